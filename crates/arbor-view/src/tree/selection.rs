//! Selection engine.
//!
//! Selection state lives on the meta nodes; the mode decides which
//! mutations are legal and is enforced eagerly on every mode change, so
//! the tree never carries a selection set the current mode could not have
//! produced.

use arbor_view_core::logging::targets;

use crate::model::meta::MetaNode;
use crate::model::node::NodeRecord;
use crate::tree::TreeState;
use crate::tree::traverse::{find_path, meta_at_mut};

/// How the tree treats selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Selection is disabled entirely.
    #[default]
    None,
    /// At most one node is selected.
    Single,
    /// Any number of nodes may be selected.
    Multiple,
    /// The focused node is the selected node; direct toggling is
    /// disabled.
    SelectionFollowsFocus,
}

/// Arguments of the `selection_changed` signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    /// Ids that became selected.
    pub selected: Vec<String>,
    /// Ids that became deselected.
    pub deselected: Vec<String>,
}

/// Structural depth-first walk over `(data, meta)` pairs, ignoring the
/// filter: selection enforcement covers hidden nodes too.
fn walk_pairs_mut<T: NodeRecord>(
    data: &[T],
    meta: &mut [MetaNode],
    f: &mut impl FnMut(&T, &mut MetaNode),
) {
    for (node, m) in data.iter().zip(meta.iter_mut()) {
        f(node, m);
        walk_pairs_mut(node.children(), &mut m.children, f);
    }
}

impl<T: NodeRecord> TreeState<T> {
    /// The active selection mode.
    pub fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    /// Switches the selection mode and enforces it immediately.
    ///
    /// Entering [`SelectionMode::Single`] keeps only the first selected
    /// node in depth-first order; entering
    /// [`SelectionMode::SelectionFollowsFocus`] selects the focused node
    /// (when selectable) and nothing else. Re-applying the current mode is
    /// a no-op.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        if self.selection_mode == mode {
            return;
        }
        tracing::debug!(target: targets::SELECTION, ?mode, "selection mode changed");
        self.selection_mode = mode;

        let (selected, deselected) = match mode {
            SelectionMode::None | SelectionMode::Multiple => (Vec::new(), Vec::new()),
            SelectionMode::Single => {
                let mut kept = false;
                let mut deselected = Vec::new();
                walk_pairs_mut(&self.roots, &mut self.meta, &mut |node, m| {
                    if m.state.selected {
                        if kept {
                            m.state.selected = false;
                            if let Some(id) = node.id() {
                                deselected.push(id.to_string());
                            }
                        } else {
                            kept = true;
                        }
                    }
                });
                (Vec::new(), deselected)
            }
            SelectionMode::SelectionFollowsFocus => self.sync_selection_to_focus(),
        };

        if !selected.is_empty() || !deselected.is_empty() {
            self.emit_selection_changed(selected, deselected);
        }
    }

    /// Toggles a node's selection.
    ///
    /// Applies only in [`SelectionMode::Single`] and
    /// [`SelectionMode::Multiple`]; otherwise, and for non-selectable or
    /// hidden nodes, nothing changes. Selecting in `Single` mode deselects
    /// every other node in the same step. Returns whether a change
    /// happened.
    pub fn toggle_selection(&mut self, id: &str) -> bool {
        match self.selection_mode {
            SelectionMode::Single | SelectionMode::Multiple => {}
            _ => return false,
        }

        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return false;
        };
        let Some(m) = meta_at_mut(&mut self.meta, &path) else {
            return false;
        };
        if !m.spec.selectable {
            tracing::debug!(target: targets::SELECTION, id, "node is not selectable");
            return false;
        }

        let now_selected = !m.state.selected;
        m.state.selected = now_selected;

        let mut selected = Vec::new();
        let mut deselected = Vec::new();
        if now_selected {
            selected.push(id.to_string());
            if self.selection_mode == SelectionMode::Single {
                walk_pairs_mut(&self.roots, &mut self.meta, &mut |node, m| {
                    if m.state.selected && node.id() != Some(id) {
                        m.state.selected = false;
                        if let Some(other) = node.id() {
                            deselected.push(other.to_string());
                        }
                    }
                });
            }
        } else {
            deselected.push(id.to_string());
        }

        self.emit_selection_changed(selected, deselected);
        true
    }

    /// Selects every visible selectable node. Applies only in
    /// [`SelectionMode::Multiple`].
    pub fn select_all(&mut self) {
        if self.selection_mode != SelectionMode::Multiple {
            return;
        }
        let mut selected = Vec::new();
        walk_pairs_mut(&self.roots, &mut self.meta, &mut |node, m| {
            if m.is_visible() && m.spec.selectable && !m.state.selected {
                m.state.selected = true;
                if let Some(id) = node.id() {
                    selected.push(id.to_string());
                }
            }
        });
        if !selected.is_empty() {
            self.emit_selection_changed(selected, Vec::new());
        }
    }

    /// Ids of all selected nodes, in depth-first order.
    pub fn selected_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        fn walk<T: NodeRecord>(data: &[T], meta: &[MetaNode], ids: &mut Vec<String>) {
            for (node, m) in data.iter().zip(meta) {
                if m.state.selected {
                    if let Some(id) = node.id() {
                        ids.push(id.to_string());
                    }
                }
                walk(node.children(), &m.children, ids);
            }
        }
        walk(&self.roots, &self.meta, &mut ids);
        ids
    }

    /// Aligns selection with the focus holder under
    /// [`SelectionMode::SelectionFollowsFocus`]. Called from inside the
    /// focus transition so both states settle before any signal fires.
    /// Returns the `(selected, deselected)` id lists.
    pub(crate) fn sync_selection_to_focus(&mut self) -> (Vec<String>, Vec<String>) {
        if self.selection_mode != SelectionMode::SelectionFollowsFocus {
            return (Vec::new(), Vec::new());
        }

        let focused = self.focused.clone();
        let mut selected = Vec::new();
        let mut deselected = Vec::new();
        walk_pairs_mut(&self.roots, &mut self.meta, &mut |node, m| {
            let is_focused = node.id().is_some() && node.id() == focused.as_deref();
            if is_focused && m.spec.selectable && !m.state.selected {
                m.state.selected = true;
                selected.push(node.id().unwrap_or_default().to_string());
            } else if !is_focused && m.state.selected {
                m.state.selected = false;
                if let Some(id) = node.id() {
                    deselected.push(id.to_string());
                }
            }
        });
        (selected, deselected)
    }

    pub(crate) fn emit_selection_changed(&self, selected: Vec<String>, deselected: Vec<String>) {
        self.selection_changed.emit(SelectionChange {
            selected,
            deselected,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{NodeSpec, TreeItem};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn selectable(id: &str) -> TreeItem {
        TreeItem::new(id, id.to_uppercase()).with_spec(NodeSpec::default().selectable(true))
    }

    fn tree(mode: SelectionMode) -> TreeState<TreeItem> {
        let mut tree = TreeState::new("t");
        tree.set_selection_mode(mode);
        tree.add_root(selectable("a"));
        tree.add_root(selectable("b"));
        tree.add_root(TreeItem::new("plain", "Plain"));
        tree
    }

    #[test]
    fn test_toggle_in_multiple_mode() {
        let mut tree = tree(SelectionMode::Multiple);
        assert!(tree.toggle_selection("a"));
        assert!(tree.toggle_selection("b"));
        assert_eq!(tree.selected_ids(), ["a", "b"]);

        assert!(tree.toggle_selection("a"));
        assert_eq!(tree.selected_ids(), ["b"]);
    }

    #[test]
    fn test_single_mode_displaces_previous() {
        let mut tree = tree(SelectionMode::Single);
        tree.toggle_selection("a");
        tree.toggle_selection("b");
        assert_eq!(tree.selected_ids(), ["b"]);
    }

    #[test]
    fn test_non_selectable_and_disabled_modes_are_no_ops() {
        let mut multiple = tree(SelectionMode::Multiple);
        assert!(!multiple.toggle_selection("plain"));

        let mut disabled = tree(SelectionMode::None);
        assert!(!disabled.toggle_selection("a"));
        assert!(disabled.selected_ids().is_empty());
    }

    #[test]
    fn test_entering_single_keeps_first_depth_first_selected() {
        let mut tree = TreeState::new("t");
        tree.set_selection_mode(SelectionMode::Multiple);
        tree.add_root(
            selectable("a").with_children(vec![
                TreeItem::new("a1", "A1")
                    .with_spec(NodeSpec::default().selectable(true).selected(true)),
            ]),
        );
        tree.add_root(selectable("b").with_spec(NodeSpec::default().selectable(true).selected(true)));

        assert_eq!(tree.selected_ids(), ["a1", "b"]);
        tree.set_selection_mode(SelectionMode::Single);
        assert_eq!(tree.selected_ids(), ["a1"]);
    }

    #[test]
    fn test_reapplying_mode_keeps_selection_and_stays_silent() {
        let mut tree = tree(SelectionMode::Single);
        tree.toggle_selection("a");

        let changes: Rc<RefCell<Vec<SelectionChange>>> = Rc::default();
        let changes_clone = changes.clone();
        tree.selection_changed
            .connect(move |change| changes_clone.borrow_mut().push(change.clone()));

        tree.set_selection_mode(SelectionMode::Single);
        assert_eq!(tree.selected_ids(), ["a"]);
        assert!(changes.borrow().is_empty());
    }

    #[test]
    fn test_select_all_skips_non_selectable() {
        let mut tree = tree(SelectionMode::Multiple);
        tree.select_all();
        assert_eq!(tree.selected_ids(), ["a", "b"]);
    }

    #[test]
    fn test_selection_follows_focus_swaps_atomically() {
        let mut tree = tree(SelectionMode::SelectionFollowsFocus);
        tree.focus("a", false);
        assert_eq!(tree.selected_ids(), ["a"]);

        let changes: Rc<RefCell<Vec<SelectionChange>>> = Rc::default();
        let changes_clone = changes.clone();
        tree.selection_changed
            .connect(move |change| changes_clone.borrow_mut().push(change.clone()));

        tree.focus("b", false);
        assert_eq!(tree.selected_ids(), ["b"]);

        // One emission carrying both sides of the swap.
        let seen = changes.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].selected, ["b"]);
        assert_eq!(seen[0].deselected, ["a"]);
    }

    #[test]
    fn test_follows_focus_skips_non_selectable_focus_holder() {
        let mut tree = tree(SelectionMode::SelectionFollowsFocus);
        tree.focus("a", false);
        tree.focus("plain", false);
        assert!(tree.selected_ids().is_empty());
    }
}
