//! Focus coordinator.
//!
//! The tree holds at most one focusable node (the roving-tabindex model).
//! `TreeState::focused` is the single source of truth; the per-node
//! `focusable` flag is derived from it and every transition clears the
//! previous holder before setting the next. Navigation follows rendered
//! row order: children count only while their parent is expanded, and
//! filtered-out nodes are skipped entirely.

use std::ops::ControlFlow;

use arbor_view_core::logging::targets;

use crate::model::meta::MetaNode;
use crate::model::node::NodeRecord;
use crate::tree::TreeState;
use crate::tree::traverse::{
    NodePath, TraversalOrder, data_at, find_path, find_path_any, meta_at, meta_at_mut, traverse,
};

/// Arguments of the `focus_changed` signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusChange {
    /// The previous focus holder.
    pub previous: Option<String>,
    /// The new focus holder.
    pub current: Option<String>,
}

impl<T: NodeRecord> TreeState<T> {
    /// The id of the current focus holder.
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Focuses the node with the given id.
    ///
    /// `keep_dom_focus` marks the transition as programmatic: the renderer
    /// updates the roving tabindex but does not move input focus. Unknown
    /// or invisible ids are ignored with a diagnostic.
    pub fn focus(&mut self, id: &str, keep_dom_focus: bool) {
        if find_path(&self.roots, &self.meta, id).is_none() {
            tracing::warn!(target: targets::FOCUS, id, "cannot focus unknown or hidden node");
            return;
        }
        self.set_focused_id(Some(id.to_string()), keep_dom_focus);
    }

    /// Relinquishes focus if `id` currently holds it.
    pub fn unfocus(&mut self, id: &str) {
        if self.focused.as_deref() == Some(id) {
            self.set_focused_id(None, false);
        }
    }

    /// Focuses the first visible node.
    pub fn focus_first(&mut self) {
        if let Some(id) = self.first_visible_id() {
            self.set_focused_id(Some(id), false);
        }
    }

    /// Focuses the last visible node, descending through expanded nodes to
    /// the deepest visible row.
    pub fn focus_last(&mut self) {
        let Some(root) = last_visible_index(&self.meta) else {
            return;
        };
        let path = deepest_visible_row(&self.meta, vec![root]);
        if let Some(id) = self.node_id_at(&path) {
            self.set_focused_id(Some(id), false);
        }
    }

    /// Focuses the next visible row after `id`: the first visible child
    /// when expanded, otherwise the next visible sibling, climbing toward
    /// the root until one exists.
    pub fn focus_next(&mut self, id: &str) {
        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return;
        };
        let Some(meta) = meta_at(&self.meta, &path) else {
            return;
        };

        if meta.state.expanded {
            if let Some(child) = first_visible_child(&self.meta, &path) {
                if let Some(next) = self.node_id_at(&child) {
                    self.set_focused_id(Some(next), false);
                }
                return;
            }
        }

        let mut current = path;
        loop {
            if let Some(sibling) = next_visible_sibling(&self.meta, &current) {
                if let Some(next) = self.node_id_at(&sibling) {
                    self.set_focused_id(Some(next), false);
                }
                return;
            }
            if current.len() <= 1 {
                return;
            }
            current.pop();
        }
    }

    /// Focuses the previous visible row before `id`: the deepest visible
    /// row of the previous sibling's expanded subtree, or the parent when
    /// the node is first among its visible siblings.
    pub fn focus_previous(&mut self, id: &str) {
        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return;
        };

        if let Some(sibling) = previous_visible_sibling(&self.meta, &path) {
            let row = deepest_visible_row(&self.meta, sibling);
            if let Some(prev) = self.node_id_at(&row) {
                self.set_focused_id(Some(prev), false);
            }
            return;
        }

        if path.len() > 1 {
            let parent = path[..path.len() - 1].to_vec();
            if let Some(prev) = self.node_id_at(&parent) {
                self.set_focused_id(Some(prev), false);
            }
        }
    }

    /// Focuses the parent of `id`, if it has one.
    pub fn focus_parent(&mut self, id: &str) {
        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return;
        };
        if path.len() > 1 {
            let parent = path[..path.len() - 1].to_vec();
            if let Some(target) = self.node_id_at(&parent) {
                self.set_focused_id(Some(target), false);
            }
        }
    }

    /// Focuses the first visible child of `id` (used by the Expand key on
    /// an already-expanded node).
    pub(crate) fn focus_first_child(&mut self, id: &str) {
        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return;
        };
        if let Some(child) = first_visible_child(&self.meta, &path) {
            if let Some(target) = self.node_id_at(&child) {
                self.set_focused_id(Some(target), false);
            }
        }
    }

    /// The id of the first visible node in row order.
    pub(crate) fn first_visible_id(&self) -> Option<String> {
        let mut first = None;
        traverse(&self.roots, &self.meta, TraversalOrder::DepthFirst, &mut |node| {
            match node.id() {
                Some(id) => {
                    first = Some(id.to_string());
                    ControlFlow::Break(())
                }
                None => ControlFlow::Continue(()),
            }
        });
        first
    }

    /// The id of the node at `path`, if it has one.
    pub(crate) fn node_id_at(&self, path: &[usize]) -> Option<String> {
        data_at(&self.roots, path)
            .and_then(NodeRecord::id)
            .map(str::to_string)
    }

    /// The single point where focus transitions happen.
    ///
    /// Clears the previous holder's flag, sets the next holder's, keeps
    /// `focused` in step, applies the selection-follows-focus coupling and
    /// emits the change signals, in that order. No intermediate state is
    /// observable from a slot.
    pub(crate) fn set_focused_id(&mut self, next: Option<String>, keep_dom_focus: bool) {
        if self.focused == next {
            if let Some(id) = next.as_deref() {
                if let Some(path) = find_path_any(&self.roots, &self.meta, id) {
                    if let Some(m) = meta_at_mut(&mut self.meta, &path) {
                        m.state.keep_dom_focus = keep_dom_focus;
                    }
                }
            }
            return;
        }

        let previous = self.focused.take();
        if let Some(prev) = previous.as_deref() {
            if let Some(path) = find_path_any(&self.roots, &self.meta, prev) {
                if let Some(m) = meta_at_mut(&mut self.meta, &path) {
                    m.state.focusable = false;
                    m.state.keep_dom_focus = false;
                }
            }
        }

        if let Some(id) = next.as_deref() {
            if let Some(path) = find_path_any(&self.roots, &self.meta, id) {
                if let Some(m) = meta_at_mut(&mut self.meta, &path) {
                    m.state.focusable = true;
                    m.state.keep_dom_focus = keep_dom_focus;
                }
            }
        }
        self.focused = next.clone();

        tracing::debug!(
            target: targets::FOCUS,
            previous = previous.as_deref(),
            current = next.as_deref(),
            "focus transition"
        );

        let (selected, deselected) = self.sync_selection_to_focus();

        self.focus_changed.emit(FocusChange {
            previous,
            current: next,
        });
        if !selected.is_empty() || !deselected.is_empty() {
            self.emit_selection_changed(selected, deselected);
        }
    }
}

/// Index of the last visible entry in a sibling list.
fn last_visible_index(siblings: &[MetaNode]) -> Option<usize> {
    siblings.iter().rposition(|m| m.is_visible())
}

/// Path of the first visible child of the node at `path`.
fn first_visible_child(meta: &[MetaNode], path: &[usize]) -> Option<NodePath> {
    let node = meta_at(meta, path)?;
    let index = node.children.iter().position(|m| m.is_visible())?;
    let mut child = path.to_vec();
    child.push(index);
    Some(child)
}

/// Path of the next visible sibling after the node at `path`.
fn next_visible_sibling(meta: &[MetaNode], path: &[usize]) -> Option<NodePath> {
    let (&index, parent) = path.split_last()?;
    let siblings = siblings_of(meta, parent)?;
    let next = siblings
        .iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, m)| m.is_visible())
        .map(|(i, _)| i)?;
    let mut sibling = parent.to_vec();
    sibling.push(next);
    Some(sibling)
}

/// Path of the previous visible sibling before the node at `path`.
fn previous_visible_sibling(
    meta: &[MetaNode],
    path: &[usize],
) -> Option<NodePath> {
    let (&index, parent) = path.split_last()?;
    let siblings = siblings_of(meta, parent)?;
    let prev = siblings[..index].iter().rposition(|m| m.is_visible())?;
    let mut sibling = parent.to_vec();
    sibling.push(prev);
    Some(sibling)
}

/// Descends from `path` to the deepest visible row, entering only
/// expanded nodes.
pub(super) fn deepest_visible_row(meta: &[MetaNode], mut path: NodePath) -> NodePath {
    loop {
        let Some(node) = meta_at(meta, &path) else {
            return path;
        };
        if !node.state.expanded {
            return path;
        }
        let Some(last) = last_visible_index(&node.children) else {
            return path;
        };
        path.push(last);
    }
}

/// The sibling meta list containing the node under `parent` (the root
/// list for an empty parent path).
fn siblings_of<'a>(
    meta: &'a [MetaNode],
    parent: &[usize],
) -> Option<&'a [MetaNode]> {
    if parent.is_empty() {
        Some(meta)
    } else {
        meta_at(meta, parent).map(|m| m.children.as_slice())
    }
}
