//! The tree state/coordination layer.
//!
//! [`TreeState`] owns the caller's data tree and its mirrored meta tree
//! and coordinates everything that happens to them: traversal, filtering,
//! the roving focus invariant, selection modes, expansion with deferred
//! child loading, drag-and-drop reconciliation and keyboard dispatch.
//! State changes are announced through signals; hosts connect slots and
//! render from [`TreeState::visible_rows`] and the meta accessors.
//!
//! All mutation is synchronous and single-threaded. Operations that need
//! host cooperation (loading children, confirming deletions, producing
//! new children) are split into a `*_requested` signal and a matching
//! `complete_*` call, so the host can suspend on its own runtime in
//! between.

pub mod drag_drop;
pub mod expand;
pub mod filter;
pub mod focus;
pub mod keyboard;
pub mod selection;
pub mod traverse;

use std::collections::HashSet;
use std::ops::ControlFlow;

use arbor_view_core::Signal;
use arbor_view_core::logging::{TreeFormatOptions, targets};

use crate::model::meta::{InputState, MetaNode, RadioGroups};
use crate::model::node::{NodeRecord, SpecDefaults};
use crate::model::sync::{NormalizeCx, push_child, splice_children};

use self::drag_drop::NodeDropped;
use self::expand::NodeRemoved;
use self::filter::FilterPredicate;
use self::focus::FocusChange;
use self::keyboard::KeyBindings;
use self::selection::{SelectionChange, SelectionMode};
use self::traverse::{
    NodeRef, TraversalOrder, children_lists_mut, data_at, find_path, find_path_any, meta_at,
    meta_at_mut,
};

/// Arguments of the `input_changed` signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputChange {
    /// The node whose input changed.
    pub id: String,
    /// The input state after the change.
    pub state: InputState,
}

/// One rendered row of the tree: a visible node at its depth, with the
/// flags a renderer needs. Children of collapsed nodes do not appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRow {
    /// The node's identifier, if it has one.
    pub id: Option<String>,
    /// The node's display label (empty when the node has none).
    pub label: String,
    /// Nesting depth; root-level rows have depth 0.
    pub depth: usize,
    /// Whether the row is expanded.
    pub expanded: bool,
    /// Whether the row is selected.
    pub selected: bool,
    /// Whether the row carries the roving tabindex.
    pub focusable: bool,
    /// Whether the row should render an expansion affordance.
    pub has_children: bool,
    /// Whether a child load is in flight.
    pub loading: bool,
}

/// The state and coordination hub for one tree instance.
///
/// Generic over the caller's node type; any `T: NodeRecord` works. Trees
/// are independent: radio groups, focus and filters never leak between
/// instances.
pub struct TreeState<T: NodeRecord> {
    tree_id: String,
    roots: Vec<T>,
    meta: Vec<MetaNode>,
    defaults: SpecDefaults<T>,
    selection_mode: SelectionMode,
    bindings: KeyBindings,
    radios: RadioGroups,
    focused: Option<String>,
    filter: Option<FilterPredicate<T>>,
    /// Ids moved within this tree during the current drag, so the
    /// origin-side cleanup in `end_drag` does not delete them.
    relocated: HashSet<String>,
    /// The node currently carrying drop-indicator flags.
    drop_indicator: Option<String>,

    /// Fires on every focus transition.
    pub focus_changed: Signal<FocusChange>,
    /// Fires when nodes become selected or deselected.
    pub selection_changed: Signal<SelectionChange>,
    /// Fires when a node expands.
    pub node_expanded: Signal<String>,
    /// Fires when a node collapses.
    pub node_collapsed: Signal<String>,
    /// Asks the host to fetch children for the given node id.
    pub load_requested: Signal<String>,
    /// Fires when fetched children were spliced in under the given id.
    pub children_loaded: Signal<String>,
    /// Asks the host to produce a child for the given parent id.
    pub add_child_requested: Signal<String>,
    /// Fires when a child was added under the given parent id.
    pub child_added: Signal<String>,
    /// Asks the host to confirm deletion of the given node id.
    pub delete_requested: Signal<String>,
    /// Fires after a node was removed, with its former position.
    pub node_removed: Signal<NodeRemoved>,
    /// Fires after a drop was applied to this tree.
    pub node_dropped: Signal<NodeDropped>,
    /// Fires when a node is activated (Enter or an input toggle).
    pub activated: Signal<String>,
    /// Fires when a node's inline input changes.
    pub input_changed: Signal<InputChange>,
}

impl<T: NodeRecord> TreeState<T> {
    /// Creates an empty tree.
    ///
    /// `tree_id` identifies this instance in drag-and-drop payloads, so
    /// give distinct trees distinct ids.
    pub fn new(tree_id: impl Into<String>) -> Self {
        Self {
            tree_id: tree_id.into(),
            roots: Vec::new(),
            meta: Vec::new(),
            defaults: SpecDefaults::default(),
            selection_mode: SelectionMode::default(),
            bindings: KeyBindings::default(),
            radios: RadioGroups::default(),
            focused: None,
            filter: None,
            relocated: HashSet::new(),
            drop_indicator: None,
            focus_changed: Signal::new(),
            selection_changed: Signal::new(),
            node_expanded: Signal::new(),
            node_collapsed: Signal::new(),
            load_requested: Signal::new(),
            children_loaded: Signal::new(),
            add_child_requested: Signal::new(),
            child_added: Signal::new(),
            delete_requested: Signal::new(),
            node_removed: Signal::new(),
            node_dropped: Signal::new(),
            activated: Signal::new(),
            input_changed: Signal::new(),
        }
    }

    /// This tree's identifier.
    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    /// Sets the spec defaults applied to nodes added from now on.
    ///
    /// Nodes already in the tree keep their resolved flags; normalization
    /// runs once, when a node enters.
    pub fn set_spec_defaults(&mut self, defaults: SpecDefaults<T>) {
        self.defaults = defaults;
    }

    /// Replaces the key bindings.
    pub fn set_key_bindings(&mut self, bindings: KeyBindings) {
        self.bindings = bindings;
    }

    /// The active key bindings.
    pub fn key_bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Whether the tree has no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes, visible or not.
    pub fn node_count(&self) -> usize {
        fn count<T: NodeRecord>(data: &[T]) -> usize {
            data.iter().map(|n| 1 + count(n.children())).sum()
        }
        count(&self.roots)
    }

    /// Appends a root node.
    pub fn add_root(&mut self, node: T) {
        let mut cx = NormalizeCx {
            defaults: &self.defaults,
            radios: &mut self.radios,
        };
        push_child(&mut cx, &mut self.roots, &mut self.meta, node);
        self.refresh_filter();
    }

    /// Replaces the whole tree content, resetting per-tree interaction
    /// state (focus, radio groups, drag markers).
    pub fn set_roots(&mut self, nodes: Vec<T>) {
        self.radios = RadioGroups::default();
        self.relocated.clear();
        self.drop_indicator = None;

        let old_len = self.roots.len();
        let mut cx = NormalizeCx {
            defaults: &self.defaults,
            radios: &mut self.radios,
        };
        splice_children(&mut cx, &mut self.roots, &mut self.meta, 0, old_len, nodes);

        self.set_focused_id(None, false);
        self.refresh_filter();
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.set_roots(Vec::new());
    }

    /// Appends a child under `parent_id`. Returns `false` when the parent
    /// does not exist.
    pub fn add_child(&mut self, parent_id: &str, node: T) -> bool {
        let Some(path) = find_path_any(&self.roots, &self.meta, parent_id) else {
            return false;
        };
        let Some((data, meta)) = children_lists_mut(&mut self.roots, &mut self.meta, &path) else {
            return false;
        };
        let mut cx = NormalizeCx {
            defaults: &self.defaults,
            radios: &mut self.radios,
        };
        push_child(&mut cx, data, meta, node);
        self.refresh_filter();
        self.child_added.emit(parent_id.to_string());
        true
    }

    /// Removes the node with the given id and its subtree.
    ///
    /// If focus lives inside the removed subtree it re-homes first: to the
    /// next visible sibling, else the previous visible sibling's deepest
    /// visible row, else the parent. Fires `node_removed` on success.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(path) = find_path_any(&self.roots, &self.meta, id) else {
            return false;
        };

        let focus_inside = self
            .focused
            .as_deref()
            .and_then(|f| find_path_any(&self.roots, &self.meta, f))
            .is_some_and(|fp| fp.starts_with(&path));
        if focus_inside {
            let target = self.rehome_target(&path);
            self.set_focused_id(target, true);
        }

        let (&index, parent) = path.split_last().unwrap_or((&0, &[]));
        let parent_id = if parent.is_empty() {
            None
        } else {
            self.node_id_at(parent)
        };

        let Some((data, meta)) = children_lists_mut(&mut self.roots, &mut self.meta, parent) else {
            return false;
        };
        let mut cx = NormalizeCx {
            defaults: &self.defaults,
            radios: &mut self.radios,
        };
        let removed = splice_children(&mut cx, data, meta, index, 1, Vec::new());
        let remaining = data.len();
        if removed.is_empty() {
            return false;
        }

        if self.drop_indicator.as_deref() == Some(id) {
            self.drop_indicator = None;
        }
        self.refresh_filter();
        tracing::debug!(target: targets::MODEL, id, "node removed");
        self.node_removed.emit(NodeRemoved {
            id: id.to_string(),
            parent_id,
            index,
            remaining_siblings: remaining,
        });
        true
    }

    /// Where focus should land when the node at `path` disappears.
    fn rehome_target(&self, path: &[usize]) -> Option<String> {
        let (&index, parent) = path.split_last()?;
        let siblings: &[MetaNode] = if parent.is_empty() {
            &self.meta
        } else {
            &meta_at(&self.meta, parent)?.children
        };

        if let Some(next) = siblings
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, m)| m.is_visible())
            .map(|(i, _)| i)
        {
            let mut p = parent.to_vec();
            p.push(next);
            return self.node_id_at(&p);
        }

        if let Some(prev) = siblings[..index].iter().rposition(|m| m.is_visible()) {
            let mut p = parent.to_vec();
            p.push(prev);
            let row = focus::deepest_visible_row(&self.meta, p);
            return self.node_id_at(&row);
        }

        if !parent.is_empty() {
            return self.node_id_at(parent);
        }
        None
    }

    /// Walks the visible tree, invoking `visit` per node until it returns
    /// [`ControlFlow::Break`].
    pub fn traverse<F>(&self, order: TraversalOrder, mut visit: F)
    where
        F: FnMut(NodeRef<'_, T>) -> ControlFlow<()>,
    {
        traverse::traverse(&self.roots, &self.meta, order, &mut visit);
    }

    /// The data record of the visible node with the given id.
    pub fn node(&self, id: &str) -> Option<&T> {
        let path = find_path(&self.roots, &self.meta, id)?;
        data_at(&self.roots, &path)
    }

    /// The meta state of the visible node with the given id.
    pub fn meta(&self, id: &str) -> Option<&MetaNode> {
        let path = find_path(&self.roots, &self.meta, id)?;
        meta_at(&self.meta, &path)
    }

    /// Flattens the tree into its rendered rows: visible nodes in row
    /// order, descending only into expanded nodes.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        fn collect<T: NodeRecord>(
            data: &[T],
            meta: &[MetaNode],
            depth: usize,
            out: &mut Vec<VisibleRow>,
        ) {
            for (node, m) in data.iter().zip(meta) {
                if !m.is_visible() {
                    continue;
                }
                out.push(VisibleRow {
                    id: node.id().map(str::to_string),
                    label: node.label().unwrap_or_default().to_string(),
                    depth,
                    expanded: m.state.expanded,
                    selected: m.state.selected,
                    focusable: m.state.focusable,
                    has_children: m.has_visible_children()
                        || (m.spec.loads_children && !m.load.children_loaded),
                    loading: m.load.children_loading,
                });
                if m.state.expanded {
                    collect(node.children(), &m.children, depth + 1, out);
                }
            }
        }

        let mut rows = Vec::new();
        collect(&self.roots, &self.meta, 0, &mut rows);
        rows
    }

    /// Sets a checkbox input's state. Returns `false` for nodes without
    /// an enabled checkbox.
    pub fn set_checkbox(&mut self, id: &str, checked: bool) -> bool {
        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return false;
        };
        let Some(m) = meta_at_mut(&mut self.meta, &path) else {
            return false;
        };
        match &mut m.input {
            Some(InputState::Checkbox {
                checked: current,
                disabled: false,
            }) => {
                if *current == checked {
                    return true;
                }
                *current = checked;
                let state = InputState::Checkbox {
                    checked,
                    disabled: false,
                };
                self.input_changed.emit(InputChange {
                    id: id.to_string(),
                    state,
                });
                true
            }
            _ => {
                tracing::debug!(target: targets::MODEL, id, "no enabled checkbox on node");
                false
            }
        }
    }

    /// Selects a radio node's value within its group. Returns `false` for
    /// nodes without an enabled radio input.
    pub fn select_radio(&mut self, id: &str) -> bool {
        let input = find_path(&self.roots, &self.meta, id)
            .and_then(|path| meta_at(&self.meta, &path))
            .and_then(|m| m.input.clone());
        match input {
            Some(InputState::Radio {
                name,
                value,
                disabled: false,
            }) => {
                self.radios.select(name.clone(), value.clone());
                self.input_changed.emit(InputChange {
                    id: id.to_string(),
                    state: InputState::Radio {
                        name,
                        value,
                        disabled: false,
                    },
                });
                true
            }
            _ => {
                tracing::debug!(target: targets::MODEL, id, "no enabled radio on node");
                false
            }
        }
    }

    /// Whether a node's input renders checked: a checkbox's own state, or
    /// for radios whether the group's selected value is this node's.
    pub fn is_input_checked(&self, id: &str) -> Option<bool> {
        match &self.meta(id)?.input {
            Some(InputState::Checkbox { checked, .. }) => Some(*checked),
            Some(InputState::Radio { name, value, .. }) => {
                Some(self.radios.selected(name) == Some(value.as_str()))
            }
            None => None,
        }
    }

    /// The selected value of a radio group.
    pub fn radio_value(&self, group: &str) -> Option<&str> {
        self.radios.selected(group)
    }

    /// Renders the tree with its meta flags for diagnostics.
    pub fn debug_tree(&self, options: &TreeFormatOptions) -> String {
        struct DebugNode {
            line: String,
            children: Vec<DebugNode>,
        }

        fn build<T: NodeRecord>(data: &[T], meta: &[MetaNode]) -> Vec<DebugNode> {
            data.iter()
                .zip(meta)
                .map(|(node, m)| {
                    let mut flags = Vec::new();
                    if !m.is_visible() {
                        flags.push("hidden");
                    }
                    if m.state.expanded {
                        flags.push("expanded");
                    }
                    if m.state.selected {
                        flags.push("selected");
                    }
                    if m.state.focusable {
                        flags.push("focusable");
                    }
                    if m.load.children_loading {
                        flags.push("loading");
                    }
                    let label = node.label().unwrap_or("<unlabeled>");
                    let id = node.id().unwrap_or("<no id>");
                    let line = if flags.is_empty() {
                        format!("{label} ({id})")
                    } else {
                        format!("{label} ({id}) [{}]", flags.join(", "))
                    };
                    DebugNode {
                        line,
                        children: build(node.children(), &m.children),
                    }
                })
                .collect()
        }

        let roots = build(&self.roots, &self.meta);
        arbor_view_core::format_tree(&roots, options, |n| n.line.clone(), |n| &n.children)
    }
}
