//! Expansion and deferred child loading.
//!
//! A node with `loads_children` expands in two phases: `expand` flags the
//! node as loading and emits `load_requested`; the host fetches children
//! on its own runtime and hands them back through `complete_load`. The
//! `children_loaded` and `children_loading` flags never hold
//! simultaneously, and a request while one is in flight is dropped rather
//! than queued.
//!
//! Adding and deleting nodes follow the same request/complete contract so
//! hosts can confirm or veto asynchronously.

use arbor_view_core::logging::targets;

use crate::model::meta::MetaNode;
use crate::model::node::NodeRecord;
use crate::model::sync::{NormalizeCx, splice_children};
use crate::tree::TreeState;
use crate::tree::traverse::{children_lists_mut, find_path, find_path_any, meta_at, meta_at_mut};

/// What an [`TreeState::expand`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// The node is now expanded.
    Expanded,
    /// A child load was requested; the node expands when it completes.
    LoadStarted,
    /// Nothing happened (unknown, not expandable, already expanded, no
    /// visible children to show, or a load is already in flight).
    Ignored,
}

/// Arguments of the `node_removed` signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRemoved {
    /// The removed node.
    pub id: String,
    /// Its former parent, `None` for a root.
    pub parent_id: Option<String>,
    /// Its former index among its siblings.
    pub index: usize,
    /// How many siblings remain in that list.
    pub remaining_siblings: usize,
}

impl<T: NodeRecord> TreeState<T> {
    /// Expands a node.
    ///
    /// For a `loads_children` node whose children were never fetched this
    /// starts the load instead; the node expands once the host calls
    /// [`complete_load`](Self::complete_load) with content. A node with no
    /// visible children and no pending loader has nothing to expand into
    /// and is left alone.
    pub fn expand(&mut self, id: &str) -> ExpandOutcome {
        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return ExpandOutcome::Ignored;
        };
        let Some(m) = meta_at_mut(&mut self.meta, &path) else {
            return ExpandOutcome::Ignored;
        };
        if !m.spec.expandable || m.state.expanded {
            return ExpandOutcome::Ignored;
        }

        if m.spec.loads_children && !m.load.children_loaded {
            if m.load.children_loading {
                tracing::debug!(target: targets::EXPAND, id, "load already in flight");
                return ExpandOutcome::Ignored;
            }
            m.load.children_loading = true;
            tracing::debug!(target: targets::EXPAND, id, "requesting child load");
            self.load_requested.emit(id.to_string());
            return ExpandOutcome::LoadStarted;
        }

        // Expanding only makes sense when a child row would appear.
        if !m.has_visible_children() {
            tracing::debug!(target: targets::EXPAND, id, "no visible children to expand into");
            return ExpandOutcome::Ignored;
        }

        m.state.expanded = true;
        self.node_expanded.emit(id.to_string());
        ExpandOutcome::Expanded
    }

    /// Collapses a node. Returns whether it was expanded.
    pub fn collapse(&mut self, id: &str) -> bool {
        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return false;
        };
        let Some(m) = meta_at_mut(&mut self.meta, &path) else {
            return false;
        };
        if !m.state.expanded {
            return false;
        }
        m.state.expanded = false;
        self.node_collapsed.emit(id.to_string());
        true
    }

    /// Expands a collapsed node or collapses an expanded one.
    pub fn toggle_expanded(&mut self, id: &str) {
        let expanded = find_path(&self.roots, &self.meta, id)
            .and_then(|path| meta_at(&self.meta, &path))
            .is_some_and(|m| m.state.expanded);
        if expanded {
            self.collapse(id);
        } else {
            self.expand(id);
        }
    }

    /// Expands every expandable node that has content. Loader nodes whose
    /// children were never fetched stay collapsed; bulk expansion does not
    /// fire load requests.
    pub fn expand_all(&mut self) {
        let mut changed = Vec::new();
        visit_meta_with_ids(&self.roots, &mut self.meta, &mut |id, m| {
            let pending_load = m.spec.loads_children && !m.load.children_loaded;
            if m.spec.expandable && !m.state.expanded && !pending_load && m.has_visible_children() {
                m.state.expanded = true;
                if let Some(id) = id {
                    changed.push(id.to_string());
                }
            }
        });
        for id in changed {
            self.node_expanded.emit(id);
        }
    }

    /// Collapses every expanded node.
    pub fn collapse_all(&mut self) {
        let mut changed = Vec::new();
        visit_meta_with_ids(&self.roots, &mut self.meta, &mut |id, m| {
            if m.state.expanded {
                m.state.expanded = false;
                if let Some(id) = id {
                    changed.push(id.to_string());
                }
            }
        });
        for id in changed {
            self.node_collapsed.emit(id);
        }
    }

    /// Delivers the result of a child load requested via
    /// [`expand`](Self::expand).
    ///
    /// A completion for a node that is gone, or that is not loading, is a
    /// silent no-op: the host may have raced a removal. An empty or `None`
    /// result leaves the node collapsed and not loaded, so a later expand
    /// retries the fetch.
    pub fn complete_load(&mut self, id: &str, children: Option<Vec<T>>) {
        let Some(path) = find_path_any(&self.roots, &self.meta, id) else {
            tracing::debug!(target: targets::EXPAND, id, "load completed for removed node");
            return;
        };
        {
            let Some(m) = meta_at_mut(&mut self.meta, &path) else {
                return;
            };
            if !m.load.children_loading {
                tracing::debug!(target: targets::EXPAND, id, "stale load completion");
                return;
            }
            m.load.children_loading = false;
        }

        let children = match children {
            Some(nodes) if !nodes.is_empty() => nodes,
            _ => {
                // Nothing came back; the node stays collapsed and a later
                // expand may retry.
                tracing::debug!(target: targets::EXPAND, id, "load returned no children");
                return;
            }
        };

        let Some((data, meta)) = children_lists_mut(&mut self.roots, &mut self.meta, &path) else {
            return;
        };
        let mut cx = NormalizeCx {
            defaults: &self.defaults,
            radios: &mut self.radios,
        };
        let index = data.len();
        splice_children(&mut cx, data, meta, index, 0, children);

        if let Some(m) = meta_at_mut(&mut self.meta, &path) {
            m.load.children_loaded = true;
            m.state.expanded = true;
        }
        self.refresh_filter();
        self.children_loaded.emit(id.to_string());
        self.node_expanded.emit(id.to_string());
    }

    /// Asks the host to produce a new child for `id` by emitting
    /// `add_child_requested`. The host answers through
    /// [`complete_add_child`](Self::complete_add_child).
    pub fn request_add_child(&mut self, id: &str) {
        if find_path(&self.roots, &self.meta, id).is_none() {
            return;
        }
        self.add_child_requested.emit(id.to_string());
    }

    /// Delivers the host's answer to an add-child request. `None` means
    /// the host declined; nothing changes.
    pub fn complete_add_child(&mut self, parent_id: &str, child: Option<T>) {
        let Some(child) = child else {
            return;
        };
        if !self.add_child(parent_id, child) {
            tracing::debug!(
                target: targets::EXPAND,
                parent = parent_id,
                "add-child completion for removed parent"
            );
        }
    }

    /// Asks the host to confirm deletion of `id` by emitting
    /// `delete_requested`. Only nodes resolved as deletable qualify. The
    /// host answers through [`complete_delete`](Self::complete_delete).
    pub fn request_delete(&mut self, id: &str) {
        let deletable = find_path(&self.roots, &self.meta, id)
            .and_then(|path| meta_at(&self.meta, &path))
            .is_some_and(|m| m.spec.deletable);
        if !deletable {
            tracing::debug!(target: targets::EXPAND, id, "node is not deletable");
            return;
        }
        self.delete_requested.emit(id.to_string());
    }

    /// Delivers the host's answer to a delete request. `false` vetoes the
    /// deletion; `true` removes the node with focus re-homing and fires
    /// `node_removed`.
    pub fn complete_delete(&mut self, id: &str, confirmed: bool) {
        if !confirmed {
            return;
        }
        self.remove(id);
    }
}

/// Structural mutable walk carrying each node's id.
fn visit_meta_with_ids<T: NodeRecord>(
    data: &[T],
    meta: &mut [MetaNode],
    f: &mut impl FnMut(Option<&str>, &mut MetaNode),
) {
    for (node, m) in data.iter().zip(meta.iter_mut()) {
        f(node.id(), m);
        visit_meta_with_ids(node.children(), &mut m.children, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{NodeSpec, TreeItem};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn loader(id: &str) -> TreeItem {
        TreeItem::new(id, id.to_uppercase()).with_spec(NodeSpec::default().loads_children(true))
    }

    #[test]
    fn test_plain_expand_collapse() {
        let mut tree = TreeState::new("t");
        tree.add_root(TreeItem::new("a", "A").with_children(vec![TreeItem::new("b", "B")]));

        assert_eq!(tree.expand("a"), ExpandOutcome::Expanded);
        assert!(tree.meta("a").unwrap().state.expanded);
        assert_eq!(tree.expand("a"), ExpandOutcome::Ignored);

        assert!(tree.collapse("a"));
        assert!(!tree.collapse("a"));
    }

    #[test]
    fn test_not_expandable_is_ignored() {
        let mut tree = TreeState::new("t");
        tree.add_root(TreeItem::new("a", "A").with_spec(NodeSpec::default().expandable(false)));
        assert_eq!(tree.expand("a"), ExpandOutcome::Ignored);
    }

    #[test]
    fn test_childless_node_does_not_expand() {
        let mut tree = TreeState::new("t");
        tree.add_root(TreeItem::new("a", "A"));

        assert_eq!(tree.expand("a"), ExpandOutcome::Ignored);
        assert!(!tree.meta("a").unwrap().state.expanded);

        tree.expand_all();
        assert!(!tree.meta("a").unwrap().state.expanded);
    }

    #[test]
    fn test_expand_with_all_children_filtered_is_ignored() {
        use std::sync::Arc;

        let mut tree = TreeState::new("t");
        tree.add_root(TreeItem::new("a", "Apple").with_children(vec![
            TreeItem::new("b", "Banana"),
        ]));

        tree.set_filter(Some(Arc::new(|item: &TreeItem, _: &MetaNode| {
            item.label.contains("Apple")
        })));
        // "a" is still visible but its only child is filtered out.
        assert_eq!(tree.expand("a"), ExpandOutcome::Ignored);
        assert!(!tree.meta("a").unwrap().state.expanded);

        tree.set_filter(None);
        assert_eq!(tree.expand("a"), ExpandOutcome::Expanded);
    }

    #[test]
    fn test_double_expand_requests_load_once() {
        let mut tree = TreeState::new("t");
        tree.add_root(loader("a"));

        let requests = Rc::new(Cell::new(0));
        let requests_clone = requests.clone();
        tree.load_requested
            .connect(move |_| requests_clone.set(requests_clone.get() + 1));

        assert_eq!(tree.expand("a"), ExpandOutcome::LoadStarted);
        assert_eq!(tree.expand("a"), ExpandOutcome::Ignored);
        assert_eq!(requests.get(), 1);

        let m = tree.meta("a").unwrap();
        assert!(m.load.children_loading);
        assert!(!m.load.children_loaded);
    }

    #[test]
    fn test_complete_load_splices_and_expands() {
        let mut tree = TreeState::new("t");
        tree.add_root(loader("a"));
        tree.expand("a");

        tree.complete_load(
            "a",
            Some(vec![TreeItem::new("a1", "A1"), TreeItem::new("a2", "A2")]),
        );

        let m = tree.meta("a").unwrap();
        assert!(m.load.children_loaded);
        assert!(!m.load.children_loading);
        assert!(m.state.expanded);
        assert_eq!(m.children.len(), 2);
        assert!(tree.meta("a1").is_some());

        // Subsequent expand cycles reuse the loaded children.
        tree.collapse("a");
        assert_eq!(tree.expand("a"), ExpandOutcome::Expanded);
    }

    #[test]
    fn test_empty_load_result_is_retriable() {
        let mut tree = TreeState::new("t");
        tree.add_root(loader("a"));

        assert_eq!(tree.expand("a"), ExpandOutcome::LoadStarted);
        tree.complete_load("a", Some(Vec::new()));

        let m = tree.meta("a").unwrap();
        assert!(!m.load.children_loaded);
        assert!(!m.load.children_loading);
        assert!(!m.state.expanded);

        // The next expand starts a fresh load.
        assert_eq!(tree.expand("a"), ExpandOutcome::LoadStarted);
        tree.complete_load("a", Some(vec![TreeItem::new("a1", "A1")]));
        assert!(tree.meta("a").unwrap().state.expanded);
    }

    #[test]
    fn test_stale_completion_is_a_no_op() {
        let mut tree = TreeState::new("t");
        tree.add_root(loader("a"));
        tree.add_root(TreeItem::new("b", "B"));

        // Completion without a request.
        tree.complete_load("a", Some(vec![TreeItem::new("x", "X")]));
        assert!(tree.meta("a").unwrap().children.is_empty());

        // Completion after the node is gone.
        tree.expand("a");
        tree.remove("a");
        tree.complete_load("a", Some(vec![TreeItem::new("x", "X")]));
        assert!(tree.meta("x").is_none());
    }

    #[test]
    fn test_expand_all_skips_unloaded_loaders() {
        let mut tree = TreeState::new("t");
        tree.add_root(TreeItem::new("a", "A").with_children(vec![
            TreeItem::new("b", "B").with_children(vec![TreeItem::new("c", "C")]),
        ]));
        tree.add_root(loader("l"));

        let requests = Rc::new(Cell::new(0));
        let requests_clone = requests.clone();
        tree.load_requested
            .connect(move |_| requests_clone.set(requests_clone.get() + 1));

        tree.expand_all();
        assert!(tree.meta("a").unwrap().state.expanded);
        assert!(tree.meta("b").unwrap().state.expanded);
        assert!(!tree.meta("l").unwrap().state.expanded);
        assert_eq!(requests.get(), 0);

        tree.collapse_all();
        assert!(!tree.meta("a").unwrap().state.expanded);
        assert!(!tree.meta("b").unwrap().state.expanded);
    }

    #[test]
    fn test_delete_round_trip_with_veto() {
        let mut tree = TreeState::new("t");
        tree.add_root(
            TreeItem::new("a", "A").with_spec(NodeSpec::default().deletable(true)),
        );
        tree.add_root(TreeItem::new("b", "B"));

        let requested: Rc<RefCell<Vec<String>>> = Rc::default();
        let requested_clone = requested.clone();
        tree.delete_requested
            .connect(move |id| requested_clone.borrow_mut().push(id.clone()));

        // "b" is not deletable.
        tree.request_delete("b");
        assert!(requested.borrow().is_empty());

        tree.request_delete("a");
        assert_eq!(requested.borrow().as_slice(), ["a".to_string()]);

        tree.complete_delete("a", false);
        assert!(tree.meta("a").is_some());

        tree.complete_delete("a", true);
        assert!(tree.meta("a").is_none());
    }

    #[test]
    fn test_add_child_round_trip() {
        let mut tree = TreeState::new("t");
        tree.add_root(TreeItem::new("a", "A"));

        let requested: Rc<RefCell<Vec<String>>> = Rc::default();
        let requested_clone = requested.clone();
        tree.add_child_requested
            .connect(move |id| requested_clone.borrow_mut().push(id.clone()));

        tree.request_add_child("a");
        assert_eq!(requested.borrow().as_slice(), ["a".to_string()]);

        tree.complete_add_child("a", None);
        assert!(tree.meta("a").unwrap().children.is_empty());

        tree.complete_add_child("a", Some(TreeItem::new("a1", "A1")));
        assert_eq!(tree.meta("a").unwrap().children.len(), 1);
    }
}
