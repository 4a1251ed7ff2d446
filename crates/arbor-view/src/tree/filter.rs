//! Filter engine.
//!
//! A filter is a predicate over `(data, meta)` pairs. Applying one
//! recomputes two flags on every meta node: `matches_filter` (the node
//! itself passes) and `subnode_matches_filter` (some descendant passes).
//! A node showing neither flag is invisible to traversal along with its
//! subtree.

use std::sync::Arc;

use arbor_view_core::logging::targets;

use crate::model::meta::MetaNode;
use crate::model::node::NodeRecord;
use crate::tree::TreeState;
use crate::tree::traverse::find_path;

/// Predicate deciding whether a node matches the active filter.
pub type FilterPredicate<T> = Arc<dyn Fn(&T, &MetaNode) -> bool>;

impl<T: NodeRecord> TreeState<T> {
    /// Installs or clears the filter and recomputes visibility for the
    /// whole tree synchronously.
    ///
    /// If the focused node becomes invisible it relinquishes focus and the
    /// first visible node takes over in the same call, flagged with
    /// `keep_dom_focus` so the renderer does not steal input focus for a
    /// programmatic restore.
    pub fn set_filter(&mut self, predicate: Option<FilterPredicate<T>>) {
        tracing::debug!(
            target: targets::FILTER,
            active = predicate.is_some(),
            "filter changed"
        );
        self.filter = predicate;
        self.refresh_filter();
    }

    /// Whether a filter is currently installed.
    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Recomputes the filter flags bottom-up and re-homes focus if its
    /// holder is no longer visible.
    ///
    /// Also runs after every structural change, so freshly inserted nodes
    /// are classified before the renderer sees them.
    pub(crate) fn refresh_filter(&mut self) {
        fn apply<T: NodeRecord>(
            predicate: &Option<FilterPredicate<T>>,
            data: &[T],
            meta: &mut [MetaNode],
        ) {
            for (node, m) in data.iter().zip(meta.iter_mut()) {
                apply(predicate, node.children(), &mut m.children);
                m.filter.subnode_matches_filter = m.has_visible_children();
                m.filter.matches_filter = match predicate {
                    Some(p) => p(node, m),
                    None => true,
                };
            }
        }

        let predicate = self.filter.clone();
        apply(&predicate, &self.roots, &mut self.meta);
        self.ensure_focus();
    }

    /// Re-establishes the single-focusable invariant after visibility or
    /// structure changed underneath the focus holder.
    pub(crate) fn ensure_focus(&mut self) {
        let still_visible = self
            .focused
            .as_deref()
            .is_some_and(|id| find_path(&self.roots, &self.meta, id).is_some());
        if still_visible {
            return;
        }
        let first = self.first_visible_id();
        self.set_focused_id(first, true);
    }
}
