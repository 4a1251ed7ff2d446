//! Synchronized mutation of the data/meta tree pair.
//!
//! The data tree and the meta tree must never diverge in length or order.
//! Every structural change anywhere in the crate goes through the
//! primitives in this module, which operate on a `(data children, meta
//! children)` pair atomically: no call site can mutate one list without the
//! other.

use crate::model::meta::{MetaNode, RadioGroups};
use crate::model::node::{NodeRecord, SpecDefaults};

/// Context required to normalize nodes entering the tree: the tree's spec
/// defaults and its radio group map.
pub struct NormalizeCx<'a, T> {
    /// Tree-level spec defaults.
    pub defaults: &'a SpecDefaults<T>,
    /// Per-tree radio group values, seeded by initial radio flags.
    pub radios: &'a mut RadioGroups,
}

/// Splices `delete_count` entries at `index` out of both lists, inserting
/// normalized meta nodes for each of `new_nodes`. Out-of-range positions
/// are clamped. Returns the removed `(data, meta)` pairs.
pub(crate) fn splice_children<T: NodeRecord>(
    cx: &mut NormalizeCx<'_, T>,
    data: &mut Vec<T>,
    meta: &mut Vec<MetaNode>,
    index: usize,
    delete_count: usize,
    new_nodes: Vec<T>,
) -> Vec<(T, MetaNode)> {
    debug_assert_eq!(data.len(), meta.len());

    let index = index.min(data.len());
    let end = index.saturating_add(delete_count).min(data.len());

    let new_meta: Vec<MetaNode> = new_nodes
        .iter()
        .map(|node| MetaNode::normalize(node, cx))
        .collect();

    let removed_data: Vec<T> = data.splice(index..end, new_nodes).collect();
    let removed_meta: Vec<MetaNode> = meta.splice(index..end, new_meta).collect();

    debug_assert_eq!(data.len(), meta.len());
    removed_data.into_iter().zip(removed_meta).collect()
}

/// Appends a node to both lists, normalizing its meta state. Returns the
/// new child count.
pub(crate) fn push_child<T: NodeRecord>(
    cx: &mut NormalizeCx<'_, T>,
    data: &mut Vec<T>,
    meta: &mut Vec<MetaNode>,
    node: T,
) -> usize {
    debug_assert_eq!(data.len(), meta.len());

    meta.push(MetaNode::normalize(&node, cx));
    data.push(node);

    debug_assert_eq!(data.len(), meta.len());
    data.len()
}

/// Inserts an already-paired node without re-normalizing, preserving its
/// existing meta state. Used by same-tree drag moves, where the live meta
/// node (expansion, selection, loaded children) must survive relocation.
pub(crate) fn insert_pair<T: NodeRecord>(
    data: &mut Vec<T>,
    meta: &mut Vec<MetaNode>,
    index: usize,
    pair: (T, MetaNode),
) {
    debug_assert_eq!(data.len(), meta.len());

    let index = index.min(data.len());
    data.insert(index, pair.0);
    meta.insert(index, pair.1);

    debug_assert_eq!(data.len(), meta.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::TreeItem;

    fn cx_parts() -> (SpecDefaults<TreeItem>, RadioGroups) {
        (SpecDefaults::default(), RadioGroups::default())
    }

    fn ids(data: &[TreeItem]) -> Vec<&str> {
        data.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_splice_keeps_lists_mirrored() {
        let (defaults, mut radios) = cx_parts();
        let mut cx = NormalizeCx {
            defaults: &defaults,
            radios: &mut radios,
        };

        let mut data = Vec::new();
        let mut meta = Vec::new();

        splice_children(
            &mut cx,
            &mut data,
            &mut meta,
            0,
            0,
            vec![
                TreeItem::new("a", "A"),
                TreeItem::new("b", "B"),
                TreeItem::new("c", "C"),
            ],
        );
        assert_eq!(data.len(), meta.len());
        assert_eq!(ids(&data), ["a", "b", "c"]);

        // Replace the middle entry with two new ones.
        let removed = splice_children(
            &mut cx,
            &mut data,
            &mut meta,
            1,
            1,
            vec![TreeItem::new("x", "X"), TreeItem::new("y", "Y")],
        );
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0.id, "b");
        assert_eq!(ids(&data), ["a", "x", "y", "c"]);
        assert_eq!(data.len(), meta.len());

        // Delete from the tail.
        let removed = splice_children(&mut cx, &mut data, &mut meta, 2, 5, Vec::new());
        assert_eq!(removed.len(), 2);
        assert_eq!(ids(&data), ["a", "x"]);
        assert_eq!(data.len(), meta.len());
    }

    #[test]
    fn test_splice_clamps_out_of_range() {
        let (defaults, mut radios) = cx_parts();
        let mut cx = NormalizeCx {
            defaults: &defaults,
            radios: &mut radios,
        };

        let mut data = vec![TreeItem::new("a", "A")];
        let mut meta = vec![MetaNode::normalize(&data[0], &mut cx)];

        let removed = splice_children(
            &mut cx,
            &mut data,
            &mut meta,
            10,
            3,
            vec![TreeItem::new("b", "B")],
        );
        assert!(removed.is_empty());
        assert_eq!(ids(&data), ["a", "b"]);
        assert_eq!(data.len(), meta.len());
    }

    #[test]
    fn test_push_child() {
        let (defaults, mut radios) = cx_parts();
        let mut cx = NormalizeCx {
            defaults: &defaults,
            radios: &mut radios,
        };

        let mut data = Vec::new();
        let mut meta = Vec::new();

        assert_eq!(push_child(&mut cx, &mut data, &mut meta, TreeItem::new("a", "A")), 1);
        assert_eq!(push_child(&mut cx, &mut data, &mut meta, TreeItem::new("b", "B")), 2);
        assert_eq!(data.len(), meta.len());
    }

    #[test]
    fn test_insert_pair_preserves_meta_state() {
        let (defaults, mut radios) = cx_parts();
        let mut cx = NormalizeCx {
            defaults: &defaults,
            radios: &mut radios,
        };

        let mut data = vec![TreeItem::new("a", "A"), TreeItem::new("c", "C")];
        let mut meta = vec![
            MetaNode::normalize(&data[0], &mut cx),
            MetaNode::normalize(&data[1], &mut cx),
        ];

        let node = TreeItem::new("b", "B");
        let mut node_meta = MetaNode::normalize(&node, &mut cx);
        node_meta.state.expanded = true;

        insert_pair(&mut data, &mut meta, 1, (node, node_meta));
        assert_eq!(ids(&data), ["a", "b", "c"]);
        assert!(meta[1].state.expanded);
        assert_eq!(data.len(), meta.len());
    }
}
