//! Traversal engine over the mirrored data/meta trees.
//!
//! All walks are filter-aware: a node that neither matches the filter nor
//! has a matching descendant is invisible to traversal, and so is its whole
//! subtree. Every traversal-dependent consumer (focus, selection
//! enforcement, find/remove by id, collision checks) inherits that
//! behavior.

use std::collections::{HashSet, VecDeque};
use std::ops::ControlFlow;

use crate::model::meta::MetaNode;
use crate::model::node::NodeRecord;

/// Index path from the root list to a node.
pub type NodePath = Vec<usize>;

/// Traversal order for [`crate::TreeState::traverse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Visit a node's children before its remaining siblings.
    #[default]
    DepthFirst,
    /// Visit all nodes of one depth before the next.
    BreadthFirst,
}

/// A borrowed view of one node during traversal.
pub struct NodeRef<'a, T> {
    /// The caller-owned data record.
    pub data: &'a T,
    /// The derived meta state.
    pub meta: &'a MetaNode,
    /// Index path from the root list to this node.
    pub path: NodePath,
}

impl<'a, T: NodeRecord> NodeRef<'a, T> {
    /// The node's identifier, if it has one.
    pub fn id(&self) -> Option<&'a str> {
        self.data.id()
    }

    /// The node's label, if it has one.
    pub fn label(&self) -> Option<&'a str> {
        self.data.label()
    }

    /// The node's depth (root-level nodes have depth 0).
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }
}

/// Walks the visible tree in the given order, invoking `visit` per node.
/// `ControlFlow::Break` halts immediately without visiting queued nodes.
pub(crate) fn traverse<T, F>(data: &[T], meta: &[MetaNode], order: TraversalOrder, visit: &mut F)
where
    T: NodeRecord,
    F: FnMut(NodeRef<'_, T>) -> ControlFlow<()>,
{
    let mut queue: VecDeque<(NodePath, &T, &MetaNode)> = VecDeque::new();

    for (i, (node, m)) in data.iter().zip(meta).enumerate() {
        if m.is_visible() {
            queue.push_back((vec![i], node, m));
        }
    }

    while let Some((path, node, m)) = queue.pop_front() {
        if visit(NodeRef {
            data: node,
            meta: m,
            path: path.clone(),
        })
        .is_break()
        {
            return;
        }

        let visible_children = node
            .children()
            .iter()
            .zip(&m.children)
            .enumerate()
            .filter(|(_, (_, cm))| cm.is_visible());

        match order {
            TraversalOrder::DepthFirst => {
                // Children go to the queue front, before remaining siblings.
                let mut entries: Vec<_> = visible_children
                    .map(|(i, (c, cm))| {
                        let mut child_path = path.clone();
                        child_path.push(i);
                        (child_path, c, cm)
                    })
                    .collect();
                while let Some(entry) = entries.pop() {
                    queue.push_front(entry);
                }
            }
            TraversalOrder::BreadthFirst => {
                for (i, (c, cm)) in visible_children {
                    let mut child_path = path.clone();
                    child_path.push(i);
                    queue.push_back((child_path, c, cm));
                }
            }
        }
    }
}

/// Finds the visible node with the given identifier, depth-first.
pub(crate) fn find_path<T: NodeRecord>(data: &[T], meta: &[MetaNode], id: &str) -> Option<NodePath> {
    let mut found = None;
    traverse(data, meta, TraversalOrder::DepthFirst, &mut |node| {
        if node.id() == Some(id) {
            found = Some(node.path);
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    found
}

/// Finds a node by identifier regardless of filter visibility.
///
/// Used by asynchronous completion handlers, which must distinguish "node
/// was removed" from "node was merely filtered out".
pub(crate) fn find_path_any<T: NodeRecord>(
    data: &[T],
    meta: &[MetaNode],
    id: &str,
) -> Option<NodePath> {
    fn walk<T: NodeRecord>(data: &[T], id: &str, path: &mut NodePath) -> bool {
        for (i, node) in data.iter().enumerate() {
            path.push(i);
            if node.id() == Some(id) || walk(node.children(), id, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    debug_assert_eq!(data.len(), meta.len());
    let mut path = Vec::new();
    walk(data, id, &mut path).then_some(path)
}

/// Collects the identifiers of every visible node.
pub(crate) fn collect_visible_ids<T: NodeRecord>(data: &[T], meta: &[MetaNode]) -> HashSet<String> {
    let mut ids = HashSet::new();
    traverse(data, meta, TraversalOrder::DepthFirst, &mut |node| {
        if let Some(id) = node.id() {
            ids.insert(id.to_string());
        }
        ControlFlow::Continue(())
    });
    ids
}

/// Resolves a path to its data node.
pub(crate) fn data_at<'a, T: NodeRecord>(data: &'a [T], path: &[usize]) -> Option<&'a T> {
    let (&first, rest) = path.split_first()?;
    let mut node = data.get(first)?;
    for &i in rest {
        node = node.children().get(i)?;
    }
    Some(node)
}

/// Resolves a path to its meta node.
pub(crate) fn meta_at<'a>(meta: &'a [MetaNode], path: &[usize]) -> Option<&'a MetaNode> {
    let (&first, rest) = path.split_first()?;
    let mut node = meta.get(first)?;
    for &i in rest {
        node = node.children.get(i)?;
    }
    Some(node)
}

/// Resolves a path to its meta node, mutably.
pub(crate) fn meta_at_mut<'a>(meta: &'a mut [MetaNode], path: &[usize]) -> Option<&'a mut MetaNode> {
    let (&first, rest) = path.split_first()?;
    let mut node = meta.get_mut(first)?;
    for &i in rest {
        node = node.children.get_mut(i)?;
    }
    Some(node)
}

/// Resolves a path to its `(data, meta)` pair.
pub(crate) fn pair_at<'a, T: NodeRecord>(
    data: &'a [T],
    meta: &'a [MetaNode],
    path: &[usize],
) -> Option<(&'a T, &'a MetaNode)> {
    Some((data_at(data, path)?, meta_at(meta, path)?))
}

/// Resolves the child list pair owned by `parent` (the root lists when the
/// parent path is empty).
pub(crate) fn children_lists_mut<'a, T: NodeRecord>(
    data: &'a mut Vec<T>,
    meta: &'a mut Vec<MetaNode>,
    parent: &[usize],
) -> Option<(&'a mut Vec<T>, &'a mut Vec<MetaNode>)> {
    let Some((&first, rest)) = parent.split_first() else {
        return Some((data, meta));
    };

    let mut node = data.get_mut(first)?;
    let mut m = meta.get_mut(first)?;
    for &i in rest {
        node = node.children_mut().get_mut(i)?;
        m = m.children.get_mut(i)?;
    }
    Some((node.children_mut(), &mut m.children))
}
