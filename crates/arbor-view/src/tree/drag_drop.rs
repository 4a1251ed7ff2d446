//! Drag-and-drop reconciliation.
//!
//! A drag carries a [`TransferData`] map keyed by MIME type, so foreign
//! drop targets can read the plain-JSON or text representation while a
//! sibling tree reads the full payload. The payload is the data subtree
//! plus the expanded bit; all other view state is re-derived on insert.
//!
//! Moves within one tree relocate the live `(data, meta)` pair, keeping
//! expansion, selection and loaded children intact. Everything else
//! (copies, cross-tree drops) inserts a snapshot whose identifiers are
//! renamed until unique in the destination.

use std::collections::HashSet;

use arbor_view_core::logging::targets;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::meta::MetaNode;
use crate::model::node::{EffectAllowed, NodeRecord};
use crate::model::sync::{NormalizeCx, insert_pair, splice_children};
use crate::tree::TreeState;
use crate::tree::traverse::{
    children_lists_mut, collect_visible_ids, data_at, find_path, find_path_any, meta_at,
    meta_at_mut, pair_at,
};

/// MIME type of the full tree-to-tree payload.
pub const MIME_NODE: &str = "application/x-arbor-view-node";
/// MIME type of the plain serialized node.
pub const MIME_JSON: &str = "application/json";
/// MIME type of the textual fallback representation.
pub const MIME_TEXT: &str = "text/plain";

/// The effect a completed drop applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    /// The node moves: the origin copy disappears.
    Move,
    /// The node is duplicated.
    Copy,
}

/// Where a drop lands relative to the target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    /// Insert before the target, as its sibling.
    Before,
    /// Insert after the target, as its sibling.
    After,
    /// Append to the target's children.
    AsChild,
}

/// MIME-keyed transfer map produced by [`TreeState::start_drag`].
///
/// Mirrors the DOM `DataTransfer` item store so a host can copy the
/// entries across verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferData {
    effect_allowed: EffectAllowed,
    entries: Vec<(String, String)>,
}

impl TransferData {
    /// Creates an empty map advertising the given allowed effects.
    pub fn new(effect_allowed: EffectAllowed) -> Self {
        Self {
            effect_allowed,
            entries: Vec::new(),
        }
    }

    /// The effects the dragged node permits.
    pub fn effect_allowed(&self) -> EffectAllowed {
        self.effect_allowed
    }

    /// Sets the value for a MIME type, replacing any previous one.
    pub fn set(&mut self, mime: impl Into<String>, value: impl Into<String>) {
        let mime = mime.into();
        self.entries.retain(|(existing, _)| *existing != mime);
        self.entries.push((mime, value.into()));
    }

    /// The value stored under a MIME type.
    pub fn get(&self, mime: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == mime)
            .map(|(_, value)| value.as_str())
    }

    /// The MIME types present, in insertion order.
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(mime, _)| mime.as_str())
    }
}

/// The tree-to-tree payload carried under [`MIME_NODE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPayload<T> {
    /// Identifier of the tree the drag started in.
    pub origin_tree: String,
    /// Whether the node was expanded when the drag started.
    #[serde(default)]
    pub expanded: bool,
    /// The dragged data subtree.
    pub node: T,
}

/// Failure to decode a foreign transfer payload.
///
/// This is the one fallible surface of the crate: payloads cross a trust
/// boundary, everything else degrades to logged no-ops.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transfer map has no entry for the required MIME type.
    #[error("transfer data has no {0} entry")]
    MissingFormat(&'static str),
    /// The payload entry is not valid JSON for the expected shape.
    #[error("malformed transfer payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl<T: DeserializeOwned> TransferPayload<T> {
    /// Decodes the payload from a transfer map.
    pub fn decode(data: &TransferData) -> Result<Self, TransferError> {
        let raw = data
            .get(MIME_NODE)
            .ok_or(TransferError::MissingFormat(MIME_NODE))?;
        Ok(serde_json::from_str(raw)?)
    }
}

/// Arguments of the `node_dropped` signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDropped {
    /// Final id of the inserted node (renamed if it collided).
    pub id: String,
    /// The drop target.
    pub target_id: String,
    /// Where the node landed relative to the target.
    pub zone: DropZone,
    /// The applied effect.
    pub effect: DropEffect,
}

impl<T: NodeRecord + Serialize + Clone> TreeState<T> {
    /// Begins dragging a node, marking it and building its transfer map.
    ///
    /// Returns `None` for unknown, hidden or non-draggable nodes, and for
    /// nodes whose allowed effect is [`EffectAllowed::None`].
    pub fn start_drag(&mut self, id: &str) -> Option<TransferData> {
        let path = find_path(&self.roots, &self.meta, id)?;
        let (node, m) = pair_at(&self.roots, &self.meta, &path)?;
        if !m.spec.draggable || m.spec.effect_allowed == EffectAllowed::None {
            tracing::debug!(target: targets::DRAG_DROP, id, "node is not draggable");
            return None;
        }

        let payload = TransferPayload {
            origin_tree: self.tree_id.clone(),
            expanded: m.state.expanded,
            node: node.clone(),
        };
        let node_json = match serde_json::to_string(&payload.node) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(target: targets::DRAG_DROP, id, %err, "node failed to serialize");
                return None;
            }
        };
        let payload_json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(target: targets::DRAG_DROP, id, %err, "payload failed to serialize");
                return None;
            }
        };

        let mut data = TransferData::new(m.spec.effect_allowed);
        data.set(MIME_NODE, payload_json);
        data.set(MIME_JSON, node_json.clone());
        data.set(MIME_TEXT, node_json);

        if let Some(m) = meta_at_mut(&mut self.meta, &path) {
            m.drag.dragging = true;
        }
        tracing::debug!(target: targets::DRAG_DROP, id, "drag started");
        Some(data)
    }
}

impl<T: NodeRecord + Clone> TreeState<T> {
    /// Applies a decoded drop onto `target_id`.
    ///
    /// A same-tree move relocates the live pair with its meta state; a
    /// copy or cross-tree drop inserts a snapshot, renaming every colliding
    /// identifier in the subtree (`{id}-1`, `{id}-2`, ...) against the
    /// visible id set. Returns `false` when the drop is refused: unknown
    /// target, target not accepting drops, or a move into the dragged
    /// node's own subtree.
    pub fn accept_drop(
        &mut self,
        payload: TransferPayload<T>,
        target_id: &str,
        zone: DropZone,
        effect: DropEffect,
    ) -> bool {
        let Some(node_id) = payload.node.id().map(str::to_string) else {
            tracing::warn!(target: targets::DRAG_DROP, "dropped node has no identifier");
            return false;
        };
        let Some(target_path) = find_path(&self.roots, &self.meta, target_id) else {
            tracing::warn!(target: targets::DRAG_DROP, target = target_id, "unknown drop target");
            return false;
        };
        let accepts = meta_at(&self.meta, &target_path).is_some_and(|m| m.spec.allow_drop);
        if !accepts {
            tracing::debug!(target: targets::DRAG_DROP, target = target_id, "target does not accept drops");
            return false;
        }

        let same_tree = payload.origin_tree == self.tree_id;
        let source_path = find_path_any(&self.roots, &self.meta, &node_id);

        let mut detached_from = None;
        let pair = if same_tree && effect == DropEffect::Move && source_path.is_some() {
            let source_path = source_path.unwrap_or_default();
            if target_path.starts_with(&source_path) {
                tracing::warn!(
                    target: targets::DRAG_DROP,
                    id = %node_id,
                    "refusing to drop a node into its own subtree"
                );
                return false;
            }

            let (&index, parent) = source_path.split_last().unwrap_or((&0, &[]));
            let Some((data, meta)) = children_lists_mut(&mut self.roots, &mut self.meta, parent)
            else {
                return false;
            };
            let mut cx = NormalizeCx {
                defaults: &self.defaults,
                radios: &mut self.radios,
            };
            let mut removed = splice_children(&mut cx, data, meta, index, 1, Vec::new());
            let Some(mut pair) = removed.pop() else {
                return false;
            };
            pair.1.drag.clear();
            self.relocated.insert(node_id.clone());
            detached_from = Some((parent.to_vec(), index));
            pair
        } else {
            // Snapshot branch: same-tree copy duplicates the live subtree,
            // cross-tree drops insert the payload snapshot.
            let mut node = match (&source_path, same_tree) {
                (Some(path), true) => data_at(&self.roots, path).cloned().unwrap_or(payload.node),
                _ => payload.node,
            };
            let mut taken = collect_visible_ids(&self.roots, &self.meta);
            resolve_id_collisions(&mut node, &mut taken);

            let mut cx = NormalizeCx {
                defaults: &self.defaults,
                radios: &mut self.radios,
            };
            let mut m = MetaNode::normalize(&node, &mut cx);
            m.state.expanded =
                payload.expanded && m.spec.expandable && !(m.spec.loads_children && !m.load.children_loaded);
            (node, m)
        };

        let final_id = pair.0.id().map(str::to_string);

        // The detach above may have shifted indices; resolve the target
        // against the current structure.
        let Some(target_path) = find_path(&self.roots, &self.meta, target_id) else {
            if let Some((parent, index)) = detached_from {
                if let Some((data, meta)) =
                    children_lists_mut(&mut self.roots, &mut self.meta, &parent)
                {
                    insert_pair(data, meta, index, pair);
                }
            }
            return false;
        };

        let (parent_path, index) = match zone {
            DropZone::Before => {
                let (&index, parent) = target_path.split_last().unwrap_or((&0, &[]));
                (parent.to_vec(), index)
            }
            DropZone::After => {
                let (&index, parent) = target_path.split_last().unwrap_or((&0, &[]));
                (parent.to_vec(), index + 1)
            }
            DropZone::AsChild => (target_path.clone(), usize::MAX),
        };

        let Some((data, meta)) = children_lists_mut(&mut self.roots, &mut self.meta, &parent_path)
        else {
            return false;
        };
        let index = index.min(data.len());
        insert_pair(data, meta, index, pair);

        self.clear_drop_indicator();
        self.refresh_filter();
        if let Some(id) = final_id {
            tracing::debug!(target: targets::DRAG_DROP, %id, target = target_id, ?zone, ?effect, "drop applied");
            self.node_dropped.emit(NodeDropped {
                id,
                target_id: target_id.to_string(),
                zone,
                effect,
            });
        }
        true
    }
}

impl<T: NodeRecord> TreeState<T> {
    /// Ends a drag that started in this tree.
    ///
    /// When the drop applied a move elsewhere (another tree, or a foreign
    /// target), the origin copy is removed here; a node relocated within
    /// this tree was already moved and only sheds its marker.
    pub fn end_drag(&mut self, id: &str, effect: Option<DropEffect>) {
        if let Some(path) = find_path_any(&self.roots, &self.meta, id) {
            if let Some(m) = meta_at_mut(&mut self.meta, &path) {
                m.drag.dragging = false;
            }
        }

        let was_relocated = self.relocated.remove(id);
        if effect == Some(DropEffect::Move) && !was_relocated {
            if find_path_any(&self.roots, &self.meta, id).is_some() {
                tracing::debug!(target: targets::DRAG_DROP, id, "removing moved-out node");
                self.remove(id);
            }
        }
    }

    /// Points the drop indicator at `id` for the given zone, or clears it
    /// with `None`. Only one node carries indicator flags at a time.
    pub fn set_drop_indicator(&mut self, id: &str, zone: Option<DropZone>) {
        self.clear_drop_indicator();
        let Some(zone) = zone else {
            return;
        };
        let Some(path) = find_path(&self.roots, &self.meta, id) else {
            return;
        };
        let Some(m) = meta_at_mut(&mut self.meta, &path) else {
            return;
        };
        m.drag.is_drop_target = true;
        match zone {
            DropZone::Before => m.drag.is_prev_drop_target = true,
            DropZone::After => m.drag.is_next_drop_target = true,
            DropZone::AsChild => m.drag.is_child_drop_target = true,
        }
        self.drop_indicator = Some(id.to_string());
    }

    /// Clears the drop indicator, wherever it points.
    pub fn clear_drop_indicator(&mut self) {
        if let Some(holder) = self.drop_indicator.take() {
            if let Some(path) = find_path_any(&self.roots, &self.meta, &holder) {
                if let Some(m) = meta_at_mut(&mut self.meta, &path) {
                    m.drag.clear_targets();
                }
            }
        }
    }
}

/// Renames identifiers in `node`'s subtree until none collides with
/// `taken`, trying `{id}-1`, `{id}-2`, ... in order. Every resolved id
/// joins the taken set, so siblings within the subtree stay unique too.
fn resolve_id_collisions<T: NodeRecord>(node: &mut T, taken: &mut HashSet<String>) {
    if let Some(id) = node.id().map(str::to_string) {
        if taken.contains(&id) {
            let mut suffix = 1u32;
            let unique = loop {
                let candidate = format!("{id}-{suffix}");
                if !taken.contains(&candidate) {
                    break candidate;
                }
                suffix += 1;
            };
            taken.insert(unique.clone());
            node.set_id(unique);
        } else {
            taken.insert(id);
        }
    }
    for child in node.children_mut() {
        resolve_id_collisions(child, taken);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{NodeSpec, TreeItem};

    fn item(id: &str) -> TreeItem {
        TreeItem::new(id, id.to_uppercase())
            .with_spec(NodeSpec::default().draggable(true).allow_drop(true))
    }

    fn payload_for(tree: &mut TreeState<TreeItem>, id: &str) -> TransferPayload<TreeItem> {
        let data = tree.start_drag(id).expect("drag should start");
        TransferPayload::decode(&data).expect("payload should decode")
    }

    #[test]
    fn test_transfer_data_round_trip() {
        let mut tree = TreeState::new("t");
        tree.add_root(item("a").with_children(vec![item("a1")]));

        let data = tree.start_drag("a").unwrap();
        assert!(tree.meta("a").unwrap().drag.dragging);
        let formats: Vec<_> = data.formats().collect();
        assert_eq!(formats, [MIME_NODE, MIME_JSON, MIME_TEXT]);

        let payload: TransferPayload<TreeItem> = TransferPayload::decode(&data).unwrap();
        assert_eq!(payload.origin_tree, "t");
        assert_eq!(payload.node.id, "a");
        assert_eq!(payload.node.children.len(), 1);
    }

    #[test]
    fn test_decode_rejects_foreign_garbage() {
        let mut data = TransferData::new(EffectAllowed::All);
        assert!(matches!(
            TransferPayload::<TreeItem>::decode(&data),
            Err(TransferError::MissingFormat(_))
        ));

        data.set(MIME_NODE, "{not json");
        assert!(matches!(
            TransferPayload::<TreeItem>::decode(&data),
            Err(TransferError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_draggable_node_refuses_drag() {
        let mut tree = TreeState::new("t");
        tree.add_root(TreeItem::new("a", "A"));
        assert!(tree.start_drag("a").is_none());
    }

    #[test]
    fn test_same_tree_move_preserves_meta_state() {
        let mut tree = TreeState::new("t");
        tree.add_root(item("a"));
        tree.add_root(
            item("b")
                .with_children(vec![item("b1")])
                .with_spec(
                    NodeSpec::default()
                        .draggable(true)
                        .allow_drop(true)
                        .expanded(true),
                ),
        );

        let payload = payload_for(&mut tree, "b");
        assert!(tree.accept_drop(payload, "a", DropZone::AsChild, DropEffect::Move));

        // Same node, relocated under "a", still expanded, id unchanged.
        let a = tree.meta("a").unwrap();
        assert_eq!(a.children.len(), 1);
        assert!(tree.meta("b").unwrap().state.expanded);
        assert_eq!(tree.node("b").unwrap().children[0].id, "b1");

        // The origin-side cleanup must not delete the relocated node.
        tree.end_drag("b", Some(DropEffect::Move));
        assert!(tree.meta("b").is_some());
    }

    #[test]
    fn test_move_into_own_subtree_is_refused() {
        let mut tree = TreeState::new("t");
        tree.add_root(item("a").with_children(vec![item("a1")]));

        let payload = payload_for(&mut tree, "a");
        assert!(!tree.accept_drop(payload, "a1", DropZone::AsChild, DropEffect::Move));
        // Structure unchanged.
        assert_eq!(tree.meta("a").unwrap().children.len(), 1);
    }

    #[test]
    fn test_same_tree_copy_renames_and_keeps_original() {
        let mut tree = TreeState::new("t");
        tree.add_root(item("a"));
        tree.add_root(item("n0"));

        let payload = payload_for(&mut tree, "n0");
        assert!(tree.accept_drop(payload, "a", DropZone::AsChild, DropEffect::Copy));

        assert!(tree.meta("n0").is_some());
        assert_eq!(tree.node("a").unwrap().children[0].id, "n0-1");

        tree.end_drag("n0", Some(DropEffect::Copy));
        assert!(tree.meta("n0").is_some());
    }

    #[test]
    fn test_collision_resolution_skips_taken_suffixes() {
        let mut tree = TreeState::new("t");
        tree.add_root(item("root"));
        tree.add_root(item("n0"));
        tree.add_root(item("n0-1"));

        let foreign = TransferPayload {
            origin_tree: "other".to_string(),
            expanded: false,
            node: TreeItem::new("n0", "N0").with_children(vec![TreeItem::new("n0", "Inner")]),
        };
        assert!(tree.accept_drop(foreign, "root", DropZone::AsChild, DropEffect::Copy));

        let inserted = &tree.node("root").unwrap().children[0];
        assert_eq!(inserted.id, "n0-2");
        // The descendant resolved independently, against the updated set.
        assert_eq!(inserted.children[0].id, "n0-3");
    }

    #[test]
    fn test_cross_tree_move_removes_from_origin_on_end_drag() {
        let mut source = TreeState::new("src");
        source.add_root(item("a"));
        let mut dest = TreeState::new("dst");
        dest.add_root(item("root"));

        let data = source.start_drag("a").unwrap();
        let payload: TransferPayload<TreeItem> = TransferPayload::decode(&data).unwrap();
        assert!(dest.accept_drop(payload, "root", DropZone::AsChild, DropEffect::Move));
        assert!(dest.meta("a").is_some());

        // Origin still holds the node until its own drag ends.
        assert!(source.meta("a").is_some());
        source.end_drag("a", Some(DropEffect::Move));
        assert!(source.meta("a").is_none());
    }

    #[test]
    fn test_sibling_zones_insert_around_target() {
        let mut tree = TreeState::new("t");
        tree.add_root(item("a"));
        tree.add_root(item("b"));
        tree.add_root(item("c"));

        let payload = payload_for(&mut tree, "c");
        assert!(tree.accept_drop(payload, "a", DropZone::Before, DropEffect::Move));
        let order: Vec<_> = tree.visible_rows().iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(order, ["c", "a", "b"]);

        let payload = payload_for(&mut tree, "c");
        assert!(tree.accept_drop(payload, "b", DropZone::After, DropEffect::Move));
        let order: Vec<_> = tree.visible_rows().iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_drop_indicator_moves_between_nodes() {
        let mut tree = TreeState::new("t");
        tree.add_root(item("a"));
        tree.add_root(item("b"));

        tree.set_drop_indicator("a", Some(DropZone::Before));
        assert!(tree.meta("a").unwrap().drag.is_prev_drop_target);

        tree.set_drop_indicator("b", Some(DropZone::AsChild));
        let a = tree.meta("a").unwrap();
        assert!(!a.drag.is_drop_target && !a.drag.is_prev_drop_target);
        let b = tree.meta("b").unwrap();
        assert!(b.drag.is_drop_target && b.drag.is_child_drop_target);

        tree.set_drop_indicator("b", None);
        let b = tree.meta("b").unwrap();
        assert!(!b.drag.is_drop_target && !b.drag.is_child_drop_target);
    }
}
