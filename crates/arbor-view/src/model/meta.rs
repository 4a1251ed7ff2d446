//! Derived per-node view state ("meta" nodes).
//!
//! Every data node is shadowed by exactly one [`MetaNode`] holding the
//! resolved behavior flags and all interaction state the renderer consumes.
//! The meta tree always mirrors the data tree structurally: same length,
//! same order, pairwise corresponding. Meta nodes are created only by the
//! synchronized mutation primitives in [`crate::model::sync`] and discarded
//! only when their data node is spliced out, so normalization runs exactly
//! once per node entering the tree.

use std::collections::HashMap;

use arbor_view_core::logging::targets;

use crate::model::node::{EffectAllowed, InputKind, NodeRecord, NodeSpec};
use crate::model::sync::NormalizeCx;

/// Radio group name used when a radio input declares none.
pub const DEFAULT_RADIO_GROUP: &str = "arbor-view-radio-group";

/// Fully resolved behavior flags: normalization output with no gaps left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpec {
    /// Whether the node may expand to show children.
    pub expandable: bool,
    /// Whether the node participates in selection.
    pub selectable: bool,
    /// Whether the node may be deleted through the tree.
    pub deletable: bool,
    /// Whether the node may be dragged.
    pub draggable: bool,
    /// Whether other nodes may be dropped onto this node.
    pub allow_drop: bool,
    /// Permitted drag-transfer effects.
    pub effect_allowed: EffectAllowed,
    /// Whether children are fetched asynchronously on first expand.
    pub loads_children: bool,
}

impl Default for ResolvedSpec {
    fn default() -> Self {
        Self {
            expandable: true,
            selectable: false,
            deletable: false,
            draggable: false,
            allow_drop: false,
            effect_allowed: EffectAllowed::All,
            loads_children: false,
        }
    }
}

/// Caller-visible interaction state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
    /// Whether the node is expanded.
    pub expanded: bool,
    /// Whether the node is selected.
    pub selected: bool,
    /// Whether this node is the tree's focusable node. At most one meta
    /// node per tree holds `true`; the tree state is the sole arbiter.
    pub focusable: bool,
    /// When set, the renderer should not move actual input focus to this
    /// node even though it became focusable (programmatic restore).
    pub keep_dom_focus: bool,
}

/// Transient drag-and-drop presentation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragFlags {
    /// The node is currently being dragged.
    pub dragging: bool,
    /// A drag hovers over this node.
    pub is_drop_target: bool,
    /// The drop would land before this node.
    pub is_prev_drop_target: bool,
    /// The drop would land after this node.
    pub is_next_drop_target: bool,
    /// The drop would land inside this node's children.
    pub is_child_drop_target: bool,
}

impl DragFlags {
    /// Clears every flag.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Clears the drop-target flags, leaving `dragging` untouched.
    pub fn clear_targets(&mut self) {
        self.is_drop_target = false;
        self.is_prev_drop_target = false;
        self.is_next_drop_target = false;
        self.is_child_drop_target = false;
    }
}

/// Asynchronous child-loading state. The two flags never advance
/// concurrently: a load request while one is in flight is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadFlags {
    /// Children have been fetched and spliced in.
    pub children_loaded: bool,
    /// A fetch is in flight.
    pub children_loading: bool,
}

/// Filter visibility flags, recomputed by the filter engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterFlags {
    /// The node itself passes the filter predicate.
    pub matches_filter: bool,
    /// Some descendant passes the filter predicate.
    pub subnode_matches_filter: bool,
}

impl Default for FilterFlags {
    fn default() -> Self {
        Self {
            matches_filter: true,
            subnode_matches_filter: false,
        }
    }
}

/// Validated inline-input state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputState {
    /// An independent checkbox.
    Checkbox {
        /// Current checked state.
        checked: bool,
        /// Whether interaction is disabled.
        disabled: bool,
    },
    /// A radio button; its checked state derives from the tree's
    /// [`RadioGroups`] map.
    Radio {
        /// Group name.
        name: String,
        /// This node's value within the group.
        value: String,
        /// Whether interaction is disabled.
        disabled: bool,
    },
}

/// Per-tree radio group values: group name to selected value.
///
/// Owned by the tree and threaded by reference through normalization, so
/// independent tree instances never cross-contaminate. Writes are
/// last-write-wins, consistent with the single-threaded execution model.
#[derive(Debug, Clone, Default)]
pub struct RadioGroups {
    values: HashMap<String, String>,
}

impl RadioGroups {
    /// Returns the selected value for a group.
    pub fn selected(&self, group: &str) -> Option<&str> {
        self.values.get(group).map(String::as_str)
    }

    /// Selects a value for a group.
    pub fn select(&mut self, group: impl Into<String>, value: impl Into<String>) {
        self.values.insert(group.into(), value.into());
    }

    /// Seeds a group's value only if none is set yet (initial values).
    pub(crate) fn seed(&mut self, group: &str, value: &str) {
        if !self.values.contains_key(group) {
            self.values.insert(group.to_string(), value.to_string());
        }
    }
}

/// Derived view-state record, one per data node, same tree shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaNode {
    /// Resolved behavior flags.
    pub spec: ResolvedSpec,
    /// Interaction state.
    pub state: NodeState,
    /// Validated inline-input state, if the node declares one.
    pub input: Option<InputState>,
    /// Transient drag-and-drop flags.
    pub drag: DragFlags,
    /// Asynchronous loading flags.
    pub load: LoadFlags,
    /// Filter visibility flags.
    pub filter: FilterFlags,
    /// Child meta nodes, mirroring the data node's children.
    pub children: Vec<MetaNode>,
}

impl MetaNode {
    /// Normalizes a data node (and its whole subtree) into meta state.
    ///
    /// Declared spec fields win over the tree defaults at every position;
    /// remaining gaps fill with the built-in defaults. A node missing an
    /// identifier or label is a configuration error: logged, then
    /// normalized best-effort so the tree stays renderable.
    pub(crate) fn normalize<T: NodeRecord>(node: &T, cx: &mut NormalizeCx<'_, T>) -> Self {
        if node.id().is_none() {
            tracing::warn!(
                target: targets::MODEL,
                label = node.label().unwrap_or("<unlabeled>"),
                "node has no resolvable identifier; id-based operations will not reach it"
            );
        }
        if node.label().is_none() {
            tracing::warn!(
                target: targets::MODEL,
                id = node.id().unwrap_or("<no id>"),
                "node has no resolvable label"
            );
        }

        let merged = node.spec().or(cx.defaults.resolve(node));

        let spec = ResolvedSpec {
            expandable: merged.expandable.unwrap_or(true),
            selectable: merged.selectable.unwrap_or(false),
            deletable: merged.deletable.unwrap_or(false),
            draggable: merged.draggable.unwrap_or(false),
            allow_drop: merged.allow_drop.unwrap_or(false),
            effect_allowed: merged.effect_allowed.unwrap_or_default(),
            loads_children: merged.loads_children.unwrap_or(false),
        };

        let input = merged.input.and_then(|declared| match declared.kind {
            InputKind::Checkbox => Some(InputState::Checkbox {
                checked: declared.checked,
                disabled: declared.disabled,
            }),
            InputKind::Radio => {
                let name = declared
                    .name
                    .unwrap_or_else(|| DEFAULT_RADIO_GROUP.to_string());
                let value = declared
                    .value
                    .unwrap_or_else(|| derive_radio_value(node.label().unwrap_or_default()));
                if declared.checked {
                    cx.radios.seed(&name, &value);
                }
                Some(InputState::Radio {
                    name,
                    value,
                    disabled: declared.disabled,
                })
            }
        });

        let state = NodeState {
            // Async-loading nodes never start expanded: there is nothing
            // to expand into until the loader has resolved.
            expanded: merged.expanded.unwrap_or(false) && !spec.loads_children,
            selected: merged.selected.unwrap_or(false),
            focusable: false,
            keep_dom_focus: false,
        };

        let children = node
            .children()
            .iter()
            .map(|child| Self::normalize(child, cx))
            .collect();

        Self {
            spec,
            state,
            input,
            drag: DragFlags::default(),
            load: LoadFlags::default(),
            filter: FilterFlags::default(),
            children,
        }
    }

    /// A node is visible when it matches the filter directly or through a
    /// descendant.
    pub fn is_visible(&self) -> bool {
        self.filter.matches_filter || self.filter.subnode_matches_filter
    }

    /// Whether any child is currently visible.
    pub fn has_visible_children(&self) -> bool {
        self.children.iter().any(MetaNode::is_visible)
    }
}

/// Derives a radio value from a label by stripping unsafe characters.
fn derive_radio_value(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{InputSpec, SpecDefaults, TreeItem};
    use crate::model::sync::NormalizeCx;

    fn normalize(item: &TreeItem) -> (MetaNode, RadioGroups) {
        let defaults = SpecDefaults::default();
        let mut radios = RadioGroups::default();
        let meta = MetaNode::normalize(
            item,
            &mut NormalizeCx {
                defaults: &defaults,
                radios: &mut radios,
            },
        );
        (meta, radios)
    }

    #[test]
    fn test_builtin_defaults() {
        let item = TreeItem::new("a", "A");
        let (meta, _) = normalize(&item);

        assert!(meta.spec.expandable);
        assert!(!meta.spec.selectable);
        assert!(!meta.spec.draggable);
        assert_eq!(meta.spec.effect_allowed, EffectAllowed::All);
        assert!(!meta.state.expanded);
        assert!(!meta.state.focusable);
        assert!(meta.filter.matches_filter);
    }

    #[test]
    fn test_loader_gates_initial_expansion() {
        let item = TreeItem::new("a", "A")
            .with_spec(NodeSpec::default().expanded(true).loads_children(true));
        let (meta, _) = normalize(&item);

        assert!(meta.spec.loads_children);
        assert!(!meta.state.expanded);
    }

    #[test]
    fn test_children_normalized_recursively() {
        let item = TreeItem::new("a", "A").with_children(vec![
            TreeItem::new("b", "B"),
            TreeItem::new("c", "C").with_spec(NodeSpec::default().expanded(true)),
        ]);
        let (meta, _) = normalize(&item);

        assert_eq!(meta.children.len(), 2);
        assert!(!meta.children[0].state.expanded);
        assert!(meta.children[1].state.expanded);
    }

    #[test]
    fn test_radio_fallback_group_and_derived_value() {
        let item = TreeItem::new("a", "Label With Spaces!").with_spec(NodeSpec::default().input(
            InputSpec {
                kind: InputKind::Radio,
                name: None,
                value: None,
                disabled: false,
                checked: false,
            },
        ));
        let (meta, _) = normalize(&item);

        match meta.input.unwrap() {
            InputState::Radio { name, value, .. } => {
                assert_eq!(name, DEFAULT_RADIO_GROUP);
                assert_eq!(value, "LabelWithSpaces");
            }
            other => panic!("expected radio input, got {other:?}"),
        }
    }

    #[test]
    fn test_initial_radio_value_seeds_group_once() {
        let defaults = SpecDefaults::default();
        let mut radios = RadioGroups::default();

        let first = TreeItem::new("a", "A").with_spec(NodeSpec::default().input(InputSpec {
            checked: true,
            ..InputSpec::radio("g", "a")
        }));
        let second = TreeItem::new("b", "B").with_spec(NodeSpec::default().input(InputSpec {
            checked: true,
            ..InputSpec::radio("g", "b")
        }));

        for item in [&first, &second] {
            MetaNode::normalize(
                item,
                &mut NormalizeCx {
                    defaults: &defaults,
                    radios: &mut radios,
                },
            );
        }

        // First flagged node wins; later flags do not overwrite.
        assert_eq!(radios.selected("g"), Some("a"));
    }

    #[test]
    fn test_visibility() {
        let item = TreeItem::new("a", "A");
        let (mut meta, _) = normalize(&item);

        assert!(meta.is_visible());
        meta.filter.matches_filter = false;
        assert!(!meta.is_visible());
        meta.filter.subnode_matches_filter = true;
        assert!(meta.is_visible());
    }
}
