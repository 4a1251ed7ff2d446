//! Caller-owned node records and their declared specifications.
//!
//! The tree layer never dictates the shape of application data. Any type
//! implementing [`NodeRecord`] can populate a tree: the trait resolves the
//! identifier, label, and children accessors once per type instead of
//! looking properties up dynamically per call. Per-node behavior flags are
//! declared through a partial [`NodeSpec`], which normalization merges with
//! tree-level defaults into the resolved form stored on the meta node.

use std::str::FromStr;
use std::sync::Arc;

use arbor_view_core::logging::targets;
use serde::{Deserialize, Serialize};

/// Trait for application data records that can populate a tree.
///
/// The `children` accessors expose the record's own child collection; the
/// tree layer mirrors it with meta state and only ever mutates it through
/// the synchronized primitives in [`crate::model::sync`].
pub trait NodeRecord: Sized {
    /// Returns the node's identifier, if it has one.
    ///
    /// Nodes without an identifier still render, but cannot be addressed by
    /// the id-based operations (focus, selection, drag-and-drop).
    fn id(&self) -> Option<&str>;

    /// Replaces the node's identifier.
    ///
    /// Called during drag-and-drop reconciliation when an incoming node's
    /// identifier collides with one already in the destination tree.
    fn set_id(&mut self, id: String);

    /// Returns the node's display label, if it has one.
    fn label(&self) -> Option<&str>;

    /// Returns the node's ordered children.
    fn children(&self) -> &[Self];

    /// Returns mutable access to the node's child collection.
    fn children_mut(&mut self) -> &mut Vec<Self>;

    /// Returns the node's declared specification.
    ///
    /// Unset fields fall back to the tree's [`SpecDefaults`] and then to
    /// the built-in defaults.
    fn spec(&self) -> NodeSpec {
        NodeSpec::default()
    }
}

/// Drag-transfer effects a node permits, mirroring the DOM
/// `effectAllowed` allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectAllowed {
    /// Any effect (the catch-all default).
    #[default]
    All,
    /// Copy only.
    Copy,
    /// Move only.
    Move,
    /// Copy or move.
    CopyMove,
    /// No transfer permitted.
    None,
}

impl EffectAllowed {
    /// Returns the DOM string form of this effect.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Copy => "copy",
            Self::Move => "move",
            Self::CopyMove => "copyMove",
            Self::None => "none",
        }
    }
}

impl FromStr for EffectAllowed {
    type Err = std::convert::Infallible;

    /// Parses an effect string. Values outside the fixed allow-list fall
    /// back to [`EffectAllowed::All`] with a diagnostic, never an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" => Self::All,
            "copy" => Self::Copy,
            "move" => Self::Move,
            "copyMove" => Self::CopyMove,
            "none" => Self::None,
            other => {
                tracing::warn!(
                    target: targets::MODEL,
                    value = other,
                    "unknown effectAllowed value, defaulting to \"all\""
                );
                Self::All
            }
        })
    }
}

/// The kind of inline input a node renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// An independent checkbox.
    Checkbox,
    /// A radio button participating in a named group.
    Radio,
}

/// Declared inline-input descriptor for a node.
///
/// Normalization validates this into the meta node's input state: radios
/// without a `name` join a shared fallback group, radios without a `value`
/// derive one from the node label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Checkbox or radio.
    pub kind: InputKind,
    /// Radio group name. Ignored for checkboxes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Radio value within its group. Ignored for checkboxes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Whether the input is disabled.
    #[serde(default)]
    pub disabled: bool,
    /// Initial checked state for checkboxes; for radios, marks this node's
    /// value as the group's initial selection.
    #[serde(default)]
    pub checked: bool,
}

impl InputSpec {
    /// A checkbox input, optionally pre-checked.
    pub fn checkbox(checked: bool) -> Self {
        Self {
            kind: InputKind::Checkbox,
            name: None,
            value: None,
            disabled: false,
            checked,
        }
    }

    /// A radio input in the given group.
    pub fn radio(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Radio,
            name: Some(name.into()),
            value: Some(value.into()),
            disabled: false,
            checked: false,
        }
    }
}

/// Declared, partial per-node specification.
///
/// Every field is optional; unset fields resolve through the tree's
/// [`SpecDefaults`] and finally the built-in defaults (`expandable` true,
/// everything else false, `effect_allowed` [`EffectAllowed::All`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    /// Whether the node may expand to show children.
    pub expandable: Option<bool>,
    /// Whether the node participates in selection.
    pub selectable: Option<bool>,
    /// Whether the node may be deleted through the tree.
    pub deletable: Option<bool>,
    /// Whether the node may be dragged.
    pub draggable: Option<bool>,
    /// Whether other nodes may be dropped onto this node.
    pub allow_drop: Option<bool>,
    /// Permitted drag-transfer effects.
    pub effect_allowed: Option<EffectAllowed>,
    /// Whether children are fetched asynchronously on first expand.
    pub loads_children: Option<bool>,
    /// Inline input descriptor.
    pub input: Option<InputSpec>,
    /// Initial expanded state. Forced off when `loads_children` resolves
    /// true, since there is no content to expand into yet.
    pub expanded: Option<bool>,
    /// Initial selected state, subject to selection-mode enforcement.
    pub selected: Option<bool>,
}

impl NodeSpec {
    /// Returns true when no field is set (serde skip helper).
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges this spec over `fallback`: set fields win at every position,
    /// and input descriptors merge field-wise.
    pub fn or(self, fallback: Self) -> Self {
        let input = match (self.input, fallback.input) {
            (Some(declared), Some(default)) => Some(InputSpec {
                kind: declared.kind,
                name: declared.name.or(default.name),
                value: declared.value.or(default.value),
                disabled: declared.disabled || default.disabled,
                checked: declared.checked || default.checked,
            }),
            (declared, default) => declared.or(default),
        };
        Self {
            expandable: self.expandable.or(fallback.expandable),
            selectable: self.selectable.or(fallback.selectable),
            deletable: self.deletable.or(fallback.deletable),
            draggable: self.draggable.or(fallback.draggable),
            allow_drop: self.allow_drop.or(fallback.allow_drop),
            effect_allowed: self.effect_allowed.or(fallback.effect_allowed),
            loads_children: self.loads_children.or(fallback.loads_children),
            input,
            expanded: self.expanded.or(fallback.expanded),
            selected: self.selected.or(fallback.selected),
        }
    }

    /// Builder-style setter for `selectable`.
    pub fn selectable(mut self, value: bool) -> Self {
        self.selectable = Some(value);
        self
    }

    /// Builder-style setter for `expandable`.
    pub fn expandable(mut self, value: bool) -> Self {
        self.expandable = Some(value);
        self
    }

    /// Builder-style setter for `draggable`.
    pub fn draggable(mut self, value: bool) -> Self {
        self.draggable = Some(value);
        self
    }

    /// Builder-style setter for `deletable`.
    pub fn deletable(mut self, value: bool) -> Self {
        self.deletable = Some(value);
        self
    }

    /// Builder-style setter for `allow_drop`.
    pub fn allow_drop(mut self, value: bool) -> Self {
        self.allow_drop = Some(value);
        self
    }

    /// Builder-style setter for `loads_children`.
    pub fn loads_children(mut self, value: bool) -> Self {
        self.loads_children = Some(value);
        self
    }

    /// Builder-style setter for the input descriptor.
    pub fn input(mut self, input: InputSpec) -> Self {
        self.input = Some(input);
        self
    }

    /// Builder-style setter for the initial expanded state.
    pub fn expanded(mut self, value: bool) -> Self {
        self.expanded = Some(value);
        self
    }

    /// Builder-style setter for the initial selected state.
    pub fn selected(mut self, value: bool) -> Self {
        self.selected = Some(value);
        self
    }
}

/// Tree-level spec defaults: a static spec, or a function of the node for
/// per-node heterogeneous defaults.
pub enum SpecDefaults<T> {
    /// The same defaults for every node.
    Static(NodeSpec),
    /// Defaults computed per node.
    PerNode(Arc<dyn Fn(&T) -> NodeSpec>),
}

impl<T> Default for SpecDefaults<T> {
    fn default() -> Self {
        Self::Static(NodeSpec::default())
    }
}

impl<T> Clone for SpecDefaults<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(spec) => Self::Static(spec.clone()),
            Self::PerNode(f) => Self::PerNode(f.clone()),
        }
    }
}

impl<T> SpecDefaults<T> {
    /// Resolves the defaults for a particular node.
    pub fn resolve(&self, node: &T) -> NodeSpec {
        match self {
            Self::Static(spec) => spec.clone(),
            Self::PerNode(f) => f(node),
        }
    }
}

/// A ready-made node record for applications without their own data type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeItem {
    /// Unique identifier within the tree.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Ordered children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeItem>,
    /// Declared per-node specification.
    #[serde(default, skip_serializing_if = "NodeSpec::is_empty")]
    pub spec: NodeSpec,
}

impl TreeItem {
    /// Creates a leaf item.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            children: Vec::new(),
            spec: NodeSpec::default(),
        }
    }

    /// Builder-style child list.
    pub fn with_children(mut self, children: Vec<TreeItem>) -> Self {
        self.children = children;
        self
    }

    /// Builder-style spec.
    pub fn with_spec(mut self, spec: NodeSpec) -> Self {
        self.spec = spec;
        self
    }
}

impl NodeRecord for TreeItem {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn label(&self) -> Option<&str> {
        Some(&self.label)
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    fn spec(&self) -> NodeSpec {
        self.spec.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_merge_node_wins() {
        let declared = NodeSpec::default().selectable(true).expanded(false);
        let defaults = NodeSpec::default()
            .selectable(false)
            .draggable(true)
            .expanded(true);

        let merged = declared.or(defaults);
        assert_eq!(merged.selectable, Some(true));
        assert_eq!(merged.draggable, Some(true));
        assert_eq!(merged.expanded, Some(false));
        assert_eq!(merged.expandable, None);
    }

    #[test]
    fn test_spec_merge_input_fieldwise() {
        let declared = NodeSpec::default().input(InputSpec {
            kind: InputKind::Radio,
            name: None,
            value: Some("v1".into()),
            disabled: false,
            checked: false,
        });
        let defaults = NodeSpec::default().input(InputSpec::radio("group", "fallback"));

        let merged = declared.or(defaults);
        let input = merged.input.unwrap();
        assert_eq!(input.name.as_deref(), Some("group"));
        assert_eq!(input.value.as_deref(), Some("v1"));
    }

    #[test]
    fn test_effect_allowed_parse() {
        assert_eq!("copy".parse::<EffectAllowed>().unwrap(), EffectAllowed::Copy);
        assert_eq!(
            "copyMove".parse::<EffectAllowed>().unwrap(),
            EffectAllowed::CopyMove
        );
        // Unknown values degrade to the catch-all.
        assert_eq!(
            "garbage".parse::<EffectAllowed>().unwrap(),
            EffectAllowed::All
        );
    }

    #[test]
    fn test_per_node_defaults() {
        let defaults: SpecDefaults<TreeItem> = SpecDefaults::PerNode(Arc::new(|item| {
            NodeSpec::default().selectable(item.label.starts_with("sel"))
        }));

        let a = TreeItem::new("a", "sel-a");
        let b = TreeItem::new("b", "plain");
        assert_eq!(defaults.resolve(&a).selectable, Some(true));
        assert_eq!(defaults.resolve(&b).selectable, Some(false));
    }

    #[test]
    fn test_tree_item_round_trip() {
        let item = TreeItem::new("n1", "Node 1").with_children(vec![TreeItem::new("n2", "Node 2")]);
        let json = serde_json::to_string(&item).unwrap();
        let back: TreeItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
