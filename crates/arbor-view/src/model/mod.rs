//! Data model: caller-owned node records, derived meta state, and the
//! synchronized mutation primitives that keep the two trees mirrored.

pub mod meta;
pub mod node;
pub mod sync;

pub use meta::{
    DEFAULT_RADIO_GROUP, DragFlags, FilterFlags, InputState, LoadFlags, MetaNode, NodeState,
    RadioGroups, ResolvedSpec,
};
pub use node::{EffectAllowed, InputKind, InputSpec, NodeRecord, NodeSpec, SpecDefaults, TreeItem};
