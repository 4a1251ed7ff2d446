//! # Arbor View
//!
//! The state and coordination layer of a hierarchical tree-view widget:
//! everything an accessible tree does except drawing it.
//!
//! The crate keeps two trees in lockstep. The caller owns the data tree
//! (any type implementing [`NodeRecord`]); the library derives a meta tree
//! of resolved behavior flags and interaction state, structurally mirrored
//! node for node. On top of that pair sit the coordinated behaviors:
//!
//! - **Traversal** - depth- or breadth-first walks over visible nodes
//!   ([`TreeState::traverse`])
//! - **Filtering** - predicate-driven visibility with ancestor
//!   preservation ([`TreeState::set_filter`])
//! - **Focus** - the roving single-focusable-node model with row-order
//!   navigation ([`TreeState::focus_next`] and friends)
//! - **Selection** - four modes with eager enforcement
//!   ([`SelectionMode`])
//! - **Expansion** - including one-shot deferred child loading via the
//!   request/complete contract ([`TreeState::expand`],
//!   [`TreeState::complete_load`])
//! - **Drag and drop** - MIME-keyed transfer payloads, same-tree moves
//!   that keep live state, and collision-renaming inserts
//!   ([`TreeState::start_drag`], [`TreeState::accept_drop`])
//! - **Keyboard** - a configurable key-code to action map
//!   ([`TreeState::handle_key`])
//!
//! State changes surface as signals (from `arbor-view-core`); a renderer
//! consumes [`TreeState::visible_rows`] plus the meta accessors and feeds
//! discrete events back in.
//!
//! # Example
//!
//! ```
//! use arbor_view::{NodeSpec, SelectionMode, TreeItem, TreeState};
//!
//! let mut tree = TreeState::new("files");
//! tree.set_selection_mode(SelectionMode::Single);
//! tree.add_root(
//!     TreeItem::new("docs", "Documents")
//!         .with_spec(NodeSpec::default().selectable(true))
//!         .with_children(vec![TreeItem::new("notes", "notes.txt")]),
//! );
//!
//! tree.expand("docs");
//! tree.toggle_selection("docs");
//!
//! assert_eq!(tree.visible_rows().len(), 2);
//! assert_eq!(tree.selected_ids(), ["docs"]);
//! ```

pub mod model;
pub mod tree;

pub use model::{
    DEFAULT_RADIO_GROUP, DragFlags, EffectAllowed, FilterFlags, InputKind, InputSpec, InputState,
    LoadFlags, MetaNode, NodeRecord, NodeSpec, NodeState, RadioGroups, ResolvedSpec, SpecDefaults,
    TreeItem,
};
pub use tree::drag_drop::{
    DropEffect, DropZone, MIME_JSON, MIME_NODE, MIME_TEXT, NodeDropped, TransferData,
    TransferError, TransferPayload,
};
pub use tree::expand::{ExpandOutcome, NodeRemoved};
pub use tree::filter::FilterPredicate;
pub use tree::focus::FocusChange;
pub use tree::keyboard::{KeyBindings, TreeAction, keys};
pub use tree::selection::{SelectionChange, SelectionMode};
pub use tree::traverse::{NodePath, NodeRef, TraversalOrder};
pub use tree::{InputChange, TreeState, VisibleRow};

pub use arbor_view_core::{ConnectionGuard, ConnectionId, Signal};
