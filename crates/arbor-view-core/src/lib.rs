//! Core systems for Arbor View.
//!
//! This crate provides the foundational components of the Arbor View tree
//! widget layer:
//!
//! - **Signal/Slot System**: Type-safe state-change notification
//! - **Logging**: `tracing` integration, per-subsystem targets, and tree
//!   debug visualization
//!
//! Arbor View runs single-threaded and event-driven: all state mutation
//! happens synchronously on the calling thread in response to discrete
//! external events. Signals therefore invoke their slots directly, with no
//! queued or cross-thread tier.
//!
//! # Signal/Slot Example
//!
//! ```
//! use arbor_view_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod signal;

pub use logging::{PerfSpan, TreeFormatOptions, TreeStyle, format_tree};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
