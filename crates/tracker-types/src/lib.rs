//! Shared types for the transaction lifecycle tracker.
//!
//! This crate holds the data model exchanged between the tracker crates:
//! operation identifiers, execution receipts, index watermarks, the
//! per-operation lifecycle state machine and the status events emitted to
//! callers, together with the configurable timing and message tables.

pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod operation;
pub mod receipt;
pub mod settings;

pub use errors::*;
pub use events::*;
pub use lifecycle::*;
pub use operation::*;
pub use receipt::*;
pub use settings::*;
