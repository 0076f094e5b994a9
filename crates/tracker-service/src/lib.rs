//! Service wiring for the transaction tracker.
//!
//! Builds the execution and index clients named in the configuration and
//! exposes the two caller modes: a live event stream per operation and a
//! batch "wait until everything is indexed" call.

pub mod service;

pub use service::{ServiceError, TrackerService};
