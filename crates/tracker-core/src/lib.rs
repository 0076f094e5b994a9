//! Transaction lifecycle tracking.
//!
//! Committing an operation happens in two independently paced steps: the
//! execution tier mines it (or rejects/drops it), and later the index tier
//! catches up so queries reflect it. This crate reconciles both into one
//! ordered, lazily pulled stream of [`StatusEvent`]s per operation.
//!
//! # Components
//!
//! - [`receipt`]: polls the execution service until the operation is mined,
//!   reverted or dropped
//! - [`watermark`]: polls the index service until it covers the mined block
//!   or the deadline passes
//! - [`lifecycle`]: sequences the two for a single operation
//! - [`batch`]: waits for a whole group of operations to become durable
//!
//! Streams only make progress while the consumer pulls them. Dropping a
//! stream stops all further network calls at the next suspension point.

use std::sync::Arc;
use thiserror::Error;
use tracker_execution::{ExecutionError, ExecutionService};
use tracker_index::{IndexError, IndexService};
use tracker_types::{OperationId, StatusEvent, TrackerSettings};

pub mod batch;
pub mod clock;
pub mod lifecycle;
pub mod receipt;
pub mod watermark;

pub use batch::BatchError;
pub use receipt::MiningUpdate;

/// Infrastructure failures that stop a tracking flow.
///
/// Pending receipts, reverts, drops and indexing timeouts are not errors;
/// they are reported as [`StatusEvent`]s.
#[derive(Debug, Error)]
pub enum TrackerError {
	#[error("Execution service error: {0}")]
	Execution(#[from] ExecutionError),
	#[error("Index service error: {0}")]
	Index(#[from] IndexError),
	#[error("Tracking of {0} ended without a terminal status")]
	Incomplete(OperationId),
}

/// Result item produced by a tracking stream.
pub type TrackResult = Result<StatusEvent, TrackerError>;

/// Entry point for tracking submitted operations.
///
/// Cheap to clone; the service handles are shared by every flow.
#[derive(Clone)]
pub struct Tracker {
	execution: Arc<ExecutionService>,
	index: Arc<IndexService>,
	settings: TrackerSettings,
}

impl Tracker {
	pub fn new(
		execution: Arc<ExecutionService>,
		index: Arc<IndexService>,
		settings: TrackerSettings,
	) -> Self {
		Self {
			execution,
			index,
			settings,
		}
	}

	pub fn settings(&self) -> &TrackerSettings {
		&self.settings
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	//! Scripted collaborators for driving the tracker in tests.

	use super::*;
	use async_trait::async_trait;
	use std::collections::{HashMap, VecDeque};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;
	use tracker_execution::ExecutionInterface;
	use tracker_index::IndexInterface;
	use tracker_types::{Receipt, Watermark};

	/// Answers each receipt query from a per-operation script. The last entry
	/// of a script repeats forever.
	#[derive(Default)]
	pub struct ScriptedExecution {
		scripts: Mutex<HashMap<OperationId, VecDeque<Result<Receipt, String>>>>,
		calls: Arc<AtomicUsize>,
	}

	impl ScriptedExecution {
		pub fn with_script(self, id: &OperationId, script: Vec<Receipt>) -> Self {
			self.scripts
				.lock()
				.unwrap()
				.insert(id.clone(), script.into_iter().map(Ok).collect());
			self
		}

		pub fn with_failure(self, id: &OperationId, message: &str) -> Self {
			self.scripts
				.lock()
				.unwrap()
				.insert(id.clone(), VecDeque::from(vec![Err(message.to_string())]));
			self
		}

		pub fn calls(&self) -> Arc<AtomicUsize> {
			self.calls.clone()
		}
	}

	#[async_trait]
	impl ExecutionInterface for ScriptedExecution {
		async fn get_receipt(&self, id: &OperationId) -> Result<Receipt, ExecutionError> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let mut scripts = self.scripts.lock().unwrap();
			let script = scripts.entry(id.clone()).or_default();
			let next = if script.len() > 1 {
				script.pop_front()
			} else {
				script.front().cloned()
			};

			match next {
				Some(Ok(receipt)) => Ok(receipt),
				Some(Err(message)) => Err(ExecutionError::Network(message)),
				None => Ok(Receipt::NotFound),
			}
		}
	}

	/// Answers watermark queries from a script whose last entry repeats.
	pub struct ScriptedIndex {
		script: Mutex<VecDeque<Result<u64, String>>>,
		calls: Arc<AtomicUsize>,
	}

	impl ScriptedIndex {
		pub fn new(script: Vec<u64>) -> Self {
			Self {
				script: Mutex::new(script.into_iter().map(Ok).collect()),
				calls: Arc::new(AtomicUsize::new(0)),
			}
		}

		pub fn failing(message: &str) -> Self {
			Self {
				script: Mutex::new(VecDeque::from(vec![Err(message.to_string())])),
				calls: Arc::new(AtomicUsize::new(0)),
			}
		}

		pub fn calls(&self) -> Arc<AtomicUsize> {
			self.calls.clone()
		}
	}

	#[async_trait]
	impl IndexInterface for ScriptedIndex {
		async fn get_watermark(&self) -> Result<Watermark, IndexError> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let mut script = self.script.lock().unwrap();
			let next = if script.len() > 1 {
				script.pop_front()
			} else {
				script.front().cloned()
			};

			match next {
				Some(Ok(block)) => Ok(Watermark::new(block)),
				Some(Err(message)) => Err(IndexError::Network(message)),
				None => Ok(Watermark::new(0)),
			}
		}
	}

	pub fn op(byte: u8) -> OperationId {
		OperationId::from_bytes([byte; 32])
	}

	pub fn settings(max_attempts: u32) -> TrackerSettings {
		TrackerSettings {
			max_attempts,
			receipt_delay_ms: 2_000,
			indexing_poll_interval_ms: 500,
			indexing_timeout_ms: 180_000,
		}
	}

	pub fn tracker(
		execution: ScriptedExecution,
		index: ScriptedIndex,
		settings: TrackerSettings,
	) -> Tracker {
		Tracker::new(
			Arc::new(ExecutionService::new(Box::new(execution))),
			Arc::new(IndexService::new(Box::new(index))),
			settings,
		)
	}
}
