//! Waiting for a group of operations to become durable together.

use crate::{Tracker, TrackerError};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use tracker_types::{Messages, OperationId, OperationRef, Phase, StatusEvent};

/// Aggregate failure of a batch, raised only after every member finished.
///
/// Refers to the first failing member in input order.
#[derive(Debug, Error)]
pub enum BatchError {
	#[error("Operation {operation_id} failed: {reason} ({failed} of {total} operations failed)")]
	MemberFailed {
		operation_id: OperationId,
		reason: String,
		failed: usize,
		total: usize,
	},
	#[error("Operation {operation_id} could not be tracked: {source} ({failed} of {total} operations failed)")]
	Infrastructure {
		operation_id: OperationId,
		source: TrackerError,
		failed: usize,
		total: usize,
	},
}

impl BatchError {
	pub fn operation_id(&self) -> &OperationId {
		match self {
			BatchError::MemberFailed { operation_id, .. }
			| BatchError::Infrastructure { operation_id, .. } => operation_id,
		}
	}
}

impl Tracker {
	/// Tracks every operation concurrently and resolves once all of them
	/// reached a terminal state.
	///
	/// Returns the confirmed event of each member in input order. No member
	/// is abandoned when another fails; the error is raised afterwards.
	pub async fn track_all(
		&self,
		ops: Vec<OperationRef>,
		messages: Arc<Messages>,
	) -> Result<Vec<StatusEvent>, BatchError> {
		let total = ops.len();
		if total == 0 {
			return Ok(Vec::new());
		}

		info!(operations = total, "Waiting for batch to be indexed");

		let ids: Vec<OperationId> = ops.iter().map(|op| op.id.clone()).collect();
		let results = join_all(
			ops.into_iter()
				.map(|op| self.wait_until_indexed(op, messages.clone())),
		)
		.await;

		let mut confirmed = Vec::with_capacity(total);
		let mut first_failure = None;
		let mut failed = 0;

		for (id, result) in ids.into_iter().zip(results) {
			match result {
				Ok(event) if event.phase == Phase::Confirmed => confirmed.push(event),
				other => {
					failed += 1;
					if first_failure.is_none() {
						first_failure = Some((id, other));
					}
				}
			}
		}

		let Some((operation_id, result)) = first_failure else {
			info!(operations = total, "Batch indexed");
			return Ok(confirmed);
		};

		warn!(
			failed,
			total,
			first = %operation_id.short(),
			"Batch finished with failures"
		);

		Err(match result {
			Ok(event) => BatchError::MemberFailed {
				operation_id,
				reason: event.reason.unwrap_or(event.message),
				failed,
				total,
			},
			Err(source) => BatchError::Infrastructure {
				operation_id,
				source,
				failed,
				total,
			},
		})
	}
}
