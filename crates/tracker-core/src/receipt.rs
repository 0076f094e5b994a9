//! Receipt polling for the mining phase.

use crate::{clock, TrackerError};
use async_stream::stream;
use futures::Stream;
use std::sync::Arc;
use tracing::debug;
use tracker_execution::ExecutionService;
use tracker_types::{Messages, OperationId, Receipt, StatusEvent, TrackerSettings};

/// Progress of the mining phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningUpdate {
	/// No receipt yet; emitted once per unsuccessful attempt.
	Pending { attempt: u32, event: StatusEvent },
	/// The operation was mined but execution reverted.
	Reverted { block_number: u64, event: StatusEvent },
	/// The attempt budget ran out without a final receipt.
	Dropped { event: StatusEvent },
	/// Mined successfully. Not a caller-visible event; the orchestrator moves
	/// on to the indexing phase.
	Mined { block_number: u64 },
}

impl MiningUpdate {
	pub fn event(&self) -> Option<&StatusEvent> {
		match self {
			MiningUpdate::Pending { event, .. }
			| MiningUpdate::Reverted { event, .. }
			| MiningUpdate::Dropped { event } => Some(event),
			MiningUpdate::Mined { .. } => None,
		}
	}
}

/// Polls the execution service for `id` until it is mined, reverted, or
/// `max_attempts` queries have gone by without a final receipt.
///
/// The stream ends right after its first non-pending item. A transport error
/// is yielded once as `Err` and also ends the stream. Between attempts the
/// flow sleeps for the receipt delay; no sleep follows the last attempt.
pub fn poll_receipt(
	execution: Arc<ExecutionService>,
	id: OperationId,
	settings: TrackerSettings,
	messages: Arc<Messages>,
) -> impl Stream<Item = Result<MiningUpdate, TrackerError>> + Send + 'static {
	stream! {
		let delay = settings.receipt_delay();

		for attempt in 1..=settings.max_attempts {
			let receipt = match execution.get_receipt(&id).await {
				Ok(receipt) => receipt,
				Err(e) => {
					yield Err(TrackerError::from(e));
					return;
				}
			};

			match receipt {
				Receipt::NotFound | Receipt::Pending => {
					debug!(
						operation = %id.short(),
						attempt,
						found = receipt.found(),
						"Operation not mined yet"
					);
					yield Ok(MiningUpdate::Pending {
						attempt,
						event: StatusEvent::pending(id.clone(), &messages.transaction_pending),
					});

					if attempt < settings.max_attempts {
						clock::sleep(delay).await;
					}
				}
				Receipt::Reverted { block_number, reason } => {
					yield Ok(MiningUpdate::Reverted {
						block_number,
						event: StatusEvent::failed(
							id.clone(),
							&messages.transaction_reverted,
							reason,
						),
					});
					return;
				}
				Receipt::Success { block_number } => {
					yield Ok(MiningUpdate::Mined { block_number });
					return;
				}
			}
		}

		yield Ok(MiningUpdate::Dropped {
			event: StatusEvent::failed(
				id.clone(),
				&messages.transaction_dropped,
				&messages.transaction_dropped,
			),
		});
	}
}
