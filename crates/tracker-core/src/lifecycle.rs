//! Per-operation orchestration of the mining and indexing phases.

use crate::{
	receipt::{poll_receipt, MiningUpdate},
	watermark::wait_for_watermark,
	TrackResult, Tracker, TrackerError,
};
use async_stream::stream;
use chrono::{DateTime, TimeDelta, Utc};
use futures::{pin_mut, Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracker_types::{LifecycleState, Messages, OperationRef, Phase, StatusEvent};

/// Wall-clock deadline of the indexing phase, saturating at the latest
/// representable time.
fn indexing_deadline(now: DateTime<Utc>, timeout_ms: u64) -> DateTime<Utc> {
	i64::try_from(timeout_ms)
		.ok()
		.and_then(TimeDelta::try_milliseconds)
		.and_then(|timeout| now.checked_add_signed(timeout))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Owns the lifecycle state of one tracked operation.
struct Flow {
	op: OperationRef,
	state: LifecycleState,
}

impl Flow {
	fn new(op: OperationRef) -> Self {
		Self {
			op,
			state: LifecycleState::Submitted,
		}
	}

	fn advance(&mut self, next: LifecycleState) {
		debug_assert!(
			self.state.can_transition_to(&next),
			"invalid transition {:?} -> {:?}",
			self.state,
			next
		);
		debug!(
			operation = %self.op.id.short(),
			from = self.state.name(),
			to = next.name(),
			"Lifecycle transition"
		);
		self.state = next;
	}

	/// Logs the terminal outcome once the flow has finished.
	fn finish(&self, event: &StatusEvent) {
		let since_submission = self
			.op
			.submitted_at
			.map(|at| (Utc::now() - at).num_milliseconds());

		match event.phase {
			Phase::Confirmed => info!(
				operation = %self.op.id.short(),
				state = self.state.name(),
				since_submission_ms = ?since_submission,
				"Operation confirmed"
			),
			_ => warn!(
				operation = %self.op.id.short(),
				state = self.state.name(),
				reason = event.reason.as_deref().unwrap_or_default(),
				since_submission_ms = ?since_submission,
				"Operation failed"
			),
		}
	}
}

impl Tracker {
	/// Tracks one operation from submission until it is durably indexed.
	///
	/// Yields zero or more pending events followed by exactly one terminal
	/// event (`confirmed` or `failed`). The indexing phase only starts after
	/// the execution service reported a successful receipt. If either
	/// service call fails the error is yielded and the stream ends.
	pub fn track(
		&self,
		op: OperationRef,
		messages: Arc<Messages>,
	) -> impl Stream<Item = TrackResult> + Send + 'static {
		let execution = self.execution.clone();
		let index = self.index.clone();
		let settings = self.settings.clone();

		stream! {
			let mut flow = Flow::new(op);
			let id = flow.op.id.clone();
			info!(operation = %id.short(), "Tracking operation");

			flow.advance(LifecycleState::Mining { attempts: 0 });

			let mining = poll_receipt(execution, id.clone(), settings.clone(), messages.clone());
			pin_mut!(mining);

			let mut mined_block = None;
			while let Some(update) = mining.next().await {
				let update = match update {
					Ok(update) => update,
					Err(e) => {
						warn!(operation = %id.short(), error = %e, "Receipt polling failed");
						yield Err(e);
						return;
					}
				};

				match update {
					MiningUpdate::Pending { attempt, event } => {
						flow.advance(LifecycleState::Mining { attempts: attempt });
						yield Ok(event);
					}
					MiningUpdate::Reverted { block_number, event } => {
						debug!(operation = %id.short(), block_number, "Operation reverted");
						flow.advance(LifecycleState::MiningFailed {
							reason: event.reason.clone().unwrap_or_default(),
						});
						flow.finish(&event);
						yield Ok(event);
						return;
					}
					MiningUpdate::Dropped { event } => {
						flow.advance(LifecycleState::MiningDropped);
						flow.finish(&event);
						yield Ok(event);
						return;
					}
					MiningUpdate::Mined { block_number } => {
						flow.advance(LifecycleState::Mined { block_number });
						mined_block = Some(block_number);
						break;
					}
				}
			}

			let Some(block_number) = mined_block else {
				yield Err(TrackerError::Incomplete(id));
				return;
			};

			info!(operation = %id.short(), block_number, "Operation mined, waiting for index");
			let deadline = indexing_deadline(Utc::now(), settings.indexing_timeout_ms);
			flow.advance(LifecycleState::IndexingPending { block_number, deadline });

			let indexing = wait_for_watermark(index, id.clone(), block_number, settings, messages);
			pin_mut!(indexing);

			while let Some(item) = indexing.next().await {
				let event = match item {
					Ok(event) => event,
					Err(e) => {
						warn!(operation = %id.short(), error = %e, "Watermark polling failed");
						yield Err(e);
						return;
					}
				};

				match event.phase {
					Phase::Pending => {
						yield Ok(event);
					}
					Phase::Confirmed => {
						flow.advance(LifecycleState::Confirmed);
						flow.finish(&event);
						yield Ok(event);
						return;
					}
					Phase::Failed => {
						flow.advance(LifecycleState::IndexingTimedOut);
						flow.finish(&event);
						yield Ok(event);
						return;
					}
				}
			}

			yield Err(TrackerError::Incomplete(id));
		}
	}

	/// Drives [`Tracker::track`] to completion and returns the terminal event.
	///
	/// Business failures (revert, drop, indexing timeout) come back as a
	/// `failed` event; only infrastructure errors are returned as `Err`.
	pub async fn wait_until_indexed(
		&self,
		op: OperationRef,
		messages: Arc<Messages>,
	) -> TrackResult {
		let id = op.id.clone();
		let events = self.track(op, messages);
		pin_mut!(events);

		while let Some(item) = events.next().await {
			let event = item?;
			if event.is_terminal() {
				return Ok(event);
			}
		}

		Err(TrackerError::Incomplete(id))
	}
}
