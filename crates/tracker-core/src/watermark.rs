//! Index watermark waiting for the indexing phase.

use crate::{clock, TrackerError};
use async_stream::stream;
use futures::Stream;
use std::sync::Arc;
use tracing::{debug, warn};
use tracker_index::IndexService;
use tracker_types::{Messages, OperationId, StatusEvent, TrackerSettings};

/// Waits for the index service to cover `target_block`.
///
/// Emits one pending event announcing the phase, then polls the watermark
/// until it reaches the target (confirmed) or the indexing timeout has
/// elapsed since the phase started (failed). The last sleep is clamped to
/// the remaining budget, so the timeout is reported no later than the
/// deadline plus the time of one watermark query.
pub fn wait_for_watermark(
	index: Arc<IndexService>,
	id: OperationId,
	target_block: u64,
	settings: TrackerSettings,
	messages: Arc<Messages>,
) -> impl Stream<Item = Result<StatusEvent, TrackerError>> + Send + 'static {
	stream! {
		let timeout = settings.indexing_timeout();
		let interval = settings.indexing_poll_interval();
		let started = clock::now();

		yield Ok(StatusEvent::pending(id.clone(), &messages.indexing_pending));

		let mut highest_seen: Option<u64> = None;

		loop {
			let watermark = match index.get_watermark().await {
				Ok(watermark) => watermark,
				Err(e) => {
					yield Err(TrackerError::from(e));
					return;
				}
			};

			if let Some(highest) = highest_seen {
				if watermark.indexed_block < highest {
					warn!(
						operation = %id.short(),
						indexed_block = watermark.indexed_block,
						previously_seen = highest,
						"Index watermark moved backwards"
					);
				}
			}
			highest_seen = Some(highest_seen.map_or(watermark.indexed_block, |h| {
				h.max(watermark.indexed_block)
			}));

			if watermark.covers(target_block) {
				yield Ok(StatusEvent::confirmed(id.clone(), &messages.indexing_success));
				return;
			}

			let elapsed = started.elapsed();
			if elapsed >= timeout {
				break;
			}

			debug!(
				operation = %id.short(),
				indexed_block = watermark.indexed_block,
				target_block,
				"Waiting for index to catch up"
			);
			clock::sleep(interval.min(timeout - elapsed)).await;
		}

		yield Ok(StatusEvent::failed(
			id.clone(),
			&messages.indexing_timeout,
			&messages.indexing_timeout,
		));
	}
}
