//! Tracker service built from configuration.

use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracker_config::Config;
use tracker_core::{BatchError, TrackResult, Tracker};
use tracker_execution::{create_execution, ExecutionError, ExecutionService};
use tracker_index::{create_index, IndexError, IndexService};
use tracker_types::{Messages, OperationRef, StatusEvent};

#[derive(Debug, Error)]
pub enum ServiceError {
	#[error("Failed to create execution client: {0}")]
	Execution(#[from] ExecutionError),
	#[error("Failed to create index client: {0}")]
	Index(#[from] IndexError),
}

type EventStream = Pin<Box<dyn Stream<Item = TrackResult> + Send>>;

/// Tracker plus the message table configured for it.
pub struct TrackerService {
	tracker: Tracker,
	messages: Arc<Messages>,
}

impl TrackerService {
	pub fn new(tracker: Tracker, messages: Messages) -> Self {
		Self {
			tracker,
			messages: Arc::new(messages),
		}
	}

	/// Builds the clients named in `config` and wires them into a tracker.
	pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
		let execution = create_execution(
			&config.execution.implementation,
			&config.execution.as_value(),
		)?;
		let index = create_index(&config.index.implementation, &config.index.as_value())?;

		info!(
			execution = %config.execution.implementation,
			index = %config.index.implementation,
			"Tracker clients ready"
		);

		let tracker = Tracker::new(
			Arc::new(ExecutionService::new(execution)),
			Arc::new(IndexService::new(index)),
			config.tracker.clone(),
		);

		Ok(Self::new(tracker, config.messages.clone()))
	}

	pub fn tracker(&self) -> &Tracker {
		&self.tracker
	}

	/// Live status events for every operation, interleaved as they happen.
	///
	/// Each operation keeps its own ordering; no ordering holds across them.
	pub fn stream_events(&self, ops: Vec<OperationRef>) -> impl Stream<Item = TrackResult> + Send {
		let streams: Vec<EventStream> = ops
			.into_iter()
			.map(|op| Box::pin(self.tracker.track(op, self.messages.clone())) as EventStream)
			.collect();

		stream::select_all(streams)
	}

	/// Resolves once every operation is terminal.
	pub async fn wait_all(&self, ops: Vec<OperationRef>) -> Result<Vec<StatusEvent>, BatchError> {
		self.tracker.track_all(ops, self.messages.clone()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use tracker_execution::ExecutionInterface;
	use tracker_index::IndexInterface;
	use tracker_types::{OperationId, Phase, Receipt, TrackerSettings, Watermark};

	struct MinedAt(u64);

	#[async_trait]
	impl ExecutionInterface for MinedAt {
		async fn get_receipt(&self, _id: &OperationId) -> Result<Receipt, ExecutionError> {
			Ok(Receipt::Success {
				block_number: self.0,
			})
		}
	}

	struct IndexedAt(u64);

	#[async_trait]
	impl IndexInterface for IndexedAt {
		async fn get_watermark(&self) -> Result<Watermark, IndexError> {
			Ok(Watermark::new(self.0))
		}
	}

	fn service(mined: u64, indexed: u64) -> TrackerService {
		let tracker = Tracker::new(
			Arc::new(ExecutionService::new(Box::new(MinedAt(mined)))),
			Arc::new(IndexService::new(Box::new(IndexedAt(indexed)))),
			TrackerSettings::default(),
		);
		TrackerService::new(tracker, Messages::default())
	}

	fn ops() -> Vec<OperationRef> {
		vec![
			OperationRef::new(OperationId::from_bytes([1; 32])),
			OperationRef::new(OperationId::from_bytes([2; 32])),
		]
	}

	#[tokio::test(start_paused = true)]
	async fn test_stream_events_merges_operations() {
		let events: Vec<_> = service(10, 10)
			.stream_events(ops())
			.map(|item| item.unwrap())
			.collect()
			.await;

		assert_eq!(events.len(), 4);
		for id in ops().into_iter().map(|op| op.id) {
			let phases: Vec<_> = events
				.iter()
				.filter(|e| e.operation_id == id)
				.map(|e| e.phase)
				.collect();
			assert_eq!(phases, vec![Phase::Pending, Phase::Confirmed]);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_wait_all_reports_timeout() {
		let result = service(10, 9).wait_all(ops()).await;

		let err = result.unwrap_err();
		assert_eq!(err.operation_id(), &OperationId::from_bytes([1; 32]));
		assert!(err
			.to_string()
			.contains(&Messages::default().indexing_timeout));
	}

	#[test]
	fn test_from_config_builds_http_clients() {
		let config: Config = r#"
			[execution]
			implementation = "http"
			base_url = "http://gateway.local"

			[index]
			implementation = "http"
			base_url = "http://index.local/watermark"
		"#
		.parse()
		.unwrap();

		assert!(TrackerService::from_config(&config).is_ok());
	}

	#[test]
	fn test_from_config_rejects_unknown_client() {
		let config: Config = r#"
			[execution]
			implementation = "http"
			base_url = "http://gateway.local"

			[index]
			implementation = "elasticsearch"
		"#
		.parse()
		.unwrap();

		assert!(matches!(
			TrackerService::from_config(&config),
			Err(ServiceError::Index(_))
		));
	}
}
