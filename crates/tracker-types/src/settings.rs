//! Timing settings and caller-supplied message table.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling budget and cadence for both tracking phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
	/// Receipt queries issued before an operation is declared dropped.
	pub max_attempts: u32,
	/// Pause between receipt queries.
	pub receipt_delay_ms: u64,
	/// Pause between watermark queries.
	pub indexing_poll_interval_ms: u64,
	/// Wall-clock budget for the index to catch up, measured from the first
	/// watermark query.
	pub indexing_timeout_ms: u64,
}

impl Default for TrackerSettings {
	fn default() -> Self {
		Self {
			max_attempts: 30,
			receipt_delay_ms: 2_000,
			indexing_poll_interval_ms: 500,
			indexing_timeout_ms: 180_000,
		}
	}
}

impl TrackerSettings {
	pub fn receipt_delay(&self) -> Duration {
		Duration::from_millis(self.receipt_delay_ms)
	}

	pub fn indexing_poll_interval(&self) -> Duration {
		Duration::from_millis(self.indexing_poll_interval_ms)
	}

	pub fn indexing_timeout(&self) -> Duration {
		Duration::from_millis(self.indexing_timeout_ms)
	}
}

/// Human-readable copy for every semantic event.
///
/// These strings never influence control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
	pub transaction_pending: String,
	pub transaction_dropped: String,
	pub transaction_reverted: String,
	pub indexing_pending: String,
	pub indexing_success: String,
	pub indexing_timeout: String,
}

impl Default for Messages {
	fn default() -> Self {
		Self {
			transaction_pending: "Transaction pending".to_string(),
			transaction_dropped: "Transaction was not found after the maximum number of attempts"
				.to_string(),
			transaction_reverted: "Transaction reverted".to_string(),
			indexing_pending: "Waiting for the indexer to catch up".to_string(),
			indexing_success: "Transaction indexed".to_string(),
			indexing_timeout: "Timed out waiting for the indexer".to_string(),
		}
	}
}
