//! Lifecycle state machine for a single tracked operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal state of one tracked operation.
///
/// Allowed transitions:
/// `Submitted -> Mining -> {MiningFailed | MiningDropped | Mined}` and
/// `Mined -> IndexingPending -> {IndexingTimedOut | Confirmed}`.
/// `Mining` may repeat itself while its attempt count grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
	Submitted,
	Mining { attempts: u32 },
	MiningFailed { reason: String },
	MiningDropped,
	Mined { block_number: u64 },
	IndexingPending {
		block_number: u64,
		deadline: DateTime<Utc>,
	},
	IndexingTimedOut,
	Confirmed,
}

impl LifecycleState {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			LifecycleState::MiningFailed { .. }
				| LifecycleState::MiningDropped
				| LifecycleState::IndexingTimedOut
				| LifecycleState::Confirmed
		)
	}

	/// Checks a move against the transition table.
	pub fn can_transition_to(&self, next: &LifecycleState) -> bool {
		use LifecycleState::*;

		match (self, next) {
			(Submitted, Mining { .. }) => true,
			(Mining { attempts: a }, Mining { attempts: b }) => b > a,
			(Mining { .. }, MiningFailed { .. } | MiningDropped | Mined { .. }) => true,
			(Mined { block_number: a }, IndexingPending { block_number: b, .. }) => a == b,
			(IndexingPending { .. }, IndexingTimedOut | Confirmed) => true,
			_ => false,
		}
	}

	/// Short label used in logs.
	pub fn name(&self) -> &'static str {
		match self {
			LifecycleState::Submitted => "submitted",
			LifecycleState::Mining { .. } => "mining",
			LifecycleState::MiningFailed { .. } => "mining_failed",
			LifecycleState::MiningDropped => "mining_dropped",
			LifecycleState::Mined { .. } => "mined",
			LifecycleState::IndexingPending { .. } => "indexing_pending",
			LifecycleState::IndexingTimedOut => "indexing_timed_out",
			LifecycleState::Confirmed => "confirmed",
		}
	}
}
