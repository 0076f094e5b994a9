//! Status events emitted to callers while an operation is tracked.

use crate::OperationId;
use serde::{Deserialize, Serialize};

/// Caller-visible phase of a tracked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
	Pending,
	Failed,
	Confirmed,
}

/// Externally observable projection of a lifecycle transition.
///
/// `reason` is present exactly when `phase` is [`Phase::Failed`]; the
/// constructors below are the only way the tracker builds events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
	#[serde(rename = "transactionHash")]
	pub operation_id: OperationId,
	pub phase: Phase,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

impl StatusEvent {
	pub fn pending(operation_id: OperationId, message: impl Into<String>) -> Self {
		Self {
			operation_id,
			phase: Phase::Pending,
			message: message.into(),
			reason: None,
		}
	}

	pub fn failed(
		operation_id: OperationId,
		message: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Self {
			operation_id,
			phase: Phase::Failed,
			message: message.into(),
			reason: Some(reason.into()),
		}
	}

	pub fn confirmed(operation_id: OperationId, message: impl Into<String>) -> Self {
		Self {
			operation_id,
			phase: Phase::Confirmed,
			message: message.into(),
			reason: None,
		}
	}

	pub fn is_terminal(&self) -> bool {
		self.phase != Phase::Pending
	}
}
