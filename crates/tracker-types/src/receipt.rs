//! Execution receipts and index watermarks.
//!
//! A [`Receipt`] is produced fresh on every poll of the execution service and
//! a [`Watermark`] on every poll of the index service. Neither is persisted.

use crate::TypesError;
use serde::{Deserialize, Serialize};

/// Outcome reported by the execution service for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptOutcome {
	Pending,
	Success,
	Reverted,
}

/// Execution service answer for one operation.
///
/// The block number is carried only by the variants that left the pending
/// state, so a mined receipt without a block cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
	/// The execution service has no record of the operation yet.
	NotFound,
	/// Known to the execution service but not yet included in a block.
	Pending,
	/// Included in a block and executed successfully.
	Success { block_number: u64 },
	/// Included in a block but execution reverted. The reason may be empty.
	Reverted { block_number: u64, reason: String },
}

impl Receipt {
	pub fn found(&self) -> bool {
		!matches!(self, Receipt::NotFound)
	}

	pub fn outcome(&self) -> ReceiptOutcome {
		match self {
			Receipt::NotFound | Receipt::Pending => ReceiptOutcome::Pending,
			Receipt::Success { .. } => ReceiptOutcome::Success,
			Receipt::Reverted { .. } => ReceiptOutcome::Reverted,
		}
	}

	pub fn block_number(&self) -> Option<u64> {
		match self {
			Receipt::Success { block_number } | Receipt::Reverted { block_number, .. } => {
				Some(*block_number)
			}
			_ => None,
		}
	}

	pub fn revert_reason(&self) -> Option<&str> {
		match self {
			Receipt::Reverted { reason, .. } => Some(reason),
			_ => None,
		}
	}

	/// Whether the operation has left the pending state.
	pub fn is_terminal(&self) -> bool {
		self.block_number().is_some()
	}
}

/// JSON shape of a receipt as served by receipt-relay endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReceipt {
	pub found: bool,
	#[serde(default = "pending_outcome")]
	pub outcome: ReceiptOutcome,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub block_number: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub revert_reason: Option<String>,
}

fn pending_outcome() -> ReceiptOutcome {
	ReceiptOutcome::Pending
}

impl TryFrom<WireReceipt> for Receipt {
	type Error = TypesError;

	fn try_from(wire: WireReceipt) -> Result<Self, Self::Error> {
		if !wire.found {
			return Ok(Receipt::NotFound);
		}

		match (wire.outcome, wire.block_number) {
			(ReceiptOutcome::Pending, None) => Ok(Receipt::Pending),
			(ReceiptOutcome::Pending, Some(block)) => Err(TypesError::InvalidReceipt(format!(
				"pending receipt carries block number {}",
				block
			))),
			(ReceiptOutcome::Success, Some(block_number)) => Ok(Receipt::Success { block_number }),
			(ReceiptOutcome::Reverted, Some(block_number)) => Ok(Receipt::Reverted {
				block_number,
				reason: wire.revert_reason.unwrap_or_default(),
			}),
			(outcome, None) => Err(TypesError::InvalidReceipt(format!(
				"{:?} receipt is missing its block number",
				outcome
			))),
		}
	}
}

impl From<&Receipt> for WireReceipt {
	fn from(receipt: &Receipt) -> Self {
		Self {
			found: receipt.found(),
			outcome: receipt.outcome(),
			block_number: receipt.block_number(),
			revert_reason: receipt.revert_reason().map(str::to_string),
		}
	}
}

/// Latest block the index service has fully processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
	pub indexed_block: u64,
}

impl Watermark {
	pub fn new(indexed_block: u64) -> Self {
		Self { indexed_block }
	}

	/// True once the target block itself has been indexed.
	pub fn covers(&self, target_block: u64) -> bool {
		self.indexed_block >= target_block
	}
}
