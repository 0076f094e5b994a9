//! Identifiers for submitted operations.
//!
//! An operation is referenced by the 32-byte hash the execution service
//! assigned on submission. The hash is kept in its canonical rendering
//! (lowercase, `0x`-prefixed) so it can be handed verbatim to any collaborator.

use crate::TypesError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of an operation hash in bytes.
pub const OPERATION_ID_LEN: usize = 32;

/// Validated operation hash, rendered as `0x` followed by 64 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
	/// Builds an id from raw hash bytes.
	pub fn from_bytes(bytes: [u8; OPERATION_ID_LEN]) -> Self {
		Self(format!("0x{}", hex::encode(bytes)))
	}

	/// Returns the canonical hex rendering.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Decodes the id back into its raw bytes.
	pub fn to_bytes(&self) -> [u8; OPERATION_ID_LEN] {
		let mut out = [0u8; OPERATION_ID_LEN];
		// Construction guarantees 64 valid hex digits after the prefix.
		if let Ok(decoded) = hex::decode(&self.0[2..]) {
			out.copy_from_slice(&decoded);
		}
		out
	}

	/// Shortened form used in log lines.
	pub fn short(&self) -> String {
		format!("{}..", &self.0[..10])
	}
}

impl FromStr for OperationId {
	type Err = TypesError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		let digits = trimmed
			.strip_prefix("0x")
			.or_else(|| trimmed.strip_prefix("0X"))
			.unwrap_or(trimmed);

		if digits.len() != OPERATION_ID_LEN * 2 {
			return Err(TypesError::InvalidOperationId(format!(
				"expected {} hex digits, got {}",
				OPERATION_ID_LEN * 2,
				digits.len()
			)));
		}

		let bytes = hex::decode(digits)
			.map_err(|e| TypesError::InvalidOperationId(format!("{}: {}", s, e)))?;

		let mut out = [0u8; OPERATION_ID_LEN];
		out.copy_from_slice(&bytes);
		Ok(Self::from_bytes(out))
	}
}

impl<'de> Deserialize<'de> for OperationId {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}

impl fmt::Display for OperationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A submitted operation handed to the tracker by the caller.
///
/// The tracker only reads this value; it is never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRef {
	pub id: OperationId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub submitted_at: Option<DateTime<Utc>>,
}

impl OperationRef {
	pub fn new(id: OperationId) -> Self {
		Self {
			id,
			submitted_at: None,
		}
	}

	pub fn with_submitted_at(mut self, at: DateTime<Utc>) -> Self {
		self.submitted_at = Some(at);
		self
	}
}

impl From<OperationId> for OperationRef {
	fn from(id: OperationId) -> Self {
		Self::new(id)
	}
}

impl FromStr for OperationRef {
	type Err = TypesError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::new(s.parse()?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const HASH: &str = "0xAbCdEf0000000000000000000000000000000000000000000000000000001234";

	#[test]
	fn test_parse_normalizes_case_and_prefix() {
		let with_prefix: OperationId = HASH.parse().unwrap();
		let without_prefix: OperationId = HASH[2..].parse().unwrap();

		assert_eq!(with_prefix, without_prefix);
		assert_eq!(with_prefix.as_str(), HASH.to_lowercase());
		assert_eq!(with_prefix.as_str().len(), 66);
	}

	#[test]
	fn test_parse_rejects_bad_input() {
		assert!("0x1234".parse::<OperationId>().is_err());
		assert!(format!("0x{}", "zz".repeat(32))
			.parse::<OperationId>()
			.is_err());
		assert!("".parse::<OperationId>().is_err());
	}

	#[test]
	fn test_bytes_round_trip() {
		let id = OperationId::from_bytes([7u8; 32]);
		assert_eq!(id.to_bytes(), [7u8; 32]);
		assert_eq!(id.short(), "0x07070707..");
	}

	#[test]
	fn test_deserialize_validates() {
		let ok: Result<OperationId, _> = serde_json::from_str(&format!("\"{}\"", HASH));
		assert!(ok.is_ok());

		let bad: Result<OperationId, _> = serde_json::from_str("\"0xdead\"");
		assert!(bad.is_err());
	}
}
