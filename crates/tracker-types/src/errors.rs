//! Error types for parsing and validating tracker data.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
	#[error("Invalid operation id: {0}")]
	InvalidOperationId(String),

	#[error("Invalid receipt: {0}")]
	InvalidReceipt(String),
}
