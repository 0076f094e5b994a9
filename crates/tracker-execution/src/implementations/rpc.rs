//! JSON-RPC execution client.
//!
//! Reads receipts straight from an EVM node with `eth_getTransactionReceipt`
//! using an Alloy HTTP provider. Plain node receipts carry only a status
//! flag, so reverted operations are reported with an empty reason.

use crate::{required_str, ExecutionError, ExecutionInterface};
use alloy::{
	network::ReceiptResponse,
	primitives::B256,
	providers::{DynProvider, Provider, ProviderBuilder},
};
use async_trait::async_trait;
use tracker_types::{OperationId, Receipt};

/// Alloy-based receipt reader.
pub struct RpcExecution {
	/// The Alloy provider for blockchain interaction.
	provider: DynProvider,
}

impl RpcExecution {
	/// Creates a new RpcExecution reading from the given RPC URL.
	pub fn new(rpc_url: &str) -> Result<Self, ExecutionError> {
		let url = rpc_url
			.parse::<reqwest::Url>()
			.map_err(|e| ExecutionError::Configuration(format!("Invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new().connect_http(url).erased();

		Ok(Self { provider })
	}
}

#[async_trait]
impl ExecutionInterface for RpcExecution {
	async fn get_receipt(&self, id: &OperationId) -> Result<Receipt, ExecutionError> {
		let tx_hash = B256::from(id.to_bytes());

		let receipt = self
			.provider
			.get_transaction_receipt(tx_hash)
			.await
			.map_err(|e| ExecutionError::Network(format!("Failed to get receipt: {}", e)))?;

		let Some(receipt) = receipt else {
			return Ok(Receipt::NotFound);
		};

		// Some nodes hand out receipts for pending blocks without a number.
		let Some(block_number) = receipt.block_number() else {
			return Ok(Receipt::Pending);
		};

		if receipt.status() {
			Ok(Receipt::Success { block_number })
		} else {
			Ok(Receipt::Reverted {
				block_number,
				reason: String::new(),
			})
		}
	}
}

/// Factory function to create a JSON-RPC execution client from configuration.
///
/// Required configuration parameters:
/// - `rpc_url`: The HTTP RPC endpoint URL
pub fn create_rpc_execution(
	config: &toml::Value,
) -> Result<Box<dyn ExecutionInterface>, ExecutionError> {
	let rpc_url = required_str(config, "rpc_url")?;

	if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
		return Err(ExecutionError::Configuration(
			"RPC URL must start with http:// or https://".to_string(),
		));
	}

	Ok(Box::new(RpcExecution::new(rpc_url)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_factory_requires_rpc_url() {
		let config: toml::Value = toml::from_str("chain_id = 1").unwrap();
		assert!(matches!(
			create_rpc_execution(&config),
			Err(ExecutionError::Configuration(_))
		));
	}

	#[test]
	fn test_factory_rejects_non_http_scheme() {
		let config: toml::Value = toml::from_str(r#"rpc_url = "ws://localhost:8546""#).unwrap();
		assert!(create_rpc_execution(&config).is_err());
	}

	#[test]
	fn test_factory_builds_client() {
		let config: toml::Value =
			toml::from_str(r#"rpc_url = "http://localhost:8545""#).unwrap();
		assert!(create_rpc_execution(&config).is_ok());
	}
}
