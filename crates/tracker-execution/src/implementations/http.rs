//! HTTP receipt-relay execution client.
//!
//! Talks to an execution gateway that exposes receipts as JSON under
//! `GET {base_url}/receipts/{id}` in the form
//! `{"found": bool, "outcome": "pending"|"success"|"reverted", "blockNumber"?, "revertReason"?}`.
//! A 404 answer is treated the same as `found: false`.

use crate::{required_str, ExecutionError, ExecutionInterface};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracker_types::{OperationId, Receipt, WireReceipt};

/// Default per-request timeout when none is configured.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

pub struct HttpExecution {
	client: Client,
	base_url: String,
	api_key: Option<String>,
}

impl HttpExecution {
	pub fn new(
		base_url: &str,
		api_key: Option<String>,
		request_timeout: Duration,
	) -> Result<Self, ExecutionError> {
		let client = Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| ExecutionError::Configuration(format!("Failed to build client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
			api_key,
		})
	}

	fn receipt_url(&self, id: &OperationId) -> String {
		format!("{}/receipts/{}", self.base_url, id)
	}
}

#[async_trait]
impl ExecutionInterface for HttpExecution {
	async fn get_receipt(&self, id: &OperationId) -> Result<Receipt, ExecutionError> {
		let mut request = self.client.get(self.receipt_url(id));
		if let Some(api_key) = &self.api_key {
			request = request.bearer_auth(api_key);
		}

		let response = request
			.send()
			.await
			.map_err(|e| ExecutionError::Network(format!("Failed to get receipt: {}", e)))?;

		if response.status() == StatusCode::NOT_FOUND {
			return Ok(Receipt::NotFound);
		}

		if !response.status().is_success() {
			return Err(ExecutionError::Network(format!(
				"Receipt endpoint returned {}",
				response.status()
			)));
		}

		let wire: WireReceipt = response
			.json()
			.await
			.map_err(|e| ExecutionError::InvalidResponse(e.to_string()))?;

		Receipt::try_from(wire).map_err(|e| ExecutionError::InvalidResponse(e.to_string()))
	}
}

/// Factory function to create an HTTP receipt-relay client from configuration.
///
/// Required configuration parameters:
/// - `base_url`: Root URL of the execution gateway
///
/// Optional:
/// - `api_key`: Sent as a Bearer token
/// - `request_timeout_ms`: Per-request timeout (default 10s)
pub fn create_http_execution(
	config: &toml::Value,
) -> Result<Box<dyn ExecutionInterface>, ExecutionError> {
	let base_url = required_str(config, "base_url")?;

	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.map(str::to_string);

	let timeout_ms = match config.get("request_timeout_ms") {
		Some(value) => value
			.as_integer()
			.and_then(|ms| u64::try_from(ms).ok())
			.filter(|ms| *ms > 0)
			.ok_or_else(|| {
				ExecutionError::Configuration(
					"request_timeout_ms must be a positive integer".to_string(),
				)
			})?,
		None => DEFAULT_REQUEST_TIMEOUT_MS,
	};

	Ok(Box::new(HttpExecution::new(
		base_url,
		api_key,
		Duration::from_millis(timeout_ms),
	)?))
}
