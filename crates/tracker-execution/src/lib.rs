//! Execution service access for the transaction tracker.
//!
//! The execution service is the tier that accepts submitted operations and
//! reports whether they were mined. The tracker only ever asks it one
//! question: "what is the receipt for this operation right now?". This crate
//! defines that interface and ships the concrete clients for it.

use async_trait::async_trait;
use thiserror::Error;
use tracker_types::{OperationId, Receipt};

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod rpc;
}

/// Errors that can occur while querying the execution service.
///
/// None of these mean "not mined yet"; an outstanding operation is reported
/// as [`Receipt::NotFound`] or [`Receipt::Pending`].
#[derive(Debug, Error)]
pub enum ExecutionError {
	/// The request could not be delivered or answered.
	#[error("Network error: {0}")]
	Network(String),
	/// The service answered with something that is not a valid receipt.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The client was configured incorrectly.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for execution service clients.
///
/// Implementations must be stateless with respect to tracking so that one
/// instance can be shared by every concurrently tracked operation.
#[async_trait]
pub trait ExecutionInterface: Send + Sync {
	/// Fetches the current receipt for an operation. Must be idempotent.
	async fn get_receipt(&self, id: &OperationId) -> Result<Receipt, ExecutionError>;
}

/// Signature of the factory functions that build a client from its TOML table.
pub type ExecutionFactory = fn(&toml::Value) -> Result<Box<dyn ExecutionInterface>, ExecutionError>;

/// Returns every known execution implementation keyed by its config name.
pub fn get_all_implementations() -> Vec<(&'static str, ExecutionFactory)> {
	vec![
		("http", implementations::http::create_http_execution),
		("rpc", implementations::rpc::create_rpc_execution),
	]
}

/// Looks up an implementation by name and builds it from its config table.
pub fn create_execution(
	name: &str,
	config: &toml::Value,
) -> Result<Box<dyn ExecutionInterface>, ExecutionError> {
	let factory = get_all_implementations()
		.into_iter()
		.find(|(candidate, _)| *candidate == name)
		.map(|(_, factory)| factory)
		.ok_or_else(|| {
			ExecutionError::Configuration(format!("Unknown execution implementation: {}", name))
		})?;

	factory(config)
}

/// Service wrapping the configured execution client.
pub struct ExecutionService {
	/// The underlying client implementation.
	client: Box<dyn ExecutionInterface>,
}

impl ExecutionService {
	/// Creates a new ExecutionService around the given client.
	pub fn new(client: Box<dyn ExecutionInterface>) -> Self {
		Self { client }
	}

	/// Fetches the current receipt for an operation.
	pub async fn get_receipt(&self, id: &OperationId) -> Result<Receipt, ExecutionError> {
		let receipt = self.client.get_receipt(id).await?;
		tracing::trace!(operation = %id.short(), ?receipt, "Fetched receipt");
		Ok(receipt)
	}
}

/// Reads a required string key from an implementation config table.
pub(crate) fn required_str<'a>(
	config: &'a toml::Value,
	key: &str,
) -> Result<&'a str, ExecutionError> {
	config
		.get(key)
		.and_then(|v| v.as_str())
		.ok_or_else(|| ExecutionError::Configuration(format!("{} is required", key)))
}

#[cfg(test)]
pub(crate) mod test_support {
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;

	/// Serves a single canned HTTP response and returns the request seen.
	pub async fn serve_once(
		status: &'static str,
		body: &'static str,
	) -> (String, tokio::task::JoinHandle<String>) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		let handle = tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut buf = vec![0u8; 4096];
			let n = socket.read(&mut buf).await.unwrap();
			let request = String::from_utf8_lossy(&buf[..n]).to_string();

			let response = format!(
				"HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
				status,
				body.len(),
				body
			);
			socket.write_all(response.as_bytes()).await.unwrap();
			socket.shutdown().await.ok();
			request
		});

		(format!("http://{}", addr), handle)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_implementation_is_rejected() {
		let config = toml::Value::Table(Default::default());
		let result = create_execution("carrier-pigeon", &config);

		assert!(matches!(result, Err(ExecutionError::Configuration(_))));
	}

	#[test]
	fn test_registry_lists_all_clients() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["http", "rpc"]);
	}
}
