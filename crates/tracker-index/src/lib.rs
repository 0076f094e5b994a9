//! Index service access for the transaction tracker.
//!
//! The index service rebuilds queryable state from chain data on its own
//! schedule. The tracker needs a single global number from it: the latest
//! block it has fully processed.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracker_types::Watermark;

/// Re-export implementations
pub mod implementations {
	pub mod graph;
	pub mod http;
}

/// Errors that can occur while querying the index service.
#[derive(Debug, Error)]
pub enum IndexError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The index answered but reported a query-level error.
	#[error("Query error: {0}")]
	Query(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for index service clients.
#[async_trait]
pub trait IndexInterface: Send + Sync {
	/// Returns the most recently indexed block.
	async fn get_watermark(&self) -> Result<Watermark, IndexError>;
}

pub type IndexFactory = fn(&toml::Value) -> Result<Box<dyn IndexInterface>, IndexError>;

/// Returns every known index implementation keyed by its config name.
pub fn get_all_implementations() -> Vec<(&'static str, IndexFactory)> {
	vec![
		("graph", implementations::graph::create_graph_index),
		("http", implementations::http::create_http_index),
	]
}

/// Looks up an implementation by name and builds it from its config table.
pub fn create_index(
	name: &str,
	config: &toml::Value,
) -> Result<Box<dyn IndexInterface>, IndexError> {
	let factory = get_all_implementations()
		.into_iter()
		.find(|(candidate, _)| *candidate == name)
		.map(|(_, factory)| factory)
		.ok_or_else(|| {
			IndexError::Configuration(format!("Unknown index implementation: {}", name))
		})?;

	factory(config)
}

/// Service wrapping the configured index client.
pub struct IndexService {
	client: Box<dyn IndexInterface>,
}

impl IndexService {
	pub fn new(client: Box<dyn IndexInterface>) -> Self {
		Self { client }
	}

	pub async fn get_watermark(&self) -> Result<Watermark, IndexError> {
		let watermark = self.client.get_watermark().await?;
		tracing::trace!(indexed_block = watermark.indexed_block, "Fetched watermark");
		Ok(watermark)
	}
}

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Shared config parsing for the HTTP-based clients.
pub(crate) struct EndpointConfig {
	pub url: String,
	pub api_key: Option<String>,
	pub request_timeout: Duration,
}

impl EndpointConfig {
	pub(crate) fn from_toml(config: &toml::Value, url_key: &str) -> Result<Self, IndexError> {
		let url = config
			.get(url_key)
			.and_then(|v| v.as_str())
			.ok_or_else(|| IndexError::Configuration(format!("{} is required", url_key)))?;

		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(IndexError::Configuration(format!(
				"{} must start with http:// or https://",
				url_key
			)));
		}

		let request_timeout_ms = match config.get("request_timeout_ms") {
			Some(value) => value
				.as_integer()
				.and_then(|ms| u64::try_from(ms).ok())
				.filter(|ms| *ms > 0)
				.ok_or_else(|| {
					IndexError::Configuration(
						"request_timeout_ms must be a positive integer".to_string(),
					)
				})?,
			None => DEFAULT_REQUEST_TIMEOUT_MS,
		};

		Ok(Self {
			url: url.to_string(),
			api_key: config
				.get("api_key")
				.and_then(|v| v.as_str())
				.map(str::to_string),
			request_timeout: Duration::from_millis(request_timeout_ms),
		})
	}

	pub(crate) fn build_client(&self) -> Result<reqwest::Client, IndexError> {
		reqwest::Client::builder()
			.timeout(self.request_timeout)
			.build()
			.map_err(|e| IndexError::Configuration(format!("Failed to build client: {}", e)))
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;

	/// Serves one canned HTTP response and hands back the raw request.
	pub async fn serve_once(
		status: &'static str,
		body: &'static str,
	) -> (String, tokio::task::JoinHandle<String>) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		let handle = tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut buf = vec![0u8; 8192];
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
