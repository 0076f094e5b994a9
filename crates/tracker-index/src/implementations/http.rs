//! Plain HTTP index client.
//!
//! For indexers that expose their position as `GET {base_url}` returning
//! `{"indexedBlock": <u64>}`.

use crate::{EndpointConfig, IndexError, IndexInterface};
use async_trait::async_trait;
use reqwest::Client;
use tracker_types::Watermark;

pub struct HttpIndex {
	client: Client,
	endpoint: EndpointConfig,
}

#[async_trait]
impl IndexInterface for HttpIndex {
	async fn get_watermark(&self) -> Result<Watermark, IndexError> {
		let mut request = self.client.get(&self.endpoint.url);
		if let Some(api_key) = &self.endpoint.api_key {
			request = request.bearer_auth(api_key);
		}

		let response = request
			.send()
			.await
			.map_err(|e| IndexError::Network(format!("Failed to get watermark: {}", e)))?;

		if !response.status().is_success() {
			return Err(IndexError::Network(format!(
				"Watermark endpoint returned {}",
				response.status()
			)));
		}

		response
			.json::<Watermark>()
			.await
			.map_err(|e| IndexError::InvalidResponse(e.to_string()))
	}
}

/// Factory function to create an HTTP watermark client from configuration.
///
/// Required configuration parameters:
/// - `base_url`: URL answering with `{"indexedBlock": n}`
pub fn create_http_index(config: &toml::Value) -> Result<Box<dyn IndexInterface>, IndexError> {
	let endpoint = EndpointConfig::from_toml(config, "base_url")?;
	Ok(Box::new(HttpIndex {
		client: endpoint.build_client()?,
		endpoint,
	}))
}
