//! Subgraph index client.
//!
//! Graph-protocol indexers publish their sync position through the `_meta`
//! field; `_meta.block.number` is the latest block whose changes are visible
//! to queries.

use crate::{EndpointConfig, IndexError, IndexInterface};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracker_types::Watermark;

const META_QUERY: &str = "{ _meta { block { number } } }";

#[derive(Debug, Deserialize)]
struct GraphResponse {
	data: Option<MetaData>,
	#[serde(default)]
	errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
struct MetaData {
	#[serde(rename = "_meta")]
	meta: Meta,
}

#[derive(Debug, Deserialize)]
struct Meta {
	block: MetaBlock,
}

#[derive(Debug, Deserialize)]
struct MetaBlock {
	number: u64,
}

#[derive(Debug, Deserialize)]
struct GraphError {
	message: String,
}

/// Watermark reader for a GraphQL subgraph endpoint.
pub struct GraphIndex {
	client: Client,
	endpoint: EndpointConfig,
}

impl GraphIndex {
	fn new(endpoint: EndpointConfig) -> Result<Self, IndexError> {
		Ok(Self {
			client: endpoint.build_client()?,
			endpoint,
		})
	}
}

#[async_trait]
impl IndexInterface for GraphIndex {
	async fn get_watermark(&self) -> Result<Watermark, IndexError> {
		let mut request = self
			.client
			.post(&self.endpoint.url)
			.json(&serde_json::json!({ "query": META_QUERY }));
		if let Some(api_key) = &self.endpoint.api_key {
			request = request.bearer_auth(api_key);
		}

		let response = request
			.send()
			.await
			.map_err(|e| IndexError::Network(format!("Failed to query subgraph: {}", e)))?;

		if !response.status().is_success() {
			return Err(IndexError::Network(format!(
				"Subgraph returned {}",
				response.status()
			)));
		}

		let body: GraphResponse = response
			.json()
			.await
			.map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

		if !body.errors.is_empty() {
			let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
			return Err(IndexError::Query(messages.join("; ")));
		}

		let data = body
			.data
			.ok_or_else(|| IndexError::InvalidResponse("missing data".to_string()))?;

		Ok(Watermark::new(data.meta.block.number))
	}
}

/// Factory function to create a subgraph index client from configuration.
///
/// Required configuration parameters:
/// - `url`: The subgraph GraphQL endpoint
pub fn create_graph_index(config: &toml::Value) -> Result<Box<dyn IndexInterface>, IndexError> {
	let endpoint = EndpointConfig::from_toml(config, "url")?;
	Ok(Box::new(GraphIndex::new(endpoint)?))
}
