//! Configuration loading for the transaction tracker.
//!
//! Configuration is a TOML file with four sections: `[tracker]` timing
//! settings, `[messages]` user-facing copy, and one `[execution]` and
//! `[index]` table each naming the client implementation plus its keys.
//! `${VAR}` references are substituted from the environment before parsing,
//! and a handful of `TRACKER_*` variables override the timing settings.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracker_types::{Messages, TrackerSettings};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Complete tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Polling budget and cadence
	#[serde(default)]
	pub tracker: TrackerSettings,
	/// User-facing copy for status events
	#[serde(default)]
	pub messages: Messages,
	/// Execution service client
	pub execution: ImplementationConfig,
	/// Index service client
	pub index: ImplementationConfig,
}

/// Names a client implementation and carries its own settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImplementationConfig {
	/// Registered implementation name, e.g. `rpc` or `graph`
	pub implementation: String,
	/// Remaining keys, handed to the implementation factory
	#[serde(flatten)]
	pub settings: toml::Table,
}

impl ImplementationConfig {
	/// Implementation settings as the value factories consume.
	pub fn as_value(&self) -> toml::Value {
		toml::Value::Table(self.settings.clone())
	}
}

impl Config {
	/// Checks values that would make tracking meaningless.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let tracker = &self.tracker;

		if tracker.max_attempts == 0 {
			return Err(ConfigError::ValidationError(
				"tracker.max_attempts must be at least 1".to_string(),
			));
		}

		for (name, value) in [
			("tracker.receipt_delay_ms", tracker.receipt_delay_ms),
			(
				"tracker.indexing_poll_interval_ms",
				tracker.indexing_poll_interval_ms,
			),
			("tracker.indexing_timeout_ms", tracker.indexing_timeout_ms),
		] {
			if value == 0 {
				return Err(ConfigError::ValidationError(format!(
					"{} must be greater than 0",
					name
				)));
			}
		}

		for (section, implementation) in [
			("execution", &self.execution.implementation),
			("index", &self.index.implementation),
		] {
			if implementation.trim().is_empty() {
				return Err(ConfigError::ValidationError(format!(
					"{}.implementation must not be empty",
					section
				)));
			}
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	/// Parses and validates a config without env substitution or overrides.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "TRACKER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let Some(file_path) = &self.file_path else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		let mut config = self.load_from_file(file_path).await?;

		self.apply_env_overrides(&mut config)?;

		config.validate()?;

		tracing::debug!(
			file = %file_path,
			execution = %config.execution.implementation,
			index = %config.index.implementation,
			"Configuration loaded"
		);

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<Config, ConfigError> {
		let content = tokio::fs::read_to_string(file_path)
			.await
			.map_err(|e| match e.kind() {
				std::io::ErrorKind::NotFound => ConfigError::FileNotFound(file_path.to_string()),
				_ => ConfigError::IoError(e),
			})?;

		let substituted_content = self.substitute_env_vars(&content)?;

		toml::from_str(&substituted_content).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		// Find and replace ${VAR_NAME} patterns
		let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;

		let mut lines = Vec::new();
		for line in content.lines() {
			// Comment lines are left alone
			if line.trim_start().starts_with('#') {
				lines.push(line.to_string());
				continue;
			}

			let mut substituted = line.to_string();
			for cap in re.captures_iter(line) {
				let full_match = &cap[0];
				let var_name = &cap[1];

				let env_value = env::var(var_name)
					.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

				substituted = substituted.replace(full_match, &env_value);
			}
			lines.push(substituted);
		}

		Ok(lines.join("\n"))
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Some(value) = self.env_override("MAX_ATTEMPTS")? {
			config.tracker.max_attempts = value;
		}

		if let Some(value) = self.env_override("RECEIPT_DELAY_MS")? {
			config.tracker.receipt_delay_ms = value;
		}

		if let Some(value) = self.env_override("INDEXING_POLL_INTERVAL_MS")? {
			config.tracker.indexing_poll_interval_ms = value;
		}

		if let Some(value) = self.env_override("INDEXING_TIMEOUT_MS")? {
			config.tracker.indexing_timeout_ms = value;
		}

		Ok(())
	}

	fn env_override<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
		let name = format!("{}{}", self.env_prefix, key);

		match env::var(&name) {
			Ok(raw) => raw
				.parse::<T>()
				.map(Some)
				.map_err(|_| ConfigError::ValidationError(format!("Invalid {}: {}", name, raw))),
			Err(_) => Ok(None),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const MINIMAL: &str = r#"
		[execution]
		implementation = "rpc"
		rpc_url = "http://localhost:8545"

		[index]
		implementation = "graph"
		url = "http://localhost:8000/subgraphs/name/market"
	"#;

	fn write_config(content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[test]
	fn test_defaults_apply_when_sections_missing() {
		let config: Config = MINIMAL.parse().unwrap();

		assert_eq!(config.tracker, TrackerSettings::default());
		assert_eq!(config.messages, Messages::default());
		assert_eq!(config.execution.implementation, "rpc");
		assert_eq!(
			config.execution.as_value().get("rpc_url").and_then(|v| v.as_str()),
			Some("http://localhost:8545")
		);
		assert!(config.index.settings.get("implementation").is_none());
	}

	#[test]
	fn test_zero_attempts_is_rejected() {
		let content = format!("[tracker]\nmax_attempts = 0\n{}", MINIMAL);
		assert!(matches!(
			content.parse::<Config>(),
			Err(ConfigError::ValidationError(_))
		));
	}

	#[test]
	fn test_missing_index_section_is_parse_error() {
		let content = r#"
			[execution]
			implementation = "rpc"
		"#;
		assert!(matches!(
			content.parse::<Config>(),
			Err(ConfigError::ParseError(_))
		));
	}

	#[tokio::test]
	async fn test_load_substitutes_env_vars() {
		env::set_var("TRACKER_TEST_SUBGRAPH_URL", "https://index.example/graphql");
		let file = write_config(
			r#"
			[messages]
			indexing_success = "Done"

			[execution]
			implementation = "http"
			base_url = "http://gateway"

			[index]
			implementation = "graph"
			url = "${TRACKER_TEST_SUBGRAPH_URL}"
			"#,
		);

		let config = ConfigLoader::new()
			.with_env_prefix("TRACKER_SUBST_TEST_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();

		assert_eq!(
			config.index.as_value().get("url").and_then(|v| v.as_str()),
			Some("https://index.example/graphql")
		);
		assert_eq!(config.messages.indexing_success, "Done");
	}

	#[tokio::test]
	async fn test_missing_env_var_is_reported() {
		let file = write_config(&MINIMAL.replace(
			"http://localhost:8545",
			"${TRACKER_TEST_DEFINITELY_UNSET}",
		));

		let result = ConfigLoader::new().with_file(file.path()).load().await;
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "TRACKER_TEST_DEFINITELY_UNSET"));
	}

	#[tokio::test]
	async fn test_env_overrides_timing() {
		env::set_var("TRACKER_OVERRIDE_TEST_MAX_ATTEMPTS", "3");
		env::set_var("TRACKER_OVERRIDE_TEST_INDEXING_TIMEOUT_MS", "1000");
		let file = write_config(MINIMAL);

		let config = ConfigLoader::new()
			.with_env_prefix("TRACKER_OVERRIDE_TEST_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();

		assert_eq!(config.tracker.max_attempts, 3);
		assert_eq!(config.tracker.indexing_timeout_ms, 1000);
		assert_eq!(config.tracker.receipt_delay_ms, 2_000);
	}

	#[tokio::test]
	async fn test_invalid_env_override_is_rejected() {
		env::set_var("TRACKER_BAD_TEST_RECEIPT_DELAY_MS", "soon");
		let file = write_config(MINIMAL);

		let result = ConfigLoader::new()
			.with_env_prefix("TRACKER_BAD_TEST_")
			.with_file(file.path())
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[tokio::test]
	async fn test_commented_placeholders_are_ignored() {
		let file = write_config(&format!(
			"# set ${{TRACKER_TEST_ONLY_IN_COMMENT}} before starting\n{}",
			MINIMAL
		));

		let config = ConfigLoader::new()
			.with_env_prefix("TRACKER_COMMENT_TEST_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();

		assert_eq!(config.execution.implementation, "rpc");
	}

	#[tokio::test]
	async fn test_shipped_config_loads() {
		env::set_var("TRACKER_RPC_URL", "http://localhost:8545");
		env::set_var(
			"TRACKER_SUBGRAPH_URL",
			"http://localhost:8000/subgraphs/name/market",
		);
		let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/tracker.toml");

		let config = ConfigLoader::new()
			.with_env_prefix("TRACKER_SHIPPED_TEST_")
			.with_file(path)
			.load()
			.await
			.unwrap();

		assert_eq!(config.tracker, TrackerSettings::default());
		assert_eq!(
			config.execution.as_value().get("rpc_url").and_then(|v| v.as_str()),
			Some("http://localhost:8545")
		);
		assert_eq!(
			config.index.as_value().get("url").and_then(|v| v.as_str()),
			Some("http://localhost:8000/subgraphs/name/market")
		);
	}

	#[tokio::test]
	async fn test_missing_file() {
		let result = ConfigLoader::new()
			.with_file("/nonexistent/tracker.toml")
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
	}
}
