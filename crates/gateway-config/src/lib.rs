//! Configuration module for the payment gateway.
//!
//! Loads the gateway configuration from TOML files, resolves environment
//! variable references and validates the result before any component is built.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["transport.toml", "storage.toml"]` to include other files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(feature = "testing")]
pub mod builders;
mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only, not the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this gateway instance.
	pub gateway: GatewayConfig,
	/// Outbound transport towards the balance service.
	pub transport: TransportConfig,
	/// Backend of the order state cache.
	pub storage: StorageConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the gateway instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// Unique identifier for this gateway instance.
	pub id: String,
}

/// Configuration for the resilient transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
	/// Which implementation performs the HTTP exchange.
	pub primary: String,
	/// Timeout of a single attempt in seconds.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	#[serde(default)]
	pub retry: RetryConfig,
	#[serde(default)]
	pub circuit_breaker: CircuitBreakerSettings,
	/// Map of transport implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

impl TransportConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}
}

/// Retry settings for transient failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	/// Retries after the first attempt.
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	/// Base of the exponential backoff; retry `n` waits `base^n` seconds.
	#[serde(default = "default_base_delay_seconds")]
	pub base_delay_seconds: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: default_max_retries(),
			base_delay_seconds: default_base_delay_seconds(),
		}
	}
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircuitBreakerSettings {
	/// Consecutive transient failures that open the circuit.
	#[serde(default = "default_failure_threshold")]
	pub failure_threshold: u32,
	/// Seconds the circuit stays open before a trial call.
	#[serde(default = "default_open_seconds")]
	pub open_seconds: u64,
}

impl Default for CircuitBreakerSettings {
	fn default() -> Self {
		Self {
			failure_threshold: default_failure_threshold(),
			open_seconds: default_open_seconds(),
		}
	}
}

fn default_timeout_seconds() -> u64 {
	10
}

fn default_max_retries() -> u32 {
	3
}

fn default_base_delay_seconds() -> u64 {
	2
}

fn default_failure_threshold() -> u32 {
	5
}

fn default_open_seconds() -> u64 {
	30
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	pub cleanup_interval_seconds: u64,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration.
	pub cors: Option<CorsConfig>,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			host: default_api_host(),
			port: default_api_port(),
			timeout_seconds: default_api_timeout(),
			max_request_size: default_max_request_size(),
			cors: None,
		}
	}
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins for CORS.
	pub allowed_origins: Vec<String>,
	/// Allowed headers for CORS.
	pub allowed_headers: Vec<String>,
	/// Allowed methods for CORS.
	pub allowed_methods: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Returns the default API timeout in seconds.
///
/// Covers one client call with all of its retries (10s attempts plus
/// 2s, 4s and 8s of backoff) with some headroom.
fn default_api_timeout() -> u64 {
	60
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)));
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.gateway.id.is_empty() {
			return Err(ConfigError::Validation("Gateway ID cannot be empty".into()));
		}

		// Transport
		validate_primary(
			"transport",
			&self.transport.primary,
			&self.transport.implementations,
		)?;
		if self.transport.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Transport timeout_seconds must be greater than 0".into(),
			));
		}
		if self.transport.timeout_seconds > 300 {
			return Err(ConfigError::Validation(
				"Transport timeout_seconds cannot exceed 300".into(),
			));
		}
		if self.transport.retry.max_retries > 10 {
			return Err(ConfigError::Validation(
				"Transport retry.max_retries cannot exceed 10".into(),
			));
		}
		if self.transport.retry.base_delay_seconds == 0 {
			return Err(ConfigError::Validation(
				"Transport retry.base_delay_seconds must be greater than 0".into(),
			));
		}
		if self.transport.circuit_breaker.failure_threshold == 0 {
			return Err(ConfigError::Validation(
				"Transport circuit_breaker.failure_threshold must be at least 1".into(),
			));
		}
		if self.transport.circuit_breaker.open_seconds == 0 {
			return Err(ConfigError::Validation(
				"Transport circuit_breaker.open_seconds must be greater than 0".into(),
			));
		}

		// Storage
		validate_primary(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
			if api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"API max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
