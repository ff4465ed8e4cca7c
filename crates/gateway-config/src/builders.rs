//! Configuration builder for tests and local development.

use crate::{
	ApiConfig, CircuitBreakerSettings, Config, GatewayConfig, RetryConfig, StorageConfig,
	TransportConfig,
};
use std::collections::HashMap;

/// Builds a [`Config`] with defaults suited to tests.
///
/// The transport defaults to a `scripted` implementation and storage to
/// `memory`, both with empty tables.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	gateway_id: String,
	transport_primary: String,
	timeout_seconds: u64,
	retry: RetryConfig,
	circuit_breaker: CircuitBreakerSettings,
	storage_primary: String,
	storage_cleanup_interval_seconds: u64,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			gateway_id: "gateway-test".to_string(),
			transport_primary: "scripted".to_string(),
			timeout_seconds: 10,
			retry: RetryConfig::default(),
			circuit_breaker: CircuitBreakerSettings::default(),
			storage_primary: "memory".to_string(),
			storage_cleanup_interval_seconds: 60,
			api: None,
		}
	}

	pub fn gateway_id(mut self, id: impl Into<String>) -> Self {
		self.gateway_id = id.into();
		self
	}

	pub fn transport_primary(mut self, primary: impl Into<String>) -> Self {
		self.transport_primary = primary.into();
		self
	}

	pub fn timeout_seconds(mut self, timeout: u64) -> Self {
		self.timeout_seconds = timeout;
		self
	}

	pub fn retry(mut self, max_retries: u32, base_delay_seconds: u64) -> Self {
		self.retry = RetryConfig {
			max_retries,
			base_delay_seconds,
		};
		self
	}

	pub fn circuit_breaker(mut self, failure_threshold: u32, open_seconds: u64) -> Self {
		self.circuit_breaker = CircuitBreakerSettings {
			failure_threshold,
			open_seconds,
		};
		self
	}

	pub fn storage_primary(mut self, primary: impl Into<String>) -> Self {
		self.storage_primary = primary.into();
		self
	}

	pub fn storage_cleanup_interval_seconds(mut self, interval: u64) -> Self {
		self.storage_cleanup_interval_seconds = interval;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		let empty_table = || toml::Value::Table(toml::Table::new());
		Config {
			gateway: GatewayConfig {
				id: self.gateway_id,
			},
			transport: TransportConfig {
				implementations: HashMap::from([(self.transport_primary.clone(), empty_table())]),
				primary: self.transport_primary,
				timeout_seconds: self.timeout_seconds,
				retry: self.retry,
				circuit_breaker: self.circuit_breaker,
			},
			storage: StorageConfig {
				implementations: HashMap::from([(self.storage_primary.clone(), empty_table())]),
				primary: self.storage_primary,
				cleanup_interval_seconds: self.storage_cleanup_interval_seconds,
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_registers_primaries() {
		let config = ConfigBuilder::new().retry(1, 1).build();
		assert!(config.transport.implementations.contains_key("scripted"));
		assert!(config.storage.implementations.contains_key("memory"));
		assert_eq!(config.transport.retry.max_retries, 1);
	}
}
