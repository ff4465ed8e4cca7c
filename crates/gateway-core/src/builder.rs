//! Builder for assembling a gateway from configuration.
//!
//! Storage and transport backends are created through factory maps keyed by
//! implementation name, so the binary decides which implementations exist and
//! the configuration decides which one is primary.

use crate::orchestrator::OrderOrchestrator;
use crate::state::OrderStateCache;
use crate::Gateway;
use gateway_balance::BalanceClient;
use gateway_config::Config;
use gateway_storage::{StorageError, StorageInterface, StorageService};
use gateway_transport::{TransportError, TransportInterface, TransportPolicies, TransportService};
use gateway_types::ConfigSchema;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building a gateway.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Factory maps for every pluggable component.
pub struct GatewayFactories<SF, TF> {
	pub storage_factories: HashMap<String, SF>,
	pub transport_factories: HashMap<String, TF>,
}

/// Builds a [`Gateway`] with pluggable implementations.
pub struct GatewayBuilder {
	config: Config,
}

impl GatewayBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build<SF, TF>(self, factories: GatewayFactories<SF, TF>) -> Result<Gateway, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		TF: Fn(&toml::Value) -> Result<Box<dyn TransportInterface>, TransportError>,
	{
		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let transport_backend = load_primary(
			"transport",
			&self.config.transport.primary,
			&self.config.transport.implementations,
			&factories.transport_factories,
		)?;
		let policies = TransportPolicies::from(&self.config.transport);
		tracing::info!(
			component = "transport",
			timeout_seconds = policies.timeout.as_secs(),
			max_retries = policies.retry.max_retries,
			failure_threshold = policies.circuit_breaker.failure_threshold,
			"Policies configured"
		);
		let transport = Arc::new(TransportService::new(transport_backend, policies));

		let orchestrator = OrderOrchestrator::new(
			BalanceClient::new(transport),
			OrderStateCache::new(storage.clone()),
		);

		Ok(Gateway::new(self.config, Arc::new(orchestrator), storage))
	}
}

/// Backends that describe the configuration they accept.
trait Configurable {
	fn schema(&self) -> Box<dyn ConfigSchema>;
}

impl Configurable for dyn StorageInterface {
	fn schema(&self) -> Box<dyn ConfigSchema> {
		self.config_schema()
	}
}

impl Configurable for dyn TransportInterface {
	fn schema(&self) -> Box<dyn ConfigSchema> {
		self.config_schema()
	}
}

/// Creates every configured implementation that has a factory, checks its
/// table against the implementation's schema and returns the primary one.
fn load_primary<T: ?Sized + Configurable, E, F>(
	component: &str,
	primary: &str,
	configs: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	E: std::fmt::Display,
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in configs {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				implementation.schema().validate(config).map_err(|e| {
					tracing::error!(
						component,
						implementation = %name,
						error = %e,
						"Invalid implementation configuration"
					);
					BuilderError::Config(format!(
						"Invalid configuration for {} implementation '{}': {}",
						component, name, e
					))
				})?;
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has no registered factory",
			component, primary
		))
	})
}
