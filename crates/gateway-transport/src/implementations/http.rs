//! HTTP transport backend built on reqwest.

use crate::{
	HttpMethod, RawRequest, RawResponse, TransportError, TransportFactory, TransportInterface,
	TransportRegistry,
};
use async_trait::async_trait;
use gateway_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// Default for `connect_timeout_seconds`.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends requests to the balance service over HTTP(S).
///
/// The client only bounds connection setup; the transport service bounds
/// every attempt as a whole.
pub struct HttpTransport {
	client: reqwest::Client,
	base_url: String,
	/// Budget the client enforces on its own, reported when it times out.
	client_timeout: Duration,
}

impl HttpTransport {
	pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			client_timeout: DEFAULT_CONNECT_TIMEOUT,
		}
	}

	/// Sets the timeout the client was built with.
	pub fn with_client_timeout(mut self, timeout: Duration) -> Self {
		self.client_timeout = timeout;
		self
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path.trim_start_matches('/'))
	}

	/// Maps a reqwest failure onto the transport taxonomy.
	fn classify(&self, error: reqwest::Error) -> TransportError {
		if error.is_timeout() {
			TransportError::Timeout(self.client_timeout)
		} else if error.is_builder() {
			TransportError::Request(error.to_string())
		} else {
			// Connect failures, resets and truncated bodies
			TransportError::Connection(error.to_string())
		}
	}
}

#[async_trait]
impl TransportInterface for HttpTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpTransportSchema)
	}

	async fn execute(&self, request: &RawRequest) -> Result<RawResponse, TransportError> {
		let url = self.url(&request.path);
		let mut builder = match request.method {
			HttpMethod::Get => self.client.get(&url),
			HttpMethod::Post => self.client.post(&url),
		}
		.header(ACCEPT, "application/json");
		if let Some(body) = &request.body {
			builder = builder
				.header(CONTENT_TYPE, "application/json")
				.body(body.clone());
		}

		let response = builder.send().await.map_err(|e| self.classify(e))?;
		let status = response.status().as_u16();
		let body = response.bytes().await.map_err(|e| self.classify(e))?;
		Ok(RawResponse { status, body })
	}
}

/// Configuration schema for HttpTransport.
pub struct HttpTransportSchema;

impl ConfigSchema for HttpTransportSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("base_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("base_url must start with http:// or https://".to_string()),
					}
				}),
			],
			vec![
				Field::new(
					"pool_max_idle_per_host",
					FieldType::Integer {
						min: Some(0),
						max: Some(1024),
					},
				),
				Field::new(
					"pool_idle_timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(3600),
					},
				),
				Field::new(
					"connect_timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Builds an HTTP transport from configuration.
///
/// Configuration parameters:
/// - `base_url`: Root URL of the balance service (required)
/// - `pool_max_idle_per_host`: Idle connections kept per host (default: 10)
/// - `pool_idle_timeout_seconds`: Idle connection lifetime (default: 90)
/// - `connect_timeout_seconds`: Connection setup budget (default: 5)
pub fn create_transport(config: &toml::Value) -> Result<Box<dyn TransportInterface>, TransportError> {
	HttpTransportSchema
		.validate(config)
		.map_err(|e| TransportError::Configuration(e.to_string()))?;

	// Schema guarantees presence and type
	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.unwrap_or_default();
	let max_idle = config
		.get("pool_max_idle_per_host")
		.and_then(|v| v.as_integer())
		.unwrap_or(10) as usize;
	let idle_timeout = config
		.get("pool_idle_timeout_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(90) as u64;
	let connect_timeout = config
		.get("connect_timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| Duration::from_secs(secs as u64))
		.unwrap_or(DEFAULT_CONNECT_TIMEOUT);

	let client = reqwest::Client::builder()
		.pool_idle_timeout(Duration::from_secs(idle_timeout))
		.pool_max_idle_per_host(max_idle)
		.connect_timeout(connect_timeout)
		.build()
		.map_err(|e| TransportError::Configuration(e.to_string()))?;

	Ok(Box::new(
		HttpTransport::new(client, base_url).with_client_timeout(connect_timeout),
	))
}

/// Registry for the HTTP transport implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		create_transport
	}
}

impl TransportRegistry for Registry {}
