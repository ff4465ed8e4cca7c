//! Resilient transport towards the balance management service.
//!
//! [`TransportService`] wraps a pluggable [`TransportInterface`] backend with a
//! per-attempt timeout, exponential retry on transient failures and a
//! consecutive-failure circuit breaker. It moves bytes only; payload semantics
//! belong to the decoder.

use async_trait::async_trait;
use bytes::Bytes;
use gateway_types::{ConfigSchema, ErrorKind, ImplementationRegistry, LogEvent, LogType};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub mod policy;

pub use policy::{
	BreakerPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryPolicy, TransportPolicies,
};

pub mod implementations {
	pub mod http;
	#[cfg(any(test, feature = "testing"))]
	pub mod scripted;
}

/// Errors that can occur while exchanging a request.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
	/// The attempt exceeded its time budget.
	#[error("Request timed out after {0:?}")]
	Timeout(Duration),
	/// Connection could not be established or was reset.
	#[error("Connection error: {0}")]
	Connection(String),
	/// The request could not be built or sent for a non-transient reason.
	#[error("Request error: {0}")]
	Request(String),
	/// The circuit is open; no network attempt was made.
	#[error("Circuit open, retry in {0:?}")]
	CircuitOpen(Duration),
	/// The caller cancelled the operation.
	#[error("Request cancelled")]
	Cancelled,
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl TransportError {
	/// Whether the failure is worth retrying and counts toward the breaker.
	pub fn is_transient(&self) -> bool {
		matches!(self, TransportError::Timeout(_) | TransportError::Connection(_))
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			TransportError::CircuitOpen(_) => ErrorKind::CircuitOpen,
			TransportError::Cancelled => ErrorKind::Cancelled,
			TransportError::Timeout(_)
			| TransportError::Connection(_)
			| TransportError::Request(_)
			| TransportError::Configuration(_) => ErrorKind::Transport,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
	Get,
	Post,
}

impl HttpMethod {
	pub fn as_str(&self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
		}
	}
}

impl fmt::Display for HttpMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Outbound request relative to the backend's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
	pub method: HttpMethod,
	pub path: String,
	/// JSON body, if any.
	pub body: Option<Bytes>,
}

impl RawRequest {
	pub fn get(path: impl Into<String>) -> Self {
		Self {
			method: HttpMethod::Get,
			path: path.into(),
			body: None,
		}
	}

	pub fn post_json(path: impl Into<String>, body: impl Into<Bytes>) -> Self {
		Self {
			method: HttpMethod::Post,
			path: path.into(),
			body: Some(body.into()),
		}
	}
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
	pub status: u16,
	pub body: Bytes,
}

impl RawResponse {
	pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
		Self {
			status,
			body: body.into(),
		}
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	pub fn is_server_error(&self) -> bool {
		(500..600).contains(&self.status)
	}

	/// Body as text, with invalid UTF-8 replaced.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Backend performing a single HTTP exchange.
///
/// Implementations perform exactly one attempt per call; timeouts, retries
/// and breaker accounting are applied by [`TransportService`].
#[async_trait]
pub trait TransportInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Sends the request and returns whatever status the server answered with.
	async fn execute(&self, request: &RawRequest) -> Result<RawResponse, TransportError>;
}

/// Factory function building a transport backend from its TOML table.
pub type TransportFactory =
	fn(&toml::Value) -> Result<Box<dyn TransportInterface>, TransportError>;

/// Registry trait for transport implementations.
pub trait TransportRegistry: ImplementationRegistry<Factory = TransportFactory> {}

/// Returns (name, factory) pairs for every transport implementation.
pub fn get_all_implementations() -> Vec<(&'static str, TransportFactory)> {
	use implementations::http;

	#[allow(unused_mut)]
	let mut factories = vec![(http::Registry::NAME, http::Registry::factory())];
	#[cfg(feature = "testing")]
	factories.push((
		implementations::scripted::Registry::NAME,
		implementations::scripted::Registry::factory(),
	));
	factories
}

/// Outcome of one attempt, before the retry decision.
enum Attempt {
	Done(Result<RawResponse, TransportError>),
	Retryable(Result<RawResponse, TransportError>),
}

/// Transport with timeout, retry and circuit breaker applied.
pub struct TransportService {
	backend: Box<dyn TransportInterface>,
	policies: TransportPolicies,
	breaker: CircuitBreaker,
}

impl TransportService {
	pub fn new(backend: Box<dyn TransportInterface>, policies: TransportPolicies) -> Self {
		Self {
			backend,
			breaker: CircuitBreaker::new(policies.circuit_breaker),
			policies,
		}
	}

	pub fn policies(&self) -> &TransportPolicies {
		&self.policies
	}

	pub fn breaker(&self) -> &CircuitBreaker {
		&self.breaker
	}

	/// Sends a request under the configured policies.
	///
	/// Transient failures (timeout, connection failure, 5xx) are retried with
	/// exponential backoff. When every attempt ends in a 5xx, the last 5xx
	/// response is returned; when every attempt fails without a response, the
	/// last error is returned. A 4xx is returned immediately. Cancellation
	/// abandons the in-flight attempt and any pending retry without touching
	/// the breaker.
	pub async fn send(
		&self,
		request: &RawRequest,
		cancel: &CancellationToken,
	) -> Result<RawResponse, TransportError> {
		let mut retry = 0;
		loop {
			let outcome = match self.attempt(request, retry + 1, cancel).await {
				Attempt::Done(result) => return result,
				Attempt::Retryable(result) => result,
			};

			if retry >= self.policies.retry.max_retries {
				return outcome;
			}
			retry += 1;

			let delay = self.policies.retry.delay_for(retry);
			tracing::debug!(
				method = %request.method,
				path = %request.path,
				retry,
				delay_secs = delay.as_secs(),
				"Retrying after transient failure"
			);
			tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(TransportError::Cancelled),
				_ = tokio::time::sleep(delay) => {},
			}
		}
	}

	async fn attempt(
		&self,
		request: &RawRequest,
		attempt: u32,
		cancel: &CancellationToken,
	) -> Attempt {
		if cancel.is_cancelled() {
			return Attempt::Done(Err(TransportError::Cancelled));
		}
		let permit = match self.breaker.try_acquire() {
			Ok(permit) => permit,
			Err(retry_after) => {
				tracing::warn!(
					method = %request.method,
					path = %request.path,
					"Circuit open, failing fast"
				);
				return Attempt::Done(Err(TransportError::CircuitOpen(retry_after)));
			},
		};

		let started = Instant::now();
		let timeout = self.policies.timeout;
		// Dropping the permit on cancellation gives a half-open trial back
		let result = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Attempt::Done(Err(TransportError::Cancelled)),
			result = tokio::time::timeout(timeout, self.backend.execute(request)) => {
				result.unwrap_or(Err(TransportError::Timeout(timeout)))
			},
		};
		let elapsed = started.elapsed();

		let event = LogEvent::new(
			LogType::ExternalServiceCall,
			request.method.as_str(),
			&request.path,
		)
		.with_elapsed(elapsed)
		.with_attempt(attempt);
		match &result {
			Ok(response) => event
				.with_status(response.status)
				.with_body(&response.text())
				.emit(),
			Err(error) => LogEvent {
				log_type: LogType::ExternalServiceException,
				..event
			}
			.with_error(error)
			.emit(),
		}

		match result {
			Ok(response) if response.is_server_error() => {
				permit.failure();
				Attempt::Retryable(Ok(response))
			},
			Ok(response) => {
				permit.success();
				Attempt::Done(Ok(response))
			},
			Err(error) if error.is_transient() => {
				permit.failure();
				Attempt::Retryable(Err(error))
			},
			// Non-transient errors carry no verdict; the permit is released
			Err(error) => Attempt::Done(Err(error)),
		}
	}
}
