//! Scripted transport backend for tests.
//!
//! Plays back a queue of canned outcomes, one per call, and records when each
//! call arrived. Clones share the same script, so a test can keep a handle
//! while the service owns another.

use crate::{
	RawRequest, RawResponse, TransportError, TransportFactory, TransportInterface,
	TransportRegistry,
};
use async_trait::async_trait;
use gateway_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Step {
	Respond(RawResponse),
	Delay(Duration, RawResponse),
	Fail(TransportError),
	Hang,
}

/// A call observed by the scripted transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
	pub at: Instant,
	pub request: RawRequest,
}

impl RecordedCall {
	/// Request body as text.
	pub fn body_text(&self) -> Option<String> {
		self.request
			.body
			.as_ref()
			.map(|b| String::from_utf8_lossy(b).into_owned())
	}
}

#[derive(Debug, Default)]
struct Script {
	steps: VecDeque<Step>,
	calls: Vec<RecordedCall>,
}

/// Transport that answers from a script instead of the network.
///
/// An exhausted script answers with a connection error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
	script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
	pub fn new() -> Self {
		Self::default()
	}

	fn push(&self, step: Step) -> &Self {
		self.script
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.steps
			.push_back(step);
		self
	}

	/// Queues a response with the given status and body.
	pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
		self.push(Step::Respond(RawResponse::new(status, body.into())))
	}

	/// Queues a JSON response.
	pub fn respond_json(&self, status: u16, body: serde_json::Value) -> &Self {
		self.respond(status, body.to_string())
	}

	/// Queues a response delivered after `delay`.
	pub fn respond_after(&self, delay: Duration, status: u16, body: impl Into<String>) -> &Self {
		self.push(Step::Delay(delay, RawResponse::new(status, body.into())))
	}

	/// Queues a connection failure.
	pub fn connection_error(&self, message: impl Into<String>) -> &Self {
		self.push(Step::Fail(TransportError::Connection(message.into())))
	}

	/// Queues an arbitrary error.
	pub fn fail(&self, error: TransportError) -> &Self {
		self.push(Step::Fail(error))
	}

	/// Queues a call that never completes.
	pub fn hang(&self) -> &Self {
		self.push(Step::Hang)
	}

	/// All calls received so far.
	pub fn calls(&self) -> Vec<RecordedCall> {
		self.script
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.calls
			.clone()
	}

	pub fn call_count(&self) -> usize {
		self.script
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.calls
			.len()
	}
}

#[async_trait]
impl TransportInterface for ScriptedTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(ScriptedTransportSchema)
	}

	async fn execute(&self, request: &RawRequest) -> Result<RawResponse, TransportError> {
		let step = {
			let mut script = self
				.script
				.lock()
				.unwrap_or_else(|poisoned| poisoned.into_inner());
			script.calls.push(RecordedCall {
				at: Instant::now(),
				request: request.clone(),
			});
			script.steps.pop_front()
		};

		match step {
			Some(Step::Respond(response)) => Ok(response),
			Some(Step::Delay(delay, response)) => {
				tokio::time::sleep(delay).await;
				Ok(response)
			},
			Some(Step::Fail(error)) => Err(error),
			Some(Step::Hang) => std::future::pending().await,
			None => Err(TransportError::Connection("script exhausted".into())),
		}
	}
}

/// Configuration schema for ScriptedTransport.
pub struct ScriptedTransportSchema;

impl ConfigSchema for ScriptedTransportSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Builds an empty scripted transport.
pub fn create_transport(
	_config: &toml::Value,
) -> Result<Box<dyn TransportInterface>, TransportError> {
	Ok(Box::new(ScriptedTransport::new()))
}

/// Registry for the scripted transport implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "scripted";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		create_transport
	}
}

impl TransportRegistry for Registry {}
