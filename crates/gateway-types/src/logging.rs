//! Structured log events.
//!
//! Outbound and inbound exchanges are described by a [`LogEvent`] record with a
//! fixed set of fields. Bodies pass through [`redact_sensitive`] before the
//! event is emitted, so credentials never reach a log sink.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Longest body excerpt attached to a log event.
const MAX_LOGGED_BODY: usize = 2048;

static SENSITIVE_VALUE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(
		r#"(?i)("(?:password|passwd|otp|pin|secret|token|access_?token|api_?key)"\s*:\s*)("(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?|true|false|null)"#,
	)
	.expect("redaction pattern is a valid regex")
});

static SENSITIVE_PAIR: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"(?i)\b(password|passwd|otp|pin|secret|token|access_?token|api_?key)=([^&\s]*)")
		.expect("redaction pattern is a valid regex")
});

/// Replaces the values of sensitive fields with `***REDACTED***`.
///
/// Handles JSON members (`"password": "..."`) and query/form pairs
/// (`otp=1234`). Everything else is returned unchanged.
pub fn redact_sensitive(input: &str) -> String {
	let redacted = SENSITIVE_VALUE.replace_all(input, r#"${1}"***REDACTED***""#);
	SENSITIVE_PAIR
		.replace_all(&redacted, "${1}=***REDACTED***")
		.into_owned()
}

/// Classification of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
	/// Inbound HTTP exchange handled by the host.
	HttpRequestResponse,
	/// Outbound call to the balance service that produced a response.
	ExternalServiceCall,
	/// Outbound call to the balance service that failed without a response.
	ExternalServiceException,
	/// Read or write against the order state cache.
	Cache,
}

impl fmt::Display for LogType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LogType::HttpRequestResponse => write!(f, "http_request_response"),
			LogType::ExternalServiceCall => write!(f, "external_service_call"),
			LogType::ExternalServiceException => write!(f, "external_service_exception"),
			LogType::Cache => write!(f, "cache"),
		}
	}
}

/// A single structured log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
	pub log_type: LogType,
	pub method: String,
	pub path: String,
	pub status: Option<u16>,
	pub elapsed_ms: u64,
	pub attempt: u32,
	/// Redacted, truncated body excerpt.
	pub body: Option<String>,
	pub error: Option<String>,
}

impl LogEvent {
	pub fn new(log_type: LogType, method: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			log_type,
			method: method.into(),
			path: path.into(),
			status: None,
			elapsed_ms: 0,
			attempt: 0,
			body: None,
			error: None,
		}
	}

	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);
		self
	}

	pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
		self.elapsed_ms = elapsed.as_millis() as u64;
		self
	}

	pub fn with_attempt(mut self, attempt: u32) -> Self {
		self.attempt = attempt;
		self
	}

	/// Attaches a body after redacting and truncating it.
	pub fn with_body(mut self, body: &str) -> Self {
		let mut redacted = redact_sensitive(body);
		if redacted.len() > MAX_LOGGED_BODY {
			let mut cut = MAX_LOGGED_BODY;
			while !redacted.is_char_boundary(cut) {
				cut -= 1;
			}
			redacted.truncate(cut);
			redacted.push_str("...");
		}
		self.body = Some(redacted);
		self
	}

	pub fn with_error(mut self, error: impl fmt::Display) -> Self {
		self.error = Some(redact_sensitive(&error.to_string()));
		self
	}

	/// Emits the event through `tracing`.
	///
	/// Failures and 5xx responses are logged at warn, everything else at debug.
	pub fn emit(&self) {
		let failed = self.error.is_some() || self.status.is_some_and(|s| s >= 500);
		let status = self.status.unwrap_or_default();
		let body = self.body.as_deref().unwrap_or_default();
		let error = self.error.as_deref().unwrap_or_default();
		if failed {
			tracing::warn!(
				log_type = %self.log_type,
				method = %self.method,
				path = %self.path,
				status,
				elapsed_ms = self.elapsed_ms,
				attempt = self.attempt,
				body,
				error,
				"exchange failed"
			);
		} else {
			tracing::debug!(
				log_type = %self.log_type,
				method = %self.method,
				path = %self.path,
				status,
				elapsed_ms = self.elapsed_ms,
				attempt = self.attempt,
				body,
				"exchange completed"
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_redacts_json_members() {
		let body = r#"{"userName":"bob","Password":"hunter2","otp":123456,"amount":10}"#;
		assert_eq!(
			redact_sensitive(body),
			r#"{"userName":"bob","Password":"***REDACTED***","otp":"***REDACTED***","amount":10}"#
		);
	}

	#[test]
	fn test_redacts_query_pairs() {
		assert_eq!(
			redact_sensitive("user=bob&otp=9911&token=abc"),
			"user=bob&otp=***REDACTED***&token=***REDACTED***"
		);
	}

	#[test]
	fn test_leaves_plain_payloads_alone() {
		let body = r#"{"orderId":"1112233123","amount":100}"#;
		assert_eq!(redact_sensitive(body), body);
	}

	#[test]
	fn test_event_truncates_long_bodies() {
		let body = "x".repeat(MAX_LOGGED_BODY + 10);
		let event = LogEvent::new(LogType::ExternalServiceCall, "GET", "/api/products")
			.with_status(200)
			.with_body(&body);
		assert_eq!(event.body.unwrap().len(), MAX_LOGGED_BODY + 3);
	}
}
