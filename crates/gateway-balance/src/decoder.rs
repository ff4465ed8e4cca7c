//! Response decoding for balance service payloads.
//!
//! Turns a [`RawResponse`] into a typed result while keeping every failure
//! distinguishable: a non-2xx status, an empty body, unparseable JSON and a
//! success envelope without a result all map to different [`DecodeError`]s.

use gateway_transport::RawResponse;
use gateway_types::{canonicalize_keys, ErrorKind, ServiceResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Longest raw body excerpt carried inside an error message.
const MAX_MESSAGE_BODY: usize = 512;

/// Whether the decoded call was a read or a write.
///
/// Reads tolerate an absent result; writes must confirm one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Read,
	Write,
}

/// Errors produced while decoding a response.
#[derive(Debug, Error)]
pub enum DecodeError {
	/// The service refused the request itself with a 4xx.
	#[error("Balance service rejected the request ({status}): {message}")]
	Rejected {
		status: u16,
		message: String,
		/// Raw response body.
		body: String,
	},
	/// The service answered with any other failure status or `success: false`.
	#[error("Balance service error ({status}): {message}")]
	Service {
		status: u16,
		message: String,
		/// Raw response body.
		body: String,
	},
	/// The body is not valid JSON for the expected shape.
	#[error("Malformed balance service response: {0}")]
	Malformed(String),
	/// A write was acknowledged with an empty body.
	#[error("Balance service returned an empty body")]
	EmptyResponse,
	/// A write was acknowledged without a result object.
	#[error("Balance service confirmed the request without a result: {0}")]
	MissingResult(&'static str),
}

impl DecodeError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			DecodeError::Rejected { .. } => ErrorKind::Rejected,
			DecodeError::Service { .. } => ErrorKind::Service,
			DecodeError::Malformed(_) => ErrorKind::Decode,
			DecodeError::EmptyResponse => ErrorKind::EmptyResponse,
			DecodeError::MissingResult(_) => ErrorKind::InternalInvariant,
		}
	}
}

/// Decodes a balance service envelope.
///
/// Returns `Ok(None)` only for reads that carried no result.
pub fn decode<T: DeserializeOwned>(
	response: &RawResponse,
	operation: Operation,
) -> Result<Option<T>, DecodeError> {
	let text = response.text();

	if !response.is_success() {
		let status = response.status;
		let message = failure_message(status, &text);
		return Err(if is_rejection(status) {
			DecodeError::Rejected {
				status,
				message,
				body: text,
			}
		} else {
			DecodeError::Service {
				status,
				message,
				body: text,
			}
		});
	}

	if text.trim().is_empty() {
		return match operation {
			Operation::Read => Ok(None),
			Operation::Write => Err(DecodeError::EmptyResponse),
		};
	}

	let mut value: Value =
		serde_json::from_str(&text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
	if value.is_null() {
		return match operation {
			Operation::Read => Ok(None),
			Operation::Write => Err(DecodeError::MissingResult("null body")),
		};
	}
	canonicalize_keys(&mut value);

	let envelope: ServiceResponse<T> =
		serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))?;

	if !envelope.success {
		return Err(DecodeError::Service {
			status: response.status,
			message: envelope
				.message
				.filter(|m| !m.trim().is_empty())
				.unwrap_or_else(|| "request was not accepted".to_string()),
			body: text,
		});
	}

	match (envelope.data, operation) {
		(Some(data), _) => Ok(Some(data)),
		(None, Operation::Read) => Ok(None),
		(None, Operation::Write) => Err(DecodeError::MissingResult("data is absent")),
	}
}

/// Decodes a write response, which must carry a result.
pub fn decode_write<T: DeserializeOwned>(response: &RawResponse) -> Result<T, DecodeError> {
	decode(response, Operation::Write)?.ok_or(DecodeError::MissingResult("data is absent"))
}

/// A 4xx that refuses the request on its merits. Authentication, request
/// timeout and throttling statuses are gateway-side problems and stay
/// `Service` failures.
fn is_rejection(status: u16) -> bool {
	(400..500).contains(&status) && !matches!(status, 401 | 403 | 407 | 408 | 429)
}

/// Best-effort human message for a failure status.
///
/// Uses `message` or `errorMessage` from a JSON body when present, otherwise a
/// trimmed excerpt of the raw body.
fn failure_message(status: u16, body: &str) -> String {
	let from_json = serde_json::from_str::<Value>(body).ok().and_then(|mut value| {
		canonicalize_keys(&mut value);
		["message", "errorMessage"]
			.iter()
			.find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
	});
	if let Some(message) = from_json.filter(|m| !m.is_empty()) {
		return message;
	}

	let excerpt = body.trim();
	if excerpt.is_empty() {
		return format!("HTTP {}", status);
	}
	match excerpt.char_indices().nth(MAX_MESSAGE_BODY) {
		Some((cut, _)) => format!("{}...", &excerpt[..cut]),
		None => excerpt.to_string(),
	}
}
