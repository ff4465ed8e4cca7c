//! API types for the payment gateway.
//!
//! Every orchestrator operation answers with an [`Envelope`]: a success flag,
//! optional data and a list of error details. The host maps the envelope to an
//! HTTP response without looking at anything but the flag and the error kinds.

use crate::ErrorKind;
use serde::{Deserialize, Serialize};

/// One entry of an envelope's error list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
	/// Error classification.
	pub code: ErrorKind,
	/// Human-readable description.
	pub message: String,
}

impl ErrorDetail {
	pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}
}

/// Uniform result of an orchestrator operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
	/// Whether the operation succeeded.
	pub success: bool,
	/// Payload, present only on success.
	pub data: Option<T>,
	/// Error details, empty on success.
	pub errors: Vec<ErrorDetail>,
}

impl<T> Envelope<T> {
	/// Creates a successful envelope carrying `data`.
	pub fn success(data: T) -> Self {
		Self {
			success: true,
			data: Some(data),
			errors: Vec::new(),
		}
	}

	/// Creates a failed envelope with the given error details.
	pub fn failure(errors: Vec<ErrorDetail>) -> Self {
		Self {
			success: false,
			data: None,
			errors,
		}
	}

	/// Creates a failed envelope with a single error.
	pub fn fail(code: ErrorKind, message: impl Into<String>) -> Self {
		Self::failure(vec![ErrorDetail::new(code, message)])
	}

	/// HTTP status for this envelope.
	///
	/// 200 on success; otherwise the status of the first error kind, or 400
	/// when a failure carries no details.
	pub fn status_code(&self) -> u16 {
		if self.success {
			return 200;
		}
		self.errors
			.first()
			.map(|e| e.code.status_code())
			.unwrap_or(400)
	}

	/// Kinds of all reported errors, in order.
	pub fn error_kinds(&self) -> Vec<ErrorKind> {
		self.errors.iter().map(|e| e.code).collect()
	}
}

/// Paging parameters for the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
	/// 1-based page number.
	#[serde(default = "default_offset")]
	pub offset: usize,
	/// Page size.
	#[serde(default = "default_limit")]
	pub limit: usize,
}

fn default_offset() -> usize {
	1
}

fn default_limit() -> usize {
	10
}

impl Default for ProductQuery {
	fn default() -> Self {
		Self {
			offset: default_offset(),
			limit: default_limit(),
		}
	}
}

impl ProductQuery {
	/// Number of items to skip before the requested page.
	pub fn skip(&self) -> usize {
		self.offset.saturating_sub(1).saturating_mul(self.limit)
	}
}
