//! Error taxonomy shared by every gateway component.
//!
//! Each crate keeps its own `thiserror` enum; whenever an error crosses into a
//! result envelope it is tagged with one of the closed [`ErrorKind`] variants
//! below, and the HTTP status is derived from that tag alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed classification of every failure an orchestrator operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	/// Bad input; never reaches the transport.
	Validation,
	/// The balance service refused the request with a 4xx, such as an
	/// insufficient balance or a duplicate order.
	Rejected,
	/// Any other failure response from the balance service.
	Service,
	/// Malformed payload on a successful status.
	Decode,
	/// Successful status with no body on a write operation.
	EmptyResponse,
	/// Timeout or connection failure after the retry policy was exhausted.
	Transport,
	/// The circuit breaker rejected the call without reaching the network.
	CircuitOpen,
	/// Successful status carrying a logically impossible null payload.
	InternalInvariant,
	/// The service confirmed a different order id than the one requested.
	OrderIdMismatch,
	/// The cached order state does not allow the requested transition.
	InvalidTransition,
	/// No cached state exists for the requested order.
	NotFound,
	/// The caller cancelled the operation.
	Cancelled,
	/// The local cache failed.
	Storage,
}

impl ErrorKind {
	/// Maps the kind to the HTTP status returned by the host.
	///
	/// Caller mistakes land in the 400 bucket, upstream and internal failures
	/// in the 500 bucket.
	pub fn status_code(&self) -> u16 {
		match self {
			ErrorKind::Validation
			| ErrorKind::Rejected
			| ErrorKind::OrderIdMismatch
			| ErrorKind::InvalidTransition => 400,
			ErrorKind::NotFound => 404,
			ErrorKind::Service
			| ErrorKind::Decode
			| ErrorKind::EmptyResponse
			| ErrorKind::InternalInvariant
			| ErrorKind::Transport => 502,
			ErrorKind::CircuitOpen => 503,
			ErrorKind::Cancelled | ErrorKind::Storage => 500,
		}
	}

	/// Stable machine-readable code used in error details.
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::Validation => "VALIDATION_ERROR",
			ErrorKind::Rejected => "SERVICE_REJECTED",
			ErrorKind::Service => "SERVICE_ERROR",
			ErrorKind::Decode => "DECODE_ERROR",
			ErrorKind::EmptyResponse => "EMPTY_RESPONSE",
			ErrorKind::Transport => "TRANSPORT_ERROR",
			ErrorKind::CircuitOpen => "CIRCUIT_OPEN",
			ErrorKind::InternalInvariant => "INTERNAL_INVARIANT",
			ErrorKind::OrderIdMismatch => "ORDER_ID_MISMATCH",
			ErrorKind::InvalidTransition => "INVALID_TRANSITION",
			ErrorKind::NotFound => "NOT_FOUND",
			ErrorKind::Cancelled => "CANCELLED",
			ErrorKind::Storage => "STORAGE_ERROR",
		}
	}

	/// Returns true for kinds caused by the caller rather than the gateway or upstream.
	pub fn is_client_error(&self) -> bool {
		(400..500).contains(&self.status_code())
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
