//! API handlers for the gateway.
//!
//! Handlers translate HTTP requests into orchestrator calls and map the
//! resulting envelope onto a response: 200 with the data on success, the
//! error list with the status of the first error kind otherwise.

use crate::server::AppState;
use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use gateway_types::{Envelope, ErrorKind};
use serde::Serialize;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub mod balance;
pub mod order;
pub mod products;

/// HTTP rendition of an [`Envelope`].
pub struct ApiResponse {
	status: StatusCode,
	body: serde_json::Value,
}

impl<T: Serialize> From<Envelope<T>> for ApiResponse {
	fn from(envelope: Envelope<T>) -> Self {
		let status = StatusCode::from_u16(envelope.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let body = if envelope.success {
			serde_json::to_value(&envelope.data)
		} else {
			serde_json::to_value(&envelope.errors)
		};
		match body {
			Ok(body) => Self { status, body },
			Err(e) => {
				tracing::error!("Failed to serialize response: {}", e);
				Self {
					status: StatusCode::INTERNAL_SERVER_ERROR,
					body: serde_json::json!([{
						"code": ErrorKind::InternalInvariant,
						"message": "response could not be serialized"
					}]),
				}
			},
		}
	}
}

impl IntoResponse for ApiResponse {
	fn into_response(self) -> Response {
		(self.status, Json(self.body)).into_response()
	}
}

/// Runs an orchestrator operation under the request deadline.
///
/// The operation's token is cancelled on shutdown and when the deadline
/// passes, before the operation is dropped. A timed out request reports
/// `Cancelled`.
pub(crate) async fn with_deadline<T, F, Fut>(state: &AppState, operation: F) -> ApiResponse
where
	T: Serialize,
	F: FnOnce(CancellationToken) -> Fut,
	Fut: Future<Output = Envelope<T>>,
{
	let cancel = state.shutdown.child_token();
	let operation = operation(cancel.clone());
	tokio::pin!(operation);

	let envelope = tokio::select! {
		envelope = &mut operation => envelope,
		_ = tokio::time::sleep(state.request_timeout) => {
			cancel.cancel();
			tracing::warn!(
				timeout_seconds = state.request_timeout.as_secs(),
				"Request deadline exceeded"
			);
			Envelope::fail(
				ErrorKind::Cancelled,
				format!(
					"Request exceeded its {}s deadline",
					state.request_timeout.as_secs()
				),
			)
		},
	};
	envelope.into()
}
