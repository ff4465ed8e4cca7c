//! Client for the balance management service.
//!
//! [`BalanceClient`] is the only component that knows the service's wire
//! paths. Each operation sends one request through the resilient transport and
//! decodes the reply with the [`decoder`].

use gateway_transport::{RawRequest, TransportError, TransportService};
use gateway_types::{
	truncate_id, BalanceSnapshot, CompletionResult, ErrorKind, PreorderRequest, PreorderResult,
	ProductList,
};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub mod decoder;

use decoder::{decode, decode_write, DecodeError, Operation};

const PRODUCTS_PATH: &str = "/api/products";
const BALANCE_PATH: &str = "/api/balance";
const PREORDER_PATH: &str = "/api/balance/preorder";
const COMPLETE_PATH: &str = "/api/balance/complete";

/// Errors that can occur while talking to the balance service.
#[derive(Debug, Error)]
pub enum BalanceError {
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// The request body could not be serialized.
	#[error("Failed to encode request: {0}")]
	Encode(String),
}

impl BalanceError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			BalanceError::Transport(e) => e.kind(),
			BalanceError::Decode(e) => e.kind(),
			BalanceError::Encode(_) => ErrorKind::InternalInvariant,
		}
	}
}

/// Façade over the four balance service operations.
#[derive(Clone)]
pub struct BalanceClient {
	transport: Arc<TransportService>,
}

impl BalanceClient {
	pub fn new(transport: Arc<TransportService>) -> Self {
		Self { transport }
	}

	/// Lists the products offered by the service.
	#[instrument(skip_all)]
	pub async fn list_products(
		&self,
		cancel: &CancellationToken,
	) -> Result<Option<ProductList>, BalanceError> {
		let response = self
			.transport
			.send(&RawRequest::get(PRODUCTS_PATH), cancel)
			.await?;
		Ok(decode(&response, Operation::Read)?)
	}

	/// Fetches the current balance snapshot.
	#[instrument(skip_all)]
	pub async fn get_balance(
		&self,
		cancel: &CancellationToken,
	) -> Result<Option<BalanceSnapshot>, BalanceError> {
		let response = self
			.transport
			.send(&RawRequest::get(BALANCE_PATH), cancel)
			.await?;
		Ok(decode(&response, Operation::Read)?)
	}

	/// Blocks funds for an order.
	#[instrument(skip_all, fields(order_id = %truncate_id(&request.order_id)))]
	pub async fn create_preorder(
		&self,
		request: &PreorderRequest,
		cancel: &CancellationToken,
	) -> Result<PreorderResult, BalanceError> {
		let body = serde_json::to_vec(request).map_err(|e| BalanceError::Encode(e.to_string()))?;
		let response = self
			.transport
			.send(&RawRequest::post_json(PREORDER_PATH, body), cancel)
			.await?;
		let result: PreorderResult = decode_write(&response)?;
		tracing::info!(status = %result.pre_order.status, "Preorder confirmed");
		Ok(result)
	}

	/// Settles a previously blocked order.
	///
	/// The body is the order id as a bare JSON string.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn complete_order(
		&self,
		order_id: &str,
		cancel: &CancellationToken,
	) -> Result<CompletionResult, BalanceError> {
		let body = serde_json::to_vec(order_id).map_err(|e| BalanceError::Encode(e.to_string()))?;
		let response = self
			.transport
			.send(&RawRequest::post_json(COMPLETE_PATH, body), cancel)
			.await?;
		let result: CompletionResult = decode_write(&response)?;
		tracing::info!(status = %result.order.status, "Completion confirmed");
		Ok(result)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gateway_transport::implementations::scripted::ScriptedTransport;
	use gateway_transport::{HttpMethod, RetryPolicy, TransportPolicies};
	use rust_decimal::Decimal;
	use serde_json::json;

	fn client(script: &ScriptedTransport) -> BalanceClient {
		let policies = TransportPolicies {
			retry: RetryPolicy::none(),
			..TransportPolicies::default()
		};
		BalanceClient::new(Arc::new(TransportService::new(
			Box::new(script.clone()),
			policies,
		)))
	}

	fn balance_json() -> serde_json::Value {
		json!({
			"userId": "u-1",
			"totalBalance": 1000,
			"availableBalance": 900,
			"blockedBalance": 100,
			"currency": "USD",
			"lastUpdated": "2025-06-01T10:00:00Z"
		})
	}

	#[tokio::test]
	async fn test_list_products() {
		let script = ScriptedTransport::new();
		script.respond_json(
			200,
			json!({"success": true, "data": [
				{"id": "p-1", "name": "Phone", "description": "", "price": 19.5,
					"currency": "USD", "category": "electronics", "stock": 3},
				{"id": "p-2", "name": "Case", "price": 5}
			]}),
		);

		let products = client(&script)
			.list_products(&CancellationToken::new())
			.await
			.unwrap()
			.unwrap();

		assert_eq!(products.len(), 2);
		assert_eq!(products.0[0].price, Decimal::new(195, 1));
		assert_eq!(products.0[1].stock, 0);
		let call = &script.calls()[0];
		assert_eq!(call.request.method, HttpMethod::Get);
		assert_eq!(call.request.path, "/api/products");
	}

	#[tokio::test]
	async fn test_empty_read_is_none() {
		let script = ScriptedTransport::new();
		script.respond(200, "");

		let balance = client(&script)
			.get_balance(&CancellationToken::new())
			.await
			.unwrap();
		assert!(balance.is_none());
		assert_eq!(script.calls()[0].request.path, "/api/balance");
	}

	#[tokio::test]
	async fn test_create_preorder_sends_order_json() {
		let script = ScriptedTransport::new();
		script.respond_json(
			200,
			json!({"success": true, "message": "ok", "data": {
				"preOrder": {"orderId": "1112233123", "amount": 100, "status": "blocked"},
				"updatedBalance": balance_json()
			}}),
		);
		let request = PreorderRequest {
			order_id: "1112233123".into(),
			amount: Decimal::from(100),
		};

		let result = client(&script)
			.create_preorder(&request, &CancellationToken::new())
			.await
			.unwrap();

		assert_eq!(result.pre_order.order_id, "1112233123");
		assert_eq!(result.updated_balance.available_balance, Decimal::from(900));

		let call = &script.calls()[0];
		assert_eq!(call.request.method, HttpMethod::Post);
		assert_eq!(call.request.path, "/api/balance/preorder");
		let sent: serde_json::Value = serde_json::from_str(&call.body_text().unwrap()).unwrap();
		assert_eq!(sent, json!({"orderId": "1112233123", "amount": 100}));
	}

	#[tokio::test]
	async fn test_complete_order_sends_bare_string() {
		let script = ScriptedTransport::new();
		script.respond_json(
			200,
			json!({"success": true, "data": {
				"order": {"orderId": "1112233123", "amount": 100, "status": "completed",
					"completedAt": "2025-06-01T10:05:00+00:00"},
				"updatedBalance": balance_json()
			}}),
		);

		let result = client(&script)
			.complete_order("1112233123", &CancellationToken::new())
			.await
			.unwrap();

		assert_eq!(result.order.status, "completed");
		assert!(result.order.completed_at.is_some());
		assert!(result.order.cancelled_at.is_none());

		let call = &script.calls()[0];
		assert_eq!(call.request.path, "/api/balance/complete");
		assert_eq!(call.body_text().as_deref(), Some("\"1112233123\""));
	}

	#[tokio::test]
	async fn test_errors_keep_their_kind() {
		let script = ScriptedTransport::new();
		script
			.respond(200, "")
			.respond(400, r#"{"message":"Invalid order"}"#)
			.connection_error("refused");
		let client = client(&script);
		let cancel = CancellationToken::new();

		let err = client.complete_order("A-1", &cancel).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::EmptyResponse);

		let err = client.complete_order("A-1", &cancel).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Rejected);
		assert!(err.to_string().contains("Invalid order"));

		let err = client.get_balance(&cancel).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Transport);
	}

	#[tokio::test]
	async fn test_cancelled_token_short_circuits() {
		let script = ScriptedTransport::new();
		script.respond(200, "");
		let cancel = CancellationToken::new();
		cancel.cancel();

		let err = client(&script).list_products(&cancel).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Cancelled);
		assert_eq!(script.call_count(), 0);
	}
}
