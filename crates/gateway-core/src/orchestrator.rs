//! Order orchestration.
//!
//! The orchestrator validates commands, drives the balance client and records
//! confirmed results in the order state cache. Every operation answers with an
//! [`Envelope`]; no error is retried here or turned into a success.

use crate::state::{CacheEntry, OrderStateCache};
use gateway_balance::{BalanceClient, BalanceError};
use gateway_storage::StorageError;
use gateway_types::{
	truncate_id, validate_order_id, BalanceSnapshot, CommandError, CreateOrderCommand,
	CreatedOrder, Envelope, ErrorDetail, ErrorKind, OrderStatus, OrderView, PreorderRequest,
	ProductPage, ProductQuery,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Largest page size accepted by the product listing.
pub const MAX_PAGE_SIZE: usize = 100;

/// Errors that can occur while processing an order operation.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("Invalid order command")]
	Validation(Vec<CommandError>),
	#[error("Invalid query: {0}")]
	InvalidQuery(String),
	#[error(transparent)]
	Balance(#[from] BalanceError),
	#[error("Balance service confirmed order '{confirmed}' for request '{requested}'")]
	OrderIdMismatch { requested: String, confirmed: String },
	#[error("Order '{order_id}' cannot be completed from state {from}")]
	InvalidTransition { order_id: String, from: OrderStatus },
	#[error("Order '{0}' not found")]
	NotFound(String),
	#[error("Balance service returned no {0}")]
	NoResult(&'static str),
	#[error("Order cache error: {0}")]
	Storage(#[from] StorageError),
}

impl OrderError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			OrderError::Validation(_) | OrderError::InvalidQuery(_) => ErrorKind::Validation,
			OrderError::Balance(e) => e.kind(),
			OrderError::OrderIdMismatch { .. } => ErrorKind::OrderIdMismatch,
			OrderError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
			OrderError::NotFound(_) => ErrorKind::NotFound,
			OrderError::NoResult(_) => ErrorKind::EmptyResponse,
			OrderError::Storage(_) => ErrorKind::Storage,
		}
	}

	/// Error details for the envelope; one per broken rule for validation failures.
	pub fn details(&self) -> Vec<ErrorDetail> {
		match self {
			OrderError::Validation(errors) => errors
				.iter()
				.map(|e| ErrorDetail::new(ErrorKind::Validation, e.to_string()))
				.collect(),
			other => vec![ErrorDetail::new(other.kind(), other.to_string())],
		}
	}
}

fn envelope<T>(result: Result<T, OrderError>) -> Envelope<T> {
	match result {
		Ok(data) => Envelope::success(data),
		Err(e) => {
			if e.kind().is_client_error() {
				tracing::info!(kind = %e.kind(), error = %e, "Operation rejected");
			} else {
				tracing::warn!(kind = %e.kind(), error = %e, "Operation failed");
			}
			Envelope::failure(e.details())
		},
	}
}

/// Coordinates order operations against the balance service.
pub struct OrderOrchestrator {
	client: BalanceClient,
	cache: OrderStateCache,
}

impl OrderOrchestrator {
	pub fn new(client: BalanceClient, cache: OrderStateCache) -> Self {
		Self { client, cache }
	}

	pub fn cache(&self) -> &OrderStateCache {
		&self.cache
	}

	/// Preorders funds for a new order.
	///
	/// Invalid commands never reach the balance service. The result is cached
	/// only when the service confirmed the requested order id.
	#[instrument(skip_all, fields(order_id = %truncate_id(&command.order_id)))]
	pub async fn create_order(
		&self,
		command: CreateOrderCommand,
		cancel: &CancellationToken,
	) -> Envelope<CreatedOrder> {
		envelope(self.try_create_order(command, cancel).await)
	}

	async fn try_create_order(
		&self,
		command: CreateOrderCommand,
		cancel: &CancellationToken,
	) -> Result<CreatedOrder, OrderError> {
		let order = command.into_order().map_err(OrderError::Validation)?;
		let request = PreorderRequest {
			order_id: order.id.clone(),
			amount: order.amount,
		};

		let result = self.client.create_preorder(&request, cancel).await?;
		if result.pre_order.order_id != order.id {
			return Err(OrderError::OrderIdMismatch {
				requested: order.id,
				confirmed: result.pre_order.order_id,
			});
		}

		let cached = self
			.cache
			.record(&order.id, CacheEntry::Preordered(result))
			.await?;
		tracing::info!(status = %cached.status(), "Order preordered");

		Ok(CreatedOrder {
			order_id: cached.entry.order_id().to_string(),
			amount: cached.entry.amount(),
			status: cached.status(),
		})
	}

	/// Settles a preordered order.
	///
	/// An order already cached as completed succeeds without calling out, and
	/// one cached in another terminal state fails without calling out. A
	/// settlement the service reports as cancelled or failed is cached and
	/// reported as an invalid transition. A settlement still in progress
	/// stays preordered, so the next call sends it again.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn complete_order(&self, order_id: &str, cancel: &CancellationToken) -> Envelope<()> {
		envelope(self.try_complete_order(order_id, cancel).await)
	}

	async fn try_complete_order(
		&self,
		order_id: &str,
		cancel: &CancellationToken,
	) -> Result<(), OrderError> {
		validate_order_id(order_id).map_err(|e| OrderError::Validation(vec![e]))?;

		if let Some(cached) = self.cache.get(order_id).await? {
			let from = cached.status();
			if from == OrderStatus::Completed {
				tracing::info!("Order already completed");
				return Ok(());
			}
			if !from.can_transition_to(OrderStatus::Completed) {
				return Err(OrderError::InvalidTransition {
					order_id: order_id.to_string(),
					from,
				});
			}
		}

		let result = self.client.complete_order(order_id, cancel).await?;
		if result.order.order_id != order_id {
			return Err(OrderError::OrderIdMismatch {
				requested: order_id.to_string(),
				confirmed: result.order.order_id,
			});
		}

		let cached = self
			.cache
			.record(order_id, CacheEntry::Completed(result))
			.await?;
		let status = cached.status();
		if status.is_terminal() && status != OrderStatus::Completed {
			return Err(OrderError::InvalidTransition {
				order_id: order_id.to_string(),
				from: status,
			});
		}
		if status == OrderStatus::Completed {
			tracing::info!("Order completed");
		} else {
			tracing::info!(%status, "Settlement accepted but not yet final");
		}
		Ok(())
	}

	/// Returns one page of the product list.
	#[instrument(skip_all, fields(offset = query.offset, limit = query.limit))]
	pub async fn list_products(
		&self,
		query: ProductQuery,
		cancel: &CancellationToken,
	) -> Envelope<ProductPage> {
		envelope(self.try_list_products(query, cancel).await)
	}

	async fn try_list_products(
		&self,
		query: ProductQuery,
		cancel: &CancellationToken,
	) -> Result<ProductPage, OrderError> {
		if query.offset < 1 {
			return Err(OrderError::InvalidQuery(
				"offset must be at least 1".to_string(),
			));
		}
		if query.limit < 1 || query.limit > MAX_PAGE_SIZE {
			return Err(OrderError::InvalidQuery(format!(
				"limit must be between 1 and {}",
				MAX_PAGE_SIZE
			)));
		}

		let products = self
			.client
			.list_products(cancel)
			.await?
			.ok_or(OrderError::NoResult("product list"))?;
		let total = products.len();
		let items = products
			.0
			.into_iter()
			.skip(query.skip())
			.take(query.limit)
			.collect();

		Ok(ProductPage {
			items,
			offset: query.offset,
			limit: query.limit,
			total,
		})
	}

	/// Returns the current balance snapshot.
	#[instrument(skip_all)]
	pub async fn get_balance(&self, cancel: &CancellationToken) -> Envelope<BalanceSnapshot> {
		let result = match self.client.get_balance(cancel).await {
			Ok(Some(balance)) => Ok(balance),
			Ok(None) => Err(OrderError::NoResult("balance")),
			Err(e) => Err(e.into()),
		};
		envelope(result)
	}

	/// Returns the cached view of an order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn get_order(&self, order_id: &str) -> Envelope<OrderView> {
		envelope(self.try_get_order(order_id).await)
	}

	async fn try_get_order(&self, order_id: &str) -> Result<OrderView, OrderError> {
		validate_order_id(order_id).map_err(|e| OrderError::Validation(vec![e]))?;
		self.cache
			.get(order_id)
			.await?
			.map(|cached| cached.view())
			.ok_or_else(|| OrderError::NotFound(order_id.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gateway_storage::implementations::memory::MemoryStorage;
	use gateway_storage::StorageService;
	use gateway_transport::implementations::scripted::ScriptedTransport;
	use gateway_transport::{
		CircuitBreakerConfig, RetryPolicy, TransportPolicies, TransportService,
	};
	use rust_decimal::Decimal;
	use serde_json::json;
	use std::sync::Arc;
	use std::time::Duration;

	const ORDER_ID: &str = "1112233123";

	fn orchestrator(script: &ScriptedTransport) -> OrderOrchestrator {
		orchestrator_with(
			script,
			TransportPolicies {
				retry: RetryPolicy::none(),
				..TransportPolicies::default()
			},
		)
	}

	fn orchestrator_with(script: &ScriptedTransport, policies: TransportPolicies) -> OrderOrchestrator {
		let transport = TransportService::new(Box::new(script.clone()), policies);
		let storage = StorageService::new(Box::new(MemoryStorage::default()));
		OrderOrchestrator::new(
			BalanceClient::new(Arc::new(transport)),
			OrderStateCache::new(Arc::new(storage)),
		)
	}

	fn balance_json(available: i64, blocked: i64) -> serde_json::Value {
		json!({
			"userId": "u-1",
			"totalBalance": available + blocked,
			"availableBalance": available,
			"blockedBalance": blocked,
			"currency": "USD",
			"lastUpdated": "2025-06-01T10:00:00Z"
		})
	}

	fn preorder_json(order_id: &str, status: &str) -> serde_json::Value {
		json!({"success": true, "message": "Preorder created", "data": {
			"preOrder": {"orderId": order_id, "amount": 100, "status": status,
				"timestamp": "2025-06-01T10:00:00Z"},
			"updatedBalance": balance_json(900, 100)
		}})
	}

	fn completion_json(order_id: &str, status: &str) -> serde_json::Value {
		json!({"success": true, "message": "Order completed", "data": {
			"order": {"orderId": order_id, "amount": 100, "status": status,
				"completedAt": "2025-06-01T10:05:00Z"},
			"updatedBalance": balance_json(900, 0)
		}})
	}

	fn command() -> CreateOrderCommand {
		CreateOrderCommand::new(ORDER_ID, Decimal::from(100))
	}

	#[tokio::test]
	async fn test_create_order_exposes_confirmed_order() {
		let script = ScriptedTransport::new();
		script.respond_json(200, preorder_json(ORDER_ID, "blocked"));
		let orchestrator = orchestrator(&script);

		let envelope = orchestrator
			.create_order(command(), &CancellationToken::new())
			.await;

		assert!(envelope.success);
		assert!(envelope.errors.is_empty());
		let created = envelope.data.unwrap();
		assert_eq!(created.order_id, ORDER_ID);
		assert_eq!(created.amount, Decimal::from(100));
		assert_eq!(created.status, OrderStatus::Preordered);

		let view = orchestrator.get_order(ORDER_ID).await.data.unwrap();
		assert_eq!(view.service_status, "blocked");
		assert_eq!(view.status, OrderStatus::Preordered);
	}

	#[tokio::test]
	async fn test_create_order_null_response_fails() {
		let script = ScriptedTransport::new();
		script.respond(200, "null");
		let orchestrator = orchestrator(&script);

		let envelope = orchestrator
			.create_order(command(), &CancellationToken::new())
			.await;

		assert!(!envelope.success);
		assert!(envelope.data.is_none());
		assert_eq!(envelope.error_kinds(), vec![ErrorKind::InternalInvariant]);
		let missing = orchestrator.get_order(ORDER_ID).await;
		assert_eq!(missing.error_kinds(), vec![ErrorKind::NotFound]);
	}

	#[tokio::test]
	async fn test_invalid_command_never_calls_service() {
		let script = ScriptedTransport::new();
		let orchestrator = orchestrator(&script);

		let envelope = orchestrator
			.create_order(
				CreateOrderCommand::new("not valid!", Decimal::ZERO),
				&CancellationToken::new(),
			)
			.await;

		assert!(!envelope.success);
		assert_eq!(
			envelope.error_kinds(),
			vec![ErrorKind::Validation, ErrorKind::Validation]
		);
		assert_eq!(envelope.status_code(), 400);
		assert_eq!(script.call_count(), 0);
	}

	#[tokio::test]
	async fn test_order_id_mismatch_is_not_cached() {
		let script = ScriptedTransport::new();
		script.respond_json(200, preorder_json("9999999999", "blocked"));
		let orchestrator = orchestrator(&script);

		let envelope = orchestrator
			.create_order(command(), &CancellationToken::new())
			.await;

		assert_eq!(envelope.error_kinds(), vec![ErrorKind::OrderIdMismatch]);
		assert!(orchestrator.cache().get(ORDER_ID).await.unwrap().is_none());
		assert!(orchestrator.cache().get("9999999999").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_service_rejection_surfaces_message() {
		let script = ScriptedTransport::new();
		script.respond(409, r#"{"errorMessage":"Insufficient balance"}"#);
		let orchestrator = orchestrator(&script);

		let envelope = orchestrator
			.create_order(command(), &CancellationToken::new())
			.await;

		assert_eq!(envelope.error_kinds(), vec![ErrorKind::Rejected]);
		assert!(envelope.errors[0].message.contains("Insufficient balance"));
		assert_eq!(envelope.status_code(), 400);
	}

	#[tokio::test]
	async fn test_completion_overwrites_cache_entry() {
		let script = ScriptedTransport::new();
		script
			.respond_json(200, preorder_json(ORDER_ID, "blocked"))
			.respond_json(200, completion_json(ORDER_ID, "completed"));
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		assert!(orchestrator.create_order(command(), &cancel).await.success);
		let envelope = orchestrator.complete_order(ORDER_ID, &cancel).await;

		assert!(envelope.success);
		assert_eq!(envelope.data, Some(()));
		let view = orchestrator.get_order(ORDER_ID).await.data.unwrap();
		assert_eq!(view.status, OrderStatus::Completed);
		assert_eq!(view.service_status, "completed");
		assert_eq!(
			script.calls()[1].body_text().as_deref(),
			Some("\"1112233123\"")
		);
	}

	#[tokio::test]
	async fn test_empty_completion_leaves_cache_untouched() {
		let script = ScriptedTransport::new();
		script
			.respond_json(200, preorder_json(ORDER_ID, "blocked"))
			.respond(200, "");
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		assert!(orchestrator.create_order(command(), &cancel).await.success);
		let before = orchestrator.cache().get(ORDER_ID).await.unwrap();

		let envelope = orchestrator.complete_order(ORDER_ID, &cancel).await;

		assert_eq!(envelope.error_kinds(), vec![ErrorKind::EmptyResponse]);
		let after = orchestrator.cache().get(ORDER_ID).await.unwrap();
		assert_eq!(before, after);
	}

	#[tokio::test]
	async fn test_failed_completion_leaves_cache_untouched() {
		let script = ScriptedTransport::new();
		script
			.respond_json(200, preorder_json(ORDER_ID, "blocked"))
			.respond(400, r#"{"message":"Order not found"}"#);
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		assert!(orchestrator.create_order(command(), &cancel).await.success);
		let envelope = orchestrator.complete_order(ORDER_ID, &cancel).await;

		assert_eq!(envelope.error_kinds(), vec![ErrorKind::Rejected]);
		let view = orchestrator.get_order(ORDER_ID).await.data.unwrap();
		assert_eq!(view.status, OrderStatus::Preordered);
	}

	#[tokio::test]
	async fn test_repeated_completion_skips_service() {
		let script = ScriptedTransport::new();
		script
			.respond_json(200, preorder_json(ORDER_ID, "blocked"))
			.respond_json(200, completion_json(ORDER_ID, "completed"));
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		orchestrator.create_order(command(), &cancel).await;
		assert!(orchestrator.complete_order(ORDER_ID, &cancel).await.success);
		assert!(orchestrator.complete_order(ORDER_ID, &cancel).await.success);
		assert_eq!(script.call_count(), 2);
	}

	#[tokio::test]
	async fn test_cancelled_order_cannot_complete() {
		let script = ScriptedTransport::new();
		script.respond_json(200, completion_json(ORDER_ID, "cancelled"));
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		// The service reports the order cancelled instead of settled
		let envelope = orchestrator.complete_order(ORDER_ID, &cancel).await;
		assert!(!envelope.success);
		assert_eq!(envelope.error_kinds(), vec![ErrorKind::InvalidTransition]);
		let view = orchestrator.get_order(ORDER_ID).await.data.unwrap();
		assert_eq!(view.status, OrderStatus::Cancelled);

		let envelope = orchestrator.complete_order(ORDER_ID, &cancel).await;
		assert_eq!(envelope.error_kinds(), vec![ErrorKind::InvalidTransition]);
		assert_eq!(script.call_count(), 1);
	}

	#[tokio::test]
	async fn test_completion_with_cancellation_time_is_rejected() {
		let script = ScriptedTransport::new();
		script.respond_json(
			200,
			json!({"success": true, "data": {
				"order": {"orderId": ORDER_ID, "amount": 100, "status": "completed",
					"cancelledAt": "2025-06-01T10:05:00Z"},
				"updatedBalance": balance_json(1000, 0)
			}}),
		);
		let orchestrator = orchestrator(&script);

		let envelope = orchestrator
			.complete_order(ORDER_ID, &CancellationToken::new())
			.await;

		assert_eq!(envelope.error_kinds(), vec![ErrorKind::InvalidTransition]);
		assert!(envelope.errors[0].message.contains("Cancelled"));
	}

	#[tokio::test]
	async fn test_unsettled_completion_is_sent_again() {
		let script = ScriptedTransport::new();
		script
			.respond_json(200, preorder_json(ORDER_ID, "blocked"))
			.respond_json(200, completion_json(ORDER_ID, "processing"))
			.respond_json(200, completion_json(ORDER_ID, "completed"));
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		orchestrator.create_order(command(), &cancel).await;
		assert!(orchestrator.complete_order(ORDER_ID, &cancel).await.success);
		let view = orchestrator.get_order(ORDER_ID).await.data.unwrap();
		assert_eq!(view.status, OrderStatus::Preordered);
		assert_eq!(view.service_status, "processing");

		assert!(orchestrator.complete_order(ORDER_ID, &cancel).await.success);
		assert_eq!(script.call_count(), 3);
		let view = orchestrator.get_order(ORDER_ID).await.data.unwrap();
		assert_eq!(view.status, OrderStatus::Completed);
	}

	#[tokio::test]
	async fn test_completion_for_other_order_is_not_cached() {
		let script = ScriptedTransport::new();
		script
			.respond_json(200, preorder_json(ORDER_ID, "blocked"))
			.respond_json(200, completion_json("9999999999", "completed"));
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		orchestrator.create_order(command(), &cancel).await;
		let before = orchestrator.cache().get(ORDER_ID).await.unwrap();

		let envelope = orchestrator.complete_order(ORDER_ID, &cancel).await;

		assert_eq!(envelope.error_kinds(), vec![ErrorKind::OrderIdMismatch]);
		assert_eq!(orchestrator.cache().get(ORDER_ID).await.unwrap(), before);
		assert!(orchestrator.cache().get("9999999999").await.unwrap().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn test_open_circuit_leaves_cache_untouched() {
		let script = ScriptedTransport::new();
		script
			.respond_json(200, preorder_json(ORDER_ID, "blocked"))
			.respond(503, "");
		let policies = TransportPolicies {
			retry: RetryPolicy::none(),
			circuit_breaker: CircuitBreakerConfig {
				failure_threshold: 1,
				open_duration: Duration::from_secs(30),
			},
			..TransportPolicies::default()
		};
		let orchestrator = orchestrator_with(&script, policies);
		let cancel = CancellationToken::new();

		orchestrator.create_order(command(), &cancel).await;
		let before = orchestrator.cache().get(ORDER_ID).await.unwrap();
		let envelope = orchestrator.complete_order(ORDER_ID, &cancel).await;
		assert_eq!(envelope.error_kinds(), vec![ErrorKind::Service]);

		let envelope = orchestrator.complete_order(ORDER_ID, &cancel).await;
		assert_eq!(envelope.error_kinds(), vec![ErrorKind::CircuitOpen]);
		assert_eq!(envelope.status_code(), 503);
		assert_eq!(script.call_count(), 2);
		assert_eq!(orchestrator.cache().get(ORDER_ID).await.unwrap(), before);
	}

	#[tokio::test]
	async fn test_complete_rejects_invalid_id() {
		let script = ScriptedTransport::new();
		let orchestrator = orchestrator(&script);

		let envelope = orchestrator
			.complete_order("", &CancellationToken::new())
			.await;

		assert_eq!(envelope.error_kinds(), vec![ErrorKind::Validation]);
		assert_eq!(envelope.errors[0].message, "OrderId is required.");
		assert_eq!(script.call_count(), 0);
	}

	#[tokio::test]
	async fn test_list_products_pages() {
		let products: Vec<_> = (1..=5)
			.map(|i| json!({"id": format!("p-{i}"), "name": format!("Product {i}"), "price": i}))
			.collect();
		let script = ScriptedTransport::new();
		script.respond_json(200, json!({"success": true, "data": products}));
		let orchestrator = orchestrator(&script);

		let page = orchestrator
			.list_products(ProductQuery { offset: 2, limit: 2 }, &CancellationToken::new())
			.await
			.data
			.unwrap();

		assert_eq!(page.total, 5);
		let ids: Vec<_> = page.items.iter().map(|p| p.id.as_str()).collect();
		assert_eq!(ids, vec!["p-3", "p-4"]);
	}

	#[tokio::test]
	async fn test_list_products_rejects_bad_query() {
		let script = ScriptedTransport::new();
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		for query in [
			ProductQuery { offset: 0, limit: 10 },
			ProductQuery { offset: 1, limit: 0 },
			ProductQuery {
				offset: 1,
				limit: MAX_PAGE_SIZE + 1,
			},
		] {
			let envelope = orchestrator.list_products(query, &cancel).await;
			assert_eq!(envelope.error_kinds(), vec![ErrorKind::Validation]);
		}
		assert_eq!(script.call_count(), 0);
	}

	#[tokio::test]
	async fn test_absent_read_results_fail() {
		let script = ScriptedTransport::new();
		script
			.respond(200, "")
			.respond_json(200, json!({"success": true, "data": null}));
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();

		let products = orchestrator
			.list_products(ProductQuery::default(), &cancel)
			.await;
		assert_eq!(products.error_kinds(), vec![ErrorKind::EmptyResponse]);

		let balance = orchestrator.get_balance(&cancel).await;
		assert!(!balance.success);
		assert!(balance.data.is_none());
	}

	#[tokio::test]
	async fn test_get_balance() {
		let script = ScriptedTransport::new();
		script.respond_json(200, json!({"success": true, "data": balance_json(900, 100)}));
		let orchestrator = orchestrator(&script);

		let balance = orchestrator
			.get_balance(&CancellationToken::new())
			.await
			.data
			.unwrap();

		assert_eq!(balance.total_balance, Decimal::from(1000));
		assert_eq!(balance.currency, "USD");
	}

	#[tokio::test]
	async fn test_cancelled_call_is_not_cached() {
		let script = ScriptedTransport::new();
		script.respond_json(200, preorder_json(ORDER_ID, "blocked"));
		let orchestrator = orchestrator(&script);
		let cancel = CancellationToken::new();
		cancel.cancel();

		let envelope = orchestrator.create_order(command(), &cancel).await;

		assert_eq!(envelope.error_kinds(), vec![ErrorKind::Cancelled]);
		assert_eq!(script.call_count(), 0);
		assert!(orchestrator.cache().get(ORDER_ID).await.unwrap().is_none());
	}
}
