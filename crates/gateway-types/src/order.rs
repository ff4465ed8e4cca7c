//! Order processing types for the payment gateway.
//!
//! An order is identified by a caller-supplied id and moves through
//! `Requested -> Preordered -> Completed`, with `Failed` and `Cancelled` as the
//! other terminal states. Transitions only follow a confirmed response from the
//! balance service.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

static ORDER_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[A-Za-z0-9\-]+$").expect("order id pattern is a valid regex")
});

/// Rejection reasons for an inbound command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
	#[error("OrderId is required.")]
	MissingOrderId,
	#[error("OrderId must be alphanumeric.")]
	InvalidOrderId,
	#[error("Amount must be greater than zero.")]
	NonPositiveAmount,
}

/// Checks an order id against the allowed character set.
pub fn validate_order_id(order_id: &str) -> Result<(), CommandError> {
	if order_id.is_empty() {
		return Err(CommandError::MissingOrderId);
	}
	if !ORDER_ID_PATTERN.is_match(order_id) {
		return Err(CommandError::InvalidOrderId);
	}
	Ok(())
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
	/// Accepted by the gateway, not yet confirmed by the service.
	Requested,
	/// Funds blocked by the service.
	Preordered,
	/// Funds settled by the service.
	Completed,
	/// A call to the service failed.
	Failed,
	/// Cancelled on the service side.
	Cancelled,
}

impl OrderStatus {
	/// Checks whether moving from `self` to `to` is a legal transition.
	pub fn can_transition_to(&self, to: OrderStatus) -> bool {
		use OrderStatus::*;
		matches!(
			(self, to),
			(Requested, Preordered)
				| (Requested, Failed)
				| (Preordered, Completed)
				| (Preordered, Failed)
				| (Preordered, Cancelled)
		)
	}

	/// Returns true when no further transition is possible.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Cancelled
		)
	}

	/// Interprets the free-form status string reported by the service.
	///
	/// Only an explicit settlement reads as `Completed`. Statuses the gateway
	/// does not recognise, such as `processing`, leave the order preordered so
	/// that a later completion is sent again.
	pub fn from_service_status(status: &str) -> Self {
		match status.trim().to_ascii_lowercase().as_str() {
			"completed" | "complete" | "settled" => OrderStatus::Completed,
			"cancelled" | "canceled" => OrderStatus::Cancelled,
			"failed" => OrderStatus::Failed,
			_ => OrderStatus::Preordered,
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Requested => write!(f, "Requested"),
			OrderStatus::Preordered => write!(f, "Preordered"),
			OrderStatus::Completed => write!(f, "Completed"),
			OrderStatus::Failed => write!(f, "Failed"),
			OrderStatus::Cancelled => write!(f, "Cancelled"),
		}
	}
}

/// An order accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	pub id: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub amount: Decimal,
	pub status: OrderStatus,
}

/// Inbound request to create an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderCommand {
	#[serde(default)]
	pub order_id: String,
	#[serde(default, with = "rust_decimal::serde::float")]
	pub amount: Decimal,
}

impl CreateOrderCommand {
	pub fn new(order_id: impl Into<String>, amount: Decimal) -> Self {
		Self {
			order_id: order_id.into(),
			amount,
		}
	}

	/// Collects every rule the command breaks.
	pub fn validate(&self) -> Result<(), Vec<CommandError>> {
		let mut errors = Vec::new();
		if self.amount <= Decimal::ZERO {
			errors.push(CommandError::NonPositiveAmount);
		}
		if let Err(e) = validate_order_id(&self.order_id) {
			errors.push(e);
		}
		if errors.is_empty() {
			Ok(())
		} else {
			Err(errors)
		}
	}

	/// Validates the command and turns it into a `Requested` order.
	pub fn into_order(self) -> Result<Order, Vec<CommandError>> {
		self.validate()?;
		Ok(Order {
			id: self.order_id,
			amount: self.amount,
			status: OrderStatus::Requested,
		})
	}
}

/// Data returned by a successful create-order call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
	/// Order id confirmed by the balance service.
	pub order_id: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub amount: Decimal,
	pub status: OrderStatus,
}

/// Cached view of an order, as exposed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
	pub order_id: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub amount: Decimal,
	pub status: OrderStatus,
	/// Status string last reported by the service.
	pub service_status: String,
	pub updated_at: DateTime<Utc>,
}
