//! Wire schema of the balance management service.
//!
//! Monetary values are fixed-point decimals exchanged as JSON numbers and
//! timestamps are timezone-aware ISO-8601 strings. Members the service omits
//! decode to their defaults, so partially populated payloads still parse.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level body returned by every balance service endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
	#[serde(default)]
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub data: Option<T>,
}

/// A product offered by the balance service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
	pub id: String,
	pub name: String,
	pub description: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub price: Decimal,
	pub currency: String,
	pub category: String,
	pub stock: i64,
}

/// Full product catalogue as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductList(pub Vec<Product>);

impl ProductList {
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// One page of the product catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
	pub items: Vec<Product>,
	pub offset: usize,
	pub limit: usize,
	pub total: usize,
}

/// Point-in-time read of a user's funds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceSnapshot {
	pub user_id: String,
	/// Available plus blocked funds.
	#[serde(with = "rust_decimal::serde::float")]
	pub total_balance: Decimal,
	#[serde(with = "rust_decimal::serde::float")]
	pub available_balance: Decimal,
	/// Funds held by preorders.
	#[serde(with = "rust_decimal::serde::float")]
	pub blocked_balance: Decimal,
	pub currency: String,
	pub last_updated: Option<DateTime<FixedOffset>>,
}

/// Body posted to the preorder endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreorderRequest {
	pub order_id: String,
	#[serde(with = "exact_number")]
	pub amount: Decimal,
}

/// Decimal written as a JSON number with every digit kept.
mod exact_number {
	use rust_decimal::Decimal;
	use serde::{ser::Error, Deserializer, Serialize, Serializer};
	use serde_json::value::RawValue;

	pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
		RawValue::from_string(value.to_string())
			.map_err(S::Error::custom)?
			.serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
		rust_decimal::serde::float::deserialize(deserializer)
	}
}

/// The block recorded by the service for a preorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreOrder {
	pub order_id: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub amount: Decimal,
	pub timestamp: Option<DateTime<FixedOffset>>,
	pub status: String,
}

/// Server-confirmed funds block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreorderResult {
	pub pre_order: PreOrder,
	pub updated_balance: BalanceSnapshot,
}

/// Order record returned by the completion endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderRecord {
	pub order_id: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub amount: Decimal,
	pub timestamp: Option<DateTime<FixedOffset>>,
	pub status: String,
	pub completed_at: Option<DateTime<FixedOffset>>,
	pub cancelled_at: Option<DateTime<FixedOffset>>,
}

/// Server-confirmed settlement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionResult {
	pub order: OrderRecord,
	pub updated_balance: BalanceSnapshot,
}
