//! Order state cache.
//!
//! Records the last result the balance service confirmed for each order id.
//! Entries are replaced wholesale on every successful transition and are never
//! written for failed calls.

use chrono::{DateTime, Utc};
use gateway_storage::{StorageError, StorageService};
use gateway_types::{
	CompletionResult, LogEvent, LogType, OrderStatus, OrderView, PreorderResult, StorageKey,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Last confirmed service result for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "camelCase")]
pub enum CacheEntry {
	Preordered(PreorderResult),
	Completed(CompletionResult),
}

impl CacheEntry {
	pub fn order_id(&self) -> &str {
		match self {
			CacheEntry::Preordered(r) => &r.pre_order.order_id,
			CacheEntry::Completed(r) => &r.order.order_id,
		}
	}

	pub fn amount(&self) -> Decimal {
		match self {
			CacheEntry::Preordered(r) => r.pre_order.amount,
			CacheEntry::Completed(r) => r.order.amount,
		}
	}

	/// Status string as reported by the service.
	pub fn service_status(&self) -> &str {
		match self {
			CacheEntry::Preordered(r) => &r.pre_order.status,
			CacheEntry::Completed(r) => &r.order.status,
		}
	}

	/// Lifecycle status implied by the entry.
	///
	/// A preorder entry is `Preordered` unless the service reported otherwise;
	/// a completion entry with a cancellation timestamp is `Cancelled`.
	pub fn status(&self) -> OrderStatus {
		match self {
			CacheEntry::Preordered(r) => match OrderStatus::from_service_status(&r.pre_order.status) {
				OrderStatus::Completed => OrderStatus::Preordered,
				other => other,
			},
			CacheEntry::Completed(r) if r.order.cancelled_at.is_some() => OrderStatus::Cancelled,
			CacheEntry::Completed(r) => OrderStatus::from_service_status(&r.order.status),
		}
	}
}

/// A cache entry with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedOrder {
	pub entry: CacheEntry,
	pub updated_at: DateTime<Utc>,
}

impl CachedOrder {
	pub fn status(&self) -> OrderStatus {
		self.entry.status()
	}

	pub fn view(&self) -> OrderView {
		OrderView {
			order_id: self.entry.order_id().to_string(),
			amount: self.entry.amount(),
			status: self.status(),
			service_status: self.entry.service_status().to_string(),
			updated_at: self.updated_at,
		}
	}
}

/// Process-wide cache of confirmed order results.
pub struct OrderStateCache {
	storage: Arc<StorageService>,
}

impl OrderStateCache {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn get(&self, order_id: &str) -> Result<Option<CachedOrder>, StorageError> {
		let cached = self
			.storage
			.find::<CachedOrder>(StorageKey::Orders.as_str(), order_id)
			.await?;
		LogEvent::new(LogType::Cache, "GET", order_id)
			.with_status(if cached.is_some() { 200 } else { 404 })
			.emit();
		Ok(cached)
	}

	/// Overwrites the entry for `order_id`.
	pub async fn record(
		&self,
		order_id: &str,
		entry: CacheEntry,
	) -> Result<CachedOrder, StorageError> {
		let cached = CachedOrder {
			entry,
			updated_at: Utc::now(),
		};
		self.storage
			.store(StorageKey::Orders.as_str(), order_id, &cached)
			.await?;
		LogEvent::new(LogType::Cache, "SET", order_id)
			.with_status(200)
			.emit();
		Ok(cached)
	}

	/// Drops expired entries and returns how many were removed.
	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.storage.cleanup_expired().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gateway_storage::implementations::memory::MemoryStorage;
	use gateway_types::{OrderRecord, PreOrder};

	fn cache() -> OrderStateCache {
		OrderStateCache::new(Arc::new(StorageService::new(Box::new(
			MemoryStorage::default(),
		))))
	}

	fn preordered(id: &str) -> CacheEntry {
		CacheEntry::Preordered(PreorderResult {
			pre_order: PreOrder {
				order_id: id.into(),
				amount: Decimal::from(100),
				status: "blocked".into(),
				..PreOrder::default()
			},
			..PreorderResult::default()
		})
	}

	fn completed(id: &str, status: &str) -> CacheEntry {
		CacheEntry::Completed(CompletionResult {
			order: OrderRecord {
				order_id: id.into(),
				amount: Decimal::from(100),
				status: status.into(),
				..OrderRecord::default()
			},
			..CompletionResult::default()
		})
	}

	#[test]
	fn test_entry_status() {
		assert_eq!(preordered("A").status(), OrderStatus::Preordered);
		assert_eq!(completed("A", "completed").status(), OrderStatus::Completed);
		assert_eq!(completed("A", "cancelled").status(), OrderStatus::Cancelled);
		assert_eq!(completed("A", "processing").status(), OrderStatus::Preordered);

		let mut cancelled = completed("A", "completed");
		if let CacheEntry::Completed(r) = &mut cancelled {
			r.order.cancelled_at = Some(chrono::Utc::now().fixed_offset());
		}
		assert_eq!(cancelled.status(), OrderStatus::Cancelled);
	}

	#[tokio::test]
	async fn test_record_overwrites() {
		let cache = cache();
		assert!(cache.get("A-1").await.unwrap().is_none());

		cache.record("A-1", preordered("A-1")).await.unwrap();
		let first = cache.get("A-1").await.unwrap().unwrap();
		assert_eq!(first.status(), OrderStatus::Preordered);

		cache
			.record("A-1", completed("A-1", "completed"))
			.await
			.unwrap();
		let second = cache.get("A-1").await.unwrap().unwrap();
		assert_eq!(second.status(), OrderStatus::Completed);
		assert!(second.updated_at >= first.updated_at);

		let view = second.view();
		assert_eq!(view.order_id, "A-1");
		assert_eq!(view.amount, Decimal::from(100));
		assert_eq!(view.service_status, "completed");
	}
}
