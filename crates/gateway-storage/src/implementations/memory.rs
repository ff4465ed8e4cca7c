//! In-memory storage backend.
//!
//! Entries live in a sharded [`DashMap`], so writers to different keys never
//! contend and concurrent writes to the same key are last-write-wins. Each
//! entry may carry a deadline; expired entries are invisible to reads and are
//! dropped by [`StorageInterface::cleanup_expired`].

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use dashmap::DashMap;
use gateway_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, StorageKey, ValidationError,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default TTL per namespace, read from `ttl_<namespace>` keys.
///
/// A missing key or a value of 0 means entries never expire.
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	fn from_config(config: &toml::Value) -> Self {
		let ttls = StorageKey::all()
			.filter_map(|key| {
				config
					.get(format!("ttl_{}", key.as_str()))
					.and_then(|v| v.as_integer())
					.filter(|secs| *secs > 0)
					.map(|secs| (key, Duration::from_secs(secs as u64)))
			})
			.collect();
		Self { ttls }
	}

	pub fn with_ttl(mut self, key: StorageKey, ttl: Duration) -> Self {
		self.ttls.insert(key, ttl);
		self
	}

	/// TTL for a raw `namespace:id` key.
	fn ttl_for(&self, key: &str) -> Option<Duration> {
		let namespace = key.split(':').next().unwrap_or_default();
		namespace
			.parse::<StorageKey>()
			.ok()
			.and_then(|sk| self.ttls.get(&sk).copied())
	}
}

struct StoredValue {
	bytes: Vec<u8>,
	expires_at: Option<Instant>,
}

impl StoredValue {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|deadline| deadline <= now)
	}
}

/// In-memory storage implementation.
///
/// Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
	store: DashMap<String, StoredValue>,
	ttl_config: TtlConfig,
}

impl MemoryStorage {
	pub fn new(ttl_config: TtlConfig) -> Self {
		Self {
			store: DashMap::new(),
			ttl_config,
		}
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match self.store.get(key) {
			Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.bytes.clone()),
			_ => Err(StorageError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let ttl = ttl
			.or_else(|| self.ttl_config.ttl_for(key))
			.filter(|ttl| !ttl.is_zero());
		self.store.insert(
			key.to_string(),
			StoredValue {
				bytes: value,
				expires_at: ttl.map(|ttl| Instant::now() + ttl),
			},
		);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self
			.store
			.get(key)
			.is_some_and(|entry| !entry.is_expired(Instant::now())))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let now = Instant::now();
		let before = self.store.len();
		self.store.retain(|_, entry| !entry.is_expired(now));
		let removed = before.saturating_sub(self.store.len());
		if removed > 0 {
			tracing::debug!(removed, "Removed expired cache entries");
		}
		Ok(removed)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let ttl_fields = StorageKey::all()
			.map(|key| {
				Field::new(
					format!("ttl_{}", key.as_str()),
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				)
			})
			.collect();
		Schema::new(vec![], ttl_fields).validate(config)
	}
}

/// Builds a memory storage backend.
///
/// Configuration parameters:
/// - `ttl_orders`: TTL in seconds for cached orders (default: 0, never expire)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new(TtlConfig::from_config(config))))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::default();

		let key = "orders:1";
		let value = b"test_value".to_vec();
		storage.set_bytes(key, value.clone(), None).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), value);
		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());
		assert!(matches!(
			storage.get_bytes(key).await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_overwrite_replaces_value() {
		let storage = MemoryStorage::default();
		storage.set_bytes("orders:1", b"v1".to_vec(), None).await.unwrap();
		storage.set_bytes("orders:1", b"v2".to_vec(), None).await.unwrap();
		assert_eq!(storage.get_bytes("orders:1").await.unwrap(), b"v2".to_vec());
	}

	#[tokio::test(start_paused = true)]
	async fn test_namespace_ttl_expires_entries() {
		let config: toml::Value = toml::from_str("ttl_orders = 60").unwrap();
		let storage = create_storage(&config).unwrap();

		storage.set_bytes("orders:1", b"v".to_vec(), None).await.unwrap();
		storage.set_bytes("other:1", b"v".to_vec(), None).await.unwrap();

		tokio::time::advance(Duration::from_secs(59)).await;
		assert!(storage.exists("orders:1").await.unwrap());

		tokio::time::advance(Duration::from_secs(1)).await;
		assert!(!storage.exists("orders:1").await.unwrap());
		assert!(matches!(
			storage.get_bytes("orders:1").await,
			Err(StorageError::NotFound)
		));
		// No TTL configured for this namespace
		assert!(storage.exists("other:1").await.unwrap());

		assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
		assert_eq!(storage.cleanup_expired().await.unwrap(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_explicit_ttl_overrides_namespace_default() {
		let storage =
			MemoryStorage::new(TtlConfig::default().with_ttl(StorageKey::Orders, Duration::from_secs(600)));
		storage
			.set_bytes("orders:1", b"v".to_vec(), Some(Duration::from_secs(5)))
			.await
			.unwrap();
		tokio::time::advance(Duration::from_secs(5)).await;
		assert!(!storage.exists("orders:1").await.unwrap());
	}

	#[test]
	fn test_schema_rejects_negative_ttl() {
		let config: toml::Value = toml::from_str("ttl_orders = -1").unwrap();
		assert!(MemoryStorageSchema.validate(&config).is_err());
		assert!(matches!(
			create_storage(&config),
			Err(StorageError::Configuration(_))
		));
	}
}
