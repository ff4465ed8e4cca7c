//! Storage module for the payment gateway.
//!
//! Provides the keyed store behind the order state cache. Backends implement
//! [`StorageInterface`] over raw bytes; [`StorageService`] layers typed,
//! namespaced JSON access on top.

use async_trait::async_trait;
use gateway_types::{ConfigSchema, ErrorKind, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl StorageError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			StorageError::NotFound => ErrorKind::NotFound,
			_ => ErrorKind::Storage,
		}
	}
}

/// Low-level interface for storage backends.
///
/// Plain key-value operations over bytes with optional per-entry TTL.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes with optional time-to-live.
	///
	/// `None` applies the backend's configured TTL for the key's namespace.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries and returns how many were removed.
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0)
	}
}

/// Factory function building a storage backend from its TOML table.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Returns (name, factory) pairs for every storage implementation.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::memory;

	vec![(memory::Registry::NAME, memory::Registry::factory())]
}

/// Typed access to a storage backend.
///
/// Values are stored as JSON under a `namespace:id` key.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

fn storage_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a value, replacing any previous value under the same key.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&storage_key(namespace, id), bytes, ttl)
			.await
	}

	/// Stores a value with the backend's default TTL for the namespace.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(namespace, id, data, None).await
	}

	/// Retrieves and deserializes a value.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&storage_key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Like [`retrieve`](Self::retrieve), with a missing key mapped to `None`.
	pub async fn find<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&storage_key(namespace, id)).await
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&storage_key(namespace, id)).await
	}

	/// Removes expired entries from storage.
	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Entry {
		order_id: String,
		status: String,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::default()))
	}

	#[tokio::test]
	async fn test_typed_round_trip_under_namespace() {
		let storage = service();
		let entry = Entry {
			order_id: "A-1".into(),
			status: "blocked".into(),
		};
		storage.store("orders", "A-1", &entry).await.unwrap();

		assert!(storage.exists("orders", "A-1").await.unwrap());
		assert!(!storage.exists("other", "A-1").await.unwrap());
		let back: Entry = storage.retrieve("orders", "A-1").await.unwrap();
		assert_eq!(back, entry);
	}

	#[tokio::test]
	async fn test_find_maps_missing_to_none() {
		let storage = service();
		let missing: Option<Entry> = storage.find("orders", "nope").await.unwrap();
		assert!(missing.is_none());
		assert_eq!(StorageError::NotFound.kind(), ErrorKind::NotFound);
	}

	#[tokio::test]
	async fn test_mismatched_type_is_serialization_error() {
		let storage = service();
		storage.store("orders", "X", &42u32).await.unwrap();
		let result: Result<Entry, _> = storage.retrieve("orders", "X").await;
		let err = result.unwrap_err();
		assert!(matches!(err, StorageError::Serialization(_)));
		assert_eq!(err.kind(), ErrorKind::Storage);
	}
}
