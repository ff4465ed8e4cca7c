//! Core engine of the payment gateway.
//!
//! Wires the balance client, the resilient transport and the order state
//! cache into an [`OrderOrchestrator`], and owns the background task that
//! evicts expired cache entries.

use gateway_config::Config;
use gateway_storage::StorageService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod builder;
pub mod orchestrator;
pub mod state;

pub use builder::{BuilderError, GatewayBuilder, GatewayFactories};
pub use orchestrator::{OrderError, OrderOrchestrator};
pub use state::{CacheEntry, CachedOrder, OrderStateCache};

/// An assembled gateway.
pub struct Gateway {
	config: Config,
	orchestrator: Arc<OrderOrchestrator>,
	storage: Arc<StorageService>,
}

impl Gateway {
	pub fn new(
		config: Config,
		orchestrator: Arc<OrderOrchestrator>,
		storage: Arc<StorageService>,
	) -> Self {
		Self {
			config,
			orchestrator,
			storage,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn orchestrator(&self) -> Arc<OrderOrchestrator> {
		self.orchestrator.clone()
	}

	/// Spawns the periodic cache cleanup until `shutdown` is cancelled.
	pub fn spawn_cleanup(&self, shutdown: CancellationToken) -> JoinHandle<()> {
		let storage = self.storage.clone();
		let period = Duration::from_secs(self.config.storage.cleanup_interval_seconds);
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			loop {
				tokio::select! {
					_ = shutdown.cancelled() => break,
					_ = interval.tick() => {},
				}
				match storage.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!("Storage cleanup: removed {} expired entries", count);
					},
					Err(e) => {
						tracing::warn!("Storage cleanup failed: {}", e);
					},
					_ => {},
				}
			}
			tracing::debug!("Storage cleanup stopped");
		})
	}
}
