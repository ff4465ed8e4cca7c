//! Main entry point for the payment gateway service.
//!
//! Loads the configuration, builds storage and transport backends from their
//! factory maps, starts the cache cleanup task and serves the HTTP API until
//! interrupted.

use clap::{Parser, ValueEnum};
use gateway_config::Config;
use gateway_core::{Gateway, GatewayBuilder, GatewayFactories};
use gateway_storage::StorageFactory;
use gateway_transport::TransportFactory;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

mod apis;
mod server;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
	Text,
	Json,
}

/// Command-line arguments for the gateway service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/gateway.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Log output format
	#[arg(long, value_enum, default_value_t = LogFormat::Text)]
	log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	match args.log_format {
		LogFormat::Text => fmt()
			.with_env_filter(env_filter)
			.with_thread_ids(true)
			.with_target(true)
			.init(),
		LogFormat::Json => fmt()
			.json()
			.with_env_filter(env_filter)
			.with_current_span(true)
			.init(),
	}

	tracing::info!("Started gateway");

	let config_path = args.config.to_string_lossy();
	let config = Config::from_file(&config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.gateway.id);

	let gateway = build_gateway(config)?;
	let shutdown = CancellationToken::new();
	let cleanup = gateway.spawn_cleanup(shutdown.clone());

	let signal = shutdown.clone();
	tokio::spawn(async move {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("Failed to listen for shutdown signal: {}", e);
		}
		tracing::info!("Shutdown requested");
		signal.cancel();
	});

	match gateway.config().api.clone().filter(|api| api.enabled) {
		Some(api_config) => {
			server::start_server(api_config, gateway.orchestrator(), shutdown.clone()).await?;
		},
		None => {
			tracing::warn!("API server disabled; running cache maintenance only");
			shutdown.cancelled().await;
		},
	}

	shutdown.cancel();
	cleanup.await?;
	tracing::info!("Stopped gateway");
	Ok(())
}

/// Builds the gateway with every registered implementation.
fn build_gateway(config: Config) -> Result<Gateway, Box<dyn std::error::Error>> {
	let storage_factories: HashMap<String, StorageFactory> = gateway_storage::get_all_implementations()
		.into_iter()
		.map(|(name, factory)| (name.to_string(), factory))
		.collect();
	let transport_factories: HashMap<String, TransportFactory> = gateway_transport::get_all_implementations()
		.into_iter()
		.map(|(name, factory)| (name.to_string(), factory))
		.collect();

	let factories = GatewayFactories {
		storage_factories,
		transport_factories,
	};
	Ok(GatewayBuilder::new(config).build(factories)?)
}
