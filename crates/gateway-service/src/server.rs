//! HTTP server for the gateway API.
//!
//! Routes are versioned under `/api/v1`. Every handler runs the orchestrator
//! with a cancellation token tied to service shutdown and to the configured
//! request timeout.

use axum::{
	extract::{DefaultBodyLimit, Request},
	http::{HeaderName, HeaderValue, Method},
	middleware::{self, Next},
	response::{Json, Response},
	routing::{get, post},
	Router,
};
use gateway_config::{ApiConfig, CorsConfig};
use gateway_core::OrderOrchestrator;
use gateway_types::{LogEvent, LogType};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::apis;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub orchestrator: Arc<OrderOrchestrator>,
	/// Cancelled when the service shuts down.
	pub shutdown: CancellationToken,
	/// Budget of one API request.
	pub request_timeout: Duration,
}

/// Builds the API router.
pub fn router(state: AppState, api_config: &ApiConfig) -> Router {
	let v1 = Router::new()
		.route("/orders/create", post(apis::order::create_order))
		.route("/orders/{id}/complete", post(apis::order::complete_order))
		.route("/orders/{id}", get(apis::order::get_order))
		.route("/products", get(apis::products::list_products))
		.route("/balance", get(apis::balance::get_balance));

	Router::new()
		.nest("/api/v1", v1)
		.route("/health", get(health))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(middleware::from_fn(log_exchange))
				.layer(cors_layer(api_config.cors.as_ref()))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Starts the HTTP server and serves until `shutdown` is cancelled.
pub async fn start_server(
	api_config: ApiConfig,
	orchestrator: Arc<OrderOrchestrator>,
	shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
	let state = AppState {
		orchestrator,
		shutdown: shutdown.clone(),
		request_timeout: Duration::from_secs(api_config.timeout_seconds),
	};
	let app = router(state, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Gateway API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown.cancelled_owned())
		.await?;

	Ok(())
}

async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

/// Emits one structured record per inbound exchange.
async fn log_exchange(request: Request, next: Next) -> Response {
	let method = request.method().to_string();
	let path = request.uri().path().to_string();
	let started = Instant::now();

	let response = next.run(request).await;

	LogEvent::new(LogType::HttpRequestResponse, method, path)
		.with_status(response.status().as_u16())
		.with_elapsed(started.elapsed())
		.emit();
	response
}

/// CORS from configuration; permissive when none is configured.
fn cors_layer(config: Option<&CorsConfig>) -> CorsLayer {
	let Some(config) = config else {
		return CorsLayer::permissive();
	};

	let origin = if config.allowed_origins.iter().any(|o| o == "*") {
		AllowOrigin::any()
	} else {
		AllowOrigin::list(
			config
				.allowed_origins
				.iter()
				.filter_map(|o| parse_or_warn("origin", o, HeaderValue::from_str(o).ok())),
		)
	};
	let methods: Vec<Method> = config
		.allowed_methods
		.iter()
		.filter_map(|m| parse_or_warn("method", m, m.parse().ok()))
		.collect();
	let headers: Vec<HeaderName> = config
		.allowed_headers
		.iter()
		.filter_map(|h| parse_or_warn("header", h, h.parse().ok()))
		.collect();

	CorsLayer::new()
		.allow_origin(origin)
		.allow_methods(methods)
		.allow_headers(headers)
}

fn parse_or_warn<T>(what: &str, raw: &str, parsed: Option<T>) -> Option<T> {
	if parsed.is_none() {
		tracing::warn!("Ignoring invalid CORS {}: {}", what, raw);
	}
	parsed
}
