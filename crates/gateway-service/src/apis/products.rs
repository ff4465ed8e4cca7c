//! Product listing endpoint.

use super::{with_deadline, ApiResponse};
use crate::server::AppState;
use axum::extract::{Query, State};
use gateway_types::ProductQuery;

/// Handles GET /api/v1/products?offset=&limit=.
pub async fn list_products(
	State(state): State<AppState>,
	Query(query): Query<ProductQuery>,
) -> ApiResponse {
	let orchestrator = state.orchestrator.clone();
	with_deadline(&state, |cancel| async move {
		orchestrator.list_products(query, &cancel).await
	})
	.await
}
