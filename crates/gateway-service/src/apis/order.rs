//! Order endpoints.

use super::{with_deadline, ApiResponse};
use crate::server::AppState;
use axum::extract::{Json, Path, State};
use gateway_types::CreateOrderCommand;

/// Handles POST /api/v1/orders/create.
pub async fn create_order(
	State(state): State<AppState>,
	Json(command): Json<CreateOrderCommand>,
) -> ApiResponse {
	let orchestrator = state.orchestrator.clone();
	with_deadline(&state, |cancel| async move {
		orchestrator.create_order(command, &cancel).await
	})
	.await
}

/// Handles POST /api/v1/orders/{id}/complete.
pub async fn complete_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
	let orchestrator = state.orchestrator.clone();
	with_deadline(&state, |cancel| async move {
		orchestrator.complete_order(&id, &cancel).await
	})
	.await
}

/// Handles GET /api/v1/orders/{id}.
///
/// Answers from the order state cache only.
pub async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
	state.orchestrator.get_order(&id).await.into()
}
