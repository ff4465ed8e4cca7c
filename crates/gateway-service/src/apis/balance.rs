//! Balance endpoint.

use super::{with_deadline, ApiResponse};
use crate::server::AppState;
use axum::extract::State;

/// Handles GET /api/v1/balance.
pub async fn get_balance(State(state): State<AppState>) -> ApiResponse {
	let orchestrator = state.orchestrator.clone();
	with_deadline(&state, |cancel| async move { orchestrator.get_balance(&cancel).await }).await
}
