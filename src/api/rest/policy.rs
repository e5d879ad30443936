use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;
use tracing::info;

use crate::config::DispatchPolicy;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/policy", get(get_policy).put(put_policy))
}

async fn get_policy(State(state): State<Arc<AppState>>) -> Json<DispatchPolicy> {
    Json(state.policy().as_ref().clone())
}

/// Controlled reload: the whole policy document is validated and swapped
/// atomically; in-flight requests finish against the snapshot they took.
async fn put_policy(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DispatchPolicy>,
) -> Result<Json<DispatchPolicy>, AppError> {
    payload.validate()?;
    state.set_policy(payload.clone());
    info!(min_collateral = payload.min_collateral, "dispatch policy reloaded");
    Ok(Json(payload))
}
