use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::GeoPoint;
use crate::models::merchant::{Merchant, MerchantStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/merchants", post(create_merchant).get(list_merchants))
        .route("/merchants/:id/status", patch(update_status))
}

#[derive(Deserialize)]
pub struct CreateMerchantRequest {
    pub name: String,
    pub region: u32,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateMerchantStatusRequest {
    pub status: MerchantStatus,
}

async fn create_merchant(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMerchantRequest>,
) -> Result<Json<Merchant>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if !payload.location.is_valid() {
        return Err(AppError::Validation("location is invalid".to_string()));
    }

    let merchant = Merchant {
        id: Uuid::new_v4(),
        name: payload.name,
        region: payload.region,
        status: MerchantStatus::Open,
        location: payload.location,
    };

    state.merchants.insert(merchant.id, merchant.clone());
    Ok(Json(merchant))
}

async fn list_merchants(State(state): State<Arc<AppState>>) -> Json<Vec<Merchant>> {
    let merchants = state
        .merchants
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(merchants)
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMerchantStatusRequest>,
) -> Result<Json<Merchant>, AppError> {
    let mut merchant = state
        .merchants
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("merchant {id} not found")))?;

    merchant.status = payload.status;
    Ok(Json(merchant.clone()))
}
