use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{AccountStatus, Courier, GeoPoint};
use crate::models::delivery::Delivery;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id/status", patch(update_status))
        .route("/couriers/:id/location", patch(update_location))
        .route("/couriers/:id/collateral", patch(update_collateral))
        .route("/couriers/:id/deliveries/active", get(active_deliveries))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub region: Option<u32>,
    pub location: GeoPoint,
    pub collateral_total: i64,
    #[serde(default)]
    pub premium_score: u32,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub online: Option<bool>,
    pub account_status: Option<AccountStatus>,
    pub region: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateCollateralRequest {
    pub collateral_total: i64,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if !payload.location.is_valid() {
        return Err(AppError::Validation("location is invalid".to_string()));
    }
    if payload.collateral_total < 0 {
        return Err(AppError::Validation(
            "collateral_total must be >= 0".to_string(),
        ));
    }

    let courier = Courier {
        id: Uuid::new_v4(),
        name: payload.name,
        online: true,
        account_status: AccountStatus::Active,
        region: payload.region,
        location: payload.location,
        collateral_total: payload.collateral_total,
        collateral_frozen: 0,
        premium_score: payload.premium_score,
        updated_at: Utc::now(),
    };

    state.couriers.insert(courier.id, courier.clone());
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(couriers)
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Courier>, AppError> {
    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    if let Some(online) = payload.online {
        courier.online = online;
    }
    if let Some(account_status) = payload.account_status {
        courier.account_status = account_status;
    }
    if let Some(region) = payload.region {
        courier.region = Some(region);
    }
    courier.updated_at = Utc::now();

    Ok(Json(courier.clone()))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    if !payload.location.is_valid() {
        return Err(AppError::Validation("location is invalid".to_string()));
    }

    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    courier.location = payload.location;
    courier.updated_at = Utc::now();

    Ok(Json(courier.clone()))
}

async fn update_collateral(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCollateralRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.collateral_total < 0 {
        return Err(AppError::Validation(
            "collateral_total must be >= 0".to_string(),
        ));
    }

    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    courier.collateral_total = payload.collateral_total;
    courier.updated_at = Utc::now();

    Ok(Json(courier.clone()))
}

async fn active_deliveries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    if !state.couriers.contains_key(&id) {
        return Err(AppError::NotFound(format!("courier {id} not found")));
    }
    Ok(Json(state.active_deliveries(id)))
}
