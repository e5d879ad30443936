use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::grab::{grab, GrabRequest};
use crate::engine::lifecycle;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::settlement::SettlementRecord;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries/grab", post(grab_delivery))
        .route("/deliveries/:id", get(get_delivery))
        .route("/deliveries/:id/settlement", get(get_settlement))
        .route("/deliveries/:id/arrive", post(arrive))
        .route("/deliveries/:id/pickup", post(pickup))
        .route("/deliveries/:id/depart", post(depart))
        .route("/deliveries/:id/complete", post(complete))
        .route("/deliveries/:id/cancel", post(cancel))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub courier_id: Uuid,
}

async fn grab_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GrabRequest>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = grab(&state, payload, Utc::now())?;
    Ok(Json(delivery))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = state
        .deliveries
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;
    Ok(Json(delivery.value().clone()))
}

async fn get_settlement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SettlementRecord>, AppError> {
    let record = state
        .settlements
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} has no settlement")))?;
    Ok(Json(record.value().clone()))
}

async fn arrive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Delivery>, AppError> {
    advance(&state, id, payload.courier_id, DeliveryStatus::Picking)
}

async fn pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Delivery>, AppError> {
    advance(&state, id, payload.courier_id, DeliveryStatus::Picked)
}

async fn depart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Delivery>, AppError> {
    advance(&state, id, payload.courier_id, DeliveryStatus::Delivering)
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Delivery>, AppError> {
    advance(&state, id, payload.courier_id, DeliveryStatus::Delivered)
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = lifecycle::cancel(&state, id, Utc::now())?;
    Ok(Json(delivery))
}

fn advance(
    state: &AppState,
    delivery_id: Uuid,
    courier_id: Uuid,
    target: DeliveryStatus,
) -> Result<Json<Delivery>, AppError> {
    let delivery = lifecycle::advance(state, delivery_id, courier_id, target, Utc::now())?;
    Ok(Json(delivery))
}
