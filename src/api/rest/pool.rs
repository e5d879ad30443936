use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::pool::{list_candidates, offer, Candidate, OfferRequest};
use crate::error::AppError;
use crate::models::courier::GeoPoint;
use crate::models::pool::PoolEntry;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pool", post(offer_order))
        .route("/pool/recommended", get(recommended))
}

async fn offer_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OfferRequest>,
) -> Result<Json<PoolEntry>, AppError> {
    let entry = offer(&state, payload, Utc::now())?;
    Ok(Json(entry))
}

#[derive(Deserialize)]
pub struct RecommendedParams {
    pub courier_id: Uuid,
    pub lat: f64,
    pub lng: f64,
}

async fn recommended(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecommendedParams>,
) -> Result<Json<Vec<Candidate>>, AppError> {
    let location = GeoPoint {
        lat: params.lat,
        lng: params.lng,
    };
    let candidates = list_candidates(&state, params.courier_id, location, Utc::now())?;
    Ok(Json(candidates))
}
