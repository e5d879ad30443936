use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::eligibility::check_standing;
use crate::engine::settlement;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::courier::GeoPoint;
use crate::models::merchant::MerchantStatus;
use crate::models::pool::PoolEntry;
use crate::state::AppState;

const DEFAULT_PICKUP_WINDOW_MINS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub dropoff: GeoPoint,
    pub fee: i64,
    #[serde(default)]
    pub priority: i32,
    pub pickup_deadline: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub entry: PoolEntry,
    pub distance_to_pickup_km: f64,
    pub earnings_estimate: i64,
}

/// Puts a payment-confirmed order up for grabs. Pickup is the merchant's
/// location; the entry inherits the merchant's region for matching.
pub fn offer(state: &AppState, req: OfferRequest, now: DateTime<Utc>) -> Result<PoolEntry, AppError> {
    if !req.dropoff.is_valid() {
        return Err(AppError::Validation("dropoff coordinates are invalid".to_string()));
    }
    if req.fee <= 0 {
        return Err(AppError::Validation("fee must be > 0".to_string()));
    }
    if let Some(expires_at) = req.expires_at {
        if expires_at <= now {
            return Err(AppError::Validation("expires_at must be in the future".to_string()));
        }
    }

    let merchant = state
        .merchants
        .get(&req.merchant_id)
        .ok_or_else(|| AppError::NotFound(format!("merchant {} not found", req.merchant_id)))?
        .value()
        .clone();
    if merchant.status != MerchantStatus::Open {
        return Err(AppError::Conflict(format!("merchant {} is closed", merchant.id)));
    }

    if state.deliveries_by_order.contains_key(&req.order_id) {
        return Err(AppError::Conflict(format!(
            "order {} already has a delivery",
            req.order_id
        )));
    }

    let policy = state.policy();
    let pickup = merchant.location;
    let entry = PoolEntry {
        id: Uuid::new_v4(),
        order_id: req.order_id,
        customer_id: req.customer_id,
        merchant_id: merchant.id,
        region: merchant.region,
        pickup,
        dropoff: req.dropoff,
        distance_km: haversine_km(&pickup, &req.dropoff),
        fee: req.fee,
        priority: req.priority,
        created_at: now,
        pickup_deadline: req
            .pickup_deadline
            .unwrap_or(now + Duration::minutes(DEFAULT_PICKUP_WINDOW_MINS)),
        expires_at: req
            .expires_at
            .unwrap_or(now + Duration::seconds(policy.pool_entry_ttl_secs)),
    };

    match state.pool.entry(req.order_id) {
        dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::Conflict(format!(
            "order {} is already offered",
            req.order_id
        ))),
        dashmap::mapref::entry::Entry::Vacant(slot) => {
            slot.insert(entry.clone());
            state.metrics.pool_entries.set(state.pool.len() as i64);
            info!(order_id = %entry.order_id, region = entry.region, fee = entry.fee, "order offered for dispatch");
            Ok(entry)
        }
    }
}

/// Side-effect-free ranked read of the pool for one courier. Expired entries
/// are skipped lazily; nothing is removed here.
pub fn list_candidates(
    state: &AppState,
    courier_id: Uuid,
    location: GeoPoint,
    now: DateTime<Utc>,
) -> Result<Vec<Candidate>, AppError> {
    if !location.is_valid() {
        return Err(AppError::Validation("courier coordinates are invalid".to_string()));
    }

    let courier = state
        .couriers
        .get(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?
        .value()
        .clone();
    check_standing(&courier)?;

    let policy = state.policy();
    let mut candidates: Vec<Candidate> = state
        .pool
        .iter()
        .filter(|entry| !entry.is_expired(now))
        .filter_map(|entry| {
            let distance_to_pickup_km = haversine_km(&location, &entry.pickup);
            let in_region = courier.region == Some(entry.region);
            let in_fallback = policy
                .fallback_radius_km
                .is_some_and(|radius| distance_to_pickup_km <= radius);

            if !(in_region || in_fallback) {
                return None;
            }

            Some(Candidate {
                earnings_estimate: settlement::quote(&entry, &policy).earnings,
                entry: entry.value().clone(),
                distance_to_pickup_km,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.entry
            .priority
            .cmp(&a.entry.priority)
            .then_with(|| a.distance_to_pickup_km.total_cmp(&b.distance_to_pickup_km))
            .then_with(|| a.entry.created_at.cmp(&b.entry.created_at))
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });

    Ok(candidates)
}

/// Consumes the entry iff it is still offered and unexpired. The conditional
/// removal is atomic per order, which makes it the grab coordinator's
/// single winner-selection point.
pub fn claim_entry(state: &AppState, order_id: Uuid, now: DateTime<Utc>) -> Option<PoolEntry> {
    let claimed = state
        .pool
        .remove_if(&order_id, |_, entry| !entry.is_expired(now))
        .map(|(_, entry)| entry);
    state.metrics.pool_entries.set(state.pool.len() as i64);
    claimed
}

pub fn drop_if_expired(state: &AppState, order_id: Uuid, now: DateTime<Utc>) -> bool {
    let dropped = state
        .pool
        .remove_if(&order_id, |_, entry| entry.is_expired(now))
        .is_some();
    if dropped {
        state.metrics.pool_entries.set(state.pool.len() as i64);
    }
    dropped
}

pub fn sweep_expired(state: &AppState, now: DateTime<Utc>) -> usize {
    let before = state.pool.len();
    state.pool.retain(|_, entry| !entry.is_expired(now));
    let removed = before.saturating_sub(state.pool.len());
    state.metrics.pool_entries.set(state.pool.len() as i64);
    removed
}

/// Hygiene only: expiry is already enforced at read and claim time.
pub async fn run_pool_sweeper(state: Arc<AppState>, interval: std::time::Duration) {
    info!("pool sweeper started");
    loop {
        sleep(interval).await;
        let removed = sweep_expired(&state, Utc::now());
        if removed > 0 {
            debug!(removed, "dropped expired pool entries");
        }
    }
}
