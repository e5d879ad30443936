use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::eligibility::check_eligibility;
use crate::engine::{pool, settlement};
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::courier::GeoPoint;
use crate::models::delivery::Delivery;
use crate::notify::DeliveryEvent;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GrabRequest {
    pub courier_id: Uuid,
    pub order_id: Uuid,
    pub location: GeoPoint,
}

pub fn grab(state: &AppState, req: GrabRequest, now: DateTime<Utc>) -> Result<Delivery, AppError> {
    let start = Instant::now();
    let result = resolve(state, req, now);

    let outcome = match &result {
        Ok(_) => "success",
        Err(err) => err.code(),
    };
    state
        .metrics
        .grab_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state.metrics.grabs_total.with_label_values(&[outcome]).inc();

    result
}

fn resolve(state: &AppState, req: GrabRequest, now: DateTime<Utc>) -> Result<Delivery, AppError> {
    if !req.location.is_valid() {
        return Err(AppError::Validation("courier coordinates are invalid".to_string()));
    }

    let courier = state
        .couriers
        .get(&req.courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {} not found", req.courier_id)))?
        .value()
        .clone();

    // Snapshot, then release the read guard before any conditional removal
    // on the same key.
    let snapshot = state
        .pool
        .get(&req.order_id)
        .map(|entry| entry.value().clone());
    let entry = match snapshot {
        Some(entry) if !entry.is_expired(now) => entry,
        Some(_) => {
            pool::drop_if_expired(state, req.order_id, now);
            return Err(AppError::NotFound(format!(
                "order {} is no longer offered",
                req.order_id
            )));
        }
        None => return Err(lost_race_error(state, req.order_id)),
    };

    // Admission re-runs here against current state: what was listed a moment
    // ago may no longer be claimable.
    let merchant = state
        .merchants
        .get(&entry.merchant_id)
        .ok_or_else(|| AppError::Internal(format!("merchant {} missing", entry.merchant_id)))?
        .value()
        .clone();
    let policy = state.policy();
    let active = state.active_deliveries(courier.id).len() as u32;
    check_eligibility(&courier, &merchant, &entry, active, &policy)?;

    if state.deliveries_by_order.contains_key(&req.order_id) {
        return Err(AppError::AlreadyGrabbed(req.order_id));
    }

    // Winner selection: the conditional removal admits exactly one of any
    // number of concurrent racers.
    let Some(entry) = pool::claim_entry(state, req.order_id, now) else {
        return Err(lost_race_error(state, req.order_id));
    };

    let quote = settlement::quote(&entry, &policy);
    let delivery = Delivery::assigned(&entry, courier.id, quote, now);

    state.deliveries_by_order.insert(entry.order_id, delivery.id);
    state.deliveries.insert(delivery.id, delivery.clone());
    settlement::freeze_hold(state, courier.id, quote.collateral_hold, now);

    info!(
        order_id = %delivery.order_id,
        delivery_id = %delivery.id,
        courier_id = %courier.id,
        earnings = delivery.earnings,
        pickup_km = haversine_km(&req.location, &delivery.pickup),
        "delivery grabbed"
    );
    state
        .notifier
        .notify(DeliveryEvent::from_delivery(&delivery, now));

    Ok(delivery)
}

/// A missing pool entry means either another courier won the race or the
/// order was never (or is no longer) offered.
fn lost_race_error(state: &AppState, order_id: Uuid) -> AppError {
    if state.deliveries_by_order.contains_key(&order_id) {
        AppError::AlreadyGrabbed(order_id)
    } else {
        AppError::NotFound(format!("order {order_id} is not offered"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{grab, GrabRequest};
    use crate::config::DispatchPolicy;
    use crate::engine::eligibility::DenyReason;
    use crate::engine::pool::{offer, OfferRequest};
    use crate::error::AppError;
    use crate::models::courier::{AccountStatus, Courier, GeoPoint};
    use crate::models::delivery::DeliveryStatus;
    use crate::models::merchant::{Merchant, MerchantStatus};
    use crate::state::AppState;

    fn policy() -> DispatchPolicy {
        DispatchPolicy {
            min_collateral: 10_000,
            premium_fee_threshold: 2_000,
            premium_score_min: 80,
            premium_collateral_hold: 5_000,
            max_active_deliveries: 3,
            fallback_radius_km: None,
            courier_share_bp: 8_000,
            per_km_rate: 60,
            pool_entry_ttl_secs: 900,
        }
    }

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(policy(), 16))
    }

    fn seed_merchant(state: &AppState, region: u32) -> Merchant {
        let merchant = Merchant {
            id: Uuid::new_v4(),
            name: "test-merchant".to_string(),
            region,
            status: MerchantStatus::Open,
            location: GeoPoint { lat: 1.30, lng: 103.85 },
        };
        state.merchants.insert(merchant.id, merchant.clone());
        merchant
    }

    fn seed_courier(state: &AppState, region: Option<u32>, collateral: i64) -> Courier {
        let courier = Courier {
            id: Uuid::new_v4(),
            name: "test-courier".to_string(),
            online: true,
            account_status: AccountStatus::Active,
            region,
            location: GeoPoint { lat: 1.30, lng: 103.85 },
            collateral_total: collateral,
            collateral_frozen: 0,
            premium_score: 0,
            updated_at: Utc::now(),
        };
        state.couriers.insert(courier.id, courier.clone());
        courier
    }

    fn seed_offer(state: &AppState, merchant_id: Uuid, fee: i64) -> Uuid {
        let req = OfferRequest {
            order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            merchant_id,
            dropoff: GeoPoint { lat: 1.33, lng: 103.88 },
            fee,
            priority: 0,
            pickup_deadline: None,
            expires_at: None,
        };
        offer(state, req, Utc::now()).unwrap().order_id
    }

    fn grab_req(courier: &Courier, order_id: Uuid) -> GrabRequest {
        GrabRequest {
            courier_id: courier.id,
            order_id,
            location: courier.location,
        }
    }

    #[test]
    fn winner_gets_an_assigned_delivery() {
        let state = state();
        let merchant = seed_merchant(&state, 1);
        let courier = seed_courier(&state, Some(1), 30_000);
        let order_id = seed_offer(&state, merchant.id, 500);

        let delivery = grab(&state, grab_req(&courier, order_id), Utc::now()).unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Assigned);
        assert_eq!(delivery.courier_id, courier.id);
        assert_eq!(delivery.order_id, order_id);
        assert!(delivery.earnings > 0);
        assert!(state.pool.is_empty());
    }

    #[test]
    fn second_grab_for_the_same_order_is_already_grabbed() {
        let state = state();
        let merchant = seed_merchant(&state, 1);
        let first = seed_courier(&state, Some(1), 30_000);
        let second = seed_courier(&state, Some(1), 30_000);
        let order_id = seed_offer(&state, merchant.id, 500);

        grab(&state, grab_req(&first, order_id), Utc::now()).unwrap();
        let result = grab(&state, grab_req(&second, order_id), Utc::now());
        assert!(matches!(result, Err(AppError::AlreadyGrabbed(_))));
    }

    #[test]
    fn unknown_order_is_not_found() {
        let state = state();
        let courier = seed_courier(&state, Some(1), 30_000);
        let result = grab(&state, grab_req(&courier, Uuid::new_v4()), Utc::now());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn expired_entry_fails_not_found_and_is_dropped() {
        let state = state();
        let merchant = seed_merchant(&state, 1);
        let courier = seed_courier(&state, Some(1), 30_000);

        let now = Utc::now();
        let req = OfferRequest {
            order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            merchant_id: merchant.id,
            dropoff: GeoPoint { lat: 1.33, lng: 103.88 },
            fee: 500,
            priority: 0,
            pickup_deadline: None,
            expires_at: Some(now + Duration::milliseconds(10)),
        };
        let order_id = offer(&state, req, now).unwrap().order_id;

        let later = now + Duration::seconds(1);
        let result = grab(&state, grab_req(&courier, order_id), later);
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(state.pool.is_empty());
    }

    #[test]
    fn eligibility_is_rechecked_at_claim_time() {
        let state = state();
        let merchant = seed_merchant(&state, 1);
        let courier = seed_courier(&state, Some(1), 30_000);
        let order_id = seed_offer(&state, merchant.id, 500);

        // listed fine, but collateral drops before the claim lands
        state.couriers.get_mut(&courier.id).unwrap().collateral_total = 1_000;

        let result = grab(&state, grab_req(&courier, order_id), Utc::now());
        assert!(matches!(
            result,
            Err(AppError::EligibilityDenied(
                DenyReason::InsufficientCollateral { .. }
            ))
        ));
        assert!(state.deliveries.is_empty());
        assert_eq!(state.pool.len(), 1);
    }

    #[test]
    fn region_mismatch_creates_no_delivery() {
        let state = state();
        let merchant = seed_merchant(&state, 1);
        let courier = seed_courier(&state, Some(2), 30_000);
        let order_id = seed_offer(&state, merchant.id, 500);

        let result = grab(&state, grab_req(&courier, order_id), Utc::now());
        assert!(matches!(
            result,
            Err(AppError::EligibilityDenied(DenyReason::RegionMismatch { .. }))
        ));
        assert!(state.deliveries.is_empty());
    }

    #[test]
    fn premium_grab_freezes_the_collateral_hold() {
        let state = state();
        let merchant = seed_merchant(&state, 1);
        let mut courier = seed_courier(&state, Some(1), 30_000);
        courier.premium_score = 90;
        state.couriers.insert(courier.id, courier.clone());
        let order_id = seed_offer(&state, merchant.id, 5_000);

        let delivery = grab(&state, grab_req(&courier, order_id), Utc::now()).unwrap();
        assert_eq!(delivery.collateral_hold, 5_000);
        assert_eq!(
            state.couriers.get(&courier.id).unwrap().collateral_frozen,
            5_000
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_grabs_have_exactly_one_winner() {
        let state = state();
        let merchant = seed_merchant(&state, 1);
        let order_id = seed_offer(&state, merchant.id, 500);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let state = state.clone();
            let courier = seed_courier(&state, Some(1), 30_000);
            handles.push(tokio::spawn(async move {
                grab(&state, grab_req(&courier, order_id), Utc::now())
            }));
        }

        let mut wins = 0;
        let mut losses = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(delivery) => {
                    assert_eq!(delivery.status, DeliveryStatus::Assigned);
                    wins += 1;
                }
                Err(AppError::AlreadyGrabbed(_)) | Err(AppError::NotFound(_)) => losses += 1,
                Err(other) => panic!("unexpected grab error: {other}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(losses, 31);
        assert_eq!(state.deliveries.len(), 1);
        assert_eq!(state.deliveries_by_order.len(), 1);
    }
}
