use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::DispatchPolicy;
use crate::models::delivery::Delivery;
use crate::models::pool::PoolEntry;
use crate::models::settlement::{SettlementRecord, SettlementReason};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EarningsQuote {
    pub earnings: i64,
    pub collateral_hold: i64,
}

pub fn compute_earnings(distance_km: f64, fee: i64, policy: &DispatchPolicy) -> i64 {
    let fee_share = fee * i64::from(policy.courier_share_bp) / 10_000;
    let distance_pay = (distance_km * policy.per_km_rate as f64).round() as i64;
    fee_share + distance_pay
}

/// Quoted at claim time and stored on the delivery, so the courier sees the
/// payout before committing. Premium entries carry a collateral hold.
pub fn quote(entry: &PoolEntry, policy: &DispatchPolicy) -> EarningsQuote {
    let collateral_hold = if entry.is_premium(policy) {
        policy.premium_collateral_hold
    } else {
        0
    };

    EarningsQuote {
        earnings: compute_earnings(entry.distance_km, entry.fee, policy),
        collateral_hold,
    }
}

pub fn freeze_hold(state: &AppState, courier_id: Uuid, amount: i64, now: DateTime<Utc>) {
    if amount <= 0 {
        return;
    }
    match state.couriers.get_mut(&courier_id) {
        Some(mut courier) => {
            courier.collateral_frozen += amount;
            courier.updated_at = now;
        }
        None => warn!(courier_id = %courier_id, "collateral hold against unknown courier"),
    }
}

/// Exactly once per delivery: the first caller writes the record and
/// releases the hold, later callers get the stored record back.
pub fn finalize(
    state: &AppState,
    delivery: &Delivery,
    reason: SettlementReason,
    now: DateTime<Utc>,
) -> SettlementRecord {
    match state.settlements.entry(delivery.id) {
        Entry::Occupied(existing) => existing.get().clone(),
        Entry::Vacant(slot) => {
            let collateral_released = release_hold(state, delivery, now);
            let earnings = match reason {
                SettlementReason::Completed => delivery.earnings,
                SettlementReason::Cancelled => 0,
            };

            let record = SettlementRecord {
                delivery_id: delivery.id,
                order_id: delivery.order_id,
                courier_id: delivery.courier_id,
                earnings,
                collateral_released,
                reason,
                settled_at: now,
            };
            slot.insert(record.clone());
            record
        }
    }
}

fn release_hold(state: &AppState, delivery: &Delivery, now: DateTime<Utc>) -> i64 {
    if delivery.collateral_hold <= 0 {
        return 0;
    }
    match state.couriers.get_mut(&delivery.courier_id) {
        Some(mut courier) => {
            let released = delivery.collateral_hold.min(courier.collateral_frozen);
            courier.collateral_frozen -= released;
            courier.updated_at = now;
            released
        }
        None => {
            warn!(courier_id = %delivery.courier_id, "releasing hold for unknown courier");
            0
        }
    }
}
