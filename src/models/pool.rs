use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DispatchPolicy;
use crate::models::courier::GeoPoint;

/// A claimable unit of work: one paid order waiting for a courier. Created
/// once per order, consumed exactly once by a successful grab or dropped on
/// expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub region: u32,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub distance_km: f64,
    pub fee: i64,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub pickup_deadline: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PoolEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_premium(&self, policy: &DispatchPolicy) -> bool {
        self.fee >= policy.premium_fee_threshold
    }
}
