use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
    Banned,
}

/// Read-only snapshot of a courier as seen by the dispatch engine. The
/// courier's own lifecycle is owned elsewhere; only the frozen-collateral
/// figure is mutated here, by settlement holds and releases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub online: bool,
    pub account_status: AccountStatus,
    pub region: Option<u32>,
    pub location: GeoPoint,
    pub collateral_total: i64,
    pub collateral_frozen: i64,
    pub premium_score: u32,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    pub fn available_collateral(&self) -> i64 {
        self.collateral_total - self.collateral_frozen
    }
}
