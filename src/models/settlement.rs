use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SettlementReason {
    Completed,
    Cancelled,
}

/// Written exactly once per delivery, at the `Delivered` transition or on
/// cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub delivery_id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub earnings: i64,
    pub collateral_released: i64,
    pub reason: SettlementReason,
    pub settled_at: DateTime<Utc>,
}
