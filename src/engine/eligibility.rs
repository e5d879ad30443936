use serde::Serialize;
use thiserror::Error;

use crate::config::DispatchPolicy;
use crate::models::courier::{AccountStatus, Courier};
use crate::models::merchant::Merchant;
use crate::models::pool::PoolEntry;

#[derive(Debug, Clone, Error, Serialize, PartialEq)]
pub enum DenyReason {
    #[error("courier is offline")]
    Offline,

    #[error("courier account is not active")]
    AccountNotActive,

    #[error("courier has no assigned region")]
    NoRegionAssigned,

    #[error("courier region {courier_region} does not match merchant region {merchant_region}")]
    RegionMismatch {
        courier_region: u32,
        merchant_region: u32,
    },

    #[error("available collateral {available} is below the {required} minimum")]
    InsufficientCollateral { available: i64, required: i64 },

    #[error("premium score {score} is below the {required} minimum")]
    PremiumScoreTooLow { score: u32, required: u32 },

    #[error("courier already has {active} active deliveries (limit {limit})")]
    TooManyActiveDeliveries { active: u32, limit: u32 },
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::Offline => "offline",
            DenyReason::AccountNotActive => "account_not_active",
            DenyReason::NoRegionAssigned => "no_region_assigned",
            DenyReason::RegionMismatch { .. } => "region_mismatch",
            DenyReason::InsufficientCollateral { .. } => "insufficient_collateral",
            DenyReason::PremiumScoreTooLow { .. } => "premium_score_too_low",
            DenyReason::TooManyActiveDeliveries { .. } => "too_many_active_deliveries",
        }
    }
}

/// Standing-and-status preconditions shared by candidate listing and the
/// claim path.
pub fn check_standing(courier: &Courier) -> Result<(), DenyReason> {
    if !courier.online {
        return Err(DenyReason::Offline);
    }
    if courier.account_status != AccountStatus::Active {
        return Err(DenyReason::AccountNotActive);
    }
    Ok(())
}

/// Pure admission decision over current snapshots. Rules short-circuit in a
/// fixed order so the surfaced reason is stable under concurrent retries.
/// Re-run at claim time: courier state can change between listing and claim.
pub fn check_eligibility(
    courier: &Courier,
    merchant: &Merchant,
    entry: &PoolEntry,
    active_deliveries: u32,
    policy: &DispatchPolicy,
) -> Result<(), DenyReason> {
    check_standing(courier)?;

    let courier_region = courier.region.ok_or(DenyReason::NoRegionAssigned)?;
    if courier_region != merchant.region {
        return Err(DenyReason::RegionMismatch {
            courier_region,
            merchant_region: merchant.region,
        });
    }

    let available = courier.available_collateral();
    if available < policy.min_collateral {
        return Err(DenyReason::InsufficientCollateral {
            available,
            required: policy.min_collateral,
        });
    }

    if entry.is_premium(policy) && courier.premium_score < policy.premium_score_min {
        return Err(DenyReason::PremiumScoreTooLow {
            score: courier.premium_score,
            required: policy.premium_score_min,
        });
    }

    if active_deliveries >= policy.max_active_deliveries {
        return Err(DenyReason::TooManyActiveDeliveries {
            active: active_deliveries,
            limit: policy.max_active_deliveries,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{check_eligibility, check_standing, DenyReason};
    use crate::config::DispatchPolicy;
    use crate::models::courier::{AccountStatus, Courier, GeoPoint};
    use crate::models::merchant::{Merchant, MerchantStatus};
    use crate::models::pool::PoolEntry;

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

    fn courier() -> Courier {
        Courier {
            id: Uuid::new_v4(),
            name: "test-courier".to_string(),
            online: true,
            account_status: AccountStatus::Active,
            region: Some(1),
            location: GeoPoint { lat: 1.30, lng: 103.85 },
            collateral_total: 30_000,
            collateral_frozen: 0,
            premium_score: 0,
            updated_at: Utc::now(),
        }
    }

    fn merchant(region: u32) -> Merchant {
        Merchant {
            id: Uuid::new_v4(),
            name: "test-merchant".to_string(),
            region,
            status: MerchantStatus::Open,
            location: GeoPoint { lat: 1.30, lng: 103.85 },
        }
    }

    fn entry(fee: i64) -> PoolEntry {
        let now = Utc::now();
        PoolEntry {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            merchant_id: Uuid::new_v4(),
            region: 1,
            pickup: GeoPoint { lat: 1.30, lng: 103.85 },
            dropoff: GeoPoint { lat: 1.32, lng: 103.87 },
            distance_km: 3.1,
            fee,
            priority: 0,
            created_at: now,
            pickup_deadline: now + Duration::minutes(30),
            expires_at: now + Duration::minutes(15),
        }
    }

    #[test]
    fn active_courier_with_ordinary_entry_is_admitted() {
        let result = check_eligibility(&courier(), &merchant(1), &entry(500), 0, &policy());
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn offline_is_denied_before_everything_else() {
        let mut c = courier();
        c.online = false;
        c.region = None;
        c.collateral_total = 0;
        let result = check_eligibility(&c, &merchant(1), &entry(500), 0, &policy());
        assert_eq!(result, Err(DenyReason::Offline));
    }

    #[test]
    fn suspended_account_is_denied() {
        let mut c = courier();
        c.account_status = AccountStatus::Suspended;
        assert_eq!(check_standing(&c), Err(DenyReason::AccountNotActive));
    }

    #[test]
    fn missing_region_is_distinct_from_region_mismatch() {
        let mut c = courier();
        c.region = None;
        let result = check_eligibility(&c, &merchant(1), &entry(500), 0, &policy());
        assert_eq!(result, Err(DenyReason::NoRegionAssigned));

        let mut c = courier();
        c.region = Some(2);
        let result = check_eligibility(&c, &merchant(1), &entry(500), 0, &policy());
        assert_eq!(
            result,
            Err(DenyReason::RegionMismatch {
                courier_region: 2,
                merchant_region: 1,
            })
        );
    }

    #[test]
    fn frozen_collateral_counts_against_the_minimum() {
        let mut c = courier();
        c.collateral_total = 12_000;
        c.collateral_frozen = 5_000;
        let result = check_eligibility(&c, &merchant(1), &entry(500), 0, &policy());
        assert_eq!(
            result,
            Err(DenyReason::InsufficientCollateral {
                available: 7_000,
                required: 10_000,
            })
        );
    }

    #[test]
    fn collateral_is_checked_before_premium_score() {
        let mut c = courier();
        c.collateral_total = 1_000;
        c.premium_score = 0;
        let result = check_eligibility(&c, &merchant(1), &entry(5_000), 0, &policy());
        assert_eq!(
            result,
            Err(DenyReason::InsufficientCollateral {
                available: 1_000,
                required: 10_000,
            })
        );
    }

    #[test]
    fn low_score_courier_is_denied_premium_but_not_ordinary_entries() {
        let mut c = courier();
        c.premium_score = 10;
        let p = policy();

        let result = check_eligibility(&c, &merchant(1), &entry(5_000), 0, &p);
        assert_eq!(
            result,
            Err(DenyReason::PremiumScoreTooLow {
                score: 10,
                required: 80,
            })
        );

        assert_eq!(check_eligibility(&c, &merchant(1), &entry(500), 0, &p), Ok(()));
    }

    #[test]
    fn active_delivery_cap_is_enforced() {
        let result = check_eligibility(&courier(), &merchant(1), &entry(500), 3, &policy());
        assert_eq!(
            result,
            Err(DenyReason::TooManyActiveDeliveries { active: 3, limit: 3 })
        );
    }
}
