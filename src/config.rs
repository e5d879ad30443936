use std::env;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub pool_sweep_interval_secs: u64,
    pub policy: DispatchPolicy,
}

/// Admission and settlement knobs, loaded once at startup and swapped as a
/// whole via the policy reload endpoint. Handlers read a snapshot per
/// request; nothing consults the environment after boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchPolicy {
    pub min_collateral: i64,
    pub premium_fee_threshold: i64,
    pub premium_score_min: u32,
    pub premium_collateral_hold: i64,
    pub max_active_deliveries: u32,
    pub fallback_radius_km: Option<f64>,
    pub courier_share_bp: u32,
    pub per_km_rate: i64,
    pub pool_entry_ttl_secs: i64,
}

impl DispatchPolicy {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.courier_share_bp > 10_000 {
            return Err(AppError::Validation(
                "courier_share_bp must be <= 10000".to_string(),
            ));
        }
        if self.min_collateral < 0 || self.premium_fee_threshold < 0 {
            return Err(AppError::Validation(
                "collateral and fee thresholds must be >= 0".to_string(),
            ));
        }
        if self.premium_collateral_hold < 0 || self.per_km_rate < 0 {
            return Err(AppError::Validation(
                "premium_collateral_hold and per_km_rate must be >= 0".to_string(),
            ));
        }
        if self.max_active_deliveries == 0 {
            return Err(AppError::Validation(
                "max_active_deliveries must be > 0".to_string(),
            ));
        }
        if self.pool_entry_ttl_secs <= 0 {
            return Err(AppError::Validation(
                "pool_entry_ttl_secs must be > 0".to_string(),
            ));
        }
        if let Some(radius) = self.fallback_radius_km {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(AppError::Validation(
                    "fallback_radius_km must be a positive number".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let policy = DispatchPolicy {
            min_collateral: parse_or_default("MIN_COLLATERAL", 10_000)?,
            premium_fee_threshold: parse_or_default("PREMIUM_FEE_THRESHOLD", 2_000)?,
            premium_score_min: parse_or_default("PREMIUM_SCORE_MIN", 80)?,
            premium_collateral_hold: parse_or_default("PREMIUM_COLLATERAL_HOLD", 5_000)?,
            max_active_deliveries: parse_or_default("MAX_ACTIVE_DELIVERIES", 3)?,
            fallback_radius_km: parse_optional("FALLBACK_RADIUS_KM")?,
            courier_share_bp: parse_or_default("COURIER_SHARE_BP", 8_000)?,
            per_km_rate: parse_or_default("PER_KM_RATE", 60)?,
            pool_entry_ttl_secs: parse_or_default("POOL_ENTRY_TTL_SECS", 900)?,
        };
        policy.validate()?;

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            pool_sweep_interval_secs: parse_or_default("POOL_SWEEP_INTERVAL_SECS", 30)?,
            policy,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}
