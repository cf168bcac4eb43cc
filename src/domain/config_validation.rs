//! Run configuration validation.
//!
//! Checks the `[simulation]` section before anything is loaded and turns it
//! into a typed [`RunConfig`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::domain::date_range;
use crate::domain::error::SimError;
use crate::ports::config_port::ConfigPort;

pub const SECTION: &str = "simulation";

/// Interval of the candle files the aggregation works from.
pub const BASE_INTERVAL_MINUTES: u32 = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub strategy: PathBuf,
    pub candles: PathBuf,
    pub output: Option<PathBuf>,
    /// Overrides the strategy's `taxa` variable.
    pub fee: Option<f64>,
    pub aggregate_minutes: Option<u32>,
    /// First candle open time to keep, epoch ms.
    pub from: Option<i64>,
    /// Last candle open time to keep, epoch ms.
    pub to: Option<i64>,
}

/// Relative dates (`-7d`, `today`) resolve against `now`.
pub fn validate_run_config(
    config: &dyn ConfigPort,
    now: DateTime<Utc>,
) -> Result<RunConfig, SimError> {
    let strategy = required_path(config, "strategy")?;
    let candles = required_path(config, "candles")?;
    let output = optional(config, "output").map(PathBuf::from);

    let fee = match optional(config, "fee") {
        None => None,
        Some(raw) => Some(validate_fee(&raw)?),
    };

    let aggregate_minutes = match optional(config, "aggregate_minutes") {
        None => None,
        Some(raw) => Some(validate_aggregate(&raw)?),
    };

    let from = match optional(config, "from") {
        None => None,
        Some(raw) => Some(validate_date("from", &raw, now)?),
    };
    let to = match optional(config, "to") {
        None => None,
        Some(raw) => Some(validate_date("to", &raw, now)?),
    };
    validate_range(from, to)?;

    Ok(RunConfig {
        strategy,
        candles,
        output,
        fee,
        aggregate_minutes,
        from,
        to,
    })
}

/// Parse a fee rate. A trailing `%` divides by 100 and a decimal comma is
/// accepted, so `"0,1%"`, `"0.1%"` and `"0.001"` are the same rate.
pub fn parse_fee_rate(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (number, scale) = match trimmed.strip_suffix('%') {
        Some(pct) => (pct.trim(), 100.0),
        None => (trimmed, 1.0),
    };
    let rate = number.replace(',', ".").parse::<f64>().ok()? / scale;
    rate.is_finite().then_some(rate)
}

pub fn validate_fee(raw: &str) -> Result<f64, SimError> {
    match parse_fee_rate(raw) {
        Some(rate) if (0.0..1.0).contains(&rate) => Ok(rate),
        Some(_) => Err(invalid("fee", "fee must be between 0 and 100%")),
        None => Err(invalid("fee", &format!("'{}' is not a fee rate", raw))),
    }
}

pub fn validate_aggregate(raw: &str) -> Result<u32, SimError> {
    let minutes = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| invalid("aggregate_minutes", "aggregate_minutes must be a whole number"))?;
    if minutes < BASE_INTERVAL_MINUTES || minutes % BASE_INTERVAL_MINUTES != 0 {
        return Err(invalid(
            "aggregate_minutes",
            &format!("aggregate_minutes must be a multiple of {}", BASE_INTERVAL_MINUTES),
        ));
    }
    Ok(minutes)
}

/// A period bound as epoch ms.
pub fn validate_date(key: &str, raw: &str, now: DateTime<Utc>) -> Result<i64, SimError> {
    date_range::parse_flexible_date(raw, now)
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| invalid(key, &format!("'{}' is not a date", raw.trim())))
}

pub fn validate_range(from: Option<i64>, to: Option<i64>) -> Result<(), SimError> {
    match (from, to) {
        (Some(start), Some(end)) if end <= start => {
            Err(invalid("to", "end of period must be after its start"))
        }
        _ => Ok(()),
    }
}

fn required_path(config: &dyn ConfigPort, key: &str) -> Result<PathBuf, SimError> {
    optional(config, key)
        .map(PathBuf::from)
        .ok_or_else(|| SimError::ConfigMissing {
            section: SECTION.to_string(),
            key: key.to_string(),
        })
}

fn optional(config: &dyn ConfigPort, key: &str) -> Option<String> {
    config
        .get_string(SECTION, key)
        .filter(|s| !s.trim().is_empty())
}

fn invalid(key: &str, reason: &str) -> SimError {
    SimError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
