//! Configuration validation.
//!
//! Validates the engine config before a batch runs.

use crate::domain::error::RuletraderError;
use crate::domain::rule_validate::MAX_LOOKBACK_DAYS;
use crate::ports::config_port::ConfigPort;

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    validate_data_path(config)?;
    validate_batch_config(config)
}

/// Everything except `[data]`, for callers that supply the price directory themselves.
pub fn validate_batch_config(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    validate_min_fetch_days(config)?;
    validate_cash(config)?;
    Ok(())
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    match config.get_string("data", "path") {
        None => Err(RuletraderError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
        Some(s) if s.trim().is_empty() => Err(RuletraderError::ConfigInvalid {
            section: "data".to_string(),
            key: "path".to_string(),
            reason: "path must not be empty".to_string(),
        }),
        Some(_) => Ok(()),
    }
}

fn validate_min_fetch_days(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let Some(raw) = config.get_string("batch", "min_fetch_days") else {
        return Ok(());
    };
    let invalid = || RuletraderError::ConfigInvalid {
        section: "batch".to_string(),
        key: "min_fetch_days".to_string(),
        reason: format!("min_fetch_days must be between 1 and {}", MAX_LOOKBACK_DAYS),
    };
    let days: i64 = raw.trim().parse().map_err(|_| invalid())?;
    if days < 1 || days > MAX_LOOKBACK_DAYS as i64 {
        return Err(invalid());
    }
    Ok(())
}

fn validate_cash(config: &dyn ConfigPort) -> Result<(), RuletraderError> {
    let mut keys = config.keys("cash");
    keys.sort();
    for key in keys {
        let value = config
            .get_string("cash", &key)
            .and_then(|s| s.trim().parse::<f64>().ok());
        match value {
            Some(v) if v.is_finite() && v >= 0.0 => {}
            _ => {
                return Err(RuletraderError::ConfigInvalid {
                    section: "cash".to_string(),
                    key,
                    reason: "cash must be a non-negative number".to_string(),
                });
            }
        }
    }
    Ok(())
}
