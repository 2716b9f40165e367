//! Configuration validation.
//!
//! Validates all config fields before any data is read.

use chrono::NaiveDateTime;

use crate::domain::date_range::decode_range;
use crate::domain::error::TraderError;
use crate::domain::trade::ProfitMode;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(
    config: &dyn ConfigPort,
    now: NaiveDateTime,
) -> Result<(), TraderError> {
    validate_paths(config)?;
    validate_profit_mode(config)?;
    validate_pips(config, "take_profit_pips")?;
    validate_pips(config, "stop_loss_pips")?;
    validate_rolling_column(config)?;
    validate_dates(config, now)?;
    Ok(())
}

fn validate_paths(config: &dyn ConfigPort) -> Result<(), TraderError> {
    config.require_string("data", "path")?;
    config.require_string("strategy", "path")?;
    Ok(())
}

fn validate_profit_mode(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if let Some(mode) = config.get_string("backtest", "profit_mode") {
        mode.parse::<ProfitMode>()
            .map_err(|e| TraderError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "profit_mode".to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

fn validate_pips(config: &dyn ConfigPort, key: &str) -> Result<(), TraderError> {
    let value = config.get_double("backtest", key, 30.0);
    if !value.is_finite() || value < 0.0 {
        return Err(TraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: key.to_string(),
            reason: format!("{} must be a non-negative number", key),
        });
    }
    Ok(())
}

fn validate_rolling_column(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_string("backtest", "rolling_column") {
        Some(s) if s.trim().is_empty() => Err(TraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "rolling_column".to_string(),
            reason: "rolling_column must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_dates(config: &dyn ConfigPort, now: NaiveDateTime) -> Result<(), TraderError> {
    let start = config.get_string("backtest", "start").unwrap_or_default();
    let end = config.get_string("backtest", "end").unwrap_or_default();
    decode_range(&start, &end, now).map_err(|e| TraderError::ConfigInvalid {
        section: "backtest".to_string(),
        key: "start/end".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}
