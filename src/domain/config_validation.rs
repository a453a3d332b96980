//! Configuration validation.
//!
//! Validates all config fields before any price data is loaded.

use crate::domain::error::LongshortError;
use crate::domain::strategy::KNOWN_STRATEGIES;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const PERIOD_SECTION_PREFIX: &str = "period.";
pub const DEFAULT_STRATEGIES: &str = "momentum,value";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), LongshortError> {
    validate_weight_bounds(config)?;
    validate_top_n(config)?;
    validate_risk_free_rate(config)?;
    validate_strategies(config)?;
    for section in period_sections(config) {
        validate_period(config, &section)?;
    }
    Ok(())
}

/// `[period.*]` section names, sorted.
pub fn period_sections(config: &dyn ConfigPort) -> Vec<String> {
    let mut sections: Vec<String> = config
        .sections()
        .into_iter()
        .filter(|s| s.starts_with(PERIOD_SECTION_PREFIX))
        .collect();
    sections.sort();
    sections
}

/// Configured strategy names, lowercased, in configuration order.
pub fn strategy_names(config: &dyn ConfigPort) -> Vec<String> {
    config
        .get_string("backtest", "strategies")
        .unwrap_or_else(|| DEFAULT_STRATEGIES.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> LongshortError {
    LongshortError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_weight_bounds(config: &dyn ConfigPort) -> Result<(), LongshortError> {
    let min = config.get_double("backtest", "min_abs_weight", 0.005);
    let max = config.get_double("backtest", "max_abs_weight", 0.20);
    if min <= 0.0 {
        return Err(invalid("backtest", "min_abs_weight", "min_abs_weight must be positive"));
    }
    if max <= min {
        return Err(invalid(
            "backtest",
            "max_abs_weight",
            "max_abs_weight must exceed min_abs_weight",
        ));
    }
    if max > 1.0 {
        return Err(invalid("backtest", "max_abs_weight", "max_abs_weight must be at most 1"));
    }
    Ok(())
}

fn validate_top_n(config: &dyn ConfigPort) -> Result<(), LongshortError> {
    if config.get_int("backtest", "top_n", 10) < 1 {
        return Err(invalid("backtest", "top_n", "top_n must be at least 1"));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), LongshortError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_strategies(config: &dyn ConfigPort) -> Result<(), LongshortError> {
    let names = strategy_names(config);
    if names.is_empty() {
        return Err(LongshortError::ConfigMissing {
            section: "backtest".to_string(),
            key: "strategies".to_string(),
        });
    }
    if let Some(unknown) = names.iter().find(|n| !KNOWN_STRATEGIES.contains(&n.as_str())) {
        return Err(invalid(
            "backtest",
            "strategies",
            format!("unknown strategy '{unknown}'"),
        ));
    }
    Ok(())
}

fn validate_period(config: &dyn ConfigPort, section: &str) -> Result<(), LongshortError> {
    let start = parse_date(config.get_string(section, "start_date").as_deref(), section, "start_date")?;
    let end = parse_date(config.get_string(section, "end_date").as_deref(), section, "end_date")?;
    if start >= end {
        return Err(invalid(section, "start_date", "start_date must be before end_date"));
    }
    Ok(())
}

pub fn parse_date(
    value: Option<&str>,
    section: &str,
    field: &str,
) -> Result<NaiveDate, LongshortError> {
    match value {
        None => Err(LongshortError::ConfigMissing {
            section: section.to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(section, field, format!("invalid {} format, expected YYYY-MM-DD", field))
        }),
    }
}
