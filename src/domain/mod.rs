//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod metrics;
pub mod period;
pub mod portfolio;
pub mod prices;
pub mod strategy;
pub mod weights;
