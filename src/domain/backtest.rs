//! Backtest engine: monthly rebalancing over daily log-returns.
//!
//! Every (period, strategy) pair is an independent unit. A unit walks the
//! trading days of its window, asks its strategy for weights on the first
//! trading day of each month, and compounds the weighted log-returns of the
//! following days into a portfolio value seeded at 1.0.

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::domain::error::LongshortError;
use crate::domain::metrics::PerformanceResults;
use crate::domain::period::Period;
use crate::domain::portfolio::PortfolioHistory;
use crate::domain::prices::{LogReturns, Weights};
use crate::domain::strategy::Strategy;
use crate::domain::weights::enforce;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub top_n: usize,
    pub min_abs_weight: f64,
    pub max_abs_weight: f64,
    pub risk_free_rate: f64,
    pub parallel: bool,
    pub charts: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            top_n: 10,
            min_abs_weight: 0.005,
            max_abs_weight: 0.20,
            risk_free_rate: 0.0,
            parallel: false,
            charts: true,
        }
    }
}

/// Weights applied from one rebalance date until the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebalance {
    pub date: NaiveDate,
    pub weights: Weights,
    pub converged: bool,
}

/// Outcome of one completed (period, strategy) unit.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub period: Period,
    pub strategy_name: String,
    pub history: PortfolioHistory,
    pub rebalances: Vec<Rebalance>,
    pub results: PerformanceResults,
}

#[derive(Debug, Clone)]
pub struct SkippedUnit {
    pub period: Period,
    pub strategy_name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<UnitReport>,
    pub skipped: Vec<SkippedUnit>,
}

/// First available trading day of each calendar month, ascending.
pub fn rebalance_dates<I>(dates: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut firsts: BTreeMap<(i32, u32), NaiveDate> = BTreeMap::new();
    for date in dates {
        firsts
            .entry((date.year(), date.month()))
            .and_modify(|d| {
                if date < *d {
                    *d = date;
                }
            })
            .or_insert(date);
    }
    firsts.into_values().collect()
}

/// Weighted sum of the day's log-returns over held tickers. Tickers without a
/// return that day contribute nothing.
pub fn portfolio_log_return(
    date: NaiveDate,
    weights: &Weights,
    daily: &BTreeMap<String, f64>,
) -> f64 {
    weights
        .iter()
        .filter_map(|(ticker, w)| match daily.get(ticker) {
            Some(r) => Some(w * r),
            None => {
                debug!(%date, %ticker, "no log-return for held ticker");
                None
            }
        })
        .sum()
}

/// Run a single (period, strategy) unit against the full log-return series.
///
/// Compositions are persisted through `report` as they are decided; reporting
/// failures are logged and do not stop the unit.
pub fn simulate_unit(
    log_returns: &LogReturns,
    period: &Period,
    strategy: &dyn Strategy,
    config: &BacktestConfig,
    report: &dyn ReportPort,
) -> Result<UnitReport, LongshortError> {
    let window: Vec<(&NaiveDate, &BTreeMap<String, f64>)> = log_returns
        .iter()
        .filter(|(date, _)| period.contains(**date))
        .collect();
    let Some(first_day) = window.first().map(|(d, _)| **d) else {
        return Err(LongshortError::DataNotFound {
            reason: format!(
                "no log-returns between {} and {}",
                period.start, period.end
            ),
        });
    };

    let rebalances_at = rebalance_dates(window.iter().map(|(d, _)| **d));
    let folder = period.folder_name(strategy.name());
    let mut history = PortfolioHistory::new(first_day, 1.0);
    let mut rebalances = Vec::with_capacity(rebalances_at.len().saturating_sub(1));

    for pair in rebalances_at.windows(2) {
        let (current, next) = (pair[0], pair[1]);

        let raw = strategy.compute_weights(current, config.top_n)?;
        let enforced = enforce(&raw, config.min_abs_weight, config.max_abs_weight)?;

        debug!(
            strategy = strategy.name(),
            date = %current,
            assets = enforced.weights.len(),
            "rebalanced"
        );
        for (ticker, w) in &enforced.weights {
            debug!(%ticker, weight_pct = w * 100.0, "composition");
        }
        if let Err(e) = report.write_composition(&folder, current, &enforced.weights) {
            warn!(%folder, date = %current, error = %e, "failed to persist composition");
        }

        let interval = log_returns.range(current..=next).filter(|(d, _)| **d > current);
        for (&day, daily) in interval {
            let r = portfolio_log_return(day, &enforced.weights, daily);
            history.apply_log_return(day, r)?;
        }

        rebalances.push(Rebalance {
            date: current,
            weights: enforced.weights,
            converged: enforced.converged,
        });
    }

    let results = PerformanceResults::calculate(history.points(), config.risk_free_rate)?;

    Ok(UnitReport {
        period: period.clone(),
        strategy_name: strategy.name().to_string(),
        history,
        rebalances,
        results,
    })
}

fn run_unit(
    log_returns: &LogReturns,
    period: &Period,
    strategy: &dyn Strategy,
    config: &BacktestConfig,
    report: &dyn ReportPort,
) -> Result<UnitReport, SkippedUnit> {
    info!(period = %period.label, strategy = strategy.name(), "running backtest");

    let skip = |reason: String| SkippedUnit {
        period: period.clone(),
        strategy_name: strategy.name().to_string(),
        reason,
    };

    let unit = match simulate_unit(log_returns, period, strategy, config, report) {
        Ok(unit) => unit,
        Err(e) => {
            warn!(period = %period.label, strategy = strategy.name(), error = %e, "skipping unit");
            return Err(skip(e.to_string()));
        }
    };

    info!(
        period = %period.label,
        strategy = strategy.name(),
        sharpe = unit.results.sharpe_ratio,
        annualized_return = unit.results.annualized_return,
        "backtest complete"
    );

    let folder = period.folder_name(strategy.name());
    if config.charts {
        if let Err(e) = report.write_charts(&folder, &unit.history) {
            warn!(%folder, error = %e, "failed to write charts");
        }
    }
    if let Err(e) = report.write_metrics(period, strategy.name(), &unit.results) {
        error!(%folder, error = %e, "failed to persist performance metrics");
    }

    Ok(unit)
}

/// Backtest every strategy over every period.
///
/// A failing unit is logged and recorded as skipped; the remaining units
/// still run. With `config.parallel` units run on the rayon pool.
pub fn run(
    store: &(dyn PricePort + Send + Sync),
    periods: &[Period],
    strategies: &[Box<dyn Strategy>],
    config: &BacktestConfig,
    report: &dyn ReportPort,
) -> RunSummary {
    let log_returns = store.log_returns();
    if log_returns.is_empty() {
        error!("no log-return data available");
        return RunSummary {
            completed: Vec::new(),
            skipped: periods
                .iter()
                .flat_map(|p| {
                    strategies.iter().map(move |s| SkippedUnit {
                        period: p.clone(),
                        strategy_name: s.name().to_string(),
                        reason: "no log-return data available".into(),
                    })
                })
                .collect(),
        };
    }

    let units: Vec<(&Period, &dyn Strategy)> = periods
        .iter()
        .flat_map(|p| strategies.iter().map(move |s| (p, s.as_ref())))
        .collect();

    let outcomes: Vec<Result<UnitReport, SkippedUnit>> = if config.parallel {
        units
            .par_iter()
            .map(|(p, s)| run_unit(log_returns, p, *s, config, report))
            .collect()
    } else {
        units
            .iter()
            .map(|(p, s)| run_unit(log_returns, p, *s, config, report))
            .collect()
    };

    let mut summary = RunSummary::default();
    for outcome in outcomes {
        match outcome {
            Ok(unit) => summary.completed.push(unit),
            Err(skipped) => summary.skipped.push(skipped),
        }
    }
    summary
}
