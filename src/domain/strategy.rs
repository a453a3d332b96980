//! Long/short weight generators.
//!
//! Each strategy scores every ticker from two price snapshots taken from the
//! store, goes long the best `top_n` scores and short the worst `top_n`, and
//! returns weights whose absolute values sum to 1.

use chrono::{Days, Months, NaiveDate};
use tracing::debug;

use crate::domain::error::LongshortError;
use crate::domain::prices::{Prices, Weights};
use crate::domain::weights::{gross_exposure, GROSS_TOLERANCE};
use crate::ports::price_port::{PricePort, SharedPricePort};

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Target weights as of `date`, using at most `top_n` assets per leg.
    fn compute_weights(&self, date: NaiveDate, top_n: usize) -> Result<Weights, LongshortError>;
}

/// Build a strategy from its configuration name.
pub fn strategy_from_name(
    name: &str,
    store: SharedPricePort,
) -> Result<Box<dyn Strategy>, LongshortError> {
    match name.trim().to_lowercase().as_str() {
        "momentum" => Ok(Box::new(MomentumStrategy::new(store))),
        "value" => Ok(Box::new(ValueStrategy::new(store))),
        other => Err(LongshortError::invalid_argument(format!(
            "unknown strategy '{other}' (expected momentum or value)"
        ))),
    }
}

pub const KNOWN_STRATEGIES: [&str; 2] = ["momentum", "value"];

/// Trailing 12-month return, skipping the most recent 30 days.
pub struct MomentumStrategy {
    store: SharedPricePort,
}

impl MomentumStrategy {
    pub fn new(store: SharedPricePort) -> Self {
        Self { store }
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "MomentumStrategy"
    }

    fn compute_weights(&self, date: NaiveDate, top_n: usize) -> Result<Weights, LongshortError> {
        let lookback_start = date
            .checked_sub_months(Months::new(12))
            .unwrap_or(NaiveDate::MIN);
        let lookback_end = date.checked_sub_days(Days::new(30)).unwrap_or(NaiveDate::MIN);

        let (first, last) = snapshots(
            self.store.as_ref(),
            self.name(),
            date,
            lookback_start,
            lookback_end,
        )?;

        let scores: Vec<(String, f64)> = first
            .iter()
            .filter(|&(_, &p0)| p0 > 1e-3)
            .filter_map(|(ticker, &p0)| {
                let p1 = *last.get(ticker)?;
                Some((ticker.clone(), (p1 - p0) / p0 * 100.0))
            })
            .collect();

        long_short_weights(scores, top_n)
    }
}

/// Five-year price coefficient `p_now / (p_now - p_then)`.
pub struct ValueStrategy {
    store: SharedPricePort,
}

impl ValueStrategy {
    pub fn new(store: SharedPricePort) -> Self {
        Self { store }
    }
}

impl Strategy for ValueStrategy {
    fn name(&self) -> &str {
        "ValueStrategy"
    }

    fn compute_weights(&self, date: NaiveDate, top_n: usize) -> Result<Weights, LongshortError> {
        let lookback_start = date
            .checked_sub_months(Months::new(60))
            .unwrap_or(NaiveDate::MIN);
        let lookback_end = date.checked_sub_days(Days::new(1)).unwrap_or(NaiveDate::MIN);

        let (then, now) = snapshots(
            self.store.as_ref(),
            self.name(),
            date,
            lookback_start,
            lookback_end,
        )?;

        let scores: Vec<(String, f64)> = now
            .iter()
            .filter_map(|(ticker, &p_now)| {
                let p_then = *then.get(ticker)?;
                let coefficient = if (p_then - p_now).abs() > 1e-3 {
                    p_now / (p_now - p_then)
                } else {
                    0.0
                };
                Some((ticker.clone(), coefficient))
            })
            .collect();

        long_short_weights(scores, top_n)
    }
}

/// Prices on the trading days closest to (on or before) both lookback ends.
fn snapshots(
    store: &(dyn PricePort + Send + Sync),
    strategy: &str,
    date: NaiveDate,
    lookback_start: NaiveDate,
    lookback_end: NaiveDate,
) -> Result<(Prices, Prices), LongshortError> {
    let earliest = store.first_date()?;
    if lookback_start < earliest {
        return Err(LongshortError::InsufficientHistory {
            strategy: strategy.to_string(),
            date,
            needed: lookback_start,
            earliest,
        });
    }

    let first_date = store.closest_date(lookback_start)?;
    let last_date = store.closest_date(lookback_end)?;
    let mut data = store.get_data(first_date, last_date);

    let first = data.remove(&first_date);
    let last = data.remove(&last_date);
    match (first, last) {
        (Some(first), Some(last)) => Ok((first, last)),
        // Both ends resolve to the same trading day.
        (Some(first), None) if first_date == last_date => Ok((first.clone(), first)),
        _ => Err(LongshortError::DataNotFound {
            reason: format!("no prices on {first_date} or {last_date}"),
        }),
    }
}

/// Rank scores descending, long the top leg and short the bottom leg.
///
/// The i-th short carries the magnitude of the i-th best score. Legs are
/// capped at half the universe so they never share a ticker.
pub fn long_short_weights(
    mut scores: Vec<(String, f64)>,
    top_n: usize,
) -> Result<Weights, LongshortError> {
    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    // Half the universe at most, so a ticker is never both long and short.
    let leg = top_n.min(scores.len() / 2);
    if leg == 0 {
        return Err(LongshortError::invalid_argument(format!(
            "need at least two scored assets, got {}",
            scores.len()
        )));
    }

    let best = &scores[..leg];
    let worst: Vec<&(String, f64)> = scores.iter().rev().take(leg).collect();

    let total: f64 = best.iter().map(|(_, s)| s.abs()).sum::<f64>()
        + worst.iter().map(|(_, s)| s.abs()).sum::<f64>();
    if total <= 0.0 || !total.is_finite() {
        return Err(LongshortError::invalid_argument(
            "scores carry no signal to weight",
        ));
    }

    let mut weights = Weights::new();
    for (i, (ticker, score)) in best.iter().enumerate() {
        let w = score / total;
        weights.insert(ticker.clone(), w);
        weights.insert(worst[i].0.clone(), -w);
    }

    let gross = gross_exposure(&weights);
    if gross <= 0.0 {
        return Err(LongshortError::invalid_argument(
            "scores carry no signal to weight",
        ));
    }
    for w in weights.values_mut() {
        *w /= gross;
    }
    debug!(
        assets = weights.len(),
        gross = gross_exposure(&weights),
        "long/short weights built"
    );
    debug_assert!((gross_exposure(&weights) - 1.0).abs() <= GROSS_TOLERANCE);

    Ok(weights)
}
