//! Performance statistics for a completed portfolio history.

use std::fmt;

use super::error::LongshortError;
use super::portfolio::EquityPoint;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;

/// Summary statistics derived once from a portfolio history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceResults {
    pub annualized_return: f64,
    /// Daily volatility scaled by `sqrt(252)`.
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub total_return: f64,
    /// Daily volatility scaled by the square root of the number of returns.
    pub total_volatility: f64,
}

impl PerformanceResults {
    /// Compute statistics from `(date, value)` points. `risk_free_rate` is
    /// annualized.
    ///
    /// Fails with `InvalidArgument` when fewer than two points are given or
    /// when the first and last points fall on the same calendar day.
    pub fn calculate(history: &[EquityPoint], risk_free_rate: f64) -> Result<Self, LongshortError> {
        if history.len() < 2 {
            return Err(LongshortError::invalid_argument(format!(
                "portfolio history needs at least two points, got {}",
                history.len()
            )));
        }

        let mut sorted = history.to_vec();
        sorted.sort_by_key(|p| p.date);

        let first = sorted[0];
        let last = sorted[sorted.len() - 1];
        let total_days = (last.date - first.date).num_days();
        if total_days <= 0 {
            return Err(LongshortError::invalid_argument(format!(
                "portfolio history spans no calendar days ({} to {})",
                first.date, last.date
            )));
        }

        let returns: Vec<f64> = sorted
            .windows(2)
            .map(|w| w[1].value / w[0].value - 1.0)
            .collect();
        let daily_stddev = sample_stddev(&returns);

        let growth = last.value / first.value;
        let annualized_return = growth.powf(CALENDAR_DAYS_PER_YEAR / total_days as f64) - 1.0;
        let annualized_volatility = daily_stddev * TRADING_DAYS_PER_YEAR.sqrt();
        let total_volatility = daily_stddev * (returns.len() as f64).sqrt();

        let sharpe_ratio = if annualized_volatility > 0.0 {
            (annualized_return - risk_free_rate) / annualized_volatility
        } else {
            0.0
        };

        Ok(PerformanceResults {
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            total_return: growth - 1.0,
            total_volatility,
        })
    }
}

/// Bessel-corrected standard deviation; zero for fewer than two samples.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

impl fmt::Display for PerformanceResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Annualized Return:     {:.3}%", self.annualized_return * 100.0)?;
        writeln!(f, "Annualized Volatility: {:.3}%", self.annualized_volatility * 100.0)?;
        writeln!(f, "Sharpe Ratio:          {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Total Return:          {:.4}%", self.total_return * 100.0)?;
        write!(f, "Total Volatility:      {:.3}%", self.total_volatility * 100.0)
    }
}
