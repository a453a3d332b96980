//! Portfolio value tracking over a backtest window.

use chrono::NaiveDate;

use crate::domain::error::LongshortError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Cumulative portfolio value, strictly increasing in date.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioHistory {
    points: Vec<EquityPoint>,
}

impl PortfolioHistory {
    /// Seed the history with `initial_value` on the first day of the window.
    pub fn new(start: NaiveDate, initial_value: f64) -> Self {
        PortfolioHistory {
            points: vec![EquityPoint {
                date: start,
                value: initial_value,
            }],
        }
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Latest recorded value.
    pub fn value(&self) -> f64 {
        self.points.last().map(|p| p.value).unwrap_or(0.0)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn record(&mut self, date: NaiveDate, value: f64) -> Result<(), LongshortError> {
        if let Some(last) = self.last_date() {
            if date <= last {
                return Err(LongshortError::invalid_argument(format!(
                    "history point {date} is not after {last}"
                )));
            }
        }
        self.points.push(EquityPoint { date, value });
        Ok(())
    }

    /// Compound a daily portfolio log-return into the value and record it.
    pub fn apply_log_return(
        &mut self,
        date: NaiveDate,
        log_return: f64,
    ) -> Result<f64, LongshortError> {
        let value = self.value() * log_return.exp();
        self.record(date, value)?;
        Ok(value)
    }

    /// Simple returns `v[i] / v[i-1] - 1`, dated by the later point.
    pub fn daily_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .windows(2)
            .map(|w| (w[1].date, w[1].value / w[0].value - 1.0))
            .collect()
    }
}
