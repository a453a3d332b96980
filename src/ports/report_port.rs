//! Reporting sink port.

use crate::domain::error::LongshortError;
use crate::domain::metrics::PerformanceResults;
use crate::domain::period::Period;
use crate::domain::portfolio::PortfolioHistory;
use crate::domain::prices::Weights;
use chrono::NaiveDate;

/// Port for persisting backtest output. Implementations are shared across
/// worker threads and must serialize their own writes.
pub trait ReportPort: Send + Sync {
    /// Portfolio composition applied at `date` within the unit `folder`.
    fn write_composition(
        &self,
        folder: &str,
        date: NaiveDate,
        weights: &Weights,
    ) -> Result<(), LongshortError>;

    /// One row of the cumulative performance table.
    fn write_metrics(
        &self,
        period: &Period,
        strategy_name: &str,
        results: &PerformanceResults,
    ) -> Result<(), LongshortError>;

    /// Default implementation: no charts.
    fn write_charts(&self, folder: &str, history: &PortfolioHistory) -> Result<(), LongshortError> {
        let _ = (folder, history);
        Ok(())
    }
}
