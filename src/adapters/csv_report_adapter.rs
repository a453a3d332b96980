//! File-system reporting sink: per-unit composition CSVs, a cumulative
//! metrics table, and SVG charts.

use crate::adapters::chart_svg;
use crate::domain::error::LongshortError;
use crate::domain::metrics::PerformanceResults;
use crate::domain::period::Period;
use crate::domain::portfolio::PortfolioHistory;
use crate::domain::prices::Weights;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub const METRICS_FILE: &str = "PerformanceMetrics.csv";

const METRICS_HEADER: [&str; 8] = [
    "Period",
    "Label",
    "Strategy",
    "Sharpe",
    "Annualized Vol",
    "Annualized Return",
    "Total Return",
    "Total Vol",
];

#[derive(Debug, Default)]
struct WriterState {
    metrics_header_written: bool,
}

/// Writes all output under a single root directory. Writes from concurrent
/// units are serialized.
pub struct CsvReportAdapter {
    output_dir: PathBuf,
    state: Mutex<WriterState>,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            state: Mutex::new(WriterState::default()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn unit_dir(&self, folder: &str) -> Result<PathBuf, LongshortError> {
        let dir = self.output_dir.join(folder);
        fs::create_dir_all(&dir).map_err(|e| LongshortError::Report {
            reason: format!("failed to create {}: {}", dir.display(), e),
        })?;
        Ok(dir)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, WriterState>, LongshortError> {
        self.state.lock().map_err(|_| LongshortError::Report {
            reason: "report writer lock poisoned".into(),
        })
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), LongshortError> {
    fs::write(path, content).map_err(|e| LongshortError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    })
}

impl ReportPort for CsvReportAdapter {
    fn write_composition(
        &self,
        folder: &str,
        date: NaiveDate,
        weights: &Weights,
    ) -> Result<(), LongshortError> {
        let _guard = self.lock()?;
        let dir = self.unit_dir(folder)?;
        let path = dir.join(format!("Rebalancing_{}.csv", date.format("%Y%m%d")));

        let mut wtr = csv::Writer::from_path(&path)?;
        wtr.write_record(["Ticker", "Weight"])?;
        for (ticker, weight) in weights {
            let pct = format!("{:.2}", weight * 100.0);
            wtr.write_record([ticker.as_str(), pct.as_str()])?;
        }
        wtr.flush()?;

        debug!(path = %path.display(), "wrote composition");
        Ok(())
    }

    fn write_metrics(
        &self,
        period: &Period,
        strategy_name: &str,
        results: &PerformanceResults,
    ) -> Result<(), LongshortError> {
        let mut state = self.lock()?;
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(METRICS_FILE);

        let file = if state.metrics_header_written {
            OpenOptions::new().append(true).create(true).open(&path)?
        } else {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?
        };
        let mut wtr = csv::Writer::from_writer(file);
        if !state.metrics_header_written {
            wtr.write_record(METRICS_HEADER)?;
        }
        wtr.write_record([
            period.range_label(),
            period.label.clone(),
            strategy_name.to_string(),
            format!("{:.2}", results.sharpe_ratio),
            format!("{:.2}", results.annualized_volatility),
            format!("{:.2}", results.annualized_return),
            format!("{:.3}", results.total_return),
            format!("{:.2}", results.total_volatility),
        ])?;
        wtr.flush()?;
        state.metrics_header_written = true;

        debug!(path = %path.display(), strategy = strategy_name, "appended metrics row");
        Ok(())
    }

    fn write_charts(&self, folder: &str, history: &PortfolioHistory) -> Result<(), LongshortError> {
        let returns = history.daily_returns();
        let values: Vec<f64> = returns.iter().map(|(_, r)| *r).collect();

        let _guard = self.lock()?;
        let dir = self.unit_dir(folder)?;
        write_file(
            &dir.join("DailyPerformance.svg"),
            &chart_svg::value_chart(history.points()),
        )?;
        write_file(
            &dir.join("DailyReturns.svg"),
            &chart_svg::returns_scatter(&returns),
        )?;
        write_file(
            &dir.join("DailyReturnsHistogram.svg"),
            &chart_svg::returns_histogram(&values),
        )?;
        Ok(())
    }
}
