#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use longshort::domain::error::LongshortError;
use longshort::domain::metrics::PerformanceResults;
use longshort::domain::period::Period;
use longshort::domain::portfolio::PortfolioHistory;
use longshort::domain::prices::{PriceStore, PriceTable, Prices, Weights};
use longshort::domain::strategy::Strategy;
use longshort::ports::report_port::ReportPort;
use std::sync::Mutex;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Monday to Friday between `start` and `end`, inclusive.
pub fn trading_days(start: &str, end: &str) -> Vec<NaiveDate> {
    date(start)
        .iter_days()
        .take_while(|d| *d <= date(end))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Prices growing at a constant daily log-rate per ticker:
/// `base * exp(rate * i)` on the i-th trading day.
pub fn drifting_table(tickers: &[(&str, f64, f64)], start: &str, end: &str) -> PriceTable {
    trading_days(start, end)
        .into_iter()
        .enumerate()
        .map(|(i, day)| {
            let prices: Prices = tickers
                .iter()
                .map(|(t, base, rate)| (t.to_string(), base * (rate * i as f64).exp()))
                .collect();
            (day, prices)
        })
        .collect()
}

pub fn drifting_store(tickers: &[(&str, f64, f64)], start: &str, end: &str) -> PriceStore {
    PriceStore::new(drifting_table(tickers, start, end))
}

pub fn weights(entries: &[(&str, f64)]) -> Weights {
    entries.iter().map(|(t, w)| (t.to_string(), *w)).collect()
}

/// Returns the same weights on every date.
pub struct FixedWeightsStrategy {
    pub name: String,
    pub weights: Weights,
}

impl FixedWeightsStrategy {
    pub fn new(name: &str, entries: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            weights: weights(entries),
        }
    }
}

impl Strategy for FixedWeightsStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_weights(&self, _date: NaiveDate, _top_n: usize) -> Result<Weights, LongshortError> {
        Ok(self.weights.clone())
    }
}

/// Always reports that its lookback precedes the data.
pub struct NoHistoryStrategy;

impl Strategy for NoHistoryStrategy {
    fn name(&self) -> &str {
        "NoHistoryStrategy"
    }

    fn compute_weights(&self, date: NaiveDate, _top_n: usize) -> Result<Weights, LongshortError> {
        Err(LongshortError::InsufficientHistory {
            strategy: self.name().to_string(),
            date,
            needed: date,
            earliest: date,
        })
    }
}

/// In-memory sink that records every call.
#[derive(Default)]
pub struct RecordingReport {
    pub compositions: Mutex<Vec<(String, NaiveDate, Weights)>>,
    pub metrics: Mutex<Vec<(Period, String, PerformanceResults)>>,
    pub charts: Mutex<Vec<String>>,
}

impl RecordingReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn composition_count(&self, folder: &str) -> usize {
        self.compositions
            .lock()
            .unwrap()
            .iter()
            .filter(|(f, _, _)| f == folder)
            .count()
    }
}

impl ReportPort for RecordingReport {
    fn write_composition(
        &self,
        folder: &str,
        date: NaiveDate,
        weights: &Weights,
    ) -> Result<(), LongshortError> {
        self.compositions
            .lock()
            .unwrap()
            .push((folder.to_string(), date, weights.clone()));
        Ok(())
    }

    fn write_metrics(
        &self,
        period: &Period,
        strategy_name: &str,
        results: &PerformanceResults,
    ) -> Result<(), LongshortError> {
        self.metrics
            .lock()
            .unwrap()
            .push((period.clone(), strategy_name.to_string(), *results));
        Ok(())
    }

    fn write_charts(&self, folder: &str, _history: &PortfolioHistory) -> Result<(), LongshortError> {
        self.charts.lock().unwrap().push(folder.to_string());
        Ok(())
    }
}

/// Sink whose every write fails.
pub struct BrokenReport;

impl ReportPort for BrokenReport {
    fn write_composition(
        &self,
        _folder: &str,
        _date: NaiveDate,
        _weights: &Weights,
    ) -> Result<(), LongshortError> {
        Err(LongshortError::Report {
            reason: "disk full".into(),
        })
    }

    fn write_metrics(
        &self,
        _period: &Period,
        _strategy_name: &str,
        _results: &PerformanceResults,
    ) -> Result<(), LongshortError> {
        Err(LongshortError::Report {
            reason: "disk full".into(),
        })
    }
}
