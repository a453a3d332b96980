//! Wide CSV price file adapter.
//!
//! Expected layout: a `date` column followed by one column per ticker, one
//! row per trading day. Empty cells mean the asset has no price that day.

use crate::domain::error::LongshortError;
use crate::domain::prices::{PriceStore, PriceTable, Prices};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the whole file into an in-memory store.
    pub fn load(&self) -> Result<PriceStore, LongshortError> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LongshortError::DataNotFound {
                reason: format!("price file {} does not exist", self.path.display()),
            },
            _ => LongshortError::Io(e),
        })?;
        let table = read_price_table(file)?;
        info!(
            path = %self.path.display(),
            days = table.len(),
            "loaded price data"
        );
        Ok(PriceStore::new(table))
    }
}

/// Parse a date cell. Accepts `YYYY-MM-DD HH:MM:SS+HH:MM`, `YYYY-MM-DD
/// HH:MM:SS` and `YYYY-MM-DD`; the time of day is dropped and the calendar
/// date is kept as written.
pub fn parse_date_cell(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    if let Ok(dt) = DateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d").ok()
}

/// Parse a wide price CSV from any reader.
///
/// Malformed rows and unparseable cells are skipped with a warning. When a
/// date appears twice the later row wins.
pub fn read_price_table<R: Read>(reader: R) -> Result<PriceTable, LongshortError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(LongshortError::DataNotFound {
            reason: "price file is empty".into(),
        });
    }
    if headers.len() < 2 {
        return Err(LongshortError::MalformedHeader {
            reason: format!(
                "expected a date column and at least one ticker, found {} column",
                headers.len()
            ),
        });
    }
    let tickers: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut table = PriceTable::new();
    let mut skipped_rows = 0usize;
    let mut skipped_cells = 0usize;

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let err = LongshortError::MalformedRow {
                    line: e.position().map_or(0, |p| p.line()),
                    reason: e.to_string(),
                };
                warn!(error = %err, "skipping row");
                skipped_rows += 1;
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());

        if record.len() != headers.len() {
            let err = LongshortError::MalformedRow {
                line,
                reason: format!("expected {} fields, found {}", headers.len(), record.len()),
            };
            warn!(error = %err, "skipping row");
            skipped_rows += 1;
            continue;
        }

        let date_cell = record.get(0).unwrap_or_default();
        let Some(date) = parse_date_cell(date_cell) else {
            let err = LongshortError::MalformedRow {
                line,
                reason: format!("unparseable date '{date_cell}'"),
            };
            warn!(error = %err, "skipping row");
            skipped_rows += 1;
            continue;
        };

        let mut prices = Prices::new();
        for (ticker, cell) in tickers.iter().zip(record.iter().skip(1)) {
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(price) if price.is_finite() => {
                    prices.insert(ticker.clone(), price);
                }
                _ => {
                    warn!(line, %ticker, %cell, "skipping unparseable price");
                    skipped_cells += 1;
                }
            }
        }

        if table.insert(date, prices).is_some() {
            debug!(line, %date, "duplicate date, keeping later row");
        }
    }

    if table.is_empty() {
        return Err(LongshortError::DataNotFound {
            reason: "price file contains no dated rows".into(),
        });
    }

    info!(
        days = table.len(),
        tickers = tickers.len(),
        skipped_rows,
        skipped_cells,
        "parsed price table"
    );
    Ok(table)
}
