//! Price table, derived log-returns, and the in-memory price store.

use crate::domain::error::LongshortError;
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Ticker to price for a single trading day.
pub type Prices = BTreeMap<String, f64>;

/// Trading day to that day's prices. Membership may vary across days.
pub type PriceTable = BTreeMap<NaiveDate, Prices>;

/// Trading day to ticker to `ln(p_t / p_{t-1})`.
pub type LogReturns = BTreeMap<NaiveDate, BTreeMap<String, f64>>;

/// Ticker to signed weight; negative weights are short exposure.
pub type Weights = BTreeMap<String, f64>;

/// Derive daily log-returns from consecutive table rows.
///
/// A (date, ticker) pair is present only when the ticker has a positive price
/// on both that date and the immediately preceding table date. Dates with no
/// such ticker are omitted.
pub fn compute_log_returns(table: &PriceTable) -> LogReturns {
    let mut out = LogReturns::new();
    let mut rows = table.iter();
    let Some((_, mut previous)) = rows.next() else {
        return out;
    };

    for (&date, current) in rows {
        let daily: BTreeMap<String, f64> = current
            .iter()
            .filter_map(|(ticker, &price)| {
                let prev = *previous.get(ticker)?;
                (price > 0.0 && prev > 0.0).then(|| (ticker.clone(), (price / prev).ln()))
            })
            .collect();

        if !daily.is_empty() {
            out.insert(date, daily);
        }
        previous = current;
    }
    out
}

/// Immutable, date-indexed price store. Log-returns are derived on first use
/// and cached.
#[derive(Debug, Default)]
pub struct PriceStore {
    table: PriceTable,
    log_returns: OnceLock<LogReturns>,
}

impl PriceStore {
    pub fn new(table: PriceTable) -> Self {
        Self {
            table,
            log_returns: OnceLock::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of trading days held.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn last_date(&self) -> Result<NaiveDate, LongshortError> {
        self.table
            .keys()
            .next_back()
            .copied()
            .ok_or_else(empty_store)
    }

    /// Every ticker that has at least one price.
    pub fn tickers(&self) -> BTreeSet<String> {
        self.table
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect()
    }

    pub fn prices_on(&self, date: NaiveDate) -> Option<&Prices> {
        self.table.get(&date)
    }
}

fn empty_store() -> LongshortError {
    LongshortError::DataNotFound {
        reason: "price store is empty".into(),
    }
}

impl PricePort for PriceStore {
    fn get_data(&self, start: NaiveDate, end: NaiveDate) -> PriceTable {
        if start > end {
            return PriceTable::new();
        }
        self.table
            .range(start..=end)
            .map(|(date, row)| (*date, row.clone()))
            .collect()
    }

    fn first_date(&self) -> Result<NaiveDate, LongshortError> {
        self.table.keys().next().copied().ok_or_else(empty_store)
    }

    fn closest_date(&self, target: NaiveDate) -> Result<NaiveDate, LongshortError> {
        match self.table.range(..=target).next_back() {
            Some((date, _)) => Ok(*date),
            None => self.first_date(),
        }
    }

    fn log_returns(&self) -> &LogReturns {
        self.log_returns
            .get_or_init(|| compute_log_returns(&self.table))
    }
}
