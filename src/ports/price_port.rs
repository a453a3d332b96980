//! Price store query port.
//!
//! The engine and the strategies only ever see prices through this trait, so
//! any date-indexed source can back a backtest.

use crate::domain::error::LongshortError;
use crate::domain::prices::{LogReturns, PriceTable};
use chrono::NaiveDate;
use std::sync::Arc;

pub trait PricePort {
    /// All rows with `start <= date <= end`.
    fn get_data(&self, start: NaiveDate, end: NaiveDate) -> PriceTable;

    /// Earliest trading date. Fails with `DataNotFound` on an empty store.
    fn first_date(&self) -> Result<NaiveDate, LongshortError>;

    /// Latest trading date on or before `target`, falling back to the
    /// earliest date when `target` precedes all data.
    fn closest_date(&self, target: NaiveDate) -> Result<NaiveDate, LongshortError>;

    /// Daily log-returns keyed by date, then ticker.
    fn log_returns(&self) -> &LogReturns;
}

/// Read-only store handle shared by strategies and worker threads.
pub type SharedPricePort = Arc<dyn PricePort + Send + Sync>;
