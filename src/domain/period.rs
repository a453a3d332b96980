//! Backtest windows.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate, label: impl Into<String>) -> Self {
        Period {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// `YYYY-MM-DD - YYYY-MM-DD`, as used in the metrics table.
    pub fn range_label(&self) -> String {
        format!("{} - {}", self.start, self.end)
    }

    /// Output folder for one strategy over this window.
    pub fn folder_name(&self, strategy_name: &str) -> String {
        format!(
            "{}_{}-{}",
            strategy_name,
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

/// US recessions and expansions since 2001, used when no periods are
/// configured.
pub fn us_business_cycles() -> Vec<Period> {
    vec![
        Period::new(ymd(2001, 4, 1), ymd(2001, 11, 1), "Recession US 1: April 2001 - November 2001"),
        Period::new(ymd(2007, 12, 1), ymd(2009, 6, 1), "Recession US 2: December 2007 - June 2009"),
        Period::new(ymd(2020, 2, 1), ymd(2020, 4, 1), "Recession US 3: February 2020 - April 2020"),
        Period::new(ymd(2001, 11, 1), ymd(2007, 12, 1), "Expansion US 1: November 2001 - December 2007"),
        Period::new(ymd(2012, 2, 1), ymd(2020, 2, 1), "Expansion US 2: June 2009 - February 2020"),
        Period::new(ymd(2020, 4, 1), ymd(2023, 12, 1), "Expansion US 3: April 2020 - December 2023"),
    ]
}
