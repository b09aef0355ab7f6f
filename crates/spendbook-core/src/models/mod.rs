use std::{collections::BTreeMap, fmt::Display, str::FromStr, sync::Arc};

use rust_decimal::Decimal;
use time::Date;

use crate::error::ValidationError;

pub mod read;
pub mod write;

/// Calendar month key; orders chronologically and prints as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u8,
}

impl YearMonth {
    pub fn new(year: i32, month: u8) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }
}

impl From<Date> for YearMonth {
    fn from(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid year-month: {s}"))?;
        let year = year
            .parse::<i32>()
            .map_err(|e| format!("invalid year in {s}: {e}"))?;
        let month = month
            .parse::<u8>()
            .map_err(|e| format!("invalid month in {s}: {e}"))?;
        YearMonth::new(year, month).map_err(|e| e.to_string())
    }
}

pub type CategoryTotals = BTreeMap<Arc<str>, Decimal>;
pub type MonthlyTotals = BTreeMap<YearMonth, Decimal>;
pub type DailyTotals = BTreeMap<Date, Decimal>;

/// Whole-collection statistics. Dates are `None` when there are no expenses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpenseStats {
    pub count: u64,
    pub total_amount: Decimal,
    pub category_count: u64,
    pub earliest: Option<Date>,
    pub latest: Option<Date>,
}

impl ExpenseStats {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn average(&self) -> Option<Decimal> {
        self.total_amount.checked_div(Decimal::from(self.count))
    }
}
