use std::sync::Arc;

use rust_decimal::Decimal;
use time::{macros::format_description, Date, Duration};

use crate::error::{Field, ValidationError};

/// Parses a strict `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    if input.len() != 10 {
        return Err(ValidationError::InvalidDate(input.to_string()));
    }
    Date::parse(input, format_description!("[year]-[month]-[day]"))
        .ok()
        .filter(|d| d.year() >= 0)
        .ok_or_else(|| ValidationError::InvalidDate(input.to_string()))
}

/// Formats a date the way it is persisted, so lexical order matches calendar order.
pub fn format_date(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), d.month() as u8, d.day())
}

/// Largest amount a single expense may carry (10,000,000,000).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Decimal places an amount may carry. Together with [`MAX_AMOUNT`] this keeps
/// every amount within the 15 significant digits a SQLite REAL round-trips.
pub const MAX_AMOUNT_SCALE: u32 = 4;

fn non_empty(value: &str, field: Field) -> Result<Arc<str>, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(Arc::from(value))
}

/// An expense that has passed validation and is ready to be persisted.
///
/// The only way to build one is through [`NewExpense::new`] or
/// [`NewExpense::with_date`], so a backend never sees a record that breaks
/// the field rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    date: Date,
    category: Arc<str>,
    description: Arc<str>,
    amount: Decimal,
}

impl NewExpense {
    pub fn new(
        date: &str,
        category: &str,
        description: &str,
        amount: Decimal,
    ) -> Result<Self, ValidationError> {
        let date = parse_date(date)?;
        Self::with_date(date, category, description, amount)
    }

    pub fn with_date(
        date: Date,
        category: &str,
        description: &str,
        amount: Decimal,
    ) -> Result<Self, ValidationError> {
        let category = non_empty(category, Field::Category)?;
        let description = non_empty(description, Field::Description)?;
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        if amount > MAX_AMOUNT {
            return Err(ValidationError::AmountTooLarge {
                amount,
                max: MAX_AMOUNT,
            });
        }
        if amount.normalize().scale() > MAX_AMOUNT_SCALE {
            return Err(ValidationError::AmountTooPrecise {
                amount,
                max_scale: MAX_AMOUNT_SCALE,
            });
        }
        Ok(Self {
            date,
            category,
            description,
            amount,
        })
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn category(&self) -> &Arc<str> {
        &self.category
    }

    pub fn description(&self) -> &Arc<str> {
        &self.description
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Inclusive date interval with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// The `days` days leading up to and including `end`.
    pub fn last_days(end: Date, days: u32) -> Self {
        let start = end
            .checked_sub(Duration::days(i64::from(days.saturating_sub(1))))
            .unwrap_or(Date::MIN);
        Self { start, end }
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::Month;

    #[test]
    fn parses_strict_iso_dates() {
        let d = parse_date("2024-01-15").unwrap();
        assert_eq!(d, Date::from_calendar_date(2024, Month::January, 15).unwrap());
        assert_eq!(format_date(d), "2024-01-15");
    }

    #[test]
    fn rejects_malformed_dates() {
        for input in ["2024/01/15", "15-01-2024", "2024-1-5", "2024-13-01", "2024-02-30", "", "2024-01-15x", "yesterday"] {
            let err = parse_date(input).unwrap_err();
            assert_eq!(err.field(), Field::Date, "{input:?} should be rejected");
        }
    }

    #[test]
    fn new_expense_checks_every_field() {
        assert!(NewExpense::new("2024-01-15", "Food", "Lunch", dec!(25.50)).is_ok());

        let err = NewExpense::new("2024-01-15", "  ", "Lunch", dec!(1)).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField(Field::Category));

        let err = NewExpense::new("2024-01-15", "Food", "", dec!(1)).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField(Field::Description));

        let err = NewExpense::new("2024-01-15", "Food", "Lunch", dec!(0)).unwrap_err();
        assert_eq!(err.field(), Field::Amount);

        let err = NewExpense::new("2024-01-15", "Food", "Lunch", dec!(-3.10)).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveAmount(dec!(-3.10)));
    }

    #[test]
    fn amount_is_bounded_in_size_and_precision() {
        assert_eq!(MAX_AMOUNT, dec!(10000000000));
        assert!(NewExpense::new("2024-01-15", "Food", "Lunch", MAX_AMOUNT).is_ok());
        assert!(NewExpense::new("2024-01-15", "Food", "Lunch", dec!(0.0001)).is_ok());
        assert!(NewExpense::new("2024-01-15", "Food", "Lunch", dec!(12.3400000)).is_ok());

        let err = NewExpense::new("2024-01-15", "Food", "Lunch", dec!(10000000000.01)).unwrap_err();
        assert!(matches!(err, ValidationError::AmountTooLarge { .. }));
        let err = NewExpense::new("2024-01-15", "Food", "Lunch", Decimal::MAX).unwrap_err();
        assert_eq!(err.field(), Field::Amount);

        let err = NewExpense::new("2024-01-15", "Food", "Lunch", dec!(0.000000001)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::AmountTooPrecise {
                amount: dec!(0.000000001),
                max_scale: MAX_AMOUNT_SCALE
            }
        );
    }

    #[test]
    fn date_is_checked_before_other_fields() {
        let err = NewExpense::new("01/15/2024", "", "", dec!(-1)).unwrap_err();
        assert_eq!(err.field(), Field::Date);
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let err = DateRange::parse("2024-02-01", "2024-01-01").unwrap_err();
        assert_eq!(err.field(), Field::DateRange);

        let same_day = DateRange::parse("2024-02-01", "2024-02-01").unwrap();
        assert!(same_day.contains(parse_date("2024-02-01").unwrap()));
    }

    #[test]
    fn last_days_includes_end_date() {
        let end = parse_date("2024-03-10").unwrap();
        let range = DateRange::last_days(end, 10);
        assert_eq!(format_date(range.start()), "2024-03-01");
        assert!(range.contains(end));
        assert!(!range.contains(parse_date("2024-02-29").unwrap()));
    }
}
