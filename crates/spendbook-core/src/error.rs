use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;
use time::Date;

use crate::storage::StorageError;

/// The expense field a validation rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Category,
    Description,
    Amount,
    DateRange,
    Month,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Date => "date",
            Field::Category => "category",
            Field::Description => "description",
            Field::Amount => "amount",
            Field::DateRange => "date range",
            Field::Month => "month",
        };
        f.write_str(name)
    }
}

/// Caller-correctable rejection of input, raised before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("date must be in YYYY-MM-DD format, got {0:?}")]
    InvalidDate(String),
    #[error("{0} cannot be empty")]
    EmptyField(Field),
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("amount must be at most {max}, got {amount}")]
    AmountTooLarge { amount: Decimal, max: Decimal },
    #[error("amount may have at most {max_scale} decimal places, got {amount}")]
    AmountTooPrecise { amount: Decimal, max_scale: u32 },
    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: Date, end: Date },
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u8),
}

impl ValidationError {
    /// The field whose rule was violated.
    pub fn field(&self) -> Field {
        match self {
            ValidationError::InvalidDate(_) => Field::Date,
            ValidationError::EmptyField(field) => *field,
            ValidationError::NonPositiveAmount(_)
            | ValidationError::AmountTooLarge { .. }
            | ValidationError::AmountTooPrecise { .. } => Field::Amount,
            ValidationError::InvertedRange { .. } => Field::DateRange,
            ValidationError::InvalidMonth(_) => Field::Month,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExpenseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ExpenseError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ExpenseError::Validation(_))
    }
}
