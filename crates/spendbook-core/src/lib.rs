//! Core types and traits for Spendbook storage backends.
//!
//! This crate provides the `StorageBackend` trait, the expense record types and
//! the validation rules every record passes before it reaches a backend.

pub mod error;
pub mod models;
pub mod storage;

// Re-export key types at crate root for convenience
pub use error::{ExpenseError, Field, ValidationError};
pub use models::{CategoryTotals, DailyTotals, ExpenseStats, MonthlyTotals, YearMonth};
pub use models::read::{Expense, ExpenseId};
pub use models::write::{
    format_date, parse_date, DateRange, NewExpense, MAX_AMOUNT, MAX_AMOUNT_SCALE,
};
pub use storage::{StorageBackend, StorageError};
