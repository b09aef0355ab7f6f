use crate::models::{
    read::{Expense, ExpenseId},
    write::{DateRange, NewExpense},
    CategoryTotals, DailyTotals, ExpenseStats, MonthlyTotals, YearMonth,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("corrupt expense row: {0}")]
    Corrupt(String),
    #[error("{0}")]
    Other(String),
}

/// A store of expense records.
///
/// Every listing returns expenses most recent first (by date, then by
/// insertion), and every result is an owned snapshot.
pub trait StorageBackend: Send + Sync {
    /// Creates whatever schema the backend needs. Safe to call repeatedly.
    fn initialize(&self) -> Result<(), StorageError>;

    fn add_expense(&self, expense: &NewExpense) -> Result<ExpenseId, StorageError>;
    /// Inserts all of `expenses` or none of them. Ids are returned in input order.
    fn add_expenses(&self, expenses: &[NewExpense]) -> Result<Vec<ExpenseId>, StorageError>;
    fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, StorageError>;
    fn list_expenses(&self, limit: Option<usize>) -> Result<Vec<Expense>, StorageError>;
    fn expenses_by_category(&self, category: &str) -> Result<Vec<Expense>, StorageError>;
    fn expenses_by_date_range(&self, range: &DateRange) -> Result<Vec<Expense>, StorageError>;
    fn expenses_by_month(&self, month: YearMonth) -> Result<Vec<Expense>, StorageError>;

    /// Returns whether a record was actually removed.
    fn delete_expense(&self, id: ExpenseId) -> Result<bool, StorageError>;

    fn category_totals(&self) -> Result<CategoryTotals, StorageError>;
    fn monthly_totals(&self) -> Result<MonthlyTotals, StorageError>;
    fn daily_totals(&self, range: &DateRange) -> Result<DailyTotals, StorageError>;
    fn statistics(&self) -> Result<ExpenseStats, StorageError>;
}
