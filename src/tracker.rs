use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spendbook_core::{
    CategoryTotals, DailyTotals, DateRange, Expense, ExpenseError, ExpenseId, ExpenseStats,
    MonthlyTotals, NewExpense, StorageBackend, YearMonth,
};

/// Demonstration data offered on first run.
const SAMPLE_EXPENSES: &[(&str, &str, &str, Decimal)] = &[
    ("2024-01-15", "Food", "Lunch at restaurant", dec!(25.50)),
    ("2024-01-16", "Transportation", "Bus ticket", dec!(3.20)),
    ("2024-01-17", "Entertainment", "Movie ticket", dec!(12.00)),
    ("2024-01-18", "Food", "Groceries", dec!(45.30)),
    ("2024-01-19", "Utilities", "Electricity bill", dec!(85.00)),
    ("2024-01-20", "Transportation", "Gas", dec!(40.00)),
    ("2024-01-21", "Food", "Coffee", dec!(4.50)),
    ("2024-01-22", "Entertainment", "Concert ticket", dec!(75.00)),
    ("2024-01-23", "Shopping", "New clothes", dec!(120.00)),
    ("2024-01-24", "Food", "Dinner out", dec!(35.75)),
];

/// The expense store as seen by the shell and the report renderer.
///
/// Takes raw caller input, validates it, and hands only validated values to
/// the backend. Build one at startup and pass it around by reference.
pub struct ExpenseTracker {
    storage: Arc<dyn StorageBackend>,
}

impl ExpenseTracker {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub fn initialize(&self) -> Result<(), ExpenseError> {
        self.storage.initialize()?;
        tracing::info!("expense store initialized");
        Ok(())
    }

    pub fn add_expense(
        &self,
        date: &str,
        category: &str,
        description: &str,
        amount: Decimal,
    ) -> Result<ExpenseId, ExpenseError> {
        let expense = NewExpense::new(date, category, description, amount).map_err(|e| {
            tracing::debug!(field = %e.field(), error = %e, "expense rejected");
            e
        })?;
        let id = self.storage.add_expense(&expense)?;
        tracing::info!(id, category, %amount, "expense added");
        Ok(id)
    }

    pub fn list_expenses(&self, limit: Option<usize>) -> Result<Vec<Expense>, ExpenseError> {
        Ok(self.storage.list_expenses(limit)?)
    }

    pub fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, ExpenseError> {
        Ok(self.storage.get_expense(id)?)
    }

    pub fn expenses_by_category(&self, category: &str) -> Result<Vec<Expense>, ExpenseError> {
        Ok(self.storage.expenses_by_category(category)?)
    }

    pub fn expenses_by_date_range(&self, start: &str, end: &str) -> Result<Vec<Expense>, ExpenseError> {
        let range = DateRange::parse(start, end)?;
        Ok(self.storage.expenses_by_date_range(&range)?)
    }

    pub fn expenses_by_month(&self, year: i32, month: u8) -> Result<Vec<Expense>, ExpenseError> {
        let month = YearMonth::new(year, month)?;
        Ok(self.storage.expenses_by_month(month)?)
    }

    pub fn delete_expense(&self, id: ExpenseId) -> Result<bool, ExpenseError> {
        let deleted = self.storage.delete_expense(id)?;
        if deleted {
            tracing::info!(id, "expense deleted");
        } else {
            tracing::debug!(id, "no expense to delete");
        }
        Ok(deleted)
    }

    pub fn category_totals(&self) -> Result<CategoryTotals, ExpenseError> {
        Ok(self.storage.category_totals()?)
    }

    pub fn monthly_totals(&self) -> Result<MonthlyTotals, ExpenseError> {
        Ok(self.storage.monthly_totals()?)
    }

    pub fn daily_totals(&self, range: &DateRange) -> Result<DailyTotals, ExpenseError> {
        Ok(self.storage.daily_totals(range)?)
    }

    pub fn statistics(&self) -> Result<ExpenseStats, ExpenseError> {
        Ok(self.storage.statistics()?)
    }

    /// Inserts the demonstration expenses in one batch and returns how many
    /// were added. Either every sample row lands or none does.
    pub fn seed_sample_data(&self) -> Result<usize, ExpenseError> {
        let batch = SAMPLE_EXPENSES
            .iter()
            .map(|(date, category, description, amount)| {
                NewExpense::new(date, category, description, *amount)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ids = self.storage.add_expenses(&batch)?;
        tracing::info!(count = ids.len(), "sample expenses seeded");
        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendbook_core::{Field, ValidationError};
    use spendbook_memory::InMemoryStorage;
    use spendbook_sqlite::SqliteStorage;

    fn tracker() -> ExpenseTracker {
        let tracker = ExpenseTracker::new(Arc::new(InMemoryStorage::new()));
        tracker.initialize().unwrap();
        tracker
    }

    #[test]
    fn rejected_expense_leaves_store_untouched() {
        let tracker = tracker();
        tracker.add_expense("2024-01-15", "Food", "Lunch", dec!(10)).unwrap();

        let err = tracker.add_expense("2024-01-15", "Food", "Lunch", dec!(-1)).unwrap_err();
        match err {
            ExpenseError::Validation(v) => assert_eq!(v.field(), Field::Amount),
            other => panic!("Expected validation error, got {:?}", other),
        }
        assert_eq!(tracker.statistics().unwrap().count, 1);
    }

    #[test]
    fn inverted_range_is_a_validation_error() {
        let tracker = tracker();
        let err = tracker.expenses_by_date_range("2024-02-01", "2024-01-01").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn month_outside_calendar_is_rejected() {
        let tracker = tracker();
        match tracker.expenses_by_month(2024, 13) {
            Err(ExpenseError::Validation(ValidationError::InvalidMonth(13))) => {}
            other => panic!("Expected InvalidMonth, got {:?}", other),
        }
    }

    #[test]
    fn sample_data_goes_through_validation() {
        let tracker = tracker();
        assert_eq!(tracker.seed_sample_data().unwrap(), 10);

        let stats = tracker.statistics().unwrap();
        assert_eq!(stats.count, 10);
        assert_eq!(stats.total_amount, dec!(446.25));
        assert_eq!(stats.category_count, 5);
        assert_eq!(tracker.expenses_by_month(2024, 1).unwrap().len(), 10);
    }

    #[test]
    fn failed_seeding_leaves_no_sample_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("expenses.db");
        let path = path.to_str().unwrap();
        let tracker = ExpenseTracker::new(Arc::new(SqliteStorage::new(path).unwrap()));

        // Reject the last sample row from a second connection
        rusqlite::Connection::open(path)
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_dinner BEFORE INSERT ON expenses
                 WHEN NEW.description = 'Dinner out'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        match tracker.seed_sample_data() {
            Err(ExpenseError::Storage(_)) => {}
            other => panic!("Expected storage error, got {:?}", other),
        }
        assert!(tracker.statistics().unwrap().is_empty());
    }

    #[test]
    fn oversized_amount_is_a_validation_error() {
        let tracker = tracker();
        let err = tracker
            .add_expense("2024-01-15", "Food", "Big", dec!(1000000000000000000000000000))
            .unwrap_err();
        match err {
            ExpenseError::Validation(ValidationError::AmountTooLarge { .. }) => {}
            other => panic!("Expected AmountTooLarge, got {:?}", other),
        }
        assert!(tracker.statistics().unwrap().is_empty());
    }
}
