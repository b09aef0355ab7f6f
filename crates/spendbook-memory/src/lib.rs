use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        atomic::{AtomicI64, Ordering},
        RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use rust_decimal::Decimal;
use spendbook_core::{
    CategoryTotals, DailyTotals, DateRange, Expense, ExpenseId, ExpenseStats, MonthlyTotals,
    NewExpense, StorageBackend, StorageError, YearMonth,
};

/// Keeps expenses in process memory. Nothing survives a restart.
pub struct InMemoryStorage {
    expenses: RwLock<BTreeMap<ExpenseId, Expense>>,
    id_counter: AtomicI64,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            expenses: RwLock::new(BTreeMap::new()),
            id_counter: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> ExpenseId {
        self.id_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<ExpenseId, Expense>>, StorageError> {
        self.expenses
            .read()
            .map_err(|_| StorageError::Other("expense map lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<ExpenseId, Expense>>, StorageError> {
        self.expenses
            .write()
            .map_err(|_| StorageError::Other("expense map lock poisoned".to_string()))
    }

    fn insert(&self, expenses: &mut BTreeMap<ExpenseId, Expense>, expense: &NewExpense) -> ExpenseId {
        let id = self.next_id();
        expenses.insert(
            id,
            Expense {
                id,
                date: expense.date(),
                category: expense.category().clone(),
                description: expense.description().clone(),
                amount: expense.amount(),
            },
        );
        id
    }

    fn select<F>(&self, filter: F) -> Result<Vec<Expense>, StorageError>
    where
        F: Fn(&Expense) -> bool,
    {
        let expenses = self.read()?;
        let mut result: Vec<Expense> = expenses.values().filter(|e| filter(e)).cloned().collect();
        result.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(result)
    }
}

fn accumulate(total: &mut Decimal, amount: Decimal) -> Result<(), StorageError> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| StorageError::Other(format!("total overflowed adding {amount}")))?;
    Ok(())
}

impl StorageBackend for InMemoryStorage {
    fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn add_expense(&self, expense: &NewExpense) -> Result<ExpenseId, StorageError> {
        let mut expenses = self.write()?;
        let id = self.insert(&mut expenses, expense);
        tracing::debug!(id, "expense inserted");
        Ok(id)
    }

    fn add_expenses(&self, batch: &[NewExpense]) -> Result<Vec<ExpenseId>, StorageError> {
        // One write guard for the whole batch: nothing after the lock can fail
        let mut expenses = self.write()?;
        let ids: Vec<_> = batch.iter().map(|e| self.insert(&mut expenses, e)).collect();
        tracing::debug!(count = ids.len(), "expense batch inserted");
        Ok(ids)
    }

    fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, StorageError> {
        Ok(self.read()?.get(&id).cloned())
    }

    fn list_expenses(&self, limit: Option<usize>) -> Result<Vec<Expense>, StorageError> {
        let mut result = self.select(|_| true)?;
        if let Some(limit) = limit {
            result.truncate(limit);
        }
        Ok(result)
    }

    fn expenses_by_category(&self, category: &str) -> Result<Vec<Expense>, StorageError> {
        self.select(|e| e.category.as_ref() == category)
    }

    fn expenses_by_date_range(&self, range: &DateRange) -> Result<Vec<Expense>, StorageError> {
        self.select(|e| range.contains(e.date))
    }

    fn expenses_by_month(&self, month: YearMonth) -> Result<Vec<Expense>, StorageError> {
        self.select(|e| YearMonth::from(e.date) == month)
    }

    fn delete_expense(&self, id: ExpenseId) -> Result<bool, StorageError> {
        let deleted = self.write()?.remove(&id).is_some();
        tracing::debug!(id, deleted, "expense delete");
        Ok(deleted)
    }

    fn category_totals(&self) -> Result<CategoryTotals, StorageError> {
        let mut result = CategoryTotals::new();
        for e in self.read()?.values() {
            accumulate(result.entry(e.category.clone()).or_insert(Decimal::ZERO), e.amount)?;
        }
        Ok(result)
    }

    fn monthly_totals(&self) -> Result<MonthlyTotals, StorageError> {
        let mut result = MonthlyTotals::new();
        for e in self.read()?.values() {
            accumulate(result.entry(YearMonth::from(e.date)).or_insert(Decimal::ZERO), e.amount)?;
        }
        Ok(result)
    }

    fn daily_totals(&self, range: &DateRange) -> Result<DailyTotals, StorageError> {
        let mut result = DailyTotals::new();
        for e in self.read()?.values().filter(|e| range.contains(e.date)) {
            accumulate(result.entry(e.date).or_insert(Decimal::ZERO), e.amount)?;
        }
        Ok(result)
    }

    fn statistics(&self) -> Result<ExpenseStats, StorageError> {
        let expenses = self.read()?;
        let categories: HashSet<&str> = expenses.values().map(|e| e.category.as_ref()).collect();
        let mut total_amount = Decimal::ZERO;
        for e in expenses.values() {
            accumulate(&mut total_amount, e.amount)?;
        }
        Ok(ExpenseStats {
            count: expenses.len() as u64,
            total_amount,
            category_count: categories.len() as u64,
            earliest: expenses.values().map(|e| e.date).min(),
            latest: expenses.values().map(|e| e.date).max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn add(storage: &InMemoryStorage, date: &str, category: &str, amount: Decimal) -> ExpenseId {
        storage
            .add_expense(&NewExpense::new(date, category, "test", amount).unwrap())
            .unwrap()
    }

    #[test]
    fn test_memory_ids_are_monotonic() {
        let storage = InMemoryStorage::new();
        let a = add(&storage, "2024-01-01", "Food", dec!(1));
        assert!(storage.delete_expense(a).unwrap());
        let b = add(&storage, "2024-01-01", "Food", dec!(1));
        assert!(b > a);
    }

    #[test]
    fn test_memory_batch_insert_assigns_ids_in_order() {
        let storage = InMemoryStorage::new();
        let batch = [
            NewExpense::new("2024-01-01", "Food", "a", dec!(1)).unwrap(),
            NewExpense::new("2024-01-02", "Food", "b", dec!(2)).unwrap(),
        ];
        let ids = storage.add_expenses(&batch).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);
        assert_eq!(storage.get_expense(ids[1]).unwrap().unwrap().description.as_ref(), "b");
    }

    #[test]
    fn test_memory_largest_amounts_sum_without_panicking() {
        let storage = InMemoryStorage::new();
        for _ in 0..3 {
            add(&storage, "2024-01-01", "Food", spendbook_core::MAX_AMOUNT);
        }
        let stats = storage.statistics().unwrap();
        assert_eq!(stats.total_amount, dec!(30000000000));
        assert_eq!(storage.category_totals().unwrap().get("Food"), Some(&dec!(30000000000)));
    }

    #[test]
    fn test_memory_accumulate_reports_overflow() {
        let mut total = Decimal::MAX;
        assert!(matches!(accumulate(&mut total, dec!(1)), Err(StorageError::Other(_))));
        assert_eq!(total, Decimal::MAX);
    }

    #[test]
    fn test_memory_category_match_is_case_sensitive() {
        let storage = InMemoryStorage::new();
        add(&storage, "2024-01-01", "Food", dec!(1));
        add(&storage, "2024-01-02", "food", dec!(2));

        let food = storage.expenses_by_category("Food").unwrap();
        assert_eq!(food.len(), 1);
        assert_eq!(food[0].amount, dec!(1));
        assert!(storage.expenses_by_category("FOOD").unwrap().is_empty());
    }

    #[test]
    fn test_memory_statistics() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.statistics().unwrap(), ExpenseStats::default());

        add(&storage, "2024-03-05", "Food", dec!(0.10));
        add(&storage, "2024-01-05", "Shopping", dec!(0.20));
        let stats = storage.statistics().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_amount, dec!(0.30));
        assert_eq!(stats.category_count, 2);
        assert_eq!(stats.earliest.map(spendbook_core::format_date).as_deref(), Some("2024-01-05"));
        assert_eq!(stats.latest.map(spendbook_core::format_date).as_deref(), Some("2024-03-05"));
    }
}
