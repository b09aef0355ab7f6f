//! File-backed expense storage on top of SQLite.

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::{params, Connection, OptionalExtension, Params};
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal,
};
use spendbook_core::{
    format_date, parse_date, CategoryTotals, DailyTotals, DateRange, Expense, ExpenseId,
    ExpenseStats, MonthlyTotals, NewExpense, StorageBackend, StorageError, YearMonth,
    MAX_AMOUNT_SCALE,
};
use time::Date;

const SELECT_EXPENSES: &str = "SELECT id, date, category, description, amount FROM expenses";

type ExpenseRow = (i64, String, String, String, f64);

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path`, or a private
    /// in-memory database for `":memory:"`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            Connection::open(path)
        }
        .map_err(sql_err)?;

        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize()?;
        tracing::info!(path, "expense database opened");
        Ok(storage)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Other("expense database lock poisoned".to_string()))
    }

    fn query_expenses<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Expense>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(sql_err)?;
        let rows = stmt
            .query_map(params, read_row)
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        rows.into_iter().map(row_to_expense).collect()
    }
}

fn sql_err(e: rusqlite::Error) -> StorageError {
    StorageError::Other(e.to_string())
}

fn read_row(row: &rusqlite::Row) -> rusqlite::Result<ExpenseRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn row_to_expense((id, date, category, description, amount): ExpenseRow) -> Result<Expense, StorageError> {
    Ok(Expense {
        id,
        date: stored_date(&date)?,
        category: Arc::from(category.as_str()),
        description: Arc::from(description.as_str()),
        amount: stored_amount(amount)?,
    })
}

fn stored_date(s: &str) -> Result<Date, StorageError> {
    parse_date(s).map_err(|e| StorageError::Corrupt(e.to_string()))
}

/// REAL values and sums come back as the nearest f64; validated amounts never
/// carry more than `MAX_AMOUNT_SCALE` places, so rounding there restores them.
fn stored_amount(value: f64) -> Result<Decimal, StorageError> {
    if !value.is_finite() {
        return Err(StorageError::Corrupt(format!("stored amount {value} is not finite")));
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(MAX_AMOUNT_SCALE).normalize())
        .ok_or_else(|| StorageError::Other(format!("amount {value} is outside the decimal range")))
}

fn stored_count(value: i64) -> Result<u64, StorageError> {
    u64::try_from(value).map_err(|_| StorageError::Corrupt(format!("negative row count {value}")))
}

fn insert_expense(conn: &Connection, expense: &NewExpense) -> Result<ExpenseId, StorageError> {
    let amount = expense
        .amount()
        .to_f64()
        .ok_or_else(|| StorageError::Other(format!("amount {} cannot be stored", expense.amount())))?;

    conn.execute(
        "INSERT INTO expenses (date, category, description, amount) VALUES (?1, ?2, ?3, ?4)",
        params![
            format_date(expense.date()),
            expense.category().as_ref(),
            expense.description().as_ref(),
            amount
        ],
    )
    .map_err(sql_err)?;
    Ok(conn.last_insert_rowid())
}

fn sql_limit(limit: Option<usize>) -> i64 {
    // SQLite treats a negative LIMIT as unbounded
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

impl StorageBackend for SqliteStorage {
    fn initialize(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_date
                ON expenses(date);

            CREATE INDEX IF NOT EXISTS idx_expenses_category
                ON expenses(category);
            ",
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn add_expense(&self, expense: &NewExpense) -> Result<ExpenseId, StorageError> {
        let conn = self.conn()?;
        let id = insert_expense(&conn, expense)?;
        tracing::debug!(id, "expense inserted");
        Ok(id)
    }

    fn add_expenses(&self, expenses: &[NewExpense]) -> Result<Vec<ExpenseId>, StorageError> {
        let mut conn = self.conn()?;
        // Dropping the transaction without commit rolls every insert back
        let tx = conn.transaction().map_err(sql_err)?;
        let ids = expenses
            .iter()
            .map(|e| insert_expense(&tx, e))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit().map_err(sql_err)?;
        tracing::debug!(count = ids.len(), "expense batch inserted");
        Ok(ids)
    }

    fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, StorageError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(&format!("{SELECT_EXPENSES} WHERE id = ?1"), params![id], read_row)
            .optional()
            .map_err(sql_err)?;
        row.map(row_to_expense).transpose()
    }

    fn list_expenses(&self, limit: Option<usize>) -> Result<Vec<Expense>, StorageError> {
        self.query_expenses(
            &format!("{SELECT_EXPENSES} ORDER BY date DESC, id DESC LIMIT ?1"),
            params![sql_limit(limit)],
        )
    }

    fn expenses_by_category(&self, category: &str) -> Result<Vec<Expense>, StorageError> {
        self.query_expenses(
            &format!("{SELECT_EXPENSES} WHERE category = ?1 ORDER BY date DESC, id DESC"),
            params![category],
        )
    }

    fn expenses_by_date_range(&self, range: &DateRange) -> Result<Vec<Expense>, StorageError> {
        self.query_expenses(
            &format!("{SELECT_EXPENSES} WHERE date BETWEEN ?1 AND ?2 ORDER BY date DESC, id DESC"),
            params![format_date(range.start()), format_date(range.end())],
        )
    }

    fn expenses_by_month(&self, month: YearMonth) -> Result<Vec<Expense>, StorageError> {
        self.query_expenses(
            &format!("{SELECT_EXPENSES} WHERE strftime('%Y-%m', date) = ?1 ORDER BY date DESC, id DESC"),
            params![month.to_string()],
        )
    }

    fn delete_expense(&self, id: ExpenseId) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM expenses WHERE id = ?1", params![id])
            .map_err(sql_err)?;
        tracing::debug!(id, deleted, "expense delete");
        Ok(deleted > 0)
    }

    fn category_totals(&self) -> Result<CategoryTotals, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT category, SUM(amount) FROM expenses GROUP BY category")
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))
            .map_err(sql_err)?;

        let mut result = CategoryTotals::new();
        for row in rows {
            let (category, total) = row.map_err(sql_err)?;
            result.insert(Arc::from(category.as_str()), stored_amount(total)?);
        }
        Ok(result)
    }

    fn monthly_totals(&self) -> Result<MonthlyTotals, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT strftime('%Y-%m', date) AS month, SUM(amount)
                 FROM expenses
                 GROUP BY month",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, f64>(1)?)))
            .map_err(sql_err)?;

        let mut result = MonthlyTotals::new();
        for row in rows {
            let (month, total) = row.map_err(sql_err)?;
            let month = month
                .ok_or_else(|| StorageError::Corrupt("expense date is not a calendar date".to_string()))?
                .parse::<YearMonth>()
                .map_err(StorageError::Corrupt)?;
            result.insert(month, stored_amount(total)?);
        }
        Ok(result)
    }

    fn daily_totals(&self, range: &DateRange) -> Result<DailyTotals, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, SUM(amount)
                 FROM expenses
                 WHERE date BETWEEN ?1 AND ?2
                 GROUP BY date",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(
                params![format_date(range.start()), format_date(range.end())],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .map_err(sql_err)?;

        let mut result = DailyTotals::new();
        for row in rows {
            let (date, total) = row.map_err(sql_err)?;
            result.insert(stored_date(&date)?, stored_amount(total)?);
        }
        Ok(result)
    }

    fn statistics(&self) -> Result<ExpenseStats, StorageError> {
        let conn = self.conn()?;
        let (count, total, categories, earliest, latest): (i64, Option<f64>, i64, Option<String>, Option<String>) = conn
            .query_row(
                "SELECT COUNT(*), SUM(amount), COUNT(DISTINCT category), MIN(date), MAX(date)
                 FROM expenses",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .map_err(sql_err)?;

        Ok(ExpenseStats {
            count: stored_count(count)?,
            total_amount: total.map(stored_amount).transpose()?.unwrap_or(Decimal::ZERO),
            category_count: stored_count(categories)?,
            earliest: earliest.as_deref().map(stored_date).transpose()?,
            latest: latest.as_deref().map(stored_date).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expense(date: &str, category: &str, description: &str, amount: Decimal) -> NewExpense {
        NewExpense::new(date, category, description, amount).unwrap()
    }

    #[test]
    fn test_sqlite_basic_operations() {
        let storage = SqliteStorage::new(":memory:").unwrap();

        let lunch = storage
            .add_expense(&expense("2024-01-15", "Food", "Lunch", dec!(25.50)))
            .unwrap();
        let bus = storage
            .add_expense(&expense("2024-02-01", "Transportation", "Bus", dec!(5.00)))
            .unwrap();
        assert_ne!(lunch, bus);

        let all = storage.list_expenses(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, bus, "most recent date comes first");
        assert_eq!(all[1].amount, dec!(25.50));
        assert_eq!(all[1].description.as_ref(), "Lunch");

        let fetched = storage.get_expense(lunch).unwrap().unwrap();
        assert_eq!(fetched, all[1]);
        assert!(storage.get_expense(9999).unwrap().is_none());
    }

    #[test]
    fn test_sqlite_limit_and_tie_break() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        let first = storage
            .add_expense(&expense("2024-03-01", "Food", "Breakfast", dec!(4)))
            .unwrap();
        let second = storage
            .add_expense(&expense("2024-03-01", "Food", "Dinner", dec!(18)))
            .unwrap();

        let listed = storage.list_expenses(Some(1)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, second);

        let both: Vec<_> = storage.list_expenses(None).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(both, vec![second, first]);
        assert!(storage.list_expenses(Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_ids_not_reused_after_delete() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        let id = storage
            .add_expense(&expense("2024-01-15", "Food", "Lunch", dec!(12)))
            .unwrap();
        assert!(storage.delete_expense(id).unwrap());
        assert!(!storage.delete_expense(id).unwrap());

        let next = storage
            .add_expense(&expense("2024-01-16", "Food", "Lunch", dec!(12)))
            .unwrap();
        assert!(next > id);
    }

    #[test]
    fn test_sqlite_aggregations() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        storage.add_expense(&expense("2024-01-15", "Food", "Lunch", dec!(25.50))).unwrap();
        storage.add_expense(&expense("2024-01-20", "Food", "Dinner", dec!(30.00))).unwrap();
        storage.add_expense(&expense("2024-02-01", "Transportation", "Bus", dec!(5.00))).unwrap();

        let by_category = storage.category_totals().unwrap();
        assert_eq!(by_category.get("Food"), Some(&dec!(55.50)));
        assert_eq!(by_category.get("Transportation"), Some(&dec!(5)));

        let by_month = storage.monthly_totals().unwrap();
        assert_eq!(by_month[&YearMonth::new(2024, 1).unwrap()], dec!(55.5));
        assert_eq!(by_month[&YearMonth::new(2024, 2).unwrap()], dec!(5));

        let range = DateRange::parse("2024-01-15", "2024-01-31").unwrap();
        let daily = storage.daily_totals(&range).unwrap();
        assert_eq!(daily.len(), 2);

        let stats = storage.statistics().unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_amount, dec!(60.50));
        assert_eq!(stats.category_count, 2);
        assert_eq!(stats.earliest, Some(parse_date("2024-01-15").unwrap()));
        assert_eq!(stats.latest, Some(parse_date("2024-02-01").unwrap()));
    }

    #[test]
    fn test_sqlite_empty_statistics() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        let stats = storage.statistics().unwrap();
        assert_eq!(stats, ExpenseStats::default());
        assert!(storage.category_totals().unwrap().is_empty());
        assert!(storage.monthly_totals().unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_file_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("expenses.db");
        let path = path.to_str().unwrap();

        {
            let storage = SqliteStorage::new(path).unwrap();
            storage.add_expense(&expense("2024-01-15", "Food", "Lunch", dec!(9.99))).unwrap();
            storage.initialize().unwrap();
        }

        let reopened = SqliteStorage::new(path).unwrap();
        reopened.initialize().unwrap();
        let all = reopened.list_expenses(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].amount, dec!(9.99));
    }

    #[test]
    fn test_sqlite_batch_insert_is_all_or_nothing() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        storage
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_broken BEFORE INSERT ON expenses
                 WHEN NEW.description = 'broken'
                 BEGIN SELECT RAISE(ABORT, 'insert rejected'); END;",
            )
            .unwrap();

        let batch = [
            expense("2024-01-15", "Food", "Lunch", dec!(25.50)),
            expense("2024-01-16", "Food", "Dinner", dec!(30)),
            expense("2024-01-17", "Food", "broken", dec!(1)),
        ];
        match storage.add_expenses(&batch) {
            Err(StorageError::Other(msg)) => assert!(msg.contains("insert rejected")),
            other => panic!("Expected Other, got {:?}", other),
        }
        assert_eq!(storage.statistics().unwrap().count, 0);

        let ids = storage.add_expenses(&batch[..2]).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(storage.statistics().unwrap().count, 2);
    }

    #[test]
    fn test_sqlite_amount_extremes_read_back_exactly() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        let largest = dec!(9999999999.9999);
        let smallest = dec!(0.0001);
        let big = storage.add_expense(&expense("2024-01-15", "Food", "big", largest)).unwrap();
        let tiny = storage.add_expense(&expense("2024-01-15", "Food", "tiny", smallest)).unwrap();

        assert_eq!(storage.get_expense(big).unwrap().unwrap().amount, largest);
        assert_eq!(storage.get_expense(tiny).unwrap().unwrap().amount, smallest);
        assert_eq!(storage.statistics().unwrap().total_amount, dec!(10000000000));
    }

    #[test]
    fn test_sqlite_non_finite_amount_is_corrupt() {
        assert!(matches!(stored_amount(f64::INFINITY), Err(StorageError::Corrupt(_))));
        assert!(matches!(stored_count(-1), Err(StorageError::Corrupt(_))));
        assert_eq!(stored_count(3).unwrap(), 3);
    }

    #[test]
    fn test_sqlite_corrupt_row_is_reported() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        storage
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO expenses (date, category, description, amount) VALUES ('15/01/2024', 'Food', 'Lunch', 3.0)",
                [],
            )
            .unwrap();

        match storage.list_expenses(None) {
            Err(StorageError::Corrupt(_)) => {}
            other => panic!("Expected Corrupt, got {:?}", other),
        }
    }
}
