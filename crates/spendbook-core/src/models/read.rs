use std::sync::Arc;

use rust_decimal::Decimal;
use time::Date;

pub type ExpenseId = i64;

/// A persisted expense, handed out by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expense {
    pub id: ExpenseId,
    pub date: Date,
    pub category: Arc<str>,
    pub description: Arc<str>,
    pub amount: Decimal,
}
