//! Text summaries and CSV export built from store snapshots.

use std::{
    fs,
    path::{Path, PathBuf},
};

use prettytable::{format, row, Table};
use rust_decimal::Decimal;
use serde::Serialize;
use spendbook_core::{format_date, CategoryTotals, Expense, ExpenseStats, MonthlyTotals};
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime};

const DESCRIPTION_WIDTH: usize = 24;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("timestamp error: {0}")]
    Format(#[from] time::error::Format),
    #[error("no expense data available for {0}")]
    NoData(&'static str),
}

pub fn money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// Share of `total` as a percentage, or "-" when it cannot be computed.
fn percent(part: Decimal, total: Option<Decimal>) -> String {
    total
        .and_then(|total| part.checked_div(total))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or_else(|| "-".to_string(), |pct| format!("{:.1}%", pct))
}

fn checked_total<'a>(amounts: impl IntoIterator<Item = &'a Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))
}

fn money_or_overflow(amount: Option<Decimal>) -> String {
    amount.map_or_else(|| "overflow".to_string(), money)
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table
}

pub fn expense_table(expenses: &[Expense]) -> Table {
    let mut table = new_table();
    table.set_titles(row!["ID", "Date", "Category", "Description", "Amount"]);
    for e in expenses {
        table.add_row(row![
            r->e.id,
            format_date(e.date),
            e.category,
            truncate(&e.description, DESCRIPTION_WIDTH),
            r->money(e.amount)
        ]);
    }
    table
}

/// Listing shown by the shell: a table plus a footer count.
pub fn expense_list(expenses: &[Expense]) -> String {
    if expenses.is_empty() {
        return "No expenses found.\n".to_string();
    }
    format!("{}Total: {} expenses\n", expense_table(expenses), expenses.len())
}

pub fn category_summary(totals: &CategoryTotals) -> String {
    if totals.is_empty() {
        return "No expense data available.\n".to_string();
    }

    let total = checked_total(totals.values());
    let mut sorted: Vec<_> = totals.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut table = new_table();
    table.set_titles(row!["Category", "Amount", "Share"]);
    for (category, amount) in sorted {
        table.add_row(row![category, r->money(*amount), r->percent(*amount, total)]);
    }
    table.add_row(row!["TOTAL", r->money_or_overflow(total), ""]);
    format!("CATEGORY SUMMARY\n{}", table)
}

pub fn monthly_summary(totals: &MonthlyTotals) -> String {
    if totals.is_empty() {
        return "No expense data available.\n".to_string();
    }

    let total = checked_total(totals.values());
    let mut table = new_table();
    table.set_titles(row!["Month", "Amount", "Share"]);
    for (month, amount) in totals.iter().rev() {
        table.add_row(row![month, r->money(*amount), r->percent(*amount, total)]);
    }
    table.add_row(row!["TOTAL", r->money_or_overflow(total), ""]);
    format!("MONTHLY SUMMARY\n{}", table)
}

pub fn statistics_report(stats: &ExpenseStats) -> String {
    let mut out = String::from("STATISTICS\n");
    out.push_str(&format!("Total Expenses: {}\n", stats.count));
    out.push_str(&format!("Total Amount: {}\n", money(stats.total_amount)));
    out.push_str(&format!("Categories: {}\n", stats.category_count));
    if let Some(avg) = stats.average() {
        out.push_str(&format!("Average per Expense: {}\n", money(avg)));
    }
    if let (Some(earliest), Some(latest)) = (stats.earliest, stats.latest) {
        out.push_str(&format!(
            "Date Range: {} to {}\n",
            format_date(earliest),
            format_date(latest)
        ));
    }
    out
}

/// Statistics followed by the most recent expenses. `recent` is expected to
/// be ordered most recent first and already limited by the caller.
pub fn detailed_report(stats: &ExpenseStats, recent: &[Expense]) -> String {
    if stats.is_empty() {
        return "No expense data available.\n".to_string();
    }

    let mut out = String::from("DETAILED EXPENSE REPORT\n");
    out.push_str(&statistics_report(stats));
    out.push_str(&format!("\nRecent Expenses (Last {}):\n", recent.len()));
    out.push_str(&expense_table(recent).to_string());

    let remaining = stats.count.saturating_sub(recent.len() as u64);
    if remaining > 0 {
        out.push_str(&format!("... and {} more expenses\n", remaining));
    }
    out
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    id: i64,
    date: String,
    category: &'a str,
    description: &'a str,
    amount: String,
}

/// Writes every expense to `path`, or to a timestamped file in `export_dir`.
pub fn export_csv(
    expenses: &[Expense],
    path: Option<&Path>,
    export_dir: &Path,
) -> Result<PathBuf, ReportError> {
    if expenses.is_empty() {
        return Err(ReportError::NoData("export"));
    }

    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let stamp = OffsetDateTime::now_utc()
                .format(format_description!("[year][month][day]_[hour][minute][second]"))?;
            export_dir.join(format!("expenses_{stamp}.csv"))
        }
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(&path)?;
    for e in expenses {
        writer.serialize(CsvRecord {
            id: e.id,
            date: format_date(e.date),
            category: &e.category,
            description: &e.description,
            amount: e.amount.to_string(),
        })?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = expenses.len(), "expenses exported");
    Ok(path)
}
