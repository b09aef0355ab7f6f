//! Numbered-menu front end over an [`ExpenseTracker`].

use std::{
    fmt,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use rust_decimal::Decimal;
use spendbook_core::{format_date, DateRange, ExpenseError, ExpenseId};
use thiserror::Error;
use time::OffsetDateTime;

use crate::{
    charts::ChartRenderer,
    config::ReportsConfig,
    reports::{self, money, ReportError},
    tracker::ExpenseTracker,
};

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("terminal IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Expense(#[from] ExpenseError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Categories offered at the prompt. Any other text is accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestedCategory {
    Food,
    Transportation,
    Entertainment,
    Utilities,
    Shopping,
    Healthcare,
}

impl SuggestedCategory {
    pub const ALL: [SuggestedCategory; 6] = [
        SuggestedCategory::Food,
        SuggestedCategory::Transportation,
        SuggestedCategory::Entertainment,
        SuggestedCategory::Utilities,
        SuggestedCategory::Shopping,
        SuggestedCategory::Healthcare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestedCategory::Food => "Food",
            SuggestedCategory::Transportation => "Transportation",
            SuggestedCategory::Entertainment => "Entertainment",
            SuggestedCategory::Utilities => "Utilities",
            SuggestedCategory::Shopping => "Shopping",
            SuggestedCategory::Healthcare => "Healthcare",
        }
    }
}

impl fmt::Display for SuggestedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const RULE: &str = "==================================================";

const MAIN_MENU: &str = "\
1. Add expense
2. List expenses
3. Delete expense
4. View summaries
5. Generate charts
6. Detailed report
7. Statistics
8. Export to CSV
0. Exit";

const CHART_MENU: &str = "\
1. Category bar chart
2. Monthly bar chart
3. Category pie chart
4. Daily trend chart
5. All charts
0. Back";

pub struct Shell<'a, R, W> {
    tracker: &'a ExpenseTracker,
    reports: &'a ReportsConfig,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(tracker: &'a ExpenseTracker, reports: &'a ReportsConfig, input: R, output: W) -> Self {
        Self {
            tracker,
            reports,
            input,
            output,
        }
    }

    /// Seeds the sample expenses when the store is empty. Returns whether
    /// anything was added.
    pub fn welcome(&mut self) -> Result<bool, ShellError> {
        if !self.tracker.statistics()?.is_empty() {
            return Ok(false);
        }
        writeln!(self.output, "Welcome to Spendbook!")?;
        writeln!(self.output, "Your expense book is empty, adding some sample expenses to get you started...")?;
        let count = self.tracker.seed_sample_data()?;
        writeln!(self.output, "Added {} sample expenses.\n", count)?;
        Ok(true)
    }

    /// Runs the menu until the user picks exit or input ends.
    pub fn run(&mut self) -> Result<(), ShellError> {
        loop {
            writeln!(self.output, "\n{}\nSPENDBOOK\n{}\n{}", RULE, RULE, MAIN_MENU)?;
            let choice = match self.prompt("Choose an option: ")? {
                Some(choice) => choice,
                None => break,
            };

            let result = match choice.as_str() {
                "1" => self.add_expense(),
                "2" => self.list_expenses(),
                "3" => self.delete_expense(),
                "4" => self.summaries(),
                "5" => self.charts(),
                "6" => self.detailed_report(),
                "7" => self.statistics(),
                "8" => self.export_csv(),
                "0" => break,
                other => {
                    writeln!(self.output, "Unknown option '{}'.", other)?;
                    Ok(Step::Continue)
                }
            };

            match result {
                Ok(Step::Continue) => {}
                Ok(Step::Quit) => break,
                Err(ShellError::Io(e)) => return Err(ShellError::Io(e)),
                Err(e) => {
                    tracing::warn!(error = %e, "menu action failed");
                    writeln!(self.output, "Error: {}", e)?;
                }
            }
        }
        writeln!(self.output, "Goodbye!")?;
        Ok(())
    }

    /// Reads one trimmed line. `None` means the input is exhausted.
    fn prompt(&mut self, text: &str) -> Result<Option<String>, ShellError> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Prompt whose answer must parse as `T`. Bad input is reported to the
    /// user before returning `Answer::Invalid`.
    fn prompt_parsed<T: FromStr>(&mut self, text: &str, what: &str) -> Result<Answer<T>, ShellError> {
        let raw = match self.prompt(text)? {
            Some(raw) => raw,
            None => return Ok(Answer::Eof),
        };
        match raw.parse::<T>() {
            Ok(value) => Ok(Answer::Value(value)),
            Err(_) => {
                writeln!(self.output, "Error: '{}' is not a valid {}.", raw, what)?;
                Ok(Answer::Invalid)
            }
        }
    }

    fn add_expense(&mut self) -> Result<Step, ShellError> {
        writeln!(self.output, "\nADD NEW EXPENSE")?;

        let Some(mut date) = self.prompt("Date (YYYY-MM-DD, blank for today): ")? else {
            return Ok(Step::Quit);
        };
        if date.is_empty() {
            date = format_date(OffsetDateTime::now_utc().date());
        }

        let suggestions: Vec<_> = SuggestedCategory::ALL.iter().map(|c| c.as_str()).collect();
        writeln!(self.output, "Suggested categories: {}", suggestions.join(", "))?;
        let Some(category) = self.prompt("Category: ")? else {
            return Ok(Step::Quit);
        };
        let Some(description) = self.prompt("Description: ")? else {
            return Ok(Step::Quit);
        };
        let amount = match self.prompt_parsed::<Decimal>("Amount: $", "amount")? {
            Answer::Value(amount) => amount,
            Answer::Invalid => return Ok(Step::Continue),
            Answer::Eof => return Ok(Step::Quit),
        };

        let id = self.tracker.add_expense(&date, &category, &description, amount)?;
        writeln!(self.output, "Expense added with ID {} ({} on {}).", id, money(amount), date)?;
        Ok(Step::Continue)
    }

    fn list_expenses(&mut self) -> Result<Step, ShellError> {
        let Some(raw) = self.prompt("How many expenses to show (blank for all): ")? else {
            return Ok(Step::Quit);
        };
        let limit = if raw.is_empty() {
            None
        } else {
            match raw.parse::<usize>() {
                Ok(n) => Some(n),
                Err(_) => {
                    writeln!(self.output, "Error: '{}' is not a valid count.", raw)?;
                    return Ok(Step::Continue);
                }
            }
        };

        let expenses = self.tracker.list_expenses(limit)?;
        write!(self.output, "\n{}", reports::expense_list(&expenses))?;
        Ok(Step::Continue)
    }

    fn delete_expense(&mut self) -> Result<Step, ShellError> {
        let id = match self.prompt_parsed::<ExpenseId>("Expense ID to delete: ", "expense ID")? {
            Answer::Value(id) => id,
            Answer::Invalid => return Ok(Step::Continue),
            Answer::Eof => return Ok(Step::Quit),
        };

        let Some(expense) = self.tracker.get_expense(id)? else {
            writeln!(self.output, "No expense with ID {}.", id)?;
            return Ok(Step::Continue);
        };
        write!(self.output, "{}", reports::expense_table(std::slice::from_ref(&expense)))?;

        let Some(confirm) = self.prompt("Delete this expense? (y/N): ")? else {
            return Ok(Step::Quit);
        };
        if matches!(confirm.to_lowercase().as_str(), "y" | "yes") {
            if self.tracker.delete_expense(id)? {
                writeln!(self.output, "Expense {} deleted.", id)?;
            } else {
                writeln!(self.output, "Expense {} was already gone.", id)?;
            }
        } else {
            writeln!(self.output, "Deletion cancelled.")?;
        }
        Ok(Step::Continue)
    }

    fn summaries(&mut self) -> Result<Step, ShellError> {
        let categories = self.tracker.category_totals()?;
        let months = self.tracker.monthly_totals()?;
        write!(
            self.output,
            "\n{}\n{}",
            reports::category_summary(&categories),
            reports::monthly_summary(&months)
        )?;
        Ok(Step::Continue)
    }

    fn charts(&mut self) -> Result<Step, ShellError> {
        let renderer = ChartRenderer::new(&self.reports.chart_dir);
        loop {
            writeln!(self.output, "\nCHARTS\n{}", CHART_MENU)?;
            let Some(choice) = self.prompt("Choose a chart: ")? else {
                return Ok(Step::Quit);
            };

            let result = match choice.as_str() {
                "1" => self.category_bar(&renderer).map(|p| vec![p]),
                "2" => self.monthly_bar(&renderer).map(|p| vec![p]),
                "3" => self.category_pie(&renderer).map(|p| vec![p]),
                "4" => self.trend(&renderer).map(|p| vec![p]),
                "5" => self.all_charts(&renderer),
                "0" => return Ok(Step::Continue),
                other => {
                    writeln!(self.output, "Unknown option '{}'.", other)?;
                    continue;
                }
            };

            match result {
                Ok(paths) => {
                    for path in paths {
                        writeln!(self.output, "Chart saved to {}", path.display())?;
                    }
                }
                Err(ShellError::Io(e)) => return Err(ShellError::Io(e)),
                Err(e) => writeln!(self.output, "Error: {}", e)?,
            }
        }
    }

    fn category_bar(&self, renderer: &ChartRenderer) -> Result<PathBuf, ShellError> {
        Ok(renderer.category_bar_chart(&self.tracker.category_totals()?)?)
    }

    fn monthly_bar(&self, renderer: &ChartRenderer) -> Result<PathBuf, ShellError> {
        Ok(renderer.monthly_bar_chart(&self.tracker.monthly_totals()?)?)
    }

    fn category_pie(&self, renderer: &ChartRenderer) -> Result<PathBuf, ShellError> {
        Ok(renderer.category_pie_chart(&self.tracker.category_totals()?)?)
    }

    fn trend(&self, renderer: &ChartRenderer) -> Result<PathBuf, ShellError> {
        let range = DateRange::last_days(OffsetDateTime::now_utc().date(), self.reports.trend_days);
        Ok(renderer.trend_chart(&self.tracker.daily_totals(&range)?, &range)?)
    }

    /// Draws every chart that has data; charts without data are skipped.
    fn all_charts(&mut self, renderer: &ChartRenderer) -> Result<Vec<PathBuf>, ShellError> {
        let attempts = [
            self.category_bar(renderer),
            self.monthly_bar(renderer),
            self.category_pie(renderer),
            self.trend(renderer),
        ];
        let mut paths = Vec::new();
        for attempt in attempts {
            match attempt {
                Ok(path) => paths.push(path),
                Err(ShellError::Report(ReportError::NoData(what))) => {
                    writeln!(self.output, "Skipped {}: no data.", what)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(paths)
    }

    fn detailed_report(&mut self) -> Result<Step, ShellError> {
        let stats = self.tracker.statistics()?;
        let recent = self.tracker.list_expenses(Some(self.reports.recent_limit))?;
        write!(self.output, "\n{}", reports::detailed_report(&stats, &recent))?;
        Ok(Step::Continue)
    }

    fn statistics(&mut self) -> Result<Step, ShellError> {
        let stats = self.tracker.statistics()?;
        write!(self.output, "\n{}", reports::statistics_report(&stats))?;
        Ok(Step::Continue)
    }

    fn export_csv(&mut self) -> Result<Step, ShellError> {
        let Some(raw) = self.prompt("Export file (blank for default location): ")? else {
            return Ok(Step::Quit);
        };
        let expenses = self.tracker.list_expenses(None)?;
        let target = (!raw.is_empty()).then(|| Path::new(&raw));
        let path = reports::export_csv(&expenses, target, &self.reports.export_dir)?;
        writeln!(self.output, "Exported {} expenses to {}", expenses.len(), path.display())?;
        Ok(Step::Continue)
    }
}

enum Step {
    Continue,
    Quit,
}

enum Answer<T> {
    Value(T),
    Invalid,
    Eof,
}
