pub mod charts;
pub mod config;
pub mod reports;
pub mod shell;
pub mod tracker;

pub use charts::ChartRenderer;
pub use reports::ReportError;
pub use shell::{Shell, ShellError, SuggestedCategory};
pub use tracker::ExpenseTracker;
