use std::{io, sync::Arc};

use anyhow::Context;
use clap::Parser;
use spendbook::{
    config::{CliArgs, Config, LoggingConfig},
    ExpenseTracker, Shell,
};
use spendbook_sqlite::SqliteStorage;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);
    init_tracing(&config.logging);

    tracing::info!(path = %config.storage.path, "opening expense database");
    let storage = SqliteStorage::new(&config.storage.path)
        .with_context(|| format!("failed to open expense database at {}", config.storage.path))?;
    let tracker = ExpenseTracker::new(Arc::new(storage));
    tracker.initialize()?;

    let stdin = io::stdin();
    let mut shell = Shell::new(&tracker, &config.reports, stdin.lock(), io::stdout());
    if config.shell.seed_sample_data {
        shell.welcome()?;
    }
    shell.run()?;
    Ok(())
}
