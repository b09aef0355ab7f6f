use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "spendbook", about = "Spendbook - personal expense tracker")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "spendbook.toml")]
    pub config: String,

    /// Path to the expense database (overrides config file)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Do not offer sample expenses when the database is empty
    #[arg(long)]
    pub no_sample_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub reports: ReportsConfig,

    #[serde(default)]
    pub shell: ShellConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportsConfig {
    /// Directory chart images are written to.
    #[serde(default = "default_chart_dir")]
    pub chart_dir: PathBuf,

    /// Directory for CSV exports when no explicit path is given.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Number of days covered by the trend chart.
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,

    /// Recent expenses shown in the detailed report.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShellConfig {
    #[serde(default = "default_true")]
    pub seed_sample_data: bool,
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        path: default_database_path(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        json: false,
    }
}

fn default_database_path() -> String {
    "data/expenses.db".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_chart_dir() -> PathBuf {
    PathBuf::from("charts")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_trend_days() -> u32 {
    30
}

fn default_recent_limit() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for ReportsConfig {
    fn default() -> Self {
        ReportsConfig {
            chart_dir: default_chart_dir(),
            export_dir: default_export_dir(),
            trend_days: default_trend_days(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            seed_sample_data: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: default_storage(),
            logging: default_logging(),
            reports: ReportsConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl Config {
    pub fn load(cli: &CliArgs) -> Self {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Config::default()
            }),
            Err(_) => Config::default(),
        };

        // CLI overrides
        if let Some(ref path) = cli.database {
            config.storage.path = path.clone();
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }
        if cli.no_sample_data {
            config.shell.seed_sample_data = false;
        }

        config
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
