//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Cellex: data-driven end-to-end suites for the Cellex marketplace
#[derive(Parser, Debug)]
#[command(name = "cellex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only failures are printed)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run suites against the API or the web UI
    Run(RunArgs),

    /// Load suites and report table errors without running them
    Validate(SuiteArgs),

    /// List the cases of each suite by group
    List(SuiteArgs),
}

/// Suite files shared by every subcommand
#[derive(Parser, Debug)]
pub struct SuiteArgs {
    /// Suite files (YAML or JSON)
    #[arg(required = true)]
    pub suites: Vec<PathBuf>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite files (YAML or JSON)
    #[arg(required = true)]
    pub suites: Vec<PathBuf>,

    /// Base URL of the REST API
    #[arg(long, env = cellex::ENV_API_URL)]
    pub api_url: Option<String>,

    /// Base URL of the web front-end
    #[arg(long, env = cellex::ENV_WEB_URL)]
    pub web_url: Option<String>,

    /// WebDriver endpoint used with --ui
    #[arg(long, env = cellex::ENV_WEBDRIVER_URL)]
    pub webdriver_url: Option<String>,

    /// Drive the web UI instead of the API
    #[arg(long)]
    pub ui: bool,

    /// Show the browser window (with --ui)
    #[arg(long)]
    pub headed: bool,

    /// Timeout for each wait in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Interval between probes in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fixture variable available as ${var:NAME} (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

/// Parse a `NAME=VALUE` pair
fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

/// Report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain text
    #[default]
    Text,
    /// JSON
    Json,
    /// JUnit XML
    Junit,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Compact text lines
    #[default]
    Text,
    /// JSON lines
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}
