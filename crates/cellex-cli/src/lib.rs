//! Cellex CLI library
//!
//! Command-line front-end for the Cellex harness: run, validate and list
//! data-driven suites.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{Cli, ColorArg, Commands, LogFormatArg, ReportFormat, RunArgs, SuiteArgs};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_reports, ProgressReporter};
