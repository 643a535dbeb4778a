//! Cellex CLI
//!
//! ## Usage
//!
//! ```bash
//! cellex run suites/login_validation.yaml               # Run against the API
//! cellex run suites/ui_cart_chat.yaml --ui              # Drive the web UI
//! cellex run suites/*.yaml --format junit -o report.xml # JUnit for CI
//! cellex validate suites/*.yaml                         # Check tables only
//! cellex list suites/admin_ban.yaml                     # Show cases by group
//! ```

use cellex_cli::{
    handlers::{execute_list, execute_run, execute_validate},
    logging::init_tracing,
    Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli);
    init_tracing(&config);

    match cli.command {
        Commands::Run(args) => execute_run(&config, &args),
        Commands::Validate(args) => execute_validate(&config, &args),
        Commands::List(args) => execute_list(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_log_format(cli.log_format.into())
}
