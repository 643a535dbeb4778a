//! `tracing` subscriber setup

use crate::config::{CliConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` wins, otherwise the verbosity default
fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()))
}

/// Install the global subscriber; logs go to stderr so reports stay clean on stdout
pub fn init_tracing(config: &CliConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder
            .with_ansi(config.color.should_color())
            .compact()
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
