//! Suite loading plus the validate and list commands

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::SuiteArgs;
use cellex::Suite;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Load one suite file, naming the file in any error
fn load_suite(path: &Path) -> CliResult<Suite> {
    Suite::from_file(path).map_err(|err| CliError::config(format!("{}: {err}", path.display())))
}

/// Load every suite file, failing on the first invalid one
pub fn load_suites(paths: &[PathBuf]) -> CliResult<Vec<Suite>> {
    paths.iter().map(|path| load_suite(path)).collect()
}

/// Execute the validate command
pub fn execute_validate(config: &CliConfig, args: &SuiteArgs) -> CliResult<()> {
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let mut invalid = 0;

    for path in &args.suites {
        match load_suite(path) {
            Ok(suite) => reporter.success(&format!(
                "{}: suite '{}' ({} setup step(s), {} case(s))",
                path.display(),
                suite.name,
                suite.setup.len(),
                suite.cases.len()
            )),
            Err(err) => {
                invalid += 1;
                reporter.failure(&err.to_string());
            }
        }
    }

    if invalid == 0 {
        Ok(())
    } else {
        Err(CliError::invalid_argument(format!(
            "{invalid} of {} suite file(s) invalid",
            args.suites.len()
        )))
    }
}

/// Render the cases of a suite by group
#[must_use]
pub fn render_listing(suite: &Suite) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} cases)", suite.name, suite.cases.len());
    for step in &suite.setup {
        let _ = writeln!(out, "  setup: {} {}", step.operation, step.description);
    }
    for group in suite.groups() {
        let _ = writeln!(out, "  [{group}]");
        for case in suite.cases.iter().filter(|c| c.group == group) {
            let _ = write!(
                out,
                "    {:<28} {:<28} expect {}",
                case.id,
                case.operation.to_string(),
                case.expectation
            );
            if let Some(skip) = &case.skip_condition {
                let _ = write!(out, " (skip on {})", skip.status);
            }
            out.push('\n');
        }
    }
    out
}

/// Execute the list command
pub fn execute_list(_config: &CliConfig, args: &SuiteArgs) -> CliResult<()> {
    for suite in load_suites(&args.suites)? {
        print!("{}", render_listing(&suite));
    }
    Ok(())
}
