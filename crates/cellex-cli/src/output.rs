//! Output formatting and progress reporting

use crate::commands::ReportFormat;
use crate::error::CliResult;
use cellex::{CaseOutcome, CaseResult, SuiteReport, JUNIT_HEADER};
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter for suite execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a spinner over the suites of a run
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, message: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.suspend(|| {
                let _ = self.term.write_line(message);
            }),
            None => {
                let _ = self.term.write_line(message);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a skip message
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("↷").yellow().bold().to_string()
        } else {
            "SKIP".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.line("");
        self.line(&styled);
    }

    /// Print one line per case
    pub fn case(&self, result: &CaseResult) {
        let head = format!("{} [{}] ({}ms)", result.id, result.group, result.duration.as_millis());
        match &result.outcome {
            CaseOutcome::Passed => self.success(&head),
            CaseOutcome::Skipped { reason } => self.skipped(&format!("{head}: {reason}")),
            CaseOutcome::Failed(failure) => {
                self.failure(&format!("{head}: {failure}"));
                for mismatch in &failure.mismatches {
                    self.line(&format!("    - {mismatch}"));
                }
            }
        }
        if let Some(error) = &result.teardown_error {
            self.warning(&format!("{}: teardown failed: {error}", result.id));
        }
    }

    /// Print the totals of a run
    pub fn summary(&self, reports: &[SuiteReport]) {
        let passed: usize = reports.iter().map(SuiteReport::passed_count).sum();
        let failed: usize = reports.iter().map(SuiteReport::failed_count).sum();
        let skipped: usize = reports.iter().map(SuiteReport::skipped_count).sum();
        let setup_failures = reports.iter().filter(|r| r.setup_error().is_some()).count();
        let ok = failed == 0 && setup_failures == 0;
        if self.quiet && ok {
            return;
        }

        let total = passed + failed + skipped;
        let duration_secs: f64 = reports.iter().map(|r| r.duration().as_secs_f64()).sum();

        self.line("");
        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if ok {
                passed_style.apply_to("PASSED")
            } else {
                failed_style.apply_to("FAILED")
            };
            self.line(&format!(
                "{} {} cases in {:.2}s ({} passed, {} failed, {} skipped)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if ok { "PASSED" } else { "FAILED" };
            self.line(&format!(
                "{status} {total} cases in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
            ));
        }
        if setup_failures > 0 {
            self.failure(&format!("{setup_failures} suite setup(s) failed"));
        }
    }
}

/// Render the reports of a run in `format`
pub fn render_reports(reports: &[SuiteReport], format: ReportFormat) -> CliResult<String> {
    Ok(match format {
        ReportFormat::Text => reports
            .iter()
            .map(SuiteReport::render_text)
            .collect::<Vec<_>>()
            .join("\n"),
        ReportFormat::Json => match reports {
            [single] => serde_json::to_string_pretty(single)?,
            many => serde_json::to_string_pretty(many)?,
        },
        ReportFormat::Junit => match reports {
            [single] => single.render_junit(),
            many => {
                let mut xml = String::from(JUNIT_HEADER);
                xml.push_str("<testsuites>\n");
                for report in many {
                    xml.push_str(&report.render_junit_testsuite());
                }
                xml.push_str("</testsuites>\n");
                xml
            }
        },
    })
}
