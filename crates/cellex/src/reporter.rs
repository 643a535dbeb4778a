//! Suite reports.
//!
//! A [`SuiteReport`] collects one [`CaseResult`] per case, keeps per-group
//! totals and renders as text, JSON or JUnit XML for CI.

use crate::case::TestCase;
use crate::result::HarnessResult;
use crate::runner::CaseOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Result of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Case identifier
    pub id: String,
    /// Reporting group
    pub group: String,
    /// Case description
    pub description: String,
    /// Classification
    pub outcome: CaseOutcome,
    /// Time from dispatch to classification, teardown included
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    /// Teardown failure, reported separately from the outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
}

impl CaseResult {
    /// Create a result for `case`
    #[must_use]
    pub fn new(case: &TestCase, outcome: CaseOutcome, duration: Duration) -> Self {
        Self {
            id: case.id.clone(),
            group: case.group.clone(),
            description: case.description.clone(),
            outcome,
            duration,
            teardown_error: None,
        }
    }

    /// Attach a teardown failure
    #[must_use]
    pub fn with_teardown_error(mut self, error: impl Into<String>) -> Self {
        self.teardown_error = Some(error.into());
        self
    }
}

/// Per-group totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Cases that passed
    pub passed: usize,
    /// Cases that failed
    pub failed: usize,
    /// Cases that were skipped
    pub skipped: usize,
}

impl GroupSummary {
    fn count(&mut self, outcome: &CaseOutcome) {
        match outcome {
            CaseOutcome::Passed => self.passed += 1,
            CaseOutcome::Failed(_) => self.failed += 1,
            CaseOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Cases in the group
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Report for one suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    suite: String,
    run_id: String,
    started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    setup_error: Option<String>,
    results: Vec<CaseResult>,
    groups: BTreeMap<String, GroupSummary>,
}

impl SuiteReport {
    /// Start an empty report
    #[must_use]
    pub fn start(suite: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            run_id: run_id.into(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
            setup_error: None,
            results: Vec::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Record a case result
    pub fn record(&mut self, result: CaseResult) {
        self.groups
            .entry(result.group.clone())
            .or_default()
            .count(&result.outcome);
        self.results.push(result);
    }

    /// Record the setup failure that skipped the suite
    pub fn set_setup_error(&mut self, error: impl Into<String>) {
        self.setup_error = Some(error.into());
    }

    /// Set the total duration
    pub fn finish(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Suite name
    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Run identifier
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Wall-clock start time
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Total duration
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Setup failure, if the suite was skipped
    #[must_use]
    pub fn setup_error(&self) -> Option<&str> {
        self.setup_error.as_deref()
    }

    /// Case results in execution order
    #[must_use]
    pub fn results(&self) -> &[CaseResult] {
        &self.results
    }

    /// Totals per group
    #[must_use]
    pub const fn groups(&self) -> &BTreeMap<String, GroupSummary> {
        &self.groups
    }

    /// Passed cases
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.groups.values().map(|g| g.passed).sum()
    }

    /// Failed cases
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.groups.values().map(|g| g.failed).sum()
    }

    /// Skipped cases
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.groups.values().map(|g| g.skipped).sum()
    }

    /// All cases
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Failed cases
    #[must_use]
    pub fn failures(&self) -> Vec<&CaseResult> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_failed())
            .collect()
    }

    /// No case failed and setup succeeded
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.setup_error.is_none() && self.failed_count() == 0
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed, {} failed, {} skipped",
            self.suite,
            self.passed_count(),
            self.total_count(),
            self.failed_count(),
            self.skipped_count()
        )
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render a plain-text report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Suite {} (run {})", self.suite, self.run_id);
        if let Some(error) = &self.setup_error {
            let _ = writeln!(out, "  setup failed: {error}");
        }

        for result in &self.results {
            let _ = write!(
                out,
                "  {}  {} [{}] {}ms",
                result.outcome.label(),
                result.id,
                result.group,
                result.duration.as_millis()
            );
            match &result.outcome {
                CaseOutcome::Passed => out.push('\n'),
                CaseOutcome::Skipped { reason } => {
                    let _ = writeln!(out, ": {reason}");
                }
                CaseOutcome::Failed(failure) => {
                    out.push('\n');
                    let _ = writeln!(out, "        expected: {}", failure.expected);
                    let _ = writeln!(out, "        actual:   {}", failure.actual);
                    for mismatch in &failure.mismatches {
                        let _ = writeln!(out, "        - {mismatch}");
                    }
                }
            }
            if let Some(error) = &result.teardown_error {
                let _ = writeln!(out, "        teardown failed: {error}");
            }
        }

        if !self.groups.is_empty() {
            out.push_str("Groups:\n");
            for (group, summary) in &self.groups {
                let _ = writeln!(
                    out,
                    "  {group}: {} passed, {} failed, {} skipped",
                    summary.passed, summary.failed, summary.skipped
                );
            }
        }
        let _ = writeln!(out, "Summary: {}", self.summary());
        out
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::from(JUNIT_HEADER);
        xml.push_str(&self.render_junit_testsuite());
        xml
    }

    /// Render this report as a bare `<testsuite>` element
    #[must_use]
    pub fn render_junit_testsuite(&self) -> String {
        let mut xml = String::new();
        let _ = writeln!(
            xml,
            r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            escape_xml(&self.suite),
            self.total_count(),
            self.failed_count(),
            self.skipped_count(),
            self.duration.as_secs_f64()
        );

        for result in &self.results {
            let _ = writeln!(
                xml,
                r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
                escape_xml(&result.group),
                escape_xml(&result.id),
                result.duration.as_secs_f64()
            );
            match &result.outcome {
                CaseOutcome::Passed => {}
                CaseOutcome::Failed(failure) => {
                    let detail = failure
                        .mismatches
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\n");
                    let _ = writeln!(
                        xml,
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(&failure.to_string()),
                        escape_xml(&detail)
                    );
                }
                CaseOutcome::Skipped { reason } => {
                    let _ = writeln!(xml, r#"    <skipped message="{}"/>"#, escape_xml(reason));
                }
            }
            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Write the JUnit XML report to `output_path`
    pub fn write_junit(&self, output_path: &Path) -> HarnessResult<()> {
        std::fs::write(output_path, self.render_junit())?;
        Ok(())
    }
}

/// XML declaration opening every JUnit document
pub const JUNIT_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
