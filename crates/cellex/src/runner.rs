//! Data-driven case runner.
//!
//! Each [`TestCase`] is resolved against the run's fixtures, dispatched once and
//! classified against its [`Expectation`]. Classification is a pure function of
//! the case and the dispatch result, see [`classify`].
//!
//! ```text
//!   Pending ──dispatch──► Dispatched ──classify──► Finished(outcome)
//!      │                                               ▲
//!      └──────── setup failure / fixture error ────────┘
//! ```

use crate::case::{Expectation, SetupStep, Suite, TestCase};
use crate::dispatch::{DispatchError, DispatchResponse, Dispatcher};
use crate::fixture::FixtureContext;
use crate::reporter::{CaseResult, SuiteReport};
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::Instrument;

/// Field of a failed check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckField {
    /// Success versus error
    Outcome,
    /// HTTP status
    Status,
    /// Domain error code
    Code,
    /// Message substring
    Message,
}

impl fmt::Display for CheckField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Outcome => "outcome",
            Self::Status => "status",
            Self::Code => "code",
            Self::Message => "message",
        })
    }
}

/// One declared check that did not hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Field that was checked
    pub field: CheckField,
    /// Declared value
    pub expected: String,
    /// Observed value
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Why a case failed: expected versus actual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Declared expectation
    pub expected: String,
    /// Observed outcome
    pub actual: String,
    /// Individual checks that did not hold
    pub mismatches: Vec<Mismatch>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, got {}", self.expected, self.actual)
    }
}

/// Final classification of a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// The outcome matched the expectation
    Passed,
    /// The outcome did not match the expectation
    Failed(Failure),
    /// The case was not evaluated
    Skipped {
        /// Reason for skipping
        reason: String,
    },
}

impl CaseOutcome {
    /// Whether the case passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Whether the case failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Whether the case was skipped
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Short label for reports
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed(_) => "FAIL",
            Self::Skipped { .. } => "SKIP",
        }
    }
}

/// Lifecycle of a single case execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseState {
    /// Not yet dispatched
    Pending,
    /// Dispatched, not yet classified
    Dispatched,
    /// Classified; terminal
    Finished(CaseOutcome),
}

impl CaseState {
    /// Move to `Dispatched`. Only valid from `Pending`.
    pub fn dispatch(self) -> HarnessResult<Self> {
        match self {
            Self::Pending => Ok(Self::Dispatched),
            other => Err(HarnessError::InvalidState {
                message: format!("cannot dispatch a case in state {other:?}"),
            }),
        }
    }

    /// Move to `Finished`. A finished case never transitions again.
    pub fn finish(self, outcome: CaseOutcome) -> HarnessResult<Self> {
        match self {
            Self::Pending | Self::Dispatched => Ok(Self::Finished(outcome)),
            Self::Finished(previous) => Err(HarnessError::InvalidState {
                message: format!("case already finished as {}", previous.label()),
            }),
        }
    }

    /// Outcome, once finished
    #[must_use]
    pub const fn outcome(&self) -> Option<&CaseOutcome> {
        match self {
            Self::Finished(outcome) => Some(outcome),
            Self::Pending | Self::Dispatched => None,
        }
    }

    /// Whether the case reached `Dispatched` or later
    #[must_use]
    pub const fn was_dispatched(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

fn describe_result(result: &Result<DispatchResponse, DispatchError>) -> String {
    match result {
        Ok(response) if response.is_success() => format!("success (HTTP {})", response.status),
        Ok(response) => format!("non-2xx response (HTTP {})", response.status),
        Err(error @ DispatchError::Response { status, .. }) => {
            let message = error
                .message()
                .map_or_else(|| "none".to_string(), |m| format!("{m:?}"));
            format!(
                "error status={status} code={} message={message}",
                optional(error.code())
            )
        }
        Err(other) => other.to_string(),
    }
}

fn optional<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

fn failed(
    case: &TestCase,
    result: &Result<DispatchResponse, DispatchError>,
    mismatches: Vec<Mismatch>,
) -> CaseOutcome {
    CaseOutcome::Failed(Failure {
        expected: case.expectation.to_string(),
        actual: describe_result(result),
        mismatches,
    })
}

/// Classify a dispatch result against a case's expectation.
///
/// - Expected success passes on a 2xx `Ok`; any other status fails. An error matching the case's skip rule
///   skips the case; any other error fails it.
/// - Expected error fails on `Ok`. On `Err` every declared field must hold:
///   exact status, exact domain code, and message containing the declared text.
#[must_use]
pub fn classify(
    case: &TestCase,
    result: &Result<DispatchResponse, DispatchError>,
) -> CaseOutcome {
    match (&case.expectation, result) {
        (Expectation::Success, Ok(response)) if response.is_success() => CaseOutcome::Passed,
        (Expectation::Success, Ok(response)) => failed(
            case,
            result,
            vec![Mismatch {
                field: CheckField::Status,
                expected: "2xx".to_string(),
                actual: response.status.to_string(),
            }],
        ),
        (Expectation::Success, Err(error)) => match &case.skip_condition {
            Some(skip) if skip.matches(error) => CaseOutcome::Skipped {
                reason: skip.reason.clone(),
            },
            _ => failed(
                case,
                result,
                vec![Mismatch {
                    field: CheckField::Outcome,
                    expected: "success".to_string(),
                    actual: "error".to_string(),
                }],
            ),
        },
        (Expectation::Error(_), Ok(_)) => failed(
            case,
            result,
            vec![Mismatch {
                field: CheckField::Outcome,
                expected: "error".to_string(),
                actual: "success".to_string(),
            }],
        ),
        (Expectation::Error(expected), Err(error)) => {
            let mut mismatches = Vec::new();

            if let Some(status) = expected.status {
                if error.status() != Some(status) {
                    mismatches.push(Mismatch {
                        field: CheckField::Status,
                        expected: status.to_string(),
                        actual: optional(error.status()),
                    });
                }
            }

            if let Some(code) = expected.code {
                if error.code() != Some(code) {
                    mismatches.push(Mismatch {
                        field: CheckField::Code,
                        expected: code.to_string(),
                        actual: optional(error.code()),
                    });
                }
            }

            if let Some(needle) = &expected.message {
                let actual = error.message();
                if !actual
                    .as_deref()
                    .is_some_and(|message| message.contains(needle.as_str()))
                {
                    mismatches.push(Mismatch {
                        field: CheckField::Message,
                        expected: format!("{needle:?}"),
                        actual: actual.map_or_else(|| "none".to_string(), |m| format!("{m:?}")),
                    });
                }
            }

            if mismatches.is_empty() {
                CaseOutcome::Passed
            } else {
                failed(case, result, mismatches)
            }
        }
    }
}

/// Runs case tables against a [`Dispatcher`].
#[derive(Clone)]
pub struct CaseRunner {
    dispatcher: Arc<dyn Dispatcher>,
}

impl fmt::Debug for CaseRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseRunner").finish_non_exhaustive()
    }
}

impl CaseRunner {
    /// Create a runner over `dispatcher`
    #[must_use]
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run every case of `suite` in declaration order.
    ///
    /// A failing setup step skips every case without dispatching it.
    pub async fn run_suite(&self, suite: &Suite, fixtures: &mut FixtureContext) -> SuiteReport {
        let span = tracing::info_span!("suite", suite = %suite.name, run_id = %fixtures.run_id());
        async {
            let mut report = SuiteReport::start(&suite.name, fixtures.run_id());
            let started = Instant::now();
            tracing::info!(cases = suite.cases.len(), "running suite");

            if let Err(reason) = self.run_setup(&suite.setup, fixtures).await {
                tracing::error!(%reason, "suite setup failed, skipping all cases");
                let skip = format!("suite setup failed: {reason}");
                for case in &suite.cases {
                    report.record(CaseResult::new(
                        case,
                        CaseOutcome::Skipped {
                            reason: skip.clone(),
                        },
                        std::time::Duration::ZERO,
                    ));
                }
                report.set_setup_error(reason);
            } else {
                for case in &suite.cases {
                    report.record(self.run_case(case, fixtures).await);
                }
            }

            report.finish(started.elapsed());
            tracing::info!(
                passed = report.passed_count(),
                failed = report.failed_count(),
                skipped = report.skipped_count(),
                "suite finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn run_setup(
        &self,
        steps: &[SetupStep],
        fixtures: &mut FixtureContext,
    ) -> Result<(), String> {
        for (index, step) in steps.iter().enumerate() {
            let label = if step.description.is_empty() {
                format!("step {} ({})", index + 1, step.operation)
            } else {
                step.description.clone()
            };
            tracing::debug!(step = %label, "setup");

            let payload = fixtures
                .resolve_payload(&step.payload)
                .map_err(|e| format!("{label}: {e}"))?;
            let response = self
                .dispatcher
                .dispatch(&step.operation, &payload)
                .await
                .map_err(|e| format!("{label}: {e}"))?;
            if let Some(capture) = &step.capture {
                fixtures
                    .capture(capture, &response.body)
                    .map_err(|e| format!("{label}: {e}"))?;
            }
        }
        Ok(())
    }

    /// Run a single case: resolve fixtures, dispatch once, classify, tear down.
    pub async fn run_case(&self, case: &TestCase, fixtures: &mut FixtureContext) -> CaseResult {
        let span = tracing::info_span!("case", id = %case.id, group = %case.group);
        async {
            let started = Instant::now();
            let (state, teardown_error) = match self.execute(case, fixtures).await {
                Ok(done) => done,
                Err(err) => {
                    tracing::error!(error = %err, "case lifecycle error");
                    let outcome = CaseOutcome::Failed(Failure {
                        expected: case.expectation.to_string(),
                        actual: err.to_string(),
                        mismatches: Vec::new(),
                    });
                    (CaseState::Finished(outcome), None)
                }
            };

            let outcome = match state {
                CaseState::Finished(outcome) => outcome,
                CaseState::Pending | CaseState::Dispatched => CaseOutcome::Skipped {
                    reason: "case did not finish".to_string(),
                },
            };

            match &outcome {
                CaseOutcome::Passed => tracing::info!("passed"),
                CaseOutcome::Failed(failure) => tracing::warn!(%failure, "failed"),
                CaseOutcome::Skipped { reason } => tracing::info!(%reason, "skipped"),
            }

            let mut result = CaseResult::new(case, outcome, started.elapsed());
            if let Some(error) = teardown_error {
                result = result.with_teardown_error(error);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        case: &TestCase,
        fixtures: &mut FixtureContext,
    ) -> HarnessResult<(CaseState, Option<String>)> {
        let state = CaseState::Pending;

        let payload = match fixtures.resolve_payload(&case.payload) {
            Ok(payload) => payload,
            Err(err) => {
                let outcome = CaseOutcome::Failed(Failure {
                    expected: case.expectation.to_string(),
                    actual: err.to_string(),
                    mismatches: Vec::new(),
                });
                return Ok((state.finish(outcome)?, None));
            }
        };

        tracing::debug!(operation = %case.operation, "dispatching");
        let state = state.dispatch()?;
        let result = self.dispatcher.dispatch(&case.operation, &payload).await;
        tracing::debug!(result = %describe_result(&result), "dispatched");
        let state = state.finish(classify(case, &result))?;

        let teardown_error = self.teardown(case, fixtures).await;

        Ok((state, teardown_error))
    }

    async fn teardown(&self, case: &TestCase, fixtures: &mut FixtureContext) -> Option<String> {
        let teardown = case.teardown.as_ref()?;
        let payload = match fixtures.resolve_payload(&teardown.payload) {
            Ok(payload) => payload,
            Err(err) => return Some(err.to_string()),
        };
        match self.dispatcher.dispatch(&teardown.operation, &payload).await {
            Ok(_) => {
                tracing::debug!(operation = %teardown.operation, "teardown done");
                None
            }
            Err(err) => {
                tracing::warn!(operation = %teardown.operation, error = %err, "teardown failed");
                Some(format!("{}: {err}", teardown.operation))
            }
        }
    }
}
