//! Action-Then-Verify Sequencer
//!
//! Performs one mutating action (click send, add to cart, submit) and then polls
//! for its observable effect. The action runs exactly once and is awaited to
//! completion before the first verification probe; only verification retries.

use crate::wait::{PollOptions, PollResult, Poller};
use std::fmt::{self, Debug};
use std::future::Future;
use std::ops::Add;
use std::time::Duration;

/// An expected post-condition with a human-readable description.
pub struct Expected<T> {
    description: String,
    check: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Debug for Expected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expected")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T> Expected<T> {
    /// Create a post-condition from a predicate
    pub fn new(
        description: impl Into<String>,
        check: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            check: Box::new(check),
        }
    }

    /// Whether an observed value satisfies the post-condition
    #[must_use]
    pub fn holds(&self, observed: &T) -> bool {
        (self.check)(observed)
    }

    /// Description used in failure messages
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<T> Expected<T>
where
    T: PartialEq + Debug + Send + Sync + 'static,
{
    /// Observed value must equal `expected`
    #[must_use]
    pub fn equals(expected: T) -> Self {
        let description = format!("{expected:?}");
        Self::new(description, move |observed| *observed == expected)
    }
}

impl<T> Expected<T>
where
    T: Copy + Add<Output = T> + PartialEq + Debug + Send + Sync + 'static,
{
    /// Observed value must be exactly `baseline + delta`.
    ///
    /// A larger jump is a failure, not an over-achievement.
    #[must_use]
    pub fn increased_by(baseline: T, delta: T) -> Self {
        let target = baseline + delta;
        Self::new(
            format!("{target:?} ({baseline:?} + {delta:?})"),
            move |observed| *observed == target,
        )
    }
}

impl Expected<String> {
    /// Observed text must contain `needle`
    #[must_use]
    pub fn contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self::new(format!("text containing {needle:?}"), move |observed: &String| {
            observed.contains(&needle)
        })
    }
}

/// Result of one action-then-verify step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult<T> {
    /// The action completed and the post-condition was observed
    Verified {
        /// The value that satisfied the post-condition
        observed: T,
        /// Time spent verifying
        elapsed: Duration,
    },
    /// The action itself failed; verification never started
    ActionFailed {
        /// Step name
        step: String,
        /// Error reported by the action
        error: String,
    },
    /// The post-condition did not hold within the timeout
    Unverified {
        /// Step name
        step: String,
        /// Description of the expected post-condition
        expected: String,
        /// Last value the probe produced
        last_observed: Option<T>,
        /// Last probe error, if the final attempts failed
        last_error: Option<String>,
        /// Time spent verifying
        elapsed: Duration,
    },
}

impl<T: Debug> StepResult<T> {
    /// Whether the step passed
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Convert into a `Result`, keeping expected and observed values on failure
    pub fn into_result(self) -> Result<T, StepFailure> {
        match self {
            Self::Verified { observed, .. } => Ok(observed),
            Self::ActionFailed { step, error } => Err(StepFailure {
                step,
                expected: "action to complete".to_string(),
                observed: format!("action error: {error}"),
            }),
            Self::Unverified {
                step,
                expected,
                last_observed,
                last_error,
                ..
            } => {
                let observed = match (last_observed, last_error) {
                    (Some(value), _) => format!("{value:?}"),
                    (None, Some(err)) => format!("no value ({err})"),
                    (None, None) => "no value".to_string(),
                };
                Err(StepFailure {
                    step,
                    expected,
                    observed,
                })
            }
        }
    }
}

/// A failed step with both sides of the comparison.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step '{step}' failed: expected {expected}, last observed {observed}")]
pub struct StepFailure {
    /// Step name
    pub step: String,
    /// Expected post-condition
    pub expected: String,
    /// Last observed value (or the action error)
    pub observed: String,
}

/// Composes an action with a polled post-condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequencer {
    poller: Poller,
}

impl Sequencer {
    /// Create a sequencer with default poll options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom poll options
    #[must_use]
    pub const fn with_options(options: PollOptions) -> Self {
        Self {
            poller: Poller::with_options(options),
        }
    }

    /// The poller used for verification
    #[must_use]
    pub const fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Run `action` once, then poll `probe` until `expected` holds.
    pub async fn act_then_verify<A, AFut, AE, F, Fut, E, T>(
        &self,
        step: &str,
        action: A,
        probe: F,
        expected: &Expected<T>,
    ) -> StepResult<T>
    where
        A: FnOnce() -> AFut,
        AFut: Future<Output = Result<(), AE>>,
        AE: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if let Err(err) = action().await {
            tracing::warn!(step, error = %err, "action failed");
            return StepResult::ActionFailed {
                step: step.to_string(),
                error: err.to_string(),
            };
        }

        match self
            .poller
            .until(step, probe, |observed| expected.holds(observed))
            .await
        {
            PollResult::Succeeded {
                value, elapsed, ..
            } => StepResult::Verified {
                observed: value,
                elapsed,
            },
            PollResult::TimedOut {
                last_value,
                last_error,
                elapsed,
                ..
            } => {
                tracing::warn!(step, expected = expected.description(), "post-condition not observed");
                StepResult::Unverified {
                    step: step.to_string(),
                    expected: expected.description().to_string(),
                    last_observed: last_value,
                    last_error,
                    elapsed,
                }
            }
        }
    }

    /// Read a baseline through `probe`, run `action`, then require exactly
    /// `baseline + delta`.
    pub async fn act_then_increment<A, AFut, AE, F, Fut, E, T>(
        &self,
        step: &str,
        mut probe: F,
        action: A,
        delta: T,
    ) -> StepResult<T>
    where
        A: FnOnce() -> AFut,
        AFut: Future<Output = Result<(), AE>>,
        AE: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        T: Copy + Add<Output = T> + PartialEq + Debug + Send + Sync + 'static,
    {
        let baseline = match self.poller.until(step, &mut probe, |_| true).await {
            PollResult::Succeeded { value, .. } => value,
            PollResult::TimedOut {
                last_error,
                elapsed,
                ..
            } => {
                return StepResult::Unverified {
                    step: step.to_string(),
                    expected: "a readable baseline before the action".to_string(),
                    last_observed: None,
                    last_error,
                    elapsed,
                };
            }
        };
        let expected = Expected::increased_by(baseline, delta);
        self.act_then_verify(step, action, probe, &expected).await
    }
}
