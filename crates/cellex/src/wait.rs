//! Condition Poller
//!
//! Repeatedly evaluates a probe against the live UI (or API) until its value
//! satisfies a predicate or the deadline passes.
//!
//! A timeout is a terminal [`PollResult::TimedOut`] value, never an error: waiting
//! for the UI to converge is expected to fail sometimes. A probe that returns
//! `Err` (element not attached yet, request refused while the page settles) only
//! means "not yet"; the poll keeps going and is still bounded by the timeout.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Timeout for slower flows such as checkout or admin actions (15 seconds)
pub const SLOW_WAIT_TIMEOUT_MS: u64 = 15_000;

/// Timeout for presence/absence checks (3 seconds)
pub const PRESENCE_WAIT_TIMEOUT_MS: u64 = 3_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Interval used when a configured interval is zero or negative (50ms)
pub const FALLBACK_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for a poll: how long to wait and how often to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl PollOptions {
    /// Create new poll options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for slower flows (15s)
    #[must_use]
    pub fn slow() -> Self {
        Self::new().with_timeout_ms(SLOW_WAIT_TIMEOUT_MS)
    }

    /// Options for presence/absence checks (3s)
    #[must_use]
    pub fn presence() -> Self {
        Self::new().with_timeout_ms(PRESENCE_WAIT_TIMEOUT_MS)
    }

    /// Build options from raw configured milliseconds.
    ///
    /// Negative timeouts collapse to zero (a single attempt); zero or negative
    /// intervals fall back to [`FALLBACK_POLL_INTERVAL_MS`].
    #[must_use]
    pub fn from_millis(timeout_ms: i64, poll_interval_ms: i64) -> Self {
        let timeout = Duration::from_millis(timeout_ms.max(0) as u64);
        let poll_interval = if poll_interval_ms <= 0 {
            Duration::from_millis(FALLBACK_POLL_INTERVAL_MS)
        } else {
            Duration::from_millis(poll_interval_ms as u64)
        };
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Set polling interval; a zero interval falls back to a small positive one
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = if interval.is_zero() {
            Duration::from_millis(FALLBACK_POLL_INTERVAL_MS)
        } else {
            interval
        };
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub fn with_poll_interval_ms(self, interval_ms: u64) -> Self {
        self.with_poll_interval(Duration::from_millis(interval_ms))
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

// =============================================================================
// TRUTHINESS
// =============================================================================

/// Default target predicate for probes that do not supply one.
pub trait Truthy {
    /// Whether the value counts as "condition met"
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

macro_rules! truthy_nonzero {
    ($($ty:ty),*) => {
        $(impl Truthy for $ty {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

truthy_nonzero!(u32, u64, usize, i32, i64);

// =============================================================================
// POLL RESULT
// =============================================================================

/// Outcome of a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
    /// The predicate held on attempt `attempts`
    Succeeded {
        /// The value that satisfied the predicate
        value: T,
        /// Number of probe invocations
        attempts: u32,
        /// Time spent waiting
        elapsed: Duration,
    },
    /// The deadline passed without the predicate holding
    TimedOut {
        /// Last value the probe produced, if any attempt succeeded in producing one
        last_value: Option<T>,
        /// Error from the last failed probe attempt
        last_error: Option<String>,
        /// Number of probe invocations
        attempts: u32,
        /// Time spent waiting
        elapsed: Duration,
    },
}

impl<T> PollResult<T> {
    /// Whether the predicate held
    #[must_use]
    pub const fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Whether the deadline passed
    #[must_use]
    pub const fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// The satisfying value, if any
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }

    /// Consume into the satisfying value
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }

    /// The last value observed, whether or not it satisfied the predicate
    #[must_use]
    pub const fn last_observed(&self) -> Option<&T> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            Self::TimedOut { last_value, .. } => last_value.as_ref(),
        }
    }

    /// Number of probe invocations
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// Time spent waiting
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Succeeded { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}

// =============================================================================
// POLLER
// =============================================================================

/// Condition poller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poller {
    options: PollOptions,
}

impl Poller {
    /// Create a poller with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub const fn with_options(options: PollOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Poll a fallible probe until `predicate` holds or the timeout elapses.
    pub async fn until<T, E, F, Fut, P>(
        &self,
        waited_for: &str,
        mut probe: F,
        predicate: P,
    ) -> PollResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&T) -> bool,
    {
        let timeout = self.options.timeout();
        let interval = self.options.poll_interval();
        let start = Instant::now();
        let mut attempts = 0_u32;
        let mut last_value = None;

        loop {
            attempts += 1;
            let last_error = match probe().await {
                Ok(value) if predicate(&value) => {
                    let elapsed = start.elapsed();
                    tracing::debug!(waited_for, attempts, ?elapsed, "condition met");
                    return PollResult::Succeeded {
                        value,
                        attempts,
                        elapsed,
                    };
                }
                Ok(value) => {
                    last_value = Some(value);
                    None
                }
                Err(err) => {
                    tracing::trace!(waited_for, attempts, error = %err, "probe failed, retrying");
                    Some(err.to_string())
                }
            };

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                tracing::debug!(waited_for, attempts, ?elapsed, "condition timed out");
                return PollResult::TimedOut {
                    last_value,
                    last_error,
                    attempts,
                    elapsed,
                };
            }

            // Never sleep past the deadline; the final attempt lands on it.
            sleep(interval.min(timeout - elapsed)).await;
        }
    }

    /// Poll a fallible probe until its value is truthy.
    pub async fn until_truthy<T, E, F, Fut>(&self, waited_for: &str, probe: F) -> PollResult<T>
    where
        T: Truthy,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.until(waited_for, probe, Truthy::is_truthy).await
    }

    /// Poll an infallible probe until `predicate` holds.
    pub async fn until_value<T, F, Fut, P>(
        &self,
        waited_for: &str,
        mut probe: F,
        predicate: P,
    ) -> PollResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        P: Fn(&T) -> bool,
    {
        self.until(
            waited_for,
            || {
                let fut = probe();
                async move { Ok::<T, std::convert::Infallible>(fut.await) }
            },
            predicate,
        )
        .await
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Wait for an infallible boolean probe with the given options.
pub async fn wait_until<F, Fut>(waited_for: &str, probe: F, options: PollOptions) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    Poller::with_options(options)
        .until_value(waited_for, probe, |ok| *ok)
        .await
        .is_succeeded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(timeout_ms: u64, interval_ms: u64) -> Poller {
        Poller::with_options(
            PollOptions::new()
                .with_timeout_ms(timeout_ms)
                .with_poll_interval_ms(interval_ms),
        )
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = PollOptions::default();
            assert_eq!(opts.timeout(), Duration::from_millis(10_000));
            assert_eq!(opts.poll_interval(), Duration::from_millis(500));
        }

        #[test]
        fn test_presets() {
            assert_eq!(PollOptions::slow().timeout(), Duration::from_secs(15));
            assert_eq!(PollOptions::presence().timeout(), Duration::from_secs(3));
        }

        #[test]
        fn test_zero_interval_falls_back() {
            let opts = PollOptions::new().with_poll_interval(Duration::ZERO);
            assert_eq!(
                opts.poll_interval(),
                Duration::from_millis(FALLBACK_POLL_INTERVAL_MS)
            );
        }

        #[test]
        fn test_from_millis_sanitises_negative_values() {
            let opts = PollOptions::from_millis(-5, -100);
            assert_eq!(opts.timeout(), Duration::ZERO);
            assert_eq!(
                opts.poll_interval(),
                Duration::from_millis(FALLBACK_POLL_INTERVAL_MS)
            );
        }

        #[test]
        fn test_from_millis_keeps_valid_values() {
            let opts = PollOptions::from_millis(3_000, 250);
            assert_eq!(opts.timeout(), Duration::from_secs(3));
            assert_eq!(opts.poll_interval(), Duration::from_millis(250));
        }
    }

    mod truthy_tests {
        use super::*;

        #[test]
        fn test_truthy_values() {
            assert!(true.is_truthy());
            assert!(!false.is_truthy());
            assert!(Some(0).is_truthy());
            assert!(!None::<u32>.is_truthy());
            assert!("3".to_string().is_truthy());
            assert!(!"   ".to_string().is_truthy());
            assert!(vec![1].is_truthy());
            assert!(!Vec::<u8>::new().is_truthy());
            assert!(2_u32.is_truthy());
            assert!(!0_usize.is_truthy());
        }
    }

    mod poller_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_immediate_success_takes_one_attempt() {
            let result = fast(1_000, 100)
                .until_value("always", || async { true }, |v| *v)
                .await;
            assert!(result.is_succeeded());
            assert_eq!(result.attempts(), 1);
            assert_eq!(result.elapsed(), Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_never_satisfied_times_out_within_bound() {
            let timeout = Duration::from_millis(1_000);
            let interval = Duration::from_millis(300);
            let result = fast(1_000, 300)
                .until_value("never", || async { false }, |v| *v)
                .await;
            assert!(result.is_timed_out());
            assert!(result.elapsed() >= timeout);
            assert!(result.elapsed() <= timeout + interval);
            // 0, 300, 600, 900 and the clamped final attempt at 1000
            assert_eq!(result.attempts(), 5);
            assert_eq!(result.last_observed(), Some(&false));
        }

        #[tokio::test(start_paused = true)]
        async fn test_early_exit_on_kth_attempt() {
            let mut calls = 0_u32;
            let result = fast(10_000, 100)
                .until_value(
                    "third call",
                    || {
                        calls += 1;
                        let n = calls;
                        async move { n }
                    },
                    |n| *n >= 3,
                )
                .await;
            assert_eq!(result.value(), Some(&3));
            assert_eq!(result.attempts(), 3);
            assert_eq!(result.elapsed(), Duration::from_millis(200));
            assert_eq!(calls, 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_timeout_performs_exactly_one_attempt() {
            let calls = Arc::new(AtomicU32::new(0));
            let counter = calls.clone();
            let result = fast(0, 100)
                .until_value(
                    "single shot",
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        async { false }
                    },
                    |v| *v,
                )
                .await;
            assert!(result.is_timed_out());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_probe_errors_are_absorbed_until_timeout() {
            let result = fast(500, 100)
                .until(
                    "element lookup",
                    || async { Err::<bool, _>("no such element: .badge") },
                    |v| *v,
                )
                .await;
            match result {
                PollResult::TimedOut {
                    last_value,
                    last_error,
                    attempts,
                    ..
                } => {
                    assert!(last_value.is_none());
                    assert_eq!(last_error.as_deref(), Some("no such element: .badge"));
                    assert_eq!(attempts, 6);
                }
                PollResult::Succeeded { .. } => panic!("probe never succeeds"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_error_then_success_recovers() {
            let mut calls = 0_u32;
            let result = fast(2_000, 100)
                .until(
                    "settling",
                    || {
                        calls += 1;
                        let n = calls;
                        async move {
                            if n < 3 {
                                Err("stale element")
                            } else {
                                Ok("ready".to_string())
                            }
                        }
                    },
                    |s: &String| s == "ready",
                )
                .await;
            assert_eq!(result.into_value().as_deref(), Some("ready"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_timeout_reports_only_the_final_attempt_error() {
            let mut calls = 0_u32;
            let result = fast(500, 100)
                .until(
                    "badge",
                    || {
                        calls += 1;
                        let n = calls;
                        async move {
                            if n == 1 {
                                Err("stale element")
                            } else {
                                Ok(2_u32)
                            }
                        }
                    },
                    |n| *n == 3,
                )
                .await;
            let PollResult::TimedOut {
                last_value,
                last_error,
                ..
            } = result
            else {
                panic!("badge never reaches 3");
            };
            assert_eq!(last_value, Some(2));
            assert_eq!(last_error, None);
        }

        #[tokio::test(start_paused = true)]
        async fn test_same_state_classifies_identically() {
            let poller = fast(300, 100);
            let first = poller
                .until_value("stable", || async { 2_u32 }, |n| *n == 3)
                .await;
            let second = poller
                .until_value("stable", || async { 2_u32 }, |n| *n == 3)
                .await;
            assert_eq!(first.is_timed_out(), second.is_timed_out());
            assert_eq!(first.last_observed(), second.last_observed());
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_truthy_uses_default_predicate() {
            let mut calls = 0_u32;
            let result = fast(1_000, 50)
                .until_truthy("badge text", || {
                    calls += 1;
                    let text = if calls > 1 { "1" } else { "" }.to_string();
                    async move { Ok::<_, Infallible>(text) }
                })
                .await;
            assert_eq!(result.into_value().as_deref(), Some("1"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_value_changed_by_background_task() {
            let flag = Arc::new(AtomicU32::new(0));
            let writer = flag.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(750)).await;
                writer.store(1, Ordering::SeqCst);
            });
            let reader = flag.clone();
            let result = fast(2_000, 100)
                .until_value(
                    "flag",
                    move || {
                        let v = reader.load(Ordering::SeqCst);
                        async move { v }
                    },
                    |v| *v == 1,
                )
                .await;
            assert!(result.is_succeeded());
            assert!(result.elapsed() >= Duration::from_millis(750));
            assert!(result.elapsed() <= Duration::from_millis(850));
        }
    }

    mod convenience_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_wait_until_true() {
            assert!(wait_until("ok", || async { true }, PollOptions::presence()).await);
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_until_false() {
            let opts = PollOptions::new().with_timeout_ms(200);
            assert!(!wait_until("never", || async { false }, opts).await);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn paused_runtime() -> tokio::runtime::Runtime {
            tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap()
        }

        proptest! {
            #[test]
            fn prop_timeout_is_bounded(timeout_ms in 0u64..5_000, interval_ms in 1u64..1_000) {
                let result = paused_runtime().block_on(
                    fast(timeout_ms, interval_ms).until_value("never", || async { false }, |v| *v),
                );
                let timeout = Duration::from_millis(timeout_ms);
                prop_assert!(result.is_timed_out());
                prop_assert!(result.elapsed() >= timeout);
                prop_assert!(result.elapsed() <= timeout + Duration::from_millis(interval_ms));
            }

            #[test]
            fn prop_early_exit_on_first_satisfying_attempt(k in 1u32..20, interval_ms in 1u64..500) {
                let calls = Arc::new(AtomicU32::new(0));
                let probe_calls = Arc::clone(&calls);
                let result = paused_runtime().block_on(fast(60_000, interval_ms).until_value(
                    "kth",
                    move || {
                        let n = probe_calls.fetch_add(1, Ordering::SeqCst) + 1;
                        async move { n >= k }
                    },
                    |v| *v,
                ));
                prop_assert!(result.is_succeeded());
                prop_assert_eq!(result.attempts(), k);
                prop_assert_eq!(calls.load(Ordering::SeqCst), k);
                let expected = Duration::from_millis(interval_ms * u64::from(k - 1));
                prop_assert!(result.elapsed() >= expected);
                prop_assert!(result.elapsed() <= expected + Duration::from_millis(interval_ms));
            }
        }
    }
}
