//! Page objects for the Cellex web front-end.
//!
//! ```text
//! ┌──────────────┐   named UI op   ┌──────────────┐   selectors   ┌───────────────┐
//! │  CaseRunner  │ ──────────────► │ UiDispatcher │ ────────────► │ BrowserDriver │
//! └──────────────┘                 └──────┬───────┘               └───────┬───────┘
//!                                         │ page objects                  │ W3C JSON
//!                                         ▼                               ▼
//!                      LoginPage · ProductListPage · ChatWindow    WebDriverSession
//!                      AdminUsersPage · ProductModal
//! ```
//!
//! Every page waits through the [`Poller`]; none sleeps for a fixed time.

pub mod admin;
pub mod cart;
pub mod chat;
pub mod driver;
pub mod login;
pub mod ui_dispatch;
pub mod webdriver;

#[cfg(test)]
pub(crate) mod fake;

pub use admin::{AdminUsersPage, ProductModal};
pub use cart::ProductListPage;
pub use chat::ChatWindow;
pub use driver::{BrowserDriver, DriverError, DriverResult, Selector};
pub use login::{LoginPage, SignupPage};
pub use ui_dispatch::UiDispatcher;
pub use webdriver::{SessionOptions, WebDriverSession, ELEMENT_KEY};

use crate::dispatch::DispatchError;
use crate::wait::{PollResult, Poller};
use async_trait::async_trait;
use std::collections::HashMap;

/// A page or component of the UI.
#[async_trait]
pub trait PageObject: Send + Sync {
    /// URL pattern that matches this page (e.g., "/login", "/users/:id")
    fn url_pattern(&self) -> &str;

    /// Page name for logging
    fn page_name(&self) -> &str;

    /// Driver the page acts through
    fn driver(&self) -> &dyn BrowserDriver;

    /// Element that must be visible before the page counts as loaded
    fn ready_selector(&self) -> Option<Selector> {
        None
    }

    /// Whether the browser is currently on this page
    async fn is_current(&self) -> DriverResult<bool> {
        let url = self.driver().current_url().await?;
        Ok(UrlMatcher::new(self.url_pattern()).matches(url_path(&url)))
    }

    /// Whether the page is current and its ready element is visible
    async fn is_ready(&self) -> DriverResult<bool> {
        if !self.is_current().await? {
            return Ok(false);
        }
        match self.ready_selector() {
            Some(selector) => self.driver().is_displayed(&selector).await,
            None => Ok(true),
        }
    }

    /// Wait until the browser is on this page
    async fn wait_until_current(&self, poller: &Poller) -> DriverResult<()> {
        let result = poller
            .until(self.page_name(), || self.is_ready(), |ready| *ready)
            .await;
        match result {
            PollResult::Succeeded { .. } => Ok(()),
            PollResult::TimedOut { last_error, .. } => Err(DriverError::Session {
                message: format!(
                    "{} did not load{}",
                    self.page_name(),
                    last_error.map(|e| format!(": {e}")).unwrap_or_default()
                ),
            }),
        }
    }
}

/// Path component of an absolute or relative URL
#[must_use]
pub fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if url.contains("://") {
        without_scheme
            .find('/')
            .map_or("/", |i| &without_scheme[i..])
    } else {
        without_scheme
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// URL pattern matcher for page objects
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

impl UrlMatcher {
    /// Create a matcher. Segments are literals, `*` or `:name`.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a path matches the pattern
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        parts.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(&parts)
                .all(|(segment, part)| match segment {
                    UrlSegment::Literal(lit) => lit == part,
                    UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
                })
    }

    /// Extract `:name` parameters from a path
    #[must_use]
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.segments
            .iter()
            .zip(parts)
            .filter_map(|(segment, part)| match segment {
                UrlSegment::Parameter(name) => Some((name.clone(), part.to_string())),
                UrlSegment::Literal(_) | UrlSegment::Wildcard => None,
            })
            .collect()
    }

    /// Get the original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// State of a submitted form while it settles
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormState {
    Pending,
    Accepted,
    Rejected(String),
}

/// Read the first visible message among `errors`, if any
pub(crate) async fn visible_error(driver: &dyn BrowserDriver, errors: &[Selector]) -> DriverResult<Option<String>> {
    for selector in errors {
        if driver.is_displayed(selector).await? {
            let text = driver.text(selector).await?;
            if !text.trim().is_empty() {
                return Ok(Some(text.trim().to_string()));
            }
        }
    }
    Ok(None)
}

/// Poll until the form either shows one of `errors` or `accepted` reports true.
///
/// A visible error becomes [`DispatchError::Rejected`]; a timeout becomes a
/// transport error naming the form.
pub(crate) async fn await_form<F, Fut>(
    driver: &dyn BrowserDriver,
    poller: &Poller,
    form: &str,
    errors: &[Selector],
    mut accepted: F,
) -> Result<(), DispatchError>
where
    F: FnMut() -> Fut + Send,
    Fut: std::future::Future<Output = DriverResult<bool>> + Send,
{
    let result = poller
        .until(
            form,
            || {
                let done = accepted();
                async move {
                    if let Some(message) = visible_error(driver, errors).await? {
                        return Ok::<_, DriverError>(FormState::Rejected(message));
                    }
                    Ok(if done.await? {
                        FormState::Accepted
                    } else {
                        FormState::Pending
                    })
                }
            },
            |state| *state != FormState::Pending,
        )
        .await;

    match result {
        PollResult::Succeeded {
            value: FormState::Rejected(message),
            ..
        } => Err(DispatchError::Rejected { message }),
        PollResult::Succeeded { .. } => Ok(()),
        PollResult::TimedOut {
            last_error,
            elapsed,
            ..
        } => Err(DispatchError::transport(format!(
            "{form} did not settle within {}ms{}",
            elapsed.as_millis(),
            last_error.map(|e| format!(" (last error: {e})")).unwrap_or_default()
        ))),
    }
}

/// Map a driver failure during an action onto the dispatch boundary
impl From<DriverError> for DispatchError {
    fn from(err: DriverError) -> Self {
        Self::transport(err.to_string())
    }
}
