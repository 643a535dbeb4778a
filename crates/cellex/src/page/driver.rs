//! Browser driver abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// Text content selector
    Text(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(path: impl Into<String>) -> Self {
        Self::XPath(path.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// W3C WebDriver location strategy and value
    #[must_use]
    pub fn to_locator(&self) -> (&'static str, String) {
        match self {
            Self::Css(s) => ("css selector", s.clone()),
            Self::XPath(s) => ("xpath", s.clone()),
            Self::TestId(id) => ("css selector", format!("[data-testid={id:?}]")),
            Self::Text(t) => (
                "xpath",
                format!("//*[contains(normalize-space(.), {})]", xpath_literal(t)),
            ),
        }
    }
}

/// Quote a string as an XPath 1.0 literal
fn xpath_literal(s: &str) -> String {
    if !s.contains('"') {
        format!("\"{s}\"")
    } else if !s.contains('\'') {
        format!("'{s}'")
    } else {
        let parts: Vec<String> = s.split('"').map(|p| format!("\"{p}\"")).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::TestId(id) => write!(f, "testid={id}"),
            Self::Text(t) => write!(f, "text={t}"),
        }
    }
}

/// Browser driver errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// No element matched the selector
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },
    /// Session could not be created or was lost
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },
    /// The WebDriver server reported an error
    #[error("WebDriver error '{error}': {message}")]
    Protocol {
        /// W3C error code, e.g. `stale element reference`
        error: String,
        /// Error message
        message: String,
    },
    /// The WebDriver server could not be reached
    #[error("WebDriver transport error: {0}")]
    Transport(String),
}

impl DriverError {
    /// Create an element-not-found error
    #[must_use]
    pub fn not_found(selector: &Selector) -> Self {
        Self::ElementNotFound {
            selector: selector.to_string(),
        }
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Minimal browser surface the page objects need.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to URL
    async fn goto(&self, url: &str) -> DriverResult<()>;

    /// Get current URL
    async fn current_url(&self) -> DriverResult<String>;

    /// Click the first matching element
    async fn click(&self, selector: &Selector) -> DriverResult<()>;

    /// Replace the value of an input
    async fn fill(&self, selector: &Selector, text: &str) -> DriverResult<()>;

    /// Visible text of the first matching element
    async fn text(&self, selector: &Selector) -> DriverResult<String>;

    /// Number of matching elements
    async fn count(&self, selector: &Selector) -> DriverResult<usize>;

    /// Whether the first matching element exists and is displayed
    async fn is_displayed(&self, selector: &Selector) -> DriverResult<bool>;
}
