//! Login and signup forms.

use super::driver::{BrowserDriver, DriverResult, Selector};
use super::{await_form, PageObject};
use crate::dispatch::DispatchError;
use crate::wait::Poller;
use async_trait::async_trait;
use std::sync::Arc;

/// `/login`
#[derive(Clone)]
pub struct LoginPage {
    driver: Arc<dyn BrowserDriver>,
    base_url: String,
    poller: Poller,
}

impl std::fmt::Debug for LoginPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginPage")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LoginPage {
    /// Page path
    pub const PATH: &'static str = "/login";

    /// Create the page object
    #[must_use]
    pub fn new(driver: Arc<dyn BrowserDriver>, base_url: impl Into<String>, poller: Poller) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poller,
        }
    }

    /// E-mail input
    #[must_use]
    pub fn email_input() -> Selector {
        Selector::test_id("login-email")
    }

    /// Password input
    #[must_use]
    pub fn password_input() -> Selector {
        Selector::test_id("login-password")
    }

    /// Submit button
    #[must_use]
    pub fn submit_button() -> Selector {
        Selector::test_id("login-submit")
    }

    /// Form-level error banner
    #[must_use]
    pub fn form_error() -> Selector {
        Selector::test_id("login-error")
    }

    /// Inline field validation message
    #[must_use]
    pub fn field_error() -> Selector {
        Selector::css(".field-error")
    }

    /// Navigate to the login page
    pub async fn open(&self) -> DriverResult<()> {
        self.driver
            .goto(&format!("{}{}", self.base_url, Self::PATH))
            .await?;
        self.wait_until_current(&self.poller).await
    }

    /// Submit credentials and wait until the app leaves `/login` or shows an error
    pub async fn login(&self, email: &str, password: &str) -> Result<(), DispatchError> {
        self.driver.fill(&Self::email_input(), email).await?;
        self.driver.fill(&Self::password_input(), password).await?;
        self.driver.click(&Self::submit_button()).await?;
        await_form(
            self.driver.as_ref(),
            &self.poller,
            "login form",
            &[Self::form_error(), Self::field_error()],
            || async move { self.is_current().await.map(|on_login| !on_login) },
        )
        .await
    }
}

#[async_trait]
impl PageObject for LoginPage {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &str {
        "login page"
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    fn ready_selector(&self) -> Option<Selector> {
        Some(Self::email_input())
    }
}

/// `/signup`
#[derive(Clone)]
pub struct SignupPage {
    driver: Arc<dyn BrowserDriver>,
    base_url: String,
    poller: Poller,
}

impl std::fmt::Debug for SignupPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupPage")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SignupPage {
    /// Page path
    pub const PATH: &'static str = "/signup";

    /// Create the page object
    #[must_use]
    pub fn new(driver: Arc<dyn BrowserDriver>, base_url: impl Into<String>, poller: Poller) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poller,
        }
    }

    /// Input for a signup field (`username`, `email`, `password`, ...)
    #[must_use]
    pub fn field(name: &str) -> Selector {
        Selector::test_id(format!("signup-{name}"))
    }

    /// Submit button
    #[must_use]
    pub fn submit_button() -> Selector {
        Selector::test_id("signup-submit")
    }

    /// Form-level error banner
    #[must_use]
    pub fn form_error() -> Selector {
        Selector::test_id("signup-error")
    }

    /// Navigate to the signup page
    pub async fn open(&self) -> DriverResult<()> {
        self.driver
            .goto(&format!("{}{}", self.base_url, Self::PATH))
            .await?;
        self.wait_until_current(&self.poller).await
    }

    /// Fill the given fields, submit, and wait for the outcome
    pub async fn signup(&self, fields: &[(&str, String)]) -> Result<(), DispatchError> {
        for (name, value) in fields {
            self.driver.fill(&Self::field(name), value).await?;
        }
        self.driver.click(&Self::submit_button()).await?;
        await_form(
            self.driver.as_ref(),
            &self.poller,
            "signup form",
            &[Self::form_error(), LoginPage::field_error()],
            || async move { self.is_current().await.map(|on_signup| !on_signup) },
        )
        .await
    }
}

#[async_trait]
impl PageObject for SignupPage {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &str {
        "signup page"
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    fn ready_selector(&self) -> Option<Selector> {
        Some(Self::submit_button())
    }
}
