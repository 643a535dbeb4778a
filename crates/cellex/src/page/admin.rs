//! Admin console: user moderation and product creation.

use super::driver::{BrowserDriver, DriverError, DriverResult, Selector};
use super::{await_form, PageObject};
use crate::dispatch::{DispatchError, Payload};
use crate::sequence::{Expected, Sequencer, StepResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Status label of a banned account
pub const BANNED_LABEL: &str = "Banned";
/// Status label of an active account
pub const ACTIVE_LABEL: &str = "Active";

/// `/admin/users`
#[derive(Clone)]
pub struct AdminUsersPage {
    driver: Arc<dyn BrowserDriver>,
    base_url: String,
    sequencer: Sequencer,
}

impl std::fmt::Debug for AdminUsersPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminUsersPage")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AdminUsersPage {
    /// Page path
    pub const PATH: &'static str = "/admin/users";

    /// Create the page object
    #[must_use]
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        base_url: impl Into<String>,
        sequencer: Sequencer,
    ) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sequencer,
        }
    }

    fn in_row(email: &str, test_id: &str) -> Selector {
        Selector::css(format!(
            "[data-user-email={email:?}] [data-testid={test_id:?}]"
        ))
    }

    /// Status cell of a user row
    #[must_use]
    pub fn status_cell(email: &str) -> Selector {
        Self::in_row(email, "user-status")
    }

    /// Ban button of a user row
    #[must_use]
    pub fn ban_button(email: &str) -> Selector {
        Self::in_row(email, "ban-user")
    }

    /// Unban button of a user row
    #[must_use]
    pub fn unban_button(email: &str) -> Selector {
        Self::in_row(email, "unban-user")
    }

    /// Search box above the user list
    #[must_use]
    pub fn search_input() -> Selector {
        Selector::test_id("user-search")
    }

    /// Reason input of the ban dialog
    #[must_use]
    pub fn reason_input() -> Selector {
        Selector::test_id("ban-reason")
    }

    /// Confirm button of the ban dialog
    #[must_use]
    pub fn confirm_button() -> Selector {
        Selector::test_id("ban-confirm")
    }

    /// Error banner of the admin console
    #[must_use]
    pub fn error_banner() -> Selector {
        Selector::test_id("admin-error")
    }

    /// Navigate to the user list
    pub async fn open(&self) -> DriverResult<()> {
        self.driver
            .goto(&format!("{}{}", self.base_url, Self::PATH))
            .await?;
        self.wait_until_current(self.sequencer.poller()).await
    }

    /// Filter the list by `query` and wait for the user's row to show
    pub async fn search(&self, email: &str) -> DriverResult<()> {
        self.driver.fill(&Self::search_input(), email).await?;
        let row = Self::status_cell(email);
        let result = self
            .sequencer
            .poller()
            .until(
                "user row",
                || self.driver.is_displayed(&row),
                |shown| *shown,
            )
            .await;
        if result.is_succeeded() {
            Ok(())
        } else {
            Err(DriverError::not_found(&row))
        }
    }

    /// Status label of a user
    pub async fn user_status(&self, email: &str) -> DriverResult<String> {
        self.driver
            .text(&Self::status_cell(email))
            .await
            .map(|s| s.trim().to_string())
    }

    /// Ban a user and wait for the row to show the banned label
    pub async fn ban_user(&self, email: &str, reason: Option<&str>) -> StepResult<String> {
        self.sequencer
            .act_then_verify(
                "ban user",
                || async move {
                    self.driver.click(&Self::ban_button(email)).await?;
                    if let Some(reason) = reason {
                        self.driver.fill(&Self::reason_input(), reason).await?;
                    }
                    self.driver.click(&Self::confirm_button()).await
                },
                || self.user_status(email),
                &Expected::equals(BANNED_LABEL.to_string()),
            )
            .await
    }

    /// Unban a user and wait for the row to show the active label
    pub async fn unban_user(&self, email: &str) -> StepResult<String> {
        self.sequencer
            .act_then_verify(
                "unban user",
                || async move { self.driver.click(&Self::unban_button(email)).await },
                || self.user_status(email),
                &Expected::equals(ACTIVE_LABEL.to_string()),
            )
            .await
    }
}

#[async_trait]
impl PageObject for AdminUsersPage {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &str {
        "admin users"
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }
}

/// Create-product dialog on `/admin/products`
#[derive(Clone)]
pub struct ProductModal {
    driver: Arc<dyn BrowserDriver>,
    base_url: String,
    sequencer: Sequencer,
}

impl std::fmt::Debug for ProductModal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductModal")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ProductModal {
    /// Path of the page hosting the dialog
    pub const PATH: &'static str = "/admin/products";

    /// Create the page object
    #[must_use]
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        base_url: impl Into<String>,
        sequencer: Sequencer,
    ) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sequencer,
        }
    }

    /// Button opening the dialog
    #[must_use]
    pub fn open_button() -> Selector {
        Selector::test_id("add-product")
    }

    /// Dialog root
    #[must_use]
    pub fn dialog() -> Selector {
        Selector::test_id("product-modal")
    }

    /// Input for a product field (`name`, `price`, `stock`, ...)
    #[must_use]
    pub fn field(name: &str) -> Selector {
        Selector::test_id(format!("product-{name}"))
    }

    /// Submit button
    #[must_use]
    pub fn submit_button() -> Selector {
        Selector::test_id("product-submit")
    }

    /// Option of the category dropdown
    #[must_use]
    pub fn category_option(category: &str) -> Selector {
        Selector::css(format!(
            "[data-testid=\"product-category\"] option[value={category:?}]"
        ))
    }

    /// Notification shown after a save
    #[must_use]
    pub fn toast() -> Selector {
        Selector::test_id("toast")
    }

    /// Form-level error banner
    #[must_use]
    pub fn form_error() -> Selector {
        Selector::test_id("product-form-error")
    }

    /// Inline field validation message
    #[must_use]
    pub fn field_error() -> Selector {
        Selector::css(".field-error")
    }

    /// Navigate to the product admin page and open the dialog
    pub async fn open(&self) -> DriverResult<()> {
        self.driver
            .goto(&format!("{}{}", self.base_url, Self::PATH))
            .await?;
        self.wait_until_current(self.sequencer.poller()).await?;
        self.driver.click(&Self::open_button()).await
    }

    /// Pick a category in the dropdown
    pub async fn select_category(&self, category: &str) -> DriverResult<()> {
        self.driver.click(&Self::category_option(category)).await
    }

    /// Text of the visible toast, if any
    pub async fn toast_message(&self) -> DriverResult<Option<String>> {
        if self.driver.is_displayed(&Self::toast()).await? {
            Ok(Some(self.driver.text(&Self::toast()).await?.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Fill every payload field, submit, and wait for the dialog to close.
    ///
    /// `category` is picked from the dropdown; other fields are typed. Returns
    /// the toast shown after the save.
    pub async fn create(&self, fields: &Payload) -> Result<Option<String>, DispatchError> {
        for (name, value) in fields {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            if name == "category" {
                self.select_category(&text).await?;
            } else {
                self.driver.fill(&Self::field(name), &text).await?;
            }
        }
        self.driver.click(&Self::submit_button()).await?;
        let driver = self.driver.as_ref();
        await_form(
            driver,
            self.sequencer.poller(),
            "product form",
            &[Self::form_error(), Self::field_error()],
            || async move { driver.is_displayed(&Self::dialog()).await.map(|open| !open) },
        )
        .await?;
        Ok(self.toast_message().await?)
    }
}

#[async_trait]
impl PageObject for ProductModal {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &str {
        "product admin"
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    fn ready_selector(&self) -> Option<Selector> {
        Some(Self::open_button())
    }
}
