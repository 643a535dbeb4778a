//! Named UI operations for case tables.
//!
//! | Operation        | Payload fields                          |
//! |------------------|-----------------------------------------|
//! | `login`          | `email`, `password`                     |
//! | `signup`         | any form field, e.g. `username`, `email`|
//! | `add_to_cart`    | `product_id`                            |
//! | `send_message`   | `conversation_id`, `text`               |
//! | `ban_user`       | `email`, optional `reason`              |
//! | `unban_user`     | `email`                                 |
//! | `create_product` | any product form field                  |
//!
//! A message shown by the UI becomes [`DispatchError::Rejected`].

use super::admin::{AdminUsersPage, ProductModal};
use super::cart::ProductListPage;
use super::chat::ChatWindow;
use super::driver::{BrowserDriver, Selector};
use super::login::{LoginPage, SignupPage};
use super::visible_error;
use crate::dispatch::{DispatchError, DispatchResponse, Dispatcher, Operation, Payload};
use crate::sequence::{Sequencer, StepResult};
use crate::wait::PollOptions;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Debug;
use std::sync::Arc;

fn text_field(payload: &Payload, name: &str) -> Result<String, DispatchError> {
    match payload.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
        None => Err(DispatchError::transport(format!(
            "payload field '{name}' is required"
        ))),
    }
}

fn text_fields(payload: &Payload) -> Vec<(&str, String)> {
    payload
        .iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (name.as_str(), text)
        })
        .collect()
}

/// Dispatches named UI operations through page objects.
#[derive(Clone)]
pub struct UiDispatcher {
    driver: Arc<dyn BrowserDriver>,
    base_url: String,
    sequencer: Sequencer,
}

impl std::fmt::Debug for UiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UiDispatcher {
    /// Create a dispatcher for the front-end at `base_url`
    #[must_use]
    pub fn new(driver: Arc<dyn BrowserDriver>, base_url: impl Into<String>, options: PollOptions) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            sequencer: Sequencer::with_options(options),
        }
    }

    /// Settle a step: verified values become the response, a visible UI
    /// message becomes a rejection, anything else a transport error.
    async fn settle<T: Debug + Serialize>(
        &self,
        step: StepResult<T>,
        errors: &[Selector],
    ) -> Result<DispatchResponse, DispatchError> {
        match step.into_result() {
            Ok(observed) => Ok(DispatchResponse::new(200, json!({ "observed": observed }))),
            Err(failure) => match visible_error(self.driver.as_ref(), errors).await {
                Ok(Some(message)) => Err(DispatchError::Rejected { message }),
                _ => Err(DispatchError::transport(failure.to_string())),
            },
        }
    }

    /// Open the user list, filtering to `email` when the list has a search box
    async fn admin_users(&self, email: &str) -> Result<AdminUsersPage, DispatchError> {
        let page = AdminUsersPage::new(self.driver.clone(), self.base_url.as_str(), self.sequencer);
        page.open().await?;
        if self
            .driver
            .is_displayed(&AdminUsersPage::search_input())
            .await?
        {
            page.search(email).await?;
        }
        Ok(page)
    }

    async fn perform(&self, name: &str, payload: &Payload) -> Result<DispatchResponse, DispatchError> {
        let base = self.base_url.as_str();
        let poller = *self.sequencer.poller();
        match name {
            "login" => {
                let page = LoginPage::new(self.driver.clone(), base, poller);
                page.open().await?;
                page.login(
                    &text_field(payload, "email")?,
                    &text_field(payload, "password")?,
                )
                .await?;
                Ok(DispatchResponse::new(200, json!({ "operation": name })))
            }
            "signup" => {
                let page = SignupPage::new(self.driver.clone(), base, poller);
                page.open().await?;
                page.signup(&text_fields(payload)).await?;
                Ok(DispatchResponse::new(200, json!({ "operation": name })))
            }
            "add_to_cart" => {
                let page = ProductListPage::new(self.driver.clone(), base, self.sequencer);
                page.open().await?;
                let step = page.add_to_cart(&text_field(payload, "product_id")?).await;
                self.settle(step, &[Selector::test_id("cart-error")]).await
            }
            "send_message" => {
                let chat = ChatWindow::new(self.driver.clone(), base, self.sequencer);
                chat.open().await?;
                chat.open_conversation(&text_field(payload, "conversation_id")?)
                    .await?;
                let step = chat.send_message(&text_field(payload, "text")?).await;
                self.settle(step, &[ChatWindow::error_banner()]).await
            }
            "ban_user" => {
                let email = text_field(payload, "email")?;
                let page = self.admin_users(&email).await?;
                let reason = payload.get("reason").and_then(Value::as_str);
                let step = page.ban_user(&email, reason).await;
                self.settle(step, &[AdminUsersPage::error_banner()]).await
            }
            "unban_user" => {
                let email = text_field(payload, "email")?;
                let page = self.admin_users(&email).await?;
                let step = page.unban_user(&email).await;
                self.settle(step, &[AdminUsersPage::error_banner()]).await
            }
            "create_product" => {
                let modal = ProductModal::new(self.driver.clone(), base, self.sequencer);
                modal.open().await?;
                let toast = modal.create(payload).await?;
                Ok(DispatchResponse::new(
                    200,
                    json!({ "operation": name, "toast": toast }),
                ))
            }
            other => Err(DispatchError::transport(format!(
                "unknown UI operation '{other}'"
            ))),
        }
    }
}

#[async_trait]
impl Dispatcher for UiDispatcher {
    async fn dispatch(
        &self,
        operation: &Operation,
        payload: &Payload,
    ) -> Result<DispatchResponse, DispatchError> {
        match operation {
            Operation::Ui { ui } => {
                tracing::debug!(operation = %ui, "UI dispatch");
                self.perform(ui, payload).await
            }
            Operation::Http { .. } => Err(DispatchError::transport(format!(
                "UI dispatcher cannot perform HTTP operation {operation}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{ErrorExpectation, Suite, TestCase};
    use crate::fixture::FixtureContext;
    use crate::page::fake::FakeDriver;
    use crate::runner::CaseRunner;

    const WEB: &str = "http://web.test";

    fn options() -> PollOptions {
        PollOptions::new()
            .with_timeout_ms(2_000)
            .with_poll_interval_ms(100)
    }

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => Payload::new(),
        }
    }

    fn login_app() -> FakeDriver {
        let fake = FakeDriver::new("about:blank");
        fake.put(&LoginPage::email_input(), "");
        fake.put(&LoginPage::password_input(), "");
        fake.put(&LoginPage::submit_button(), "Đăng nhập");
        fake.on_click(&LoginPage::submit_button(), |d| {
            let password = d.value(&LoginPage::password_input()).unwrap_or_default();
            if password.len() < 8 {
                d.put(&LoginPage::form_error(), "Mật khẩu không hợp lệ");
            } else {
                d.set_url("http://web.test/products");
            }
        });
        fake
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_operation() {
        let dispatcher = UiDispatcher::new(Arc::new(login_app()), WEB, options());
        let response = dispatcher
            .dispatch(
                &Operation::ui("login"),
                &payload(json!({"email": "u@cellex.test", "password": "ValidPass123"})),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ui_cases_through_runner() {
        let dispatcher = Arc::new(UiDispatcher::new(Arc::new(login_app()), WEB, options()));
        let suite = Suite::new("ui-login")
            .with_case(
                TestCase::new("UI_LOGIN_SHORT_PW", "password", Operation::ui("login"))
                    .with_payload(json!({"email": "u@cellex.test", "password": "123"}))
                    .expect_error(ErrorExpectation::any().with_message("không hợp lệ")),
            )
            .with_case(
                TestCase::new("UI_LOGIN_STATUS", "password", Operation::ui("login"))
                    .with_payload(json!({"email": "u@cellex.test", "password": "123"}))
                    .expect_error(ErrorExpectation::any().with_status(400)),
            );
        let report = CaseRunner::new(dispatcher)
            .run_suite(&suite, &mut FixtureContext::with_run_id("ui"))
            .await;
        assert!(report.results()[0].outcome.is_passed());
        // UI rejections carry no HTTP status
        assert!(report.results()[1].outcome.is_failed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_to_cart_reports_count() {
        let fake = FakeDriver::new("about:blank");
        fake.put(&ProductListPage::cart_badge(), "0");
        fake.put(&ProductListPage::add_button("p-7"), "Thêm vào giỏ");
        fake.on_click(&ProductListPage::add_button("p-7"), |d| {
            d.set_text(&ProductListPage::cart_badge(), "1");
        });
        let dispatcher = UiDispatcher::new(Arc::new(fake), WEB, options());
        let response = dispatcher
            .dispatch(&Operation::ui("add_to_cart"), &payload(json!({"product_id": "p-7"})))
            .await
            .unwrap();
        assert_eq!(response.body, json!({"observed": 1}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ban_rejection_message() {
        let fake = FakeDriver::new("about:blank");
        let email = "u@cellex.test";
        fake.put(&AdminUsersPage::status_cell(email), "Active");
        fake.put(&AdminUsersPage::ban_button(email), "Khóa");
        fake.put(&AdminUsersPage::confirm_button(), "Xác nhận");
        fake.on_click(&AdminUsersPage::confirm_button(), |d| {
            d.put(&AdminUsersPage::error_banner(), "Không thể khóa quản trị viên");
        });
        let dispatcher = UiDispatcher::new(Arc::new(fake), WEB, options());
        let err = dispatcher
            .dispatch(&Operation::ui("ban_user"), &payload(json!({"email": email})))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Rejected {
                message: "Không thể khóa quản trị viên".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_and_http_operations() {
        let dispatcher = UiDispatcher::new(Arc::new(FakeDriver::new("about:blank")), WEB, options());
        let unknown = dispatcher
            .dispatch(&Operation::ui("checkout"), &Payload::new())
            .await
            .unwrap_err();
        assert!(unknown.to_string().contains("checkout"));

        let http = dispatcher
            .dispatch(
                &Operation::http(crate::dispatch::HttpMethod::Get, "/products"),
                &Payload::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(http, DispatchError::Transport { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_payload_field() {
        let dispatcher = UiDispatcher::new(Arc::new(login_app()), WEB, options());
        let err = dispatcher
            .dispatch(&Operation::ui("login"), &payload(json!({"email": "u@cellex.test"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'password'"));
    }
}
