//! Chat window.

use super::driver::{BrowserDriver, DriverResult, Selector};
use super::PageObject;
use crate::sequence::{Expected, Sequencer, StepResult};
use async_trait::async_trait;
use std::sync::Arc;

/// `/chat`
#[derive(Clone)]
pub struct ChatWindow {
    driver: Arc<dyn BrowserDriver>,
    base_url: String,
    sequencer: Sequencer,
}

impl std::fmt::Debug for ChatWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatWindow")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ChatWindow {
    /// Page path
    pub const PATH: &'static str = "/chat";

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

    /// Entry in the conversation list
    #[must_use]
    pub fn conversation(id: &str) -> Selector {
        Selector::css(format!("[data-conversation-id={id:?}]"))
    }

    /// Message composer
    #[must_use]
    pub fn input() -> Selector {
        Selector::test_id("chat-input")
    }

    /// Send button
    #[must_use]
    pub fn send_button() -> Selector {
        Selector::test_id("chat-send")
    }

    /// Every rendered message bubble
    #[must_use]
    pub fn messages() -> Selector {
        Selector::test_id("chat-message")
    }

    /// Most recent message bubble
    #[must_use]
    pub fn last_message() -> Selector {
        Selector::xpath("(//*[@data-testid=\"chat-message\"])[last()]")
    }

    /// Error banner shown when a message is refused
    #[must_use]
    pub fn error_banner() -> Selector {
        Selector::test_id("chat-error")
    }

    /// Navigate to the chat page
    pub async fn open(&self) -> DriverResult<()> {
        self.driver
            .goto(&format!("{}{}", self.base_url, Self::PATH))
            .await?;
        self.wait_until_current(self.sequencer.poller()).await
    }

    /// Select a conversation
    pub async fn open_conversation(&self, id: &str) -> DriverResult<()> {
        self.driver.click(&Self::conversation(id)).await
    }

    /// Number of messages and the text of the newest one
    pub async fn snapshot(&self) -> DriverResult<(usize, String)> {
        let count = self.driver.count(&Self::messages()).await?;
        if count == 0 {
            return Ok((0, String::new()));
        }
        let last = self.driver.text(&Self::last_message()).await?;
        Ok((count, last))
    }

    /// Send `text` once and wait for exactly one new message carrying it
    pub async fn send_message(&self, text: &str) -> StepResult<(usize, String)> {
        let (baseline, _) = match self.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                return StepResult::ActionFailed {
                    step: "send message".to_string(),
                    error: format!("could not read conversation: {err}"),
                }
            }
        };

        let needle = text.to_string();
        let expected = Expected::new(
            format!("{} messages, newest containing {needle:?}", baseline + 1),
            move |(count, last): &(usize, String)| *count == baseline + 1 && last.contains(&needle),
        );

        self.sequencer
            .act_then_verify(
                "send message",
                || async move {
                    self.driver.fill(&Self::input(), text).await?;
                    self.driver.click(&Self::send_button()).await
                },
                || self.snapshot(),
                &expected,
            )
            .await
    }
}

#[async_trait]
impl PageObject for ChatWindow {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &str {
        "chat window"
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    fn ready_selector(&self) -> Option<Selector> {
        Some(Self::input())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::FakeDriver;
    use crate::wait::PollOptions;
    use std::time::Duration;

    fn window(fake: &FakeDriver) -> ChatWindow {
        ChatWindow::new(
            Arc::new(fake.clone()),
            "http://web.test",
            Sequencer::with_options(
                PollOptions::new()
                    .with_timeout_ms(5_000)
                    .with_poll_interval_ms(250),
            ),
        )
    }

    fn conversation(fake: &FakeDriver) {
        fake.put(&ChatWindow::conversation("c-1"), "Shop Cellex");
        fake.put(&ChatWindow::input(), "");
        fake.put(&ChatWindow::send_button(), "Gửi");
        fake.put_many(&ChatWindow::messages(), "", 2);
        fake.put(&ChatWindow::last_message(), "Xin chào");
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_appears_after_delay() {
        let fake = FakeDriver::new("about:blank");
        conversation(&fake);
        fake.on_click(&ChatWindow::send_button(), |d| {
            let d = d.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1_200)).await;
                d.put_many(&ChatWindow::messages(), "", 3);
                d.put(&ChatWindow::last_message(), "Còn hàng không?");
            });
        });
        let chat = window(&fake);
        chat.open().await.unwrap();
        chat.open_conversation("c-1").await.unwrap();

        let observed = chat.send_message("Còn hàng không?").await.into_result().unwrap();
        assert_eq!(observed, (3, "Còn hàng không?".to_string()));
        assert_eq!(fake.value(&ChatWindow::input()).as_deref(), Some("Còn hàng không?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_send_is_detected() {
        let fake = FakeDriver::new("about:blank");
        conversation(&fake);
        fake.on_click(&ChatWindow::send_button(), |d| {
            d.put_many(&ChatWindow::messages(), "", 4);
            d.put(&ChatWindow::last_message(), "hello");
        });
        let chat = window(&fake);
        let failure = chat.send_message("hello").await.into_result().unwrap_err();
        assert!(failure.expected.starts_with("3 messages"));
        assert!(failure.observed.contains('4'));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_conversation_snapshot() {
        let fake = FakeDriver::new("http://web.test/chat");
        let chat = window(&fake);
        assert_eq!(chat.snapshot().await.unwrap(), (0, String::new()));
    }
}
