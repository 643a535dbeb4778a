//! W3C WebDriver client.
//!
//! Speaks the JSON wire protocol of chromedriver/geckodriver/Selenium over
//! `reqwest`. Only the commands the page objects use are implemented.

use super::driver::{BrowserDriver, DriverError, DriverResult, Selector};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

/// Key under which W3C drivers return element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735a6f06d0";

/// Browser session options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// `browserName` capability
    pub browser: String,
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub width: u32,
    /// Viewport height
    pub height: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            browser: "chrome".to_string(),
            headless: true,
            width: 1280,
            height: 800,
        }
    }
}

impl SessionOptions {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    fn capabilities(&self) -> Value {
        let mut args = vec![format!("--window-size={},{}", self.width, self.height)];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": self.browser,
                    "goog:chromeOptions": { "args": args },
                    "moz:firefoxOptions": { "args": if self.headless { vec!["-headless"] } else { vec![] } }
                }
            }
        })
    }
}

/// A live WebDriver session
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    endpoint: String,
    session_id: String,
    client: reqwest::Client,
}

async fn read_value(response: reqwest::Response) -> DriverResult<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| DriverError::Transport(e.to_string()))?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Err(DriverError::Protocol { error, message })
}

impl WebDriverSession {
    /// Start a new browser session on the WebDriver server at `endpoint`
    pub async fn start(endpoint: impl Into<String>, options: &SessionOptions) -> DriverResult<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DriverError::Transport(e.to_string()))?;

        let response = client
            .post(format!("{endpoint}/session"))
            .json(&options.capabilities())
            .send()
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;
        let value = read_value(response).await.map_err(|e| DriverError::Session {
            message: e.to_string(),
        })?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Session {
                message: "new session response has no sessionId".to_string(),
            })?
            .to_string();

        tracing::info!(%endpoint, %session_id, "WebDriver session started");
        Ok(Self {
            endpoint,
            session_id,
            client,
        })
    }

    /// Session identifier
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// End the session and close the browser
    pub async fn quit(self) -> DriverResult<()> {
        self.command(Method::DELETE, "", None).await?;
        tracing::info!(session_id = %self.session_id, "WebDriver session closed");
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> DriverResult<Value> {
        let url = format!("{}/session/{}{path}", self.endpoint, self.session_id);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;
        read_value(response).await
    }

    async fn find(&self, selector: &Selector) -> DriverResult<String> {
        let (using, value) = selector.to_locator();
        let found = self
            .command(
                Method::POST,
                "/element",
                Some(json!({"using": using, "value": value})),
            )
            .await
            .map_err(|e| match e {
                DriverError::Protocol { ref error, .. } if error == "no such element" => {
                    DriverError::not_found(selector)
                }
                other => other,
            })?;
        found
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DriverError::Protocol {
                error: "invalid response".to_string(),
                message: format!("no element reference for {selector}"),
            })
    }
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> DriverResult<()> {
        tracing::debug!(url, "navigate");
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn current_url(&self) -> DriverResult<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&self, selector: &Selector) -> DriverResult<()> {
        let element = self.find(selector).await?;
        self.command(
            Method::POST,
            &format!("/element/{element}/click"),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> DriverResult<()> {
        let element = self.find(selector).await?;
        self.command(
            Method::POST,
            &format!("/element/{element}/clear"),
            Some(json!({})),
        )
        .await?;
        self.command(
            Method::POST,
            &format!("/element/{element}/value"),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn text(&self, selector: &Selector) -> DriverResult<String> {
        let element = self.find(selector).await?;
        let value = self
            .command(Method::GET, &format!("/element/{element}/text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn count(&self, selector: &Selector) -> DriverResult<usize> {
        let (using, value) = selector.to_locator();
        let found = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({"using": using, "value": value})),
            )
            .await?;
        Ok(found.as_array().map_or(0, Vec::len))
    }

    async fn is_displayed(&self, selector: &Selector) -> DriverResult<bool> {
        let element = match self.find(selector).await {
            Ok(element) => element,
            Err(DriverError::ElementNotFound { .. }) => return Ok(false),
            Err(other) => return Err(other),
        };
        let value = self
            .command(Method::GET, &format!("/element/{element}/displayed"), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}
