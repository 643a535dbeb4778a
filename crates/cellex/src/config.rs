//! Harness configuration
//!
//! Values come from defaults, then `CELLEX_*` environment variables (a `.env`
//! file is loaded first when present), then explicit overrides such as CLI flags.

use crate::http::ApiConfig;
use crate::result::{HarnessError, HarnessResult};
use crate::wait::{PollOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};

/// Environment variable for the web front-end URL
pub const ENV_WEB_URL: &str = "CELLEX_WEB_URL";
/// Environment variable for the API base URL
pub const ENV_API_URL: &str = "CELLEX_API_URL";
/// Environment variable for the WebDriver endpoint
pub const ENV_WEBDRIVER_URL: &str = "CELLEX_WEBDRIVER_URL";
/// Environment variable for the poll interval in milliseconds
pub const ENV_POLL_INTERVAL_MS: &str = "CELLEX_POLL_INTERVAL_MS";
/// Environment variable for the default wait timeout in milliseconds
pub const ENV_TIMEOUT_MS: &str = "CELLEX_TIMEOUT_MS";
/// Environment variable toggling headless browsers
pub const ENV_HEADLESS: &str = "CELLEX_HEADLESS";
/// Environment variable for the admin account e-mail
pub const ENV_ADMIN_EMAIL: &str = "CELLEX_ADMIN_EMAIL";
/// Environment variable for the admin account password
pub const ENV_ADMIN_PASSWORD: &str = "CELLEX_ADMIN_PASSWORD";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Web front-end URL
    pub web_url: String,
    /// API base URL
    pub api_url: String,
    /// WebDriver server URL
    pub webdriver_url: String,
    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Default wait timeout in milliseconds
    pub default_timeout_ms: u64,
    /// Run browsers headless
    pub headless: bool,
    /// Admin account e-mail
    pub admin_email: Option<String>,
    /// Admin account password
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            web_url: "http://localhost:3000".to_string(),
            api_url: "http://localhost:8080/api".to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            headless: true,
            admin_email: None,
            admin_password: None,
        }
    }
}

fn parse_millis(name: &str, raw: &str) -> HarnessResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| HarnessError::config(format!("{name} must be a whole number of milliseconds, got '{raw}'")))
}

fn parse_bool(name: &str, raw: &str) -> HarnessResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HarnessError::config(format!(
            "{name} must be true or false, got '{raw}'"
        ))),
    }
}

impl HarnessConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `.env` and the process environment
    pub fn from_env() -> HarnessResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(HarnessError::config(format!(".env: {err}"))),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> HarnessResult<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_WEB_URL) {
            config.web_url = url;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            config.api_url = url;
        }
        if let Some(url) = lookup(ENV_WEBDRIVER_URL) {
            config.webdriver_url = url;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.default_timeout_ms = parse_millis(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            config.headless = parse_bool(ENV_HEADLESS, &raw)?;
        }
        config.admin_email = lookup(ENV_ADMIN_EMAIL).filter(|v| !v.is_empty());
        config.admin_password = lookup(ENV_ADMIN_PASSWORD).filter(|v| !v.is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Check URLs
    pub fn validate(&self) -> HarnessResult<()> {
        for (name, url) in [
            ("web_url", &self.web_url),
            ("api_url", &self.api_url),
            ("webdriver_url", &self.webdriver_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(HarnessError::config(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        Ok(())
    }

    /// Set the API base URL
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the web front-end URL
    #[must_use]
    pub fn with_web_url(mut self, url: impl Into<String>) -> Self {
        self.web_url = url.into();
        self
    }

    /// Set the WebDriver URL
    #[must_use]
    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = url.into();
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the default wait timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set admin credentials
    #[must_use]
    pub fn with_admin(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.admin_email = Some(email.into());
        self.admin_password = Some(password.into());
        self
    }

    /// Poll options for waits
    #[must_use]
    pub fn poll_options(&self) -> PollOptions {
        PollOptions::new()
            .with_timeout_ms(self.default_timeout_ms)
            .with_poll_interval_ms(self.poll_interval_ms)
    }

    /// API dispatcher configuration
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.api_url.clone())
    }

    /// Admin credentials, when both are set
    #[must_use]
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        Some((self.admin_email.as_deref()?, self.admin_password.as_deref()?))
    }
}
