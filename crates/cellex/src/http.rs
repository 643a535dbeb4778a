//! HTTP dispatcher for the Cellex REST API.

use crate::auth::AuthContext;
use crate::dispatch::{DispatchError, DispatchResponse, Dispatcher, HttpMethod, Operation, Payload};
use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the API lives and how its session endpoints look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://localhost:8080/api`
    pub base_url: String,
    /// Login endpoint; a successful POST here stores the session token
    pub login_path: String,
    /// Logout endpoint; a successful call here clears the session token
    pub logout_path: String,
    /// JSON pointers tried in order to find the token in a login response
    pub token_pointers: Vec<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080/api")
    }
}

impl ApiConfig {
    /// Create a config for `base_url` with the standard endpoints
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            login_path: "/auth/login".to_string(),
            logout_path: "/auth/logout".to_string(),
            token_pointers: ["/result/token", "/token", "/accessToken", "/data/token"]
                .map(String::from)
                .to_vec(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Build the request URL for `template` under `base_url`.
///
/// `{field}` placeholders are taken out of `payload` and each path segment is
/// percent-encoded, so a value can never add segments, a query or a fragment.
fn fill_path(
    base_url: &str,
    template: &str,
    payload: &mut Payload,
) -> Result<reqwest::Url, DispatchError> {
    let mut segments = Vec::new();
    for raw in template.trim_start_matches('/').split('/') {
        let mut segment = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            let name = &rest[open + 1..close];
            let value = payload.remove(name).ok_or_else(|| {
                DispatchError::transport(format!(
                    "path parameter '{name}' missing from payload for {template}"
                ))
            })?;
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            if value.is_empty() {
                return Err(DispatchError::transport(format!(
                    "path parameter '{name}' is empty for {template}"
                )));
            }
            segment.push_str(&rest[..open]);
            segment.push_str(&value);
            rest = &rest[close + 1..];
        }
        segment.push_str(rest);
        segments.push(segment);
    }

    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| DispatchError::transport(format!("invalid API URL {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| DispatchError::transport(format!("API URL {base_url} cannot have a path")))?
        .pop_if_empty()
        .extend(&segments);
    Ok(url)
}

fn query_pairs(payload: &Payload) -> Vec<(String, String)> {
    payload
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Dispatches HTTP operations against the Cellex API.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    config: ApiConfig,
    client: reqwest::Client,
    auth: AuthContext,
}

impl HttpDispatcher {
    /// Create a dispatcher with a fresh session
    pub fn new(config: ApiConfig) -> HarnessResult<Self> {
        Self::with_auth(config, AuthContext::new())
    }

    /// Create a dispatcher sharing an existing session
    pub fn with_auth(config: ApiConfig, auth: AuthContext) -> HarnessResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HarnessError::config(format!("HTTP client: {e}")))?;
        Ok(Self {
            config,
            client,
            auth,
        })
    }

    /// API configuration
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Session shared with this dispatcher
    #[must_use]
    pub const fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Log in and store the session token
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<DispatchResponse, DispatchError> {
        let payload = match json!({"email": email, "password": password}) {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        let operation = Operation::http(HttpMethod::Post, self.config.login_path.clone());
        self.dispatch(&operation, &payload).await
    }

    /// Drop the session token
    pub async fn clear_auth(&self) {
        self.auth.clear().await;
    }

    async fn send(
        &self,
        method: HttpMethod,
        template: &str,
        payload: &Payload,
    ) -> Result<DispatchResponse, DispatchError> {
        let mut body = payload.clone();
        let url = fill_path(&self.config.base_url, template, &mut body)?;

        let mut request = match method {
            HttpMethod::Get => self.client.get(url.clone()),
            HttpMethod::Post => self.client.post(url.clone()),
            HttpMethod::Put => self.client.put(url.clone()),
            HttpMethod::Patch => self.client.patch(url.clone()),
            HttpMethod::Delete => self.client.delete(url.clone()),
        };
        request = if method.uses_query() {
            request.query(&query_pairs(&body))
        } else {
            request.json(&body)
        };
        if let Some(token) = self.auth.token().await {
            request = request.bearer_auth(token);
        }

        tracing::debug!(%method, %url, "sending request");
        let response = request
            .send()
            .await
            .map_err(|e| DispatchError::transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| DispatchError::transport(e.to_string()))?;
        let body = parse_body(&text);
        tracing::debug!(%method, %url, status, "received response");

        if (200..300).contains(&status) {
            self.track_session(method, template, &body).await;
            Ok(DispatchResponse::new(status, body))
        } else {
            if status == 401 {
                tracing::warn!(%method, %url, "401 response, clearing session");
                self.auth.clear().await;
            }
            Err(DispatchError::response(status, body))
        }
    }

    async fn track_session(&self, method: HttpMethod, path: &str, body: &Value) {
        if method == HttpMethod::Post && path == self.config.login_path {
            let token = self
                .config
                .token_pointers
                .iter()
                .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str));
            match token {
                Some(token) => self.auth.set_token(token).await,
                None => tracing::warn!("login succeeded but no token found in response"),
            }
        } else if path == self.config.logout_path {
            self.auth.clear().await;
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(
        &self,
        operation: &Operation,
        payload: &Payload,
    ) -> Result<DispatchResponse, DispatchError> {
        match operation {
            Operation::Http { method, path } => self.send(*method, path, payload).await,
            Operation::Ui { ui } => Err(DispatchError::transport(format!(
                "HTTP dispatcher cannot perform UI operation '{ui}'"
            ))),
        }
    }
}
