//! Dispatcher boundary.
//!
//! A dispatcher performs the operation under test (an HTTP call or a named UI
//! flow) and returns either a 2xx response or a structured error. The case runner
//! depends only on this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Input payload: field name to value, in declaration order.
pub type Payload = Map<String, Value>;

/// HTTP method of an API operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the payload travels in the query string rather than the body
    #[must_use]
    pub const fn uses_query(&self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the action a case invokes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operation {
    /// Backend endpoint
    Http {
        /// HTTP method
        method: HttpMethod,
        /// Path relative to the API base URL; `{field}` segments come from the payload
        path: String,
    },
    /// Named page-object flow
    Ui {
        /// Operation name, e.g. `login`
        ui: String,
    },
}

impl Operation {
    /// Create an HTTP operation
    #[must_use]
    pub fn http(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::Http {
            method,
            path: path.into(),
        }
    }

    /// Create a UI operation
    #[must_use]
    pub fn ui(name: impl Into<String>) -> Self {
        Self::Ui { ui: name.into() }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { method, path } => write!(f, "{method} {path}"),
            Self::Ui { ui } => write!(f, "ui:{ui}"),
        }
    }
}

/// Successful dispatch result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResponse {
    /// HTTP status (UI dispatchers report 200)
    pub status: u16,
    /// Response body
    pub body: Value,
}

impl DispatchResponse {
    /// Create a response
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Whether the status is in the success class
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Structured dispatch failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// The system under test answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Response {
        /// HTTP status
        status: u16,
        /// Response body (JSON, or a JSON string for non-JSON bodies)
        body: Value,
    },
    /// The UI refused the action and showed a message
    #[error("rejected: {message}")]
    Rejected {
        /// Visible validation or error message
        message: String,
    },
    /// The operation could not be performed at all
    #[error("transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },
}

impl DispatchError {
    /// Create a response error
    #[must_use]
    pub const fn response(status: u16, body: Value) -> Self {
        Self::Response { status, body }
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// HTTP status, when the backend answered
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Rejected { .. } | Self::Transport { .. } => None,
        }
    }

    /// Numeric domain error code from the body (`code`), not the HTTP status
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Response { body, .. } => match body.get("code")? {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            },
            Self::Rejected { .. } | Self::Transport { .. } => None,
        }
    }

    /// Human-readable message carried by the error
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Response { body, .. } => match body {
                Value::String(s) => Some(s.clone()),
                _ => ["message", "error"]
                    .iter()
                    .find_map(|key| body.get(*key).and_then(Value::as_str))
                    .map(str::to_string),
            },
            Self::Rejected { message } => Some(message.clone()),
            Self::Transport { message } => Some(message.clone()),
        }
    }
}

/// Performs operations under test.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Perform `operation` with `payload`.
    ///
    /// Returns the response for 2xx outcomes and a [`DispatchError`] otherwise.
    async fn dispatch(
        &self,
        operation: &Operation,
        payload: &Payload,
    ) -> Result<DispatchResponse, DispatchError>;
}
