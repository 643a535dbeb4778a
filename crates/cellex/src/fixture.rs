//! Per-run fixtures.
//!
//! Payloads may carry placeholders that are resolved right before dispatch:
//!
//! | Placeholder          | Value                                         |
//! |----------------------|-----------------------------------------------|
//! | `${run_id}`          | the run identifier                            |
//! | `${unique_email}`    | `e2e-<run>-<n>@cellex.test`, fresh per use    |
//! | `${unique_username}` | `e2e_<run>_<n>`, fresh per use                |
//! | `${var:NAME}`        | a variable set by a setup capture or the CLI  |
//!
//! A string that is exactly one placeholder is replaced by the value itself, so
//! a captured numeric id stays a number.

use crate::case::Capture;
use crate::dispatch::Payload;
use crate::result::{HarnessError, HarnessResult};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

/// Domain used for generated e-mail addresses
pub const FIXTURE_EMAIL_DOMAIN: &str = "cellex.test";

fn placeholder_regex() -> HarnessResult<&'static Regex> {
    static PLACEHOLDER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{([a-z_]+)(?::([A-Za-z0-9_.\-]+))?\}"))
        .as_ref()
        .map_err(|e| HarnessError::fixture(format!("placeholder pattern: {e}")))
}

/// Run-scoped values: run id, generated identities and captured variables.
#[derive(Debug, Clone)]
pub struct FixtureContext {
    run_id: String,
    counter: u64,
    vars: HashMap<String, Value>,
}

impl Default for FixtureContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureContext {
    /// Create a context with a fresh run id
    #[must_use]
    pub fn new() -> Self {
        let mut run_id = Uuid::new_v4().simple().to_string();
        run_id.truncate(8);
        Self::with_run_id(run_id)
    }

    /// Create a context with a fixed run id
    #[must_use]
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            counter: 0,
            vars: HashMap::new(),
        }
    }

    /// Run identifier
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Set a variable
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Read a variable
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Generate a unique e-mail address
    pub fn unique_email(&mut self) -> String {
        self.counter += 1;
        format!(
            "e2e-{}-{}@{FIXTURE_EMAIL_DOMAIN}",
            self.run_id, self.counter
        )
    }

    /// Generate a unique username
    pub fn unique_username(&mut self) -> String {
        self.counter += 1;
        format!("e2e_{}_{}", self.run_id, self.counter)
    }

    /// Store the value at `capture.pointer` in `body` as `capture.var`.
    pub fn capture(&mut self, capture: &Capture, body: &Value) -> HarnessResult<()> {
        let value = body.pointer(&capture.pointer).ok_or_else(|| {
            HarnessError::fixture(format!(
                "capture '{}': nothing at {} in response",
                capture.var, capture.pointer
            ))
        })?;
        tracing::debug!(var = %capture.var, value = %value, "captured fixture variable");
        self.vars.insert(capture.var.clone(), value.clone());
        Ok(())
    }

    /// Resolve every placeholder in a payload
    pub fn resolve_payload(&mut self, payload: &Payload) -> HarnessResult<Payload> {
        payload
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.resolve_value(value)?)))
            .collect()
    }

    /// Resolve every placeholder in a JSON value
    pub fn resolve_value(&mut self, value: &Value) -> HarnessResult<Value> {
        match value {
            Value::String(s) => self.resolve_string(s),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<HarnessResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => self.resolve_payload(map).map(Value::Object),
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&mut self, s: &str) -> HarnessResult<Value> {
        let re = placeholder_regex()?;
        if !s.contains("${") {
            return Ok(Value::String(s.to_string()));
        }

        if let Some(caps) = re.captures(s) {
            if caps.get(0).is_some_and(|m| m.as_str().len() == s.len()) {
                return self.lookup(&caps);
            }
        }

        let mut out = String::with_capacity(s.len());
        let mut last = 0;
        for caps in re.captures_iter(s) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&s[last..whole.start()]);
            match self.lookup(&caps)? {
                Value::String(text) => out.push_str(&text),
                other => out.push_str(&other.to_string()),
            }
            last = whole.end();
        }
        out.push_str(&s[last..]);
        Ok(Value::String(out))
    }

    fn lookup(&mut self, caps: &Captures<'_>) -> HarnessResult<Value> {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let arg = caps.get(2).map(|m| m.as_str());
        match (name, arg) {
            ("run_id", None) => Ok(Value::String(self.run_id.clone())),
            ("unique_email", None) => Ok(Value::String(self.unique_email())),
            ("unique_username", None) => Ok(Value::String(self.unique_username())),
            ("var", Some(var)) => self.vars.get(var).cloned().ok_or_else(|| {
                HarnessError::fixture(format!("variable '{var}' is not set"))
            }),
            _ => Err(HarnessError::fixture(format!(
                "unknown placeholder '{}'",
                caps.get(0).map_or("", |m| m.as_str())
            ))),
        }
    }
}
