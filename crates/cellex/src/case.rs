//! Declarative test cases and suite tables.
//!
//! On disk a case is a loose record (`should_succeed`, `expected_status`,
//! `expected_code`, `expected_message`). In memory it is a [`TestCase`] whose
//! [`Expectation`] is a sum type, so a success case can never carry an expected
//! error code or message. The conversion rejects inconsistent records when the
//! table is loaded, not when the case runs.

use crate::dispatch::{DispatchError, Operation, Payload};
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Group used when a record does not name one
pub const DEFAULT_GROUP: &str = "general";

/// Declared checks for an expected-error case. Absent fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorExpectation {
    /// Exact HTTP status
    pub status: Option<u16>,
    /// Exact domain error code from the body
    pub code: Option<i64>,
    /// Substring of the actual message
    pub message: Option<String>,
}

impl ErrorExpectation {
    /// Any error satisfies this expectation
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Require an HTTP status
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Require a domain error code
    #[must_use]
    pub const fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Require the message to contain `message`
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// What a case expects from its dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "expect", rename_all = "snake_case")]
pub enum Expectation {
    /// The operation must succeed with a 2xx status
    Success,
    /// The operation must fail in the declared way
    Error(ErrorExpectation),
}

impl Expectation {
    /// Whether this is an expected-success case
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = match self {
            Self::Success => return f.write_str("success (2xx)"),
            Self::Error(expected) => expected,
        };
        let mut parts = Vec::new();
        if let Some(status) = expected.status {
            parts.push(format!("status={status}"));
        }
        if let Some(code) = expected.code {
            parts.push(format!("code={code}"));
        }
        if let Some(message) = &expected.message {
            parts.push(format!("message contains {message:?}"));
        }
        if parts.is_empty() {
            f.write_str("any error")
        } else {
            write!(f, "error {}", parts.join(" "))
        }
    }
}

/// Run-time skip rule for expected-success cases whose backing entity may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkipCondition {
    /// HTTP status that triggers the skip
    pub status: u16,
    /// Optional substring the error message must contain
    #[serde(default)]
    pub message_contains: Option<String>,
    /// Reason reported for the skip
    pub reason: String,
}

impl SkipCondition {
    /// Skip when the dispatch fails with `status`
    #[must_use]
    pub fn on_status(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            message_contains: None,
            reason: reason.into(),
        }
    }

    /// Whether a dispatch error matches this condition
    #[must_use]
    pub fn matches(&self, error: &DispatchError) -> bool {
        if error.status() != Some(self.status) {
            return false;
        }
        match &self.message_contains {
            Some(needle) => error
                .message()
                .is_some_and(|message| message.contains(needle.as_str())),
            None => true,
        }
    }
}

/// Cleanup operation a case declares for itself (e.g. unban-on-finish).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Teardown {
    /// Operation to dispatch after the case finishes
    pub operation: Operation,
    /// Payload for the teardown operation
    #[serde(default)]
    pub payload: Payload,
}

/// One declarative validation scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Stable identifier
    pub id: String,
    /// Reporting group
    pub group: String,
    /// Human-readable intent
    pub description: String,
    /// Action to invoke
    pub operation: Operation,
    /// Exact input under test
    pub payload: Payload,
    /// Expected outcome
    pub expectation: Expectation,
    /// Run-time skip rule
    pub skip_condition: Option<SkipCondition>,
    /// Declared cleanup
    pub teardown: Option<Teardown>,
}

impl TestCase {
    /// Create an expected-success case with an empty payload
    #[must_use]
    pub fn new(id: impl Into<String>, group: impl Into<String>, operation: Operation) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
            description: String::new(),
            operation,
            payload: Payload::new(),
            expectation: Expectation::Success,
            skip_condition: None,
            teardown: None,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the payload from a JSON object; other JSON values leave it empty
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = match payload {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        self
    }

    /// Expect a 2xx outcome
    #[must_use]
    pub fn expect_success(mut self) -> Self {
        self.expectation = Expectation::Success;
        self
    }

    /// Expect a declared error
    #[must_use]
    pub fn expect_error(mut self, expected: ErrorExpectation) -> Self {
        self.expectation = Expectation::Error(expected);
        self
    }

    /// Skip at run time when the dispatch error matches `condition`
    #[must_use]
    pub fn skip_if(mut self, condition: SkipCondition) -> Self {
        self.skip_condition = Some(condition);
        self
    }

    /// Declare a cleanup operation
    #[must_use]
    pub fn with_teardown(mut self, teardown: Teardown) -> Self {
        self.teardown = Some(teardown);
        self
    }
}

/// Loose on-disk case record.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseRecord {
    id: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    description: String,
    operation: Operation,
    #[serde(default)]
    payload: Payload,
    #[serde(default)]
    should_succeed: Option<bool>,
    #[serde(default)]
    expected_status: Option<u16>,
    #[serde(default)]
    expected_code: Option<i64>,
    #[serde(default)]
    expected_message: Option<String>,
    #[serde(default)]
    skip_if: Option<SkipCondition>,
    #[serde(default)]
    teardown: Option<Teardown>,
}

impl TryFrom<CaseRecord> for TestCase {
    type Error = HarnessError;

    fn try_from(record: CaseRecord) -> HarnessResult<Self> {
        let id = record.id.trim().to_string();
        if id.is_empty() {
            return Err(HarnessError::invalid_case("<unnamed>", "id must not be empty"));
        }

        let declared_error = ErrorExpectation {
            status: record.expected_status,
            code: record.expected_code,
            message: record.expected_message,
        };
        let has_error_fields = declared_error != ErrorExpectation::default();

        let expectation = match (record.should_succeed, has_error_fields) {
            (Some(true), true) => {
                return Err(HarnessError::invalid_case(
                    id,
                    "should_succeed: true cannot be combined with expected_status, expected_code or expected_message",
                ));
            }
            (Some(true), false) => Expectation::Success,
            (Some(false), _) | (None, true) => Expectation::Error(declared_error),
            (None, false) => {
                return Err(HarnessError::invalid_case(
                    id,
                    "declare should_succeed or at least one expected_* field",
                ));
            }
        };

        if record.skip_if.is_some() && !expectation.is_success() {
            return Err(HarnessError::invalid_case(
                id,
                "skip_if only applies to expected-success cases",
            ));
        }

        Ok(Self {
            id,
            group: record
                .group
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            description: record.description,
            operation: record.operation,
            payload: record.payload,
            expectation,
            skip_condition: record.skip_if,
            teardown: record.teardown,
        })
    }
}

/// Response value to remember after a setup step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Capture {
    /// Fixture variable name, referenced as `${var:NAME}`
    pub var: String,
    /// JSON pointer into the response body, e.g. `/result/id`
    pub pointer: String,
}

/// Suite-level precondition, dispatched before any case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetupStep {
    /// What the step establishes
    #[serde(default)]
    pub description: String,
    /// Operation to dispatch
    pub operation: Operation,
    /// Payload for the operation
    #[serde(default)]
    pub payload: Payload,
    /// Value to capture from the response
    #[serde(default)]
    pub capture: Option<Capture>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteDocument {
    suite: String,
    #[serde(default)]
    setup: Vec<SetupStep>,
    cases: Vec<CaseRecord>,
}

/// An ordered, validated case table.
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    /// Suite name
    pub name: String,
    /// Preconditions for the whole suite
    pub setup: Vec<SetupStep>,
    /// Cases in declaration order
    pub cases: Vec<TestCase>,
}

impl Suite {
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setup: Vec::new(),
            cases: Vec::new(),
        }
    }

    /// Add a setup step
    #[must_use]
    pub fn with_setup(mut self, step: SetupStep) -> Self {
        self.setup.push(step);
        self
    }

    /// Add a case
    #[must_use]
    pub fn with_case(mut self, case: TestCase) -> Self {
        self.cases.push(case);
        self
    }

    /// Parse a YAML (or JSON) suite document and validate every case.
    pub fn from_yaml_str(source: &str) -> HarnessResult<Self> {
        let document: SuiteDocument = serde_yaml_ng::from_str(source)?;
        let cases = document
            .cases
            .into_iter()
            .map(TestCase::try_from)
            .collect::<HarnessResult<Vec<_>>>()?;
        let suite = Self {
            name: document.suite,
            setup: document.setup,
            cases,
        };
        suite.validate()?;
        Ok(suite)
    }

    /// Load a suite file
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source).map_err(|err| match err {
            HarnessError::Yaml(inner) => HarnessError::InvalidSuite {
                suite: path.display().to_string(),
                message: inner.to_string(),
            },
            other => other,
        })
    }

    /// Check table-wide invariants
    pub fn validate(&self) -> HarnessResult<()> {
        if self.name.trim().is_empty() {
            return Err(HarnessError::InvalidSuite {
                suite: "<unnamed>".to_string(),
                message: "suite name must not be empty".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for case in &self.cases {
            if !seen.insert(case.id.as_str()) {
                return Err(HarnessError::invalid_case(
                    case.id.clone(),
                    "duplicate id in suite",
                ));
            }
        }
        Ok(())
    }

    /// Group names in first-appearance order
    #[must_use]
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for case in &self.cases {
            if !groups.contains(&case.group.as_str()) {
                groups.push(case.group.as_str());
            }
        }
        groups
    }

    /// Look up a case by id
    #[must_use]
    pub fn case(&self, id: &str) -> Option<&TestCase> {
        self.cases.iter().find(|case| case.id == id)
    }
}
