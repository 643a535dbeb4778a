//! Cellex: end-to-end validation harness for the Cellex marketplace
//!
//! Cases are declarative rows (operation, payload, expected outcome) run against
//! the REST API or the web front-end. Asynchronous UI effects are observed by
//! polling, never by fixed sleeps.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                        CELLEX Architecture                            │
//! ├───────────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌──────────────────────────┐    │
//! │   │ Case table │    │ CaseRunner │    │ Dispatcher               │    │
//! │   │ (YAML)     │───►│ classify   │───►│  HttpDispatcher (API)    │    │
//! │   │            │    │ + fixtures │    │  UiDispatcher (pages)    │    │
//! │   └────────────┘    └─────┬──────┘    └───────────┬──────────────┘    │
//! │                           │                       │                   │
//! │                           ▼                       ▼                   │
//! │                     ┌────────────┐    ┌──────────────────────────┐    │
//! │                     │ SuiteReport│    │ Sequencer ─► Poller      │    │
//! │                     │ text/JSON  │    │ (act once, verify polls) │    │
//! │                     └────────────┘    └──────────────────────────┘    │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod auth;
mod case;
mod config;
mod dispatch;
mod fixture;
mod http;
mod reporter;
mod result;
mod runner;
mod sequence;
mod wait;

/// Page objects and the browser driver
pub mod page;

pub use auth::AuthContext;
pub use case::{
    Capture, CaseRecord, ErrorExpectation, Expectation, SetupStep, SkipCondition, Suite, Teardown,
    TestCase, DEFAULT_GROUP,
};
pub use config::{
    HarnessConfig, ENV_ADMIN_EMAIL, ENV_ADMIN_PASSWORD, ENV_API_URL, ENV_HEADLESS,
    ENV_POLL_INTERVAL_MS, ENV_TIMEOUT_MS, ENV_WEBDRIVER_URL, ENV_WEB_URL,
};
pub use dispatch::{
    DispatchError, DispatchResponse, Dispatcher, HttpMethod, Operation, Payload,
};
pub use fixture::{FixtureContext, FIXTURE_EMAIL_DOMAIN};
pub use http::{ApiConfig, HttpDispatcher, DEFAULT_REQUEST_TIMEOUT};
pub use reporter::{CaseResult, GroupSummary, SuiteReport, JUNIT_HEADER};
pub use result::{HarnessError, HarnessResult};
pub use runner::{classify, CaseOutcome, CaseRunner, CaseState, CheckField, Failure, Mismatch};
pub use sequence::{Expected, Sequencer, StepFailure, StepResult};
pub use wait::{
    wait_until, PollOptions, PollResult, Poller, Truthy, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS, FALLBACK_POLL_INTERVAL_MS, PRESENCE_WAIT_TIMEOUT_MS,
    SLOW_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::case::*;
    pub use super::dispatch::*;
    pub use super::fixture::FixtureContext;
    pub use super::page::{BrowserDriver, PageObject, Selector, UiDispatcher};
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::sequence::*;
    pub use super::wait::*;
    pub use super::{ApiConfig, HarnessConfig, HttpDispatcher};
}
