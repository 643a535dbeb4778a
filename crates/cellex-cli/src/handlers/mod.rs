//! Command handlers - extracted from main.rs for testability

pub mod run;
pub mod suites;

pub use run::{apply_overrides, execute_run};
pub use suites::{execute_list, execute_validate, load_suites, render_listing};
