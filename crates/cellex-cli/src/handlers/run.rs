//! Run command handler

use super::suites::load_suites;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_reports, ProgressReporter};
use crate::RunArgs;
use cellex::page::{SessionOptions, UiDispatcher, WebDriverSession};
use cellex::{CaseRunner, Dispatcher, FixtureContext, HarnessConfig, HttpDispatcher, Suite, SuiteReport};
use std::sync::Arc;

/// Apply command-line flags on top of the environment configuration
#[must_use]
pub fn apply_overrides(mut harness: HarnessConfig, args: &RunArgs) -> HarnessConfig {
    if let Some(url) = &args.api_url {
        harness = harness.with_api_url(url.clone());
    }
    if let Some(url) = &args.web_url {
        harness = harness.with_web_url(url.clone());
    }
    if let Some(url) = &args.webdriver_url {
        harness = harness.with_webdriver_url(url.clone());
    }
    if let Some(ms) = args.timeout_ms {
        harness = harness.with_timeout_ms(ms);
    }
    if let Some(ms) = args.poll_interval_ms {
        harness = harness.with_poll_interval_ms(ms);
    }
    if args.headed {
        harness = harness.with_headless(false);
    }
    harness
}

/// Fixture context shared by every suite of a run
fn fixtures_for(harness: &HarnessConfig, args: &RunArgs) -> FixtureContext {
    let mut fixtures = FixtureContext::new();
    if let Some((email, password)) = harness.admin_credentials() {
        fixtures.set_var("admin_email", email);
        fixtures.set_var("admin_password", password);
    }
    for (name, value) in &args.vars {
        fixtures.set_var(name.clone(), value.clone());
    }
    fixtures
}

async fn run_all(
    dispatcher: Arc<dyn Dispatcher>,
    suites: &[Suite],
    fixtures: &mut FixtureContext,
    reporter: &mut ProgressReporter,
    verbose: bool,
) -> Vec<SuiteReport> {
    let runner = CaseRunner::new(dispatcher);
    let mut reports = Vec::with_capacity(suites.len());

    reporter.start_progress(suites.len() as u64, "suites");
    for suite in suites {
        reporter.set_message(&suite.name);
        let report = runner.run_suite(suite, fixtures).await;

        reporter.header(&format!("{} ({} cases)", suite.name, suite.cases.len()));
        if let Some(error) = report.setup_error() {
            reporter.failure(&format!("setup failed: {error}"));
        }
        for result in report.results() {
            if verbose || result.outcome.is_failed() {
                reporter.case(result);
            }
        }
        reporter.increment(1);
        reports.push(report);
    }
    reporter.finish();
    reports
}

async fn run_ui(
    harness: &HarnessConfig,
    suites: &[Suite],
    fixtures: &mut FixtureContext,
    reporter: &mut ProgressReporter,
    verbose: bool,
) -> CliResult<Vec<SuiteReport>> {
    let options = SessionOptions::default().with_headless(harness.headless);
    let session = WebDriverSession::start(&harness.webdriver_url, &options).await?;
    let dispatcher = Arc::new(UiDispatcher::new(
        Arc::new(session.clone()),
        &harness.web_url,
        harness.poll_options(),
    ));

    let reports = run_all(dispatcher, suites, fixtures, reporter, verbose).await;
    if let Err(err) = session.quit().await {
        reporter.warning(&format!("could not close browser session: {err}"));
    }
    Ok(reports)
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let harness = apply_overrides(HarnessConfig::from_env()?, args);
    harness.validate()?;
    let suites = load_suites(&args.suites)?;
    let mut fixtures = fixtures_for(&harness, args);
    let mut reporter =
        ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let verbose = config.verbosity.is_verbose();

    tracing::info!(
        run_id = fixtures.run_id(),
        suites = suites.len(),
        ui = args.ui,
        "starting run"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let reports = runtime.block_on(async {
        if args.ui {
            run_ui(&harness, &suites, &mut fixtures, &mut reporter, verbose).await
        } else {
            let dispatcher = Arc::new(HttpDispatcher::new(harness.api_config())?);
            Ok(run_all(dispatcher, &suites, &mut fixtures, &mut reporter, verbose).await)
        }
    })?;

    reporter.summary(&reports);
    let rendered = render_reports(&reports, args.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            reporter.success(&format!("report written to {}", path.display()));
        }
        None => println!("{rendered}"),
    }

    let failed: usize = reports.iter().map(SuiteReport::failed_count).sum();
    let broken_setups = reports.iter().filter(|r| r.setup_error().is_some()).count();
    if failed == 0 && broken_setups == 0 {
        Ok(())
    } else {
        Err(CliError::suite_failed(format!(
            "{failed} case(s) failed, {broken_setups} suite setup(s) failed"
        )))
    }
}
