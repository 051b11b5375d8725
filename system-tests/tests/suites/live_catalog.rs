// system-tests/tests/suites/live_catalog.rs
// ============================================================================
// Module: Live Catalog Tests
// Description: Built-in suites against a real tool and recorded fixtures.
// Purpose: Confirm the recorded oracles still hold for the installed tool.
// Dependencies: system-tests, repack-harness-core
// ============================================================================

//! ## Overview
//! Opt-in: runs only when the live target variables are all set. Without
//! them the test records a `skipped` summary and passes.

use repack_harness_core::DigestVerifier;
use repack_harness_core::FailurePolicy;
use repack_harness_core::FixtureProvisioner;
use repack_harness_core::HarnessContext;
use repack_harness_core::LaunchMode;
use repack_harness_core::SuiteSpec;
use repack_harness_core::ToolInvoker;
use repack_harness_core::ToolSpec;
use repack_harness_core::VerifyMode;
use repack_harness_core::Workspace;
use repack_harness_core::catalog;
use system_tests::config::LiveTarget;
use system_tests::config::SystemTestConfig;

use crate::helpers::artifacts::TestReporter;
use crate::helpers::rig::run_logged;

/// Builds a context around the live tool installation.
fn live_context(target: &LiveTarget, config: &SystemTestConfig) -> HarnessContext {
    let invoker =
        ToolInvoker::new(ToolSpec::new(target.program.clone()), LaunchMode::Auto, &target.workspace)
            .with_timeout(config.timeout);
    HarnessContext {
        workspace: Workspace::new(&target.workspace),
        fixtures: FixtureProvisioner::new(&target.fixture_root),
        invoker,
        verifier: DigestVerifier::default(),
        mode: VerifyMode::Enforce,
    }
}

/// Runs one built-in suite and fails with its outcomes when any scenario fails.
fn run_builtin(
    target: &LiveTarget,
    config: &SystemTestConfig,
    suite: &SuiteSpec,
    reporter: &TestReporter,
) -> Result<String, Box<dyn std::error::Error>> {
    suite.validate()?;
    let report = run_logged(
        live_context(target, config),
        &suite.name,
        suite,
        FailurePolicy::Continue,
        reporter.artifacts(),
    )?;
    if !report.passed() {
        return Err(format!("suite {} failed: {:?}", suite.name, report.outcomes).into());
    }
    Ok(format!("{}: {} scenario(s) passed", suite.name, report.counts.passed))
}

#[test]
fn builtin_suites_hold_against_live_tool() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("builtin_suites_hold_against_live_tool")?;
    let config = SystemTestConfig::load()?;
    let Some(target) = config.live.clone() else {
        reporter.finish(
            "skipped",
            vec!["live target not configured".to_string()],
            Vec::new(),
        )?;
        return Ok(());
    };

    let mut notes = Vec::new();
    let mut artifacts = Vec::new();
    for suite in [catalog::coral(), catalog::issue_52()] {
        notes.push(run_builtin(&target, &config, &suite, &reporter)?);
        artifacts.push(format!("{}.report.json", suite.name));
        artifacts.push(format!("{}.events.jsonl", suite.name));
    }
    reporter.finish("pass", notes, artifacts)?;
    Ok(())
}
