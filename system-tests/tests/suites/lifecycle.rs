// system-tests/tests/suites/lifecycle.rs
// ============================================================================
// Module: Lifecycle Tests
// Description: Workspace lifecycle, failure policies, and oracle recording.
// Purpose: Ensure scenarios leave the workspace in the state they promise.
// Dependencies: system-tests helpers, repack-harness-core
// ============================================================================

//! ## Overview
//! Drives whole suites through the stand-in tool and inspects the workspace
//! between and after scenarios.

use repack_harness_core::ArtifactCheck;
use repack_harness_core::CheckStatus;
use repack_harness_core::DigestAlgorithm;
use repack_harness_core::FailurePolicy;
use repack_harness_core::FinishPolicy;
use repack_harness_core::ScenarioSpec;
use repack_harness_core::ScenarioState;
use repack_harness_core::ScenarioStatus;
use repack_harness_core::SuiteSpec;
use repack_harness_core::VerifyMode;
use repack_harness_core::digest_bytes;

use crate::helpers;
use crate::helpers::artifacts::TestReporter;
use crate::helpers::rig::Rig;
use crate::helpers::rig::boot_scenario;
use crate::helpers::rig::run_logged;
use crate::helpers::rig::signed_pair_checks;

/// Placeholder literal that never matches.
const WRONG_DIGEST: &str = "00000000000000000000000000000000";

#[test]
fn clear_and_reset_leave_no_generated_artifacts() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("clear_and_reset_leave_no_generated_artifacts")?;
    let rig = Rig::new()?;
    let suite = SuiteSpec::new(
        "lifecycle",
        vec![
            boot_scenario("unpack_pack_clear").pack().verify(signed_pair_checks()).clear(),
            boot_scenario("finish_clear_then_reset")
                .pack()
                .verify(signed_pair_checks())
                .finish(FinishPolicy::ClearThenReset),
        ],
    );

    let report = rig.run("lifecycle", &suite, VerifyMode::Enforce, reporter.artifacts())?;

    if !report.passed() {
        return Err(format!("suite failed: {:?}", report.outcomes).into());
    }
    for outcome in &report.outcomes {
        if outcome.states.last() != Some(&ScenarioState::Clean) {
            return Err(format!("{} did not end clean: {:?}", outcome.name, outcome.states).into());
        }
    }
    let leftovers = rig.context(VerifyMode::Enforce)?.workspace.leftovers();
    if !leftovers.is_empty() {
        return Err(format!("workspace not clean: {leftovers:?}").into());
    }
    reporter.finish(
        "pass",
        vec!["clear and clear_then_reset both leave the workspace clean".to_string()],
        vec!["lifecycle.report.json".to_string(), "lifecycle.events.jsonl".to_string()],
    )?;
    Ok(())
}

#[test]
fn keep_finish_leaves_outputs_until_next_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("keep_finish_leaves_outputs_until_next_scenario")?;
    let rig = Rig::new()?;
    let kept = SuiteSpec::new(
        "kept",
        vec![
            boot_scenario("boot_kept")
                .pack()
                .verify(signed_pair_checks())
                .finish(FinishPolicy::Keep),
        ],
    );

    let report = rig.run("kept", &kept, VerifyMode::Enforce, reporter.artifacts())?;
    if !report.passed() || !rig.workspace().join("boot.img.signed").is_file() {
        return Err("keep finish should leave boot.img.signed in place".into());
    }

    let vbmeta = SuiteSpec::new(
        "vbmeta",
        vec![
            ScenarioSpec::new("vbmeta_after_keep", helpers::rig::CASE)
                .fixture("vbmeta.img", "vbmeta.img")
                .unpack()
                .pack()
                .verify(vec![ArtifactCheck::digest(
                    "vbmeta.img",
                    &digest_bytes(DigestAlgorithm::Md5, helpers::rig::VBMETA_IMAGE).value,
                )])
                .finish(FinishPolicy::Keep),
        ],
    );
    let report = rig.run("vbmeta", &vbmeta, VerifyMode::Enforce, reporter.artifacts())?;
    if !report.passed() {
        return Err(format!("vbmeta scenario failed: {:?}", report.outcomes).into());
    }
    if rig.workspace().join("boot.img.signed").exists() {
        return Err("entry reset should remove the previous scenario's outputs".into());
    }
    reporter.finish(
        "pass",
        vec!["entry reset removes outputs kept by a previous scenario".to_string()],
        vec!["kept.report.json".to_string(), "vbmeta.report.json".to_string()],
    )?;
    Ok(())
}

#[test]
fn halt_policy_marks_remaining_scenarios_not_run() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("halt_policy_marks_remaining_scenarios_not_run")?;
    let rig = Rig::new()?;
    let suite = SuiteSpec::new(
        "halting",
        vec![
            boot_scenario("first_passes").pack().verify(signed_pair_checks()),
            boot_scenario("second_fails")
                .pack()
                .verify(vec![ArtifactCheck::digest("boot.img.signed", WRONG_DIGEST)]),
            boot_scenario("third_skipped").pack().verify(signed_pair_checks()),
        ],
    );

    let report = run_logged(
        rig.context(VerifyMode::Enforce)?,
        "halting",
        &suite,
        FailurePolicy::Halt,
        reporter.artifacts(),
    )?;

    let statuses: Vec<ScenarioStatus> = report.outcomes.iter().map(|o| o.status).collect();
    if statuses != [ScenarioStatus::Passed, ScenarioStatus::Failed, ScenarioStatus::NotRun] {
        return Err(format!("unexpected statuses: {statuses:?}").into());
    }
    let failure = report
        .outcome("second_fails")
        .and_then(|outcome| outcome.failure.clone())
        .ok_or("missing failure details")?;
    if failure.kind != "digest_mismatch" || failure.step != Some(2) {
        return Err(format!("unexpected failure: {failure:?}").into());
    }
    if !rig.workspace().join("boot.img.signed").is_file() {
        return Err("failed scenario should keep its outputs for inspection".into());
    }
    reporter.finish(
        "pass",
        vec!["halt stops after the first failure".to_string()],
        vec!["halting.report.json".to_string()],
    )?;
    Ok(())
}

#[test]
fn record_mode_captures_oracle_for_enforced_rerun() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("record_mode_captures_oracle_for_enforced_rerun")?;
    let rig = Rig::new()?;
    let recording = SuiteSpec::new(
        "recording",
        vec![
            boot_scenario("boot_signed")
                .pack()
                .verify(vec![ArtifactCheck::digest("boot.img.signed", WRONG_DIGEST)]),
        ],
    );

    let report = rig.run("recording", &recording, VerifyMode::Record, reporter.artifacts())?;
    let outcome = report.outcome("boot_signed").ok_or("missing outcome")?;
    let observation = outcome.observations.first().ok_or("missing observation")?;
    if outcome.status != ScenarioStatus::Passed || observation.status != CheckStatus::Recorded {
        return Err(format!("record mode should tolerate mismatch: {outcome:?}").into());
    }
    let recorded = observation.digest.clone().ok_or("missing recorded digest")?;

    let enforced = SuiteSpec::new(
        "enforced",
        vec![
            boot_scenario("boot_signed")
                .pack()
                .verify(vec![ArtifactCheck::digest("boot.img.signed", &recorded)]),
        ],
    );
    let report = rig.run("enforced", &enforced, VerifyMode::Enforce, reporter.artifacts())?;
    if !report.passed() {
        return Err(format!("recorded oracle did not hold: {:?}", report.outcomes).into());
    }
    reporter.finish(
        "pass",
        vec![format!("recorded boot.img.signed = {recorded}")],
        vec!["recording.report.json".to_string(), "enforced.report.json".to_string()],
    )?;
    Ok(())
}
