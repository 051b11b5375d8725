// system-tests/tests/suites/determinism.rs
// ============================================================================
// Module: Determinism Tests
// Description: Repeat runs of one suite must observe identical digests.
// Purpose: Catch nondeterminism in provisioning, mutation, or reset.
// Dependencies: system-tests helpers, repack-harness-core
// ============================================================================

//! ## Overview
//! Runs a mixed suite twice in one rig and once in a fresh rig, then compares
//! every observed `(scenario, step, artifact, digest)` tuple.
//! Invariants:
//! - Entry reset makes each run independent of what the previous run left.
//! - Fresh scratch directories do not change any digest.

use repack_harness_core::ArtifactCheck;
use repack_harness_core::DigestAlgorithm;
use repack_harness_core::FinishPolicy;
use repack_harness_core::ScenarioSpec;
use repack_harness_core::SuiteReport;
use repack_harness_core::SuiteSpec;
use repack_harness_core::VerifyMode;
use repack_harness_core::digest_bytes;

use crate::helpers::artifacts::TestReporter;
use crate::helpers::rig::CASE;
use crate::helpers::rig::Rig;
use crate::helpers::rig::VBMETA_IMAGE;
use crate::helpers::rig::boot_scenario;
use crate::helpers::rig::signed_pair_checks;

/// One observed digest, flattened for comparison.
type Observation = (String, usize, String, Option<String>);

/// Mixed suite covering vbmeta, boot, both, and a descriptor edit.
fn mixed_suite() -> SuiteSpec {
    let vbmeta = digest_bytes(DigestAlgorithm::Md5, VBMETA_IMAGE).value;
    SuiteSpec::new(
        "repeatable",
        vec![
            ScenarioSpec::new("vbmeta_only", CASE)
                .fixture("vbmeta.img", "vbmeta.img")
                .unpack()
                .pack()
                .verify(vec![ArtifactCheck::digest("vbmeta.img", &vbmeta)]),
            boot_scenario("boot_only")
                .pack()
                .verify(signed_pair_checks())
                .finish(FinishPolicy::Keep),
            ScenarioSpec::new("boot_vbmeta", CASE)
                .fixture("boot.img.xz", "boot.img")
                .fixture("vbmeta.img", "vbmeta.img")
                .unpack()
                .pack()
                .verify(signed_pair_checks()),
            boot_scenario("boot_mutated")
                .mutate("algorithm_type", 2_i64)
                .pack()
                .verify(signed_pair_checks())
                .clear(),
        ],
    )
}

/// Flattens every observation of a report.
fn observations(report: &SuiteReport) -> Vec<Observation> {
    report
        .outcomes
        .iter()
        .flat_map(|outcome| {
            outcome.observations.iter().map(|obs| {
                (outcome.name.clone(), obs.step, obs.artifact.clone(), obs.digest.clone())
            })
        })
        .collect()
}

#[test]
fn repeated_runs_observe_identical_digests() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("repeated_runs_observe_identical_digests")?;
    let suite = mixed_suite();
    let rig = Rig::new()?;

    let first = rig.run("first", &suite, VerifyMode::Enforce, reporter.artifacts())?;
    let second = rig.run("second", &suite, VerifyMode::Enforce, reporter.artifacts())?;
    let fresh = Rig::new()?.run("fresh", &suite, VerifyMode::Enforce, reporter.artifacts())?;

    for (label, report) in [("first", &first), ("second", &second), ("fresh", &fresh)] {
        if !report.passed() {
            return Err(format!("{label} run failed: {:?}", report.outcomes).into());
        }
    }
    let baseline = observations(&first);
    if baseline.is_empty() {
        return Err("no observations recorded".into());
    }
    if observations(&second) != baseline {
        return Err("second run in the same workspace observed different digests".into());
    }
    if observations(&fresh) != baseline {
        return Err("run in a fresh workspace observed different digests".into());
    }
    if first.counts != second.counts {
        return Err(format!("counts differ: {:?} vs {:?}", first.counts, second.counts).into());
    }
    reporter.finish(
        "pass",
        vec![format!("{} observations matched across three runs", baseline.len())],
        vec![
            "first.report.json".to_string(),
            "second.report.json".to_string(),
            "fresh.report.json".to_string(),
        ],
    )?;
    Ok(())
}

#[test]
fn record_mode_is_repeatable() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("record_mode_is_repeatable")?;
    let suite = mixed_suite();
    let rig = Rig::new()?;

    let first = rig.run("record_first", &suite, VerifyMode::Record, reporter.artifacts())?;
    let second = rig.run("record_second", &suite, VerifyMode::Record, reporter.artifacts())?;
    if observations(&first) != observations(&second) {
        return Err("record mode captured different digests on rerun".into());
    }
    reporter.finish(
        "pass",
        vec!["record mode captured the same oracle twice".to_string()],
        vec!["record_first.report.json".to_string(), "record_second.report.json".to_string()],
    )?;
    Ok(())
}
