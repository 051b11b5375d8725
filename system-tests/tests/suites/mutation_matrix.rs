// system-tests/tests/suites/mutation_matrix.rs
// ============================================================================
// Module: Mutation Matrix Tests
// Description: Descriptor edits versus signed image digests.
// Purpose: Ensure each signing configuration yields its own signed image.
// Dependencies: system-tests helpers, repack-harness-core
// ============================================================================

//! ## Overview
//! Re-signs one unpacked boot image across descriptor settings and compares
//! the observed `boot.img.signed` digests.
//! Invariants:
//! - `algorithm_type` 0 through 6 give pairwise-distinct signed images.
//! - `boot.img.signed2` always equals `boot.img.signed`.
//! - Repeating an identical edit does not change the signed image.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use repack_harness_core::ScenarioOutcome;
use repack_harness_core::SuiteSpec;
use repack_harness_core::VerifyMode;

use crate::helpers::artifacts::TestReporter;
use crate::helpers::rig::Rig;
use crate::helpers::rig::boot_scenario;
use crate::helpers::rig::signed_pair_checks;

/// Signing algorithm identifiers exercised by the matrix.
const ALGORITHM_TYPES: std::ops::RangeInclusive<i64> = 0..=6;

/// Returns the signed image digest observed at a verify step.
///
/// The pair check on `boot.img.signed2` records the reference digest as
/// `expected`, so one observation yields both sides.
fn signed_digest(outcome: &ScenarioOutcome, step: usize) -> Result<String, String> {
    let observed = outcome
        .observations
        .iter()
        .find(|obs| obs.step == step && obs.artifact == "boot.img.signed2")
        .ok_or_else(|| format!("no observation at step {step}"))?;
    match (&observed.expected, &observed.digest) {
        (Some(expected), Some(digest)) if expected == digest => Ok(digest.clone()),
        _ => Err(format!("signed and signed2 differ at step {step}: {observed:?}")),
    }
}

#[test]
fn algorithm_types_yield_distinct_signatures() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("algorithm_types_yield_distinct_signatures")?;
    let rig = Rig::new()?;
    let mut scenario = boot_scenario("algorithm_matrix");
    let mut verify_steps = Vec::new();
    for algorithm in ALGORITHM_TYPES {
        scenario =
            scenario.mutate("algorithm_type", algorithm).pack().verify(signed_pair_checks());
        verify_steps.push((algorithm, scenario.steps.len() - 1));
    }
    let suite = SuiteSpec::new("algorithm_matrix", vec![scenario]);

    let report = rig.run("algorithm_matrix", &suite, VerifyMode::Enforce, reporter.artifacts())?;
    let outcome = report.outcome("algorithm_matrix").ok_or("missing outcome")?;
    if !outcome.passed() {
        return Err(format!("matrix scenario failed: {:?}", outcome.failure).into());
    }

    let mut digests = BTreeMap::new();
    for (algorithm, step) in verify_steps {
        digests.insert(algorithm, signed_digest(outcome, step)?);
    }
    let distinct: BTreeSet<&String> = digests.values().collect();
    if distinct.len() != digests.len() {
        return Err(format!("signed digests collide: {digests:?}").into());
    }
    let notes = digests
        .iter()
        .map(|(algorithm, digest)| format!("algorithm_type {algorithm}: {digest}"))
        .collect();
    reporter.finish(
        "pass",
        notes,
        vec!["algorithm_matrix.report.json".to_string()],
    )?;
    Ok(())
}

#[test]
fn footer_hash_algorithm_changes_signature() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("footer_hash_algorithm_changes_signature")?;
    let rig = Rig::new()?;
    let scenario = boot_scenario("footer_hash")
        .pack()
        .verify(signed_pair_checks())
        .mutate("hash_algorithm", "sha512")
        .pack()
        .verify(signed_pair_checks());
    let suite = SuiteSpec::new("footer_hash", vec![scenario]);

    let report = rig.run("footer_hash", &suite, VerifyMode::Enforce, reporter.artifacts())?;
    let outcome = report.outcome("footer_hash").ok_or("missing outcome")?;
    if !outcome.passed() {
        return Err(format!("footer hash scenario failed: {:?}", outcome.failure).into());
    }
    let stock = signed_digest(outcome, 2)?;
    let sha512 = signed_digest(outcome, 5)?;
    if stock == sha512 {
        return Err(format!("hash_algorithm edit did not change boot.img.signed ({stock})").into());
    }
    reporter.finish(
        "pass",
        vec![format!("sha256: {stock}"), format!("sha512: {sha512}")],
        vec!["footer_hash.report.json".to_string()],
    )?;
    Ok(())
}

#[test]
fn repeated_edit_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("repeated_edit_is_idempotent")?;
    let rig = Rig::new()?;
    let scenario = boot_scenario("repeat_edit")
        .mutate("algorithm_type", 3_i64)
        .pack()
        .verify(signed_pair_checks())
        .mutate("algorithm_type", 3_i64)
        .pack()
        .verify(signed_pair_checks());
    let suite = SuiteSpec::new("repeat_edit", vec![scenario]);

    let report = rig.run("repeat_edit", &suite, VerifyMode::Enforce, reporter.artifacts())?;
    let outcome = report.outcome("repeat_edit").ok_or("missing outcome")?;
    if !outcome.passed() {
        return Err(format!("repeat scenario failed: {:?}", outcome.failure).into());
    }
    let first = signed_digest(outcome, 3)?;
    let second = signed_digest(outcome, 6)?;
    if first != second {
        return Err(format!("second identical edit changed the image: {first} vs {second}").into());
    }
    reporter.finish(
        "pass",
        vec![format!("algorithm_type 3: {first}")],
        vec!["repeat_edit.report.json".to_string()],
    )?;
    Ok(())
}
