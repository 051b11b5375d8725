// crates/repack-harness-core/src/catalog.rs
// ============================================================================
// Module: Built-in Catalog
// Description: Recorded regression suites for the boot image tool.
// Purpose: Ship the known-good oracles so a bare `run` has something to do.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Each suite is plain data over [`ScenarioSpec`]. Digest literals are MD5
//! values recorded from known-good tool builds; a suite run with SHA-256
//! selected will reject them at validation time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::scenario::ArtifactCheck;
use crate::scenario::FinishPolicy;
use crate::scenario::ScenarioSpec;
use crate::suite::SuiteSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Names of the built-in suites.
pub const BUILTIN_SUITES: &[&str] = &[CORAL_SUITE, ISSUE_52_SUITE];

/// Pixel 4 (coral) factory image suite.
pub const CORAL_SUITE: &str = "coral";
/// Recovery image regression for issue 52.
pub const ISSUE_52_SUITE: &str = "issue_52";

/// Fixture case directory for the coral suite.
const CORAL_CASE: &str = "10.0.0_coral-qq1d.200205.002";
/// Fixture case directory for the issue 52 suite.
const ISSUE_52_CASE: &str = "issue_52";

/// Compressed coral boot image.
const CORAL_BOOT_XZ: &str = "boot.img.xz";
/// Coral vbmeta image.
const CORAL_VBMETA: &str = "vbmeta.img";

/// Signed boot image digest with the stock descriptor.
const BOOT_SIGNED_STOCK: &str = "0fed36e951788e49c2bcd23b95011878";

/// `boot.img.signed` digests for `algorithm_type` 1 through 6.
const ALGORITHM_DIGESTS: [(i64, &str); 6] = [
    (1, "2adfd5d17b12a49b14e49a14504ab5eb"),
    (2, "4ecb4d4493dea6480f93502fbd5491e3"),
    (3, "7971607e61c7f55fa1c59c7ccbf042ac"),
    (4, "8e2e28b4bd69b1887ddc664ad75b99ed"),
    (5, "b8bdacb1131e013404996ba7ace89ad3"),
    (6, "c7488be18b6acaf1bd4f3191a0bbcb95"),
];

// ============================================================================
// SECTION: Lookup
// ============================================================================

/// Returns a built-in suite by name.
#[must_use]
pub fn builtin(name: &str) -> Option<SuiteSpec> {
    match name {
        CORAL_SUITE => Some(coral()),
        ISSUE_52_SUITE => Some(issue_52()),
        _ => None,
    }
}

// ============================================================================
// SECTION: Suites
// ============================================================================

/// Returns the coral suite.
#[must_use]
pub fn coral() -> SuiteSpec {
    SuiteSpec::new(
        CORAL_SUITE,
        vec![
            vbmeta_only(),
            boot_only(),
            boot_vbmeta(),
            boot_change_algorithm(),
            boot_change_footer_hash_algorithm(),
        ],
    )
}

/// Returns the issue 52 suite.
#[must_use]
pub fn issue_52() -> SuiteSpec {
    SuiteSpec::new(ISSUE_52_SUITE, vec![twrp_unpack_clear()])
}

/// Repacks a lone vbmeta image.
fn vbmeta_only() -> ScenarioSpec {
    ScenarioSpec::new("vbmeta_only", CORAL_CASE)
        .fixture(CORAL_VBMETA, "vbmeta.img")
        .unpack()
        .pack()
        .verify(vec![
            ArtifactCheck::digest("vbmeta.img", "7d46447d06bf98e91900e303525fae70"),
            ArtifactCheck::digest("vbmeta.img.signed", "865c673b258030d97ed2ff1c3d32fa5e"),
        ])
}

/// Repacks a lone boot image.
fn boot_only() -> ScenarioSpec {
    ScenarioSpec::new("boot_only", CORAL_CASE)
        .fixture(CORAL_BOOT_XZ, "boot.img")
        .unpack()
        .pack()
        .verify(vec![
            ArtifactCheck::digest("boot.img.google", "aaf8d027cb0c165de7c66bf32f8341c1"),
            ArtifactCheck::digest("boot.img.signed", BOOT_SIGNED_STOCK),
            ArtifactCheck::digest("boot.img.signed2", BOOT_SIGNED_STOCK),
        ])
        .finish(FinishPolicy::Keep)
}

/// Repacks boot and vbmeta together.
fn boot_vbmeta() -> ScenarioSpec {
    ScenarioSpec::new("boot_vbmeta", CORAL_CASE)
        .fixture(CORAL_VBMETA, "vbmeta.img")
        .fixture(CORAL_BOOT_XZ, "boot.img")
        .unpack()
        .pack()
        .verify(vec![
            ArtifactCheck::digest("boot.img.signed", BOOT_SIGNED_STOCK),
            ArtifactCheck::digest("vbmeta.img.signed", "70689c8e0e576ea6cc0b4301931304ab"),
        ])
}

/// Re-signs one unpacked boot image with each signing algorithm.
fn boot_change_algorithm() -> ScenarioSpec {
    let mut scenario = ScenarioSpec::new("boot_change_algorithm", CORAL_CASE)
        .fixture(CORAL_BOOT_XZ, "boot.img")
        .unpack();
    let last = ALGORITHM_DIGESTS.len() - 1;
    for (index, (algorithm, digest)) in ALGORITHM_DIGESTS.into_iter().enumerate() {
        let mut checks = vec![ArtifactCheck::digest("boot.img.signed", digest)];
        if index == last {
            checks.push(ArtifactCheck::digest("boot.img.signed2", digest));
        }
        scenario = scenario.mutate("algorithm_type", algorithm).pack().verify(checks);
    }
    scenario.finish(FinishPolicy::Keep)
}

/// Switches the footer hash to SHA-512.
fn boot_change_footer_hash_algorithm() -> ScenarioSpec {
    ScenarioSpec::new("boot_change_footer_hash_algorithm", CORAL_CASE)
        .fixture(CORAL_BOOT_XZ, "boot.img")
        .unpack()
        .mutate("hash_algorithm", "sha512")
        .pack()
        .verify(vec![
            ArtifactCheck::digest("boot.img.signed", "5e23cf961963916b106799e2534c49fb"),
            ArtifactCheck::digest("boot.img.signed2", "5e23cf961963916b106799e2534c49fb"),
        ])
        .finish(FinishPolicy::Keep)
}

/// Unpacks a TWRP recovery image and clears the tool state.
fn twrp_unpack_clear() -> ScenarioSpec {
    ScenarioSpec::new("twrp_unpack_clear", ISSUE_52_CASE)
        .fixture("twrp-3.5.0_10-1-coral.img.xz", "boot.img")
        .unpack()
        .clear()
}
