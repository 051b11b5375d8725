// crates/repack-harness-core/src/lib.rs
// ============================================================================
// Module: Repack Harness Core Library
// Description: Scenario engine for boot image repack/sign regression runs.
// Purpose: Drive an external image tool and check its outputs against oracles.
// Dependencies: md-5, regex, serde, serde_json, sha2, thiserror, xz2
// ============================================================================

//! ## Overview
//! `repack-harness-core` runs regression scenarios against an external
//! repackaging tool. A scenario stages fixture images into a workspace, runs
//! the tool's `unpack` / `pack` / `clear` subcommands, optionally edits the
//! signing descriptor in between, and compares artifact digests with recorded
//! literals.
//!
//! The harness treats the tool as a black box. Exit status gates progress;
//! artifact digests are the only correctness oracle.
//! Invariants:
//! - One scenario runs at a time against one workspace.
//! - Scenario data is validated before any filesystem side effect.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod descriptor;
pub mod digest;
pub mod error;
pub mod events;
pub mod fixture;
pub mod invoker;
pub mod runner;
pub mod scenario;
pub mod suite;
pub mod workspace;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use descriptor::DEFAULT_DESCRIPTOR;
pub use descriptor::DescriptorMutator;
pub use descriptor::DescriptorValue;
pub use descriptor::MutationReport;
pub use digest::ContentDigest;
pub use digest::DigestAlgorithm;
pub use digest::DigestVerifier;
pub use digest::VerifyMode;
pub use digest::digest_bytes;
pub use digest::digest_file;
pub use error::HarnessError;
pub use events::EventLevel;
pub use events::EventSink;
pub use events::FileEventSink;
pub use events::HarnessEvent;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use events::TeeEventSink;
pub use fixture::Compression;
pub use fixture::FixtureProvisioner;
pub use fixture::FixtureSpec;
pub use fixture::ProvisionedFixture;
pub use invoker::ArgvLauncher;
pub use invoker::InvocationReport;
pub use invoker::LaunchMode;
pub use invoker::OutputMode;
pub use invoker::ProcessLauncher;
pub use invoker::ShellLauncher;
pub use invoker::ToolCommand;
pub use invoker::ToolInvoker;
pub use invoker::ToolSpec;
pub use runner::CheckStatus;
pub use runner::HarnessContext;
pub use runner::ObservedDigest;
pub use runner::ScenarioFailure;
pub use runner::ScenarioOutcome;
pub use runner::ScenarioRunner;
pub use runner::ScenarioStatus;
pub use scenario::ArtifactCheck;
pub use scenario::Expectation;
pub use scenario::FinishPolicy;
pub use scenario::ScenarioSpec;
pub use scenario::ScenarioState;
pub use scenario::Step;
pub use suite::FailurePolicy;
pub use suite::SuiteCounts;
pub use suite::SuiteDriver;
pub use suite::SuiteReport;
pub use suite::SuiteSpec;
pub use workspace::DEFAULT_BUILD_DIR;
pub use workspace::DEFAULT_MANAGED_ARTIFACTS;
pub use workspace::ResetReport;
pub use workspace::Workspace;
