// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for repack harness system-tests.
// Purpose: Provide the scripted tool rig and artifact utilities.
// Dependencies: system-tests, repack-harness-core
// ============================================================================

//! ## Overview
//! Shared helpers for repack harness system-tests.
//! Invariants:
//! - System-test execution is deterministic and fail-closed.
//! - Every suite run leaves a report and event log in the run root.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
