// system-tests/src/lib.rs
// ============================================================================
// Module: Repack Harness System Tests Library
// Description: Shared configuration for system test binaries.
// Purpose: Provide common utilities for the repack harness system tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts the environment-backed configuration shared by the
//! system-test binaries in `system-tests/tests`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
