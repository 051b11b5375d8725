// crates/repack-harness-config/src/lib.rs
// ============================================================================
// Module: Repack Harness Config Library
// Description: Configuration model and loading for harness runs.
// Purpose: Single source of truth for repack-harness.toml semantics.
// Dependencies: repack-harness-core, serde, toml
// ============================================================================

//! ## Overview
//! `repack-harness-config` turns a TOML file plus environment overrides into a
//! validated [`HarnessConfig`], and from there into the core crate's
//! [`repack_harness_core::HarnessContext`] and suite tables. Validation is
//! strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvOverrides;
pub use env::HarnessEnv;
pub use env::read_env_strict;
