// crates/repack-harness-cli/src/lib.rs
// ============================================================================
// Module: Repack Harness CLI Library
// Description: Shared helpers for the `repack-harness` binary.
// Purpose: Keep user-facing strings in one catalog.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Library half of the CLI crate. The binary formats every user-facing line
//! through the [`t!`] macro so messages live in a single catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod i18n;
