// crates/repack-harness-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and placeholder substitution for CLI output.
// Purpose: Centralize user-facing strings so wording stays consistent.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every line the `repack-harness` binary prints comes from [`CATALOG`] via
//! the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is built once and read-only thereafter.
//! - Missing keys fall back to the key itself.
//! - Placeholders are substituted in argument order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// Formatted value substituted for the placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Catalog entries as `(key, template)` pairs.
pub const CATALOG: &[(&str, &str)] = &[
    ("main.version", "repack-harness {version}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config OK: suite {suite} with {count} scenario(s)"),
    ("suite.resolve_failed", "Failed to resolve suite: {error}"),
    ("run.log_open_failed", "Failed to open event log {path}: {error}"),
    ("run.failed", "Suite run failed: {error}"),
    ("run.scenario.passed", "PASS {name} ({steps} step(s), {duration_ms} ms)"),
    ("run.scenario.failed", "FAIL {name} at {location}: [{kind}] {message}"),
    ("run.scenario.not_run", "SKIP {name} (not run)"),
    ("run.location.step", "step {step}"),
    ("run.location.setup", "setup"),
    ("run.recorded", "  recorded {artifact} at step {step}: {digest} (expected {expected})"),
    ("run.summary", "Suite {suite}: {passed} passed, {failed} failed, {not_run} not run"),
    ("run.report.serialize_failed", "Failed to serialize report: {error}"),
    ("run.report.write_failed", "Failed to write report {path}: {error}"),
    ("run.report.written", "Report written to {path}"),
    ("list.suite", "Suite {suite} ({count} scenario(s))"),
    ("list.scenario", "{name} [case {case}, finish {finish}]"),
    ("list.fixture", "  fixture {source} -> {destination}"),
    ("list.step", "  {index}. {step}"),
    ("digest.line", "{digest}  {path}"),
    ("digest.failed", "Failed to hash {path}: {error}"),
    ("reset.failed", "Workspace reset failed: {error}"),
    ("reset.clean", "Workspace already clean: {root}"),
    ("reset.removed", "Removed {entry}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
];

/// Returns the catalog as a lookup map.
pub(crate) fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Formats `key` from the catalog, substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
