// crates/repack-harness-core/src/error.rs
// ============================================================================
// Module: Repack Harness Errors
// Description: Error taxonomy shared by every harness component.
// Purpose: Give scenario failures stable, reproducible diagnostics.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every harness step fails fast with a [`HarnessError`]. Variants are stable
//! for programmatic handling; display strings name the artifact, command, or
//! field involved so a failing scenario can be reproduced from the message
//! alone.
//! Invariants:
//! - Errors are never retried by the harness.
//! - Digest mismatches always carry both expected and actual hex values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::invoker::ToolCommand;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while orchestrating a scenario.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Fixture source does not exist.
    #[error("fixture missing: {}", path.display())]
    FixtureMissing {
        /// Fixture path that was requested.
        path: PathBuf,
    },
    /// Fixture archive could not be decoded.
    #[error("fixture corrupt: {}: {message}", path.display())]
    FixtureCorrupt {
        /// Fixture archive path.
        path: PathBuf,
        /// Decoder failure detail.
        message: String,
    },
    /// External tool exited with a non-zero status.
    #[error("tool invocation failed: {command} exited with {}", format_exit_code(*exit_code))]
    ToolInvocationFailed {
        /// Subcommand that failed.
        command: ToolCommand,
        /// Process exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
    },
    /// External tool could not be started.
    #[error("tool launch failed: {command}: {message}")]
    ToolLaunch {
        /// Subcommand being launched.
        command: ToolCommand,
        /// Spawn failure detail.
        message: String,
    },
    /// External tool exceeded the configured wait bound and was killed.
    #[error("tool timed out: {command} after {} ms", timeout.as_millis())]
    ToolTimedOut {
        /// Subcommand that timed out.
        command: ToolCommand,
        /// Wait bound that elapsed.
        timeout: Duration,
    },
    /// Descriptor does not contain the requested field.
    #[error("field not found: {field} in {}", path.display())]
    FieldNotFound {
        /// Field name that was searched for.
        field: String,
        /// Descriptor path.
        path: PathBuf,
    },
    /// Artifact expected in the workspace does not exist.
    #[error("artifact missing: {}", path.display())]
    ArtifactMissing {
        /// Artifact path that was expected.
        path: PathBuf,
    },
    /// Artifact digest differs from the oracle.
    #[error("digest mismatch for {artifact}: expected {expected}, actual {actual}")]
    DigestMismatch {
        /// Artifact name relative to the workspace.
        artifact: String,
        /// Expected lowercase hex digest.
        expected: String,
        /// Observed lowercase hex digest.
        actual: String,
    },
    /// Expected digest literal is malformed.
    #[error("invalid digest literal for {artifact}: {message}")]
    InvalidDigest {
        /// Artifact the literal belongs to.
        artifact: String,
        /// Validation failure detail.
        message: String,
    },
    /// Scenario data violates the scenario state machine or naming rules.
    #[error("invalid scenario {scenario}: {message}")]
    InvalidScenario {
        /// Scenario name.
        scenario: String,
        /// Validation failure detail.
        message: String,
    },
    /// Filesystem failure outside the cases above.
    #[error("{context}: {message}")]
    Io {
        /// Operation being attempted.
        context: String,
        /// Underlying I/O error text.
        message: String,
    },
}

impl HarnessError {
    /// Wraps an I/O error with the path it concerns.
    pub(crate) fn io(action: &str, path: &Path, error: &io::Error) -> Self {
        Self::Io {
            context: format!("{action} {}", path.display()),
            message: error.to_string(),
        }
    }

    /// Returns a stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FixtureMissing {
                ..
            } => "fixture_missing",
            Self::FixtureCorrupt {
                ..
            } => "fixture_corrupt",
            Self::ToolInvocationFailed {
                ..
            } => "tool_invocation_failed",
            Self::ToolLaunch {
                ..
            } => "tool_launch",
            Self::ToolTimedOut {
                ..
            } => "tool_timed_out",
            Self::FieldNotFound {
                ..
            } => "field_not_found",
            Self::ArtifactMissing {
                ..
            } => "artifact_missing",
            Self::DigestMismatch {
                ..
            } => "digest_mismatch",
            Self::InvalidDigest {
                ..
            } => "invalid_digest",
            Self::InvalidScenario {
                ..
            } => "invalid_scenario",
            Self::Io {
                ..
            } => "io",
        }
    }
}

/// Formats a process exit code for display.
fn format_exit_code(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |code| format!("status {code}"))
}
