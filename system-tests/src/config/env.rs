// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 fails closed.
//!
//! The live target (real tool, real fixtures, real workspace) is opt-in and
//! all-or-nothing: setting only some of its variables is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional run root override.
    RunRoot,
    /// Optional tool timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Allow reusing an existing run root (`true`/`false` or `1`/`0`).
    AllowOverwrite,
    /// Real tool program for the live catalog suite.
    ToolProgram,
    /// Fixture root holding the recorded factory images.
    FixtureRoot,
    /// Workspace root the real tool operates in.
    Workspace,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "REPACK_HARNESS_SYSTEM_TEST_RUN_ROOT",
            Self::TimeoutSeconds => "REPACK_HARNESS_SYSTEM_TEST_TIMEOUT_SEC",
            Self::AllowOverwrite => "REPACK_HARNESS_SYSTEM_TEST_ALLOW_OVERWRITE",
            Self::ToolProgram => "REPACK_HARNESS_SYSTEM_TEST_TOOL",
            Self::FixtureRoot => "REPACK_HARNESS_SYSTEM_TEST_FIXTURE_ROOT",
            Self::Workspace => "REPACK_HARNESS_SYSTEM_TEST_WORKSPACE",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Real tool installation used by the live catalog suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTarget {
    /// Tool program (for example `./gradlew`).
    pub program: String,
    /// Fixture root containing the catalog case directories.
    pub fixture_root: PathBuf,
    /// Workspace root the tool runs in.
    pub workspace: PathBuf,
}

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Optional run root override.
    pub run_root: Option<PathBuf>,
    /// Optional tool timeout override.
    pub timeout: Option<Duration>,
    /// Allow reusing an existing run root (`true`/`false` or `1`/`0`).
    pub allow_overwrite: bool,
    /// Live tool target, when fully configured.
    pub live: Option<LiveTarget>,
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// fails validation, or when the live target is only partially set.
    pub fn load() -> Result<Self, String> {
        let run_root = read_env_nonempty(SystemTestEnv::RunRoot.as_str())?.map(PathBuf::from);
        let timeout = read_env_nonempty(SystemTestEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(SystemTestEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let allow_overwrite = parse_bool_env(
            SystemTestEnv::AllowOverwrite.as_str(),
            read_env_nonempty(SystemTestEnv::AllowOverwrite.as_str())?,
        )?;
        let live = load_live_target()?;
        Ok(Self {
            run_root,
            timeout,
            allow_overwrite,
            live,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the live target variables as a unit.
fn load_live_target() -> Result<Option<LiveTarget>, String> {
    let program = read_env_nonempty(SystemTestEnv::ToolProgram.as_str())?;
    let fixture_root = read_env_nonempty(SystemTestEnv::FixtureRoot.as_str())?;
    let workspace = read_env_nonempty(SystemTestEnv::Workspace.as_str())?;
    match (program, fixture_root, workspace) {
        (None, None, None) => Ok(None),
        (Some(program), Some(fixture_root), Some(workspace)) => Ok(Some(LiveTarget {
            program,
            fixture_root: PathBuf::from(fixture_root),
            workspace: PathBuf::from(workspace),
        })),
        _ => Err(format!(
            "{}, {}, and {} must be set together",
            SystemTestEnv::ToolProgram.as_str(),
            SystemTestEnv::FixtureRoot.as_str(),
            SystemTestEnv::Workspace.as_str()
        )),
    }
}

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive timeout value from an environment variable string.
///
/// # Errors
///
/// Returns an error when the value is non-numeric or zero.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a boolean environment variable, defaulting to `false` when unset.
///
/// # Errors
///
/// Returns an error when the value is not a recognized boolean literal.
fn parse_bool_env(name: &str, raw: Option<String>) -> Result<bool, String> {
    let Some(value) = raw else {
        return Ok(false);
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(format!("{name} must be 1, 0, true, or false"))
}
