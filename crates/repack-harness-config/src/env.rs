// crates/repack-harness-config/src/env.rs
// ============================================================================
// Module: Harness Environment Overrides
// Description: Environment-backed overrides for harness configuration.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Set-but-empty values and invalid UTF-8 fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use crate::config::ConfigError;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys understood by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Config file path.
    Config,
    /// Workspace root override.
    Workspace,
    /// Tool program override.
    Tool,
    /// Tool timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Fixture root override.
    FixtureRoot,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "REPACK_HARNESS_CONFIG",
            Self::Workspace => "REPACK_HARNESS_WORKSPACE",
            Self::Tool => "REPACK_HARNESS_TOOL",
            Self::TimeoutSeconds => "REPACK_HARNESS_TIMEOUT_SEC",
            Self::FixtureRoot => "REPACK_HARNESS_FIXTURE_ROOT",
        }
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Typed overrides read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Workspace root override.
    pub workspace_root: Option<PathBuf>,
    /// Tool program override.
    pub tool_program: Option<String>,
    /// Tool timeout override in seconds.
    pub timeout_seconds: Option<u64>,
    /// Fixture root override.
    pub fixture_root: Option<PathBuf>,
}

impl EnvOverrides {
    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is not valid UTF-8, is
    /// empty, or fails validation (for example, a zero timeout).
    pub fn from_env() -> Result<Self, ConfigError> {
        let workspace_root = read_env_nonempty(HarnessEnv::Workspace.as_str())?.map(PathBuf::from);
        let tool_program = read_env_nonempty(HarnessEnv::Tool.as_str())?;
        let timeout_seconds = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let fixture_root =
            read_env_nonempty(HarnessEnv::FixtureRoot.as_str())?.map(PathBuf::from);
        Ok(Self {
            workspace_root,
            tool_program,
            timeout_seconds,
            fixture_root,
        })
    }

    /// Returns true when no override is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.workspace_root.is_none()
            && self.tool_program.is_none()
            && self.timeout_seconds.is_none()
            && self.fixture_root.is_none()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable is set but blank.
pub(crate) fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the value is non-numeric or zero.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<u64, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be a positive integer number of seconds"))
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
    }
    Ok(secs)
}
