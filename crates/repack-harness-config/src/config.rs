// crates/repack-harness-config/src/config.rs
// ============================================================================
// Module: Repack Harness Configuration
// Description: Configuration loading and validation for harness runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: repack-harness-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then environment overrides are applied and the result is validated as a
//! whole. When no path is given and the default file is absent, built-in
//! defaults are used so a bare `run` drives the built-in `coral` suite from
//! the current directory.
//! Invariants:
//! - Every suite reachable from a valid config passes scenario validation.
//! - Relative paths resolve against the process working directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use repack_harness_core::DEFAULT_BUILD_DIR;
use repack_harness_core::DEFAULT_MANAGED_ARTIFACTS;
use repack_harness_core::DigestAlgorithm;
use repack_harness_core::DigestVerifier;
use repack_harness_core::FailurePolicy;
use repack_harness_core::FixtureProvisioner;
use repack_harness_core::HarnessContext;
use repack_harness_core::LaunchMode;
use repack_harness_core::OutputMode;
use repack_harness_core::ScenarioSpec;
use repack_harness_core::SuiteSpec;
use repack_harness_core::ToolInvoker;
use repack_harness_core::ToolSpec;
use repack_harness_core::VerifyMode;
use repack_harness_core::Workspace;
use repack_harness_core::catalog;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::env::EnvOverrides;
use crate::env::HarnessEnv;
use crate::env::read_env_nonempty;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "repack-harness.toml";
/// Default fixture root, relative to the working directory.
pub const DEFAULT_FIXTURE_ROOT: &str = "src/integrationTest/resources";
/// Suite run when the config names none.
pub const DEFAULT_SUITE: &str = catalog::CORAL_SUITE;
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for the tool timeout (one day).
pub(crate) const MAX_TIMEOUT_SECONDS: u64 = 24 * 60 * 60;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Workspace layout.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// External tool invocation.
    #[serde(default)]
    pub tool: ToolConfig,
    /// Fixture location.
    #[serde(default)]
    pub fixtures: FixturesConfig,
    /// Digest verification.
    #[serde(default)]
    pub verify: VerifyConfig,
    /// Suite selection.
    #[serde(default)]
    pub suite: SuiteConfig,
    /// File the config was read from (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Workspace layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Directory the tool runs in.
    pub root: PathBuf,
    /// Build tree the tool unpacks into.
    pub build_dir: String,
    /// Image files removed on reset.
    pub artifacts: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            build_dir: DEFAULT_BUILD_DIR.to_string(),
            artifacts: DEFAULT_MANAGED_ARTIFACTS.iter().map(|name| (*name).to_string()).collect(),
        }
    }
}

/// External tool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Program to launch; the host's Gradle wrapper when unset.
    pub program: Option<String>,
    /// Arguments placed before the subcommand.
    pub args: Vec<String>,
    /// Launch convention.
    pub launch: LaunchMode,
    /// Optional per-invocation wait bound.
    pub timeout_seconds: Option<u64>,
    /// Child output routing.
    pub output: OutputMode,
}

/// Fixture settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixturesConfig {
    /// Directory holding one sub-directory per fixture case.
    pub root: PathBuf,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_FIXTURE_ROOT),
        }
    }
}

/// Digest verification settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Hash function for artifact digests.
    pub algorithm: DigestAlgorithm,
    /// Mismatch handling.
    pub mode: VerifyMode,
}

/// Suite selection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Built-in suite name, or the name of the inline scenarios.
    pub name: String,
    /// Behavior after a failing scenario.
    pub policy: FailurePolicy,
    /// Inline scenario tables; when present they replace the built-in suite.
    pub scenarios: Vec<ScenarioSpec>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SUITE.to_string(),
            policy: FailurePolicy::Continue,
            scenarios: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HarnessConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `REPACK_HARNESS_CONFIG`, then
    /// `repack-harness.toml` in the working directory, then built-in
    /// defaults. Environment overrides are applied before validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overrides, or validation fail.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let overrides = EnvOverrides::from_env()?;
        let mut config = match resolve_path(path)? {
            Some(resolved) => Self::read(&resolved)?,
            None => Self::default(),
        };
        config.apply_overrides(&overrides);
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds the size
    /// limit, is not UTF-8, or is not valid TOML for this model.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses TOML text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    pub fn apply_overrides(&mut self, overrides: &EnvOverrides) {
        if let Some(root) = &overrides.workspace_root {
            self.workspace.root.clone_from(root);
        }
        if let Some(program) = &overrides.tool_program {
            self.tool.program = Some(program.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.tool.timeout_seconds = Some(seconds);
        }
        if let Some(root) = &overrides.fixture_root {
            self.fixtures.root.clone_from(root);
        }
    }

    // ========================================================================
    // SECTION: Validation
    // ========================================================================

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("workspace.root", &self.workspace.root.to_string_lossy())?;
        validate_relative_name("workspace.build_dir", &self.workspace.build_dir)?;
        for artifact in &self.workspace.artifacts {
            validate_relative_name("workspace.artifacts", artifact)?;
        }
        if let Some(program) = &self.tool.program {
            validate_path_string("tool.program", program)?;
        }
        if let Some(seconds) = self.tool.timeout_seconds
            && !(1..=MAX_TIMEOUT_SECONDS).contains(&seconds)
        {
            return Err(ConfigError::Invalid(format!(
                "tool.timeout_seconds must be between 1 and {MAX_TIMEOUT_SECONDS}"
            )));
        }
        validate_path_string("fixtures.root", &self.fixtures.root.to_string_lossy())?;
        let suite = self.suite_spec(None)?;
        self.validate_suite(&suite)
    }

    /// Validates a suite against this config's digest algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an invalid suite or scenario.
    pub fn validate_suite(&self, suite: &SuiteSpec) -> Result<(), ConfigError> {
        suite.validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        let verifier = self.verifier();
        for scenario in &suite.scenarios {
            scenario
                .validate(verifier)
                .map_err(|err| ConfigError::Invalid(format!("suite {}: {err}", suite.name)))?;
        }
        Ok(())
    }

    // ========================================================================
    // SECTION: Construction
    // ========================================================================

    /// Resolves the suite to run.
    ///
    /// `name` overrides `suite.name`. Inline scenarios are used when the
    /// effective name equals `suite.name`; otherwise the name must be a
    /// built-in suite.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown suite name.
    pub fn suite_spec(&self, name: Option<&str>) -> Result<SuiteSpec, ConfigError> {
        let name = name.unwrap_or(self.suite.name.as_str());
        if name == self.suite.name && !self.suite.scenarios.is_empty() {
            return Ok(SuiteSpec::new(name, self.suite.scenarios.clone()));
        }
        catalog::builtin(name).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "unknown suite {name} (built-in suites: {})",
                catalog::BUILTIN_SUITES.join(", ")
            ))
        })
    }

    /// Returns the tool program and leading arguments.
    #[must_use]
    pub fn tool_spec(&self) -> ToolSpec {
        let program =
            self.tool.program.clone().unwrap_or_else(|| ToolSpec::host_default().program);
        ToolSpec {
            program,
            args: self.tool.args.clone(),
        }
    }

    /// Returns the configured digest verifier.
    #[must_use]
    pub const fn verifier(&self) -> DigestVerifier {
        DigestVerifier::new(self.verify.algorithm)
    }

    /// Returns the configured workspace.
    #[must_use]
    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.workspace.root)
            .with_build_dir(self.workspace.build_dir.clone())
            .with_artifacts(self.workspace.artifacts.clone())
    }

    /// Builds the harness context for a run.
    #[must_use]
    pub fn context(&self) -> HarnessContext {
        let invoker = ToolInvoker::new(self.tool_spec(), self.tool.launch, &self.workspace.root)
            .with_timeout(self.tool.timeout_seconds.map(Duration::from_secs))
            .with_output(self.tool.output);
        HarnessContext {
            workspace: self.workspace(),
            fixtures: FixtureProvisioner::new(&self.fixtures.root),
            invoker,
            verifier: self.verifier(),
            mode: self.verify.mode,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns `None` when falling back to built-in defaults.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = read_env_nonempty(HarnessEnv::Config.as_str())? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a name that must stay inside the workspace root.
///
/// The name must include at least one normal component so it never resolves
/// to the root itself.
fn validate_relative_name(field: &str, value: &str) -> Result<(), ConfigError> {
    validate_path_string(field, value)?;
    let components: Vec<Component<'_>> = Path::new(value).components().collect();
    let confined = components
        .iter()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if !confined {
        return Err(ConfigError::Invalid(format!(
            "{field} must be relative to the workspace root: {value}"
        )));
    }
    if !components.iter().any(|component| matches!(component, Component::Normal(_))) {
        return Err(ConfigError::Invalid(format!(
            "{field} must name an entry below the workspace root: {value}"
        )));
    }
    Ok(())
}
