// crates/repack-harness-core/src/workspace.rs
// ============================================================================
// Module: Workspace Manager
// Description: Owns the directory the external tool reads and writes.
// Purpose: Reset transient scenario state to a known-empty baseline.
// Dependencies: std::fs
// ============================================================================

//! ## Overview
//! A [`Workspace`] is the single mutable resource shared by all scenarios. It
//! knows which entries the external tool produces (the unpack tree plus a set
//! of named image files) and can delete them. Deleting an entry that is
//! already absent is a no-op.
//! Invariants:
//! - Reset only touches the build tree and managed artifact names, and each
//!   of those names a distinct entry below the root (never the root itself).
//! - Relative paths handed to the workspace never escape its root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default directory the external tool unpacks into.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Image files the external tool reads or produces in the workspace root.
pub const DEFAULT_MANAGED_ARTIFACTS: &[&str] = &[
    "boot.img",
    "boot.img.clear",
    "boot.img.google",
    "boot.img.signed",
    "boot.img.signed2",
    "recovery.img",
    "recovery.img.clear",
    "recovery.img.google",
    "recovery.img.signed",
    "recovery.img.signed2",
    "vbmeta.img",
    "vbmeta.img.signed",
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Entries deleted by a workspace reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    /// Whether the build tree existed and was removed.
    pub build_tree_removed: bool,
    /// Managed artifact names that existed and were removed.
    pub removed: Vec<String>,
}

impl ResetReport {
    /// Returns true when nothing needed to be deleted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.build_tree_removed && self.removed.is_empty()
    }
}

/// Scenario workspace rooted at a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Workspace root directory.
    root: PathBuf,
    /// Build tree relative to the root.
    build_dir: String,
    /// Artifact names managed in the root.
    artifacts: Vec<String>,
}

impl Workspace {
    /// Creates a workspace with the default build tree and artifact names.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            build_dir: DEFAULT_BUILD_DIR.to_string(),
            artifacts: DEFAULT_MANAGED_ARTIFACTS.iter().map(|name| (*name).to_string()).collect(),
        }
    }

    /// Overrides the build tree directory name.
    #[must_use]
    pub fn with_build_dir(mut self, build_dir: impl Into<String>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    /// Overrides the managed artifact names.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the build tree path.
    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.build_dir)
    }

    /// Returns the build tree as configured, relative to the root.
    #[must_use]
    pub fn build_dir_name(&self) -> &str {
        &self.build_dir
    }

    /// Returns the managed artifact names.
    #[must_use]
    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    /// Resolves a workspace-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidScenario`] when the path is absolute or
    /// climbs out of the workspace.
    pub fn path(&self, relative: &str) -> Result<PathBuf, HarnessError> {
        validate_relative(relative)?;
        Ok(self.root.join(relative))
    }

    /// Deletes the build tree and every managed artifact that exists.
    ///
    /// The build tree and artifact names are checked before anything is
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidScenario`] when a managed name does not
    /// name an entry inside the root, or [`HarnessError::Io`] when an existing
    /// entry cannot be removed.
    pub fn reset(&self) -> Result<ResetReport, HarnessError> {
        self.validate()?;
        let mut report = ResetReport::default();
        let build = self.build_dir();
        match fs::remove_dir_all(&build) {
            Ok(()) => report.build_tree_removed = true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(HarnessError::io("remove build tree", &build, &err)),
        }
        for name in &self.artifacts {
            let path = self.root.join(name);
            if remove_file_if_exists(&path)? {
                report.removed.push(name.clone());
            }
        }
        Ok(report)
    }

    /// Checks that the build tree and artifact names stay inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidScenario`] for the first unsafe name.
    pub fn validate(&self) -> Result<(), HarnessError> {
        validate_relative(&self.build_dir)?;
        self.artifacts.iter().try_for_each(|name| validate_relative(name))
    }

    /// Deletes a single file the tool produced.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ArtifactMissing`] when the file is absent, or
    /// [`HarnessError::InvalidScenario`] for paths escaping the workspace.
    pub fn remove_artifact(&self, relative: &str) -> Result<PathBuf, HarnessError> {
        let path = self.path(relative)?;
        if remove_file_if_exists(&path)? {
            Ok(path)
        } else {
            Err(HarnessError::ArtifactMissing {
                path,
            })
        }
    }

    /// Lists managed entries that currently exist.
    #[must_use]
    pub fn leftovers(&self) -> Vec<String> {
        let mut present = Vec::new();
        if self.build_dir().exists() {
            present.push(format!("{}/", self.build_dir));
        }
        present.extend(self.artifacts.iter().filter(|name| self.root.join(name).exists()).cloned());
        present
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Removes a file, reporting whether it existed.
fn remove_file_if_exists(path: &Path) -> Result<bool, HarnessError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(HarnessError::io("remove artifact", path, &err)),
    }
}

/// Rejects absolute paths, parent traversal, and paths naming the root itself.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidScenario`] for unsafe paths.
pub(crate) fn validate_relative(relative: &str) -> Result<(), HarnessError> {
    let invalid = |message: &str| HarnessError::InvalidScenario {
        scenario: String::new(),
        message: format!("{message}: {relative}"),
    };
    if relative.trim().is_empty() {
        return Err(invalid("empty relative path"));
    }
    let mut named = false;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("relative path escapes root")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("relative path must not be absolute"));
            }
        }
    }
    if !named {
        return Err(invalid("relative path names the root itself"));
    }
    Ok(())
}
