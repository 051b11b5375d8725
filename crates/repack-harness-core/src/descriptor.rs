// crates/repack-harness-core/src/descriptor.rs
// ============================================================================
// Module: Descriptor Mutator
// Description: Field-level edits of the descriptor emitted by `unpack`.
// Purpose: Change signing configuration between re-pack runs.
// Dependencies: regex, serde, serde_json
// ============================================================================

//! ## Overview
//! The descriptor format belongs to the external tool and drifts between tool
//! versions, so edits are plain text substitutions rather than a
//! parse/serialize round trip. Every `"field" : <scalar>` occurrence is
//! rewritten to `"field" : <value>`; everything else in the document,
//! including fields the harness does not know about, is kept byte-for-byte.
//! Invariants:
//! - All occurrences are replaced, one per sub-image structure.
//! - Re-applying the same value leaves the file unchanged.
//! - Zero occurrences is an error, never a silent no-op.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use regex::Captures;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Descriptor written by `unpack` for boot images.
pub const DEFAULT_DESCRIPTOR: &str = "build/unzip_boot/boot.avb.json";

/// JSON scalar token accepted as an existing field value.
const SCALAR_PATTERN: &str =
    r#"(?:"(?:[^"\\]|\\.)*"|-?[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?|true|false|null)"#;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Replacement value for a descriptor field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorValue {
    /// Integer literal, e.g. an algorithm identifier.
    Integer(i64),
    /// String literal, e.g. a hash algorithm name.
    Text(String),
}

impl DescriptorValue {
    /// Renders the value as a JSON token.
    #[must_use]
    pub fn to_token(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Text(value) => {
                serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
            }
        }
    }
}

impl fmt::Display for DescriptorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

impl From<i64> for DescriptorValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for DescriptorValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Result of a field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationReport {
    /// Number of occurrences rewritten.
    pub replacements: usize,
    /// Whether the file content changed.
    pub changed: bool,
}

// ============================================================================
// SECTION: Mutator
// ============================================================================

/// Text-level descriptor editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorMutator;

impl DescriptorMutator {
    /// Sets every occurrence of `field` in the descriptor file to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ArtifactMissing`] when the descriptor is absent,
    /// [`HarnessError::FieldNotFound`] when no occurrence matches, and
    /// [`HarnessError::Io`] for read/write failures.
    pub fn set_field(
        self,
        path: &Path,
        field: &str,
        value: &DescriptorValue,
    ) -> Result<MutationReport, HarnessError> {
        let text = fs::read_to_string(path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                HarnessError::ArtifactMissing {
                    path: path.to_path_buf(),
                }
            } else {
                HarnessError::io("read descriptor", path, &err)
            }
        })?;
        let (updated, replacements) = self.apply(&text, field, value)?;
        if replacements == 0 {
            return Err(HarnessError::FieldNotFound {
                field: field.to_string(),
                path: path.to_path_buf(),
            });
        }
        let changed = updated != text;
        if changed {
            fs::write(path, updated.as_bytes())
                .map_err(|err| HarnessError::io("write descriptor", path, &err))?;
        }
        Ok(MutationReport {
            replacements,
            changed,
        })
    }

    /// Rewrites `field` in descriptor text, returning the new text and the
    /// number of occurrences replaced.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidScenario`] when the field name cannot be
    /// compiled into a pattern.
    pub fn apply(
        self,
        text: &str,
        field: &str,
        value: &DescriptorValue,
    ) -> Result<(String, usize), HarnessError> {
        let pattern = field_pattern(field)?;
        let token = value.to_token();
        let mut replacements = 0_usize;
        let updated = pattern.replace_all(text, |caps: &Captures<'_>| {
            replacements += 1;
            format!("{} : {token}", &caps["key"])
        });
        Ok((updated.into_owned(), replacements))
    }
}

/// Compiles the match pattern for one field.
fn field_pattern(field: &str) -> Result<Regex, HarnessError> {
    if field.trim().is_empty() {
        return Err(HarnessError::InvalidScenario {
            scenario: String::new(),
            message: "descriptor field name must not be empty".to_string(),
        });
    }
    let source = format!(r#"(?P<key>"{}")\s*:\s*{SCALAR_PATTERN}"#, regex::escape(field));
    Regex::new(&source).map_err(|err| HarnessError::InvalidScenario {
        scenario: String::new(),
        message: format!("descriptor field pattern for {field}: {err}"),
    })
}
