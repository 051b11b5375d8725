// crates/repack-harness-core/src/fixture.rs
// ============================================================================
// Module: Fixture Provisioner
// Description: Stages read-only fixture files into the scenario workspace.
// Purpose: Reproduce exact input image bytes, decompressing xz archives.
// Dependencies: serde, xz2
// ============================================================================

//! ## Overview
//! Fixtures live under `<fixture_root>/<case>/` and are never opened for
//! writing. Provisioning either copies the fixture verbatim or streams a
//! single-stream xz archive through a decoder into the destination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use xz2::read::XzDecoder;

use crate::error::HarnessError;
use crate::workspace::Workspace;
use crate::workspace::validate_relative;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Compression applied to a fixture file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Infer from the source extension (`.xz` means xz).
    #[default]
    Auto,
    /// Plain copy.
    None,
    /// Single-stream xz archive.
    Xz,
}

impl Compression {
    /// Resolves `Auto` against a source file name.
    #[must_use]
    pub fn resolve(self, source: &str) -> Self {
        match self {
            Self::Auto => {
                let is_xz = Path::new(source)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xz"));
                if is_xz { Self::Xz } else { Self::None }
            }
            other => other,
        }
    }
}

/// One fixture staged into the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureSpec {
    /// File name under the scenario's fixture case directory.
    pub source: String,
    /// File name in the workspace root.
    pub destination: String,
    /// Compression of the source file.
    #[serde(default)]
    pub compression: Compression,
}

impl FixtureSpec {
    /// Creates a fixture entry with inferred compression.
    #[must_use]
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            compression: Compression::Auto,
        }
    }
}

/// Fixture staged by a provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedFixture {
    /// Fixture file read.
    pub source: PathBuf,
    /// Workspace file written.
    pub destination: PathBuf,
    /// Compression actually applied.
    pub compression: Compression,
    /// Bytes written to the destination.
    pub bytes: u64,
}

/// Stages fixtures from a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureProvisioner {
    /// Directory holding one sub-directory per fixture case.
    root: PathBuf,
}

impl FixtureProvisioner {
    /// Creates a provisioner over the fixture root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the fixture root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stages a fixture of the given case into the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::FixtureMissing`] when the source is absent,
    /// [`HarnessError::FixtureCorrupt`] when an archive fails to decode,
    /// [`HarnessError::InvalidScenario`] when the case or source leaves the
    /// fixture root, and [`HarnessError::Io`] for destination write failures.
    pub fn provision(
        &self,
        case: &str,
        spec: &FixtureSpec,
        workspace: &Workspace,
    ) -> Result<ProvisionedFixture, HarnessError> {
        validate_relative(case)?;
        validate_relative(&spec.source)?;
        let source = self.root.join(case).join(&spec.source);
        let destination = workspace.path(&spec.destination)?;
        let compression = spec.compression.resolve(&spec.source);
        let bytes = match compression {
            Compression::Xz => decompress_xz(&source, &destination)?,
            Compression::None | Compression::Auto => copy_verbatim(&source, &destination)?,
        };
        Ok(ProvisionedFixture {
            source,
            destination,
            compression,
            bytes,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens a fixture for reading, mapping absence to `FixtureMissing`.
fn open_fixture(source: &Path) -> Result<File, HarnessError> {
    File::open(source).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            HarnessError::FixtureMissing {
                path: source.to_path_buf(),
            }
        } else {
            HarnessError::io("open fixture", source, &err)
        }
    })
}

/// Copies a fixture byte-for-byte.
fn copy_verbatim(source: &Path, destination: &Path) -> Result<u64, HarnessError> {
    let mut reader = open_fixture(source)?;
    let file =
        File::create(destination).map_err(|err| HarnessError::io("create", destination, &err))?;
    let mut writer = BufWriter::new(file);
    let bytes = io::copy(&mut reader, &mut writer)
        .map_err(|err| HarnessError::io("copy fixture", source, &err))?;
    writer.flush().map_err(|err| HarnessError::io("flush", destination, &err))?;
    Ok(bytes)
}

/// Decodes a single-stream xz fixture into the destination.
fn decompress_xz(source: &Path, destination: &Path) -> Result<u64, HarnessError> {
    let reader = open_fixture(source)?;
    let mut decoder = XzDecoder::new(BufReader::new(reader));
    let file =
        File::create(destination).map_err(|err| HarnessError::io("create", destination, &err))?;
    let mut writer = BufWriter::new(file);
    match io::copy(&mut decoder, &mut writer) {
        Ok(bytes) => {
            writer.flush().map_err(|err| HarnessError::io("flush", destination, &err))?;
            Ok(bytes)
        }
        Err(err) => {
            drop(writer);
            let _ = fs::remove_file(destination);
            Err(HarnessError::FixtureCorrupt {
                path: source.to_path_buf(),
                message: err.to_string(),
            })
        }
    }
}
