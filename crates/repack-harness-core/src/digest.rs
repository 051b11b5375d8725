// crates/repack-harness-core/src/digest.rs
// ============================================================================
// Module: Digest Verifier
// Description: Content digests of produced artifacts and oracle comparison.
// Purpose: Serve as the harness's only correctness oracle.
// Dependencies: md-5, sha2, serde
// ============================================================================

//! ## Overview
//! Artifacts are hashed over their full byte content and compared against
//! recorded hex literals. MD5 is the default because the recorded oracles
//! were produced with it; equality testing does not need collision
//! resistance. SHA-256 is available for newly recorded suites.
//! Invariants:
//! - Comparison is case-insensitive on the expected literal.
//! - Digests are always reported as lowercase hex.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Read buffer size used while hashing.
const READ_CHUNK_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Algorithms
// ============================================================================

/// Hash function used for artifact digests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    /// MD5, matching the recorded oracle literals.
    #[default]
    Md5,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the stable algorithm label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Returns the hex length of a digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How verify steps treat digest mismatches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMode {
    /// Mismatches fail the scenario.
    #[default]
    Enforce,
    /// Mismatches are reported with the observed digest and do not fail.
    Record,
}

/// Lowercase hex digest of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDigest {
    /// Hash algorithm identifier.
    pub algorithm: DigestAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl ContentDigest {
    /// Creates a digest from raw hash output.
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }

    /// Returns true when `expected` names this digest, ignoring case.
    #[must_use]
    pub fn matches(&self, expected: &str) -> bool {
        self.value.eq_ignore_ascii_case(expected.trim())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Hashes an in-memory buffer.
#[must_use]
pub fn digest_bytes(algorithm: DigestAlgorithm, bytes: &[u8]) -> ContentDigest {
    match algorithm {
        DigestAlgorithm::Md5 => ContentDigest::new(algorithm, &Md5::digest(bytes)),
        DigestAlgorithm::Sha256 => ContentDigest::new(algorithm, &Sha256::digest(bytes)),
    }
}

/// Hashes the full content of a file.
///
/// # Errors
///
/// Returns [`HarnessError::ArtifactMissing`] when the file does not exist and
/// [`HarnessError::Io`] for read failures.
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> Result<ContentDigest, HarnessError> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            HarnessError::ArtifactMissing {
                path: path.to_path_buf(),
            }
        } else {
            HarnessError::io("open artifact", path, &err)
        }
    })?;
    match algorithm {
        DigestAlgorithm::Md5 => hash_reader::<Md5>(algorithm, file, path),
        DigestAlgorithm::Sha256 => hash_reader::<Sha256>(algorithm, file, path),
    }
}

/// Streams a reader through a hasher.
fn hash_reader<D: Digest>(
    algorithm: DigestAlgorithm,
    mut reader: impl Read,
    path: &Path,
) -> Result<ContentDigest, HarnessError> {
    let mut hasher = D::new();
    let mut buffer = vec![0_u8; READ_CHUNK_BYTES];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(HarnessError::io("read artifact", path, &err)),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(ContentDigest::new(algorithm, &hasher.finalize()))
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Compares artifacts against expected digests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestVerifier {
    /// Hash function applied to artifacts.
    algorithm: DigestAlgorithm,
}

impl DigestVerifier {
    /// Creates a verifier for the algorithm.
    #[must_use]
    pub const fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
        }
    }

    /// Returns the configured algorithm.
    #[must_use]
    pub const fn algorithm(self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Checks an expected literal's shape.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidDigest`] for wrong length or non-hex text.
    pub fn validate_literal(self, artifact: &str, expected: &str) -> Result<(), HarnessError> {
        let trimmed = expected.trim();
        if trimmed.len() != self.algorithm.hex_len() {
            return Err(HarnessError::InvalidDigest {
                artifact: artifact.to_string(),
                message: format!(
                    "expected {} hex characters for {}, got {}",
                    self.algorithm.hex_len(),
                    self.algorithm,
                    trimmed.len()
                ),
            });
        }
        if !trimmed.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(HarnessError::InvalidDigest {
                artifact: artifact.to_string(),
                message: "digest literal contains non-hex characters".to_string(),
            });
        }
        Ok(())
    }

    /// Hashes an artifact.
    ///
    /// # Errors
    ///
    /// See [`digest_file`].
    pub fn digest(self, path: &Path) -> Result<ContentDigest, HarnessError> {
        digest_file(self.algorithm, path)
    }

    /// Hashes an artifact and compares it with an expected literal.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidDigest`] for a malformed literal,
    /// [`HarnessError::ArtifactMissing`] for an absent file, and
    /// [`HarnessError::DigestMismatch`] when the digests differ.
    pub fn verify(
        self,
        artifact: &str,
        path: &Path,
        expected: &str,
    ) -> Result<ContentDigest, HarnessError> {
        self.validate_literal(artifact, expected)?;
        let actual = self.digest(path)?;
        if actual.matches(expected) {
            Ok(actual)
        } else {
            Err(HarnessError::DigestMismatch {
                artifact: artifact.to_string(),
                expected: expected.trim().to_ascii_lowercase(),
                actual: actual.value,
            })
        }
    }

    /// Requires two artifacts to hash identically.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ArtifactMissing`] when either file is absent and
    /// [`HarnessError::DigestMismatch`] (reference digest as expected) when
    /// they differ.
    pub fn verify_same(
        self,
        artifact: &str,
        path: &Path,
        reference_path: &Path,
    ) -> Result<ContentDigest, HarnessError> {
        let reference = self.digest(reference_path)?;
        let actual = self.digest(path)?;
        if actual == reference {
            Ok(actual)
        } else {
            Err(HarnessError::DigestMismatch {
                artifact: artifact.to_string(),
                expected: reference.value,
                actual: actual.value,
            })
        }
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
