// crates/repack-harness-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Scratch workspaces, fixtures, and a scripted stand-in tool.
// Purpose: Drive the runner end to end without the real image tool.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use repack_harness_core::DescriptorMutator;
use repack_harness_core::DescriptorValue;
use repack_harness_core::DigestAlgorithm;
use repack_harness_core::DigestVerifier;
use repack_harness_core::FixtureProvisioner;
use repack_harness_core::HarnessContext;
use repack_harness_core::LaunchMode;
use repack_harness_core::OutputMode;
use repack_harness_core::ToolInvoker;
use repack_harness_core::ToolSpec;
use repack_harness_core::VerifyMode;
use repack_harness_core::Workspace;
use repack_harness_core::digest_bytes;
use tempfile::TempDir;
use xz2::write::XzEncoder;

/// Fixture case directory used by the helpers.
pub const CASE: &str = "case";

/// Raw boot image bytes staged by the helpers.
pub const BOOT_IMAGE: &[u8] = b"ANDROID!\x00\x01kernel-and-ramdisk";

/// Raw vbmeta image bytes staged by the helpers.
pub const VBMETA_IMAGE: &[u8] = b"AVB0vbmeta-payload";

/// Descriptor the stand-in tool writes on unpack.
pub const DESCRIPTOR: &str = "{\n  \"header\" : {\n    \"algorithm_type\" : 0\n  },\n  \"hash_algorithm\" : \"sha256\"\n}\n";

/// POSIX script emulating the tool's unpack/pack/clear contract.
///
/// `pack` signs by concatenating the unpacked image with the descriptor, so
/// every descriptor edit changes `boot.img.signed`.
pub const FAKE_TOOL: &str = r#"#!/bin/sh
set -e
case "$1" in
  unpack)
    [ -f boot.img ] || [ -f vbmeta.img ] || { echo "nothing to unpack" >&2; exit 2; }
    mkdir -p build/unzip_boot
    if [ -f boot.img ]; then
      cp boot.img build/unzip_boot/kernel
      printf '{\n  "header" : {\n    "algorithm_type" : 0\n  },\n  "hash_algorithm" : "sha256"\n}\n' > build/unzip_boot/boot.avb.json
    fi
    if [ -f vbmeta.img ]; then cp vbmeta.img build/unzip_boot/vbmeta; fi
    ;;
  pack)
    [ -d build/unzip_boot ] || { echo "not unpacked" >&2; exit 3; }
    if [ -f build/unzip_boot/kernel ]; then
      cp boot.img boot.img.google
      cp boot.img boot.img.clear
      cat build/unzip_boot/kernel build/unzip_boot/boot.avb.json > boot.img.signed
      cp boot.img.signed boot.img.signed2
    fi
    if [ -f build/unzip_boot/vbmeta ]; then
      cat build/unzip_boot/vbmeta build/unzip_boot/vbmeta > vbmeta.img.signed
    fi
    ;;
  clear)
    rm -rf build boot.img.clear
    ;;
  *)
    exit 64
    ;;
esac
"#;

/// Scratch workspace plus fixture root.
pub struct Scratch {
    /// Keeps the temp directory alive.
    _dir: TempDir,
    /// Workspace root.
    pub workspace: PathBuf,
    /// Fixture root holding [`CASE`].
    pub fixtures: PathBuf,
    /// Stand-in tool script path.
    pub tool: PathBuf,
}

impl Scratch {
    /// Creates the directories, fixtures, and tool script.
    pub fn new() -> Result<Self, String> {
        let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
        let workspace = dir.path().join("workspace");
        let fixtures = dir.path().join("fixtures");
        let case = fixtures.join(CASE);
        fs::create_dir_all(&workspace).map_err(|err| err.to_string())?;
        fs::create_dir_all(&case).map_err(|err| err.to_string())?;
        fs::write(case.join("boot.img.xz"), xz(BOOT_IMAGE)?).map_err(|err| err.to_string())?;
        fs::write(case.join("vbmeta.img"), VBMETA_IMAGE).map_err(|err| err.to_string())?;
        let tool = dir.path().join("fake-tool.sh");
        fs::write(&tool, FAKE_TOOL).map_err(|err| err.to_string())?;
        Ok(Self {
            _dir: dir,
            workspace,
            fixtures,
            tool,
        })
    }

    /// Builds a harness context around the stand-in tool.
    pub fn context(&self, mode: VerifyMode) -> HarnessContext {
        let tool = ToolSpec {
            program: "sh".to_string(),
            args: vec![self.tool.display().to_string()],
        };
        HarnessContext {
            workspace: Workspace::new(&self.workspace),
            fixtures: FixtureProvisioner::new(&self.fixtures),
            invoker: ToolInvoker::new(tool, LaunchMode::Argv, &self.workspace)
                .with_output(OutputMode::Quiet),
            verifier: DigestVerifier::new(DigestAlgorithm::Md5),
            mode,
        }
    }

    /// Returns a workspace path.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.workspace.join(relative)
    }
}

/// Compresses bytes as a single xz stream.
pub fn xz(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let mut encoder = XzEncoder::new(Vec::new(), 6);
    encoder.write_all(bytes).map_err(|err| err.to_string())?;
    encoder.finish().map_err(|err| err.to_string())
}

/// MD5 the stand-in tool produces for `boot.img.signed` after `edits`.
pub fn signed_digest(edits: &[(&str, DescriptorValue)]) -> Result<String, String> {
    let mut descriptor = DESCRIPTOR.to_string();
    for (field, value) in edits {
        let (text, _) =
            DescriptorMutator.apply(&descriptor, field, value).map_err(|err| err.to_string())?;
        descriptor = text;
    }
    let mut signed = BOOT_IMAGE.to_vec();
    signed.extend_from_slice(descriptor.as_bytes());
    Ok(digest_bytes(DigestAlgorithm::Md5, &signed).value)
}

/// MD5 of in-memory bytes.
pub fn md5(bytes: &[u8]) -> String {
    digest_bytes(DigestAlgorithm::Md5, bytes).value
}

/// Returns true when the path exists.
pub fn exists(root: &Path, relative: &str) -> bool {
    root.join(relative).exists()
}
