// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Per-test run roots and deterministic summaries.
// Purpose: Keep suite reports and event logs for post-mortem inspection.
// Dependencies: system-tests, repack-harness-core, serde, serde_jcs
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use repack_harness_core::SuiteReport;
use repack_harness_core::events::now_millis;
use serde::Serialize;
use system_tests::config::SystemTestConfig;

/// Serialized `summary.json` payload.
#[derive(Debug, Serialize)]
struct TestSummary {
    /// Test name.
    test_name: String,
    /// Final status label.
    status: String,
    /// Start time in Unix milliseconds.
    started_at_ms: u128,
    /// End time in Unix milliseconds.
    ended_at_ms: u128,
    /// Wall-clock duration.
    duration_ms: u128,
    /// Free-form notes.
    notes: Vec<String>,
    /// Artifact names relative to the run root.
    artifacts: Vec<String>,
}

/// Returns the default run root for a test.
fn default_run_root(test_name: &str) -> PathBuf {
    PathBuf::from("target/system-tests")
        .join(format!("run_{}", now_millis()))
        .join(test_name)
}

/// Artifact directory for a single system-test.
#[derive(Debug, Clone)]
pub struct TestArtifacts {
    /// Artifact root directory.
    root: PathBuf,
}

impl TestArtifacts {
    /// Creates the artifact root, refusing to reuse a populated override root.
    pub fn new(test_name: &str) -> io::Result<Self> {
        let config = SystemTestConfig::load().map_err(io::Error::other)?;
        let root = match config.run_root {
            Some(run_root) => {
                let root = run_root.join(test_name);
                let populated =
                    fs::read_dir(&root).is_ok_and(|mut entries| entries.next().is_some());
                if populated && !config.allow_overwrite {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("run root {} is not empty", root.display()),
                    ));
                }
                root
            }
            None => default_run_root(test_name),
        };
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the artifact root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the JSON-line event log for a run label.
    pub fn event_log(&self, label: &str) -> PathBuf {
        self.root.join(format!("{label}.events.jsonl"))
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes a suite report as `<label>.report.json`.
    pub fn write_report(&self, label: &str, report: &SuiteReport) -> io::Result<PathBuf> {
        self.write_json(&format!("{label}.report.json"), report)
    }

    /// Writes a UTF-8 text artifact.
    pub fn write_text(&self, name: &str, value: &str) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        Ok(path)
    }
}

/// Writes a summary when the test ends, even on panic.
pub struct TestReporter {
    /// Artifact directory.
    artifacts: TestArtifacts,
    /// Test name.
    test_name: String,
    /// Start time in Unix milliseconds.
    started_at_ms: u128,
    /// Whether a summary was written.
    finalized: bool,
}

impl TestReporter {
    /// Creates a reporter for the named test.
    pub fn new(test_name: &str) -> io::Result<Self> {
        Ok(Self {
            artifacts: TestArtifacts::new(test_name)?,
            test_name: test_name.to_string(),
            started_at_ms: now_millis(),
            finalized: false,
        })
    }

    /// Returns the artifact directory.
    pub fn artifacts(&self) -> &TestArtifacts {
        &self.artifacts
    }

    /// Writes `summary.json` and `summary.md`.
    pub fn finish(
        &mut self,
        status: &str,
        notes: Vec<String>,
        artifacts: Vec<String>,
    ) -> io::Result<()> {
        let ended_at_ms = now_millis();
        let summary = TestSummary {
            test_name: self.test_name.clone(),
            status: status.to_string(),
            started_at_ms: self.started_at_ms,
            ended_at_ms,
            duration_ms: ended_at_ms.saturating_sub(self.started_at_ms),
            notes,
            artifacts,
        };
        self.artifacts.write_json("summary.json", &summary)?;
        self.artifacts.write_text("summary.md", &summary_markdown(&summary))?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status = if std::thread::panicking() { "panic" } else { "unknown" };
        let _ = self.finish(
            status,
            vec!["test ended without an explicit summary".to_string()],
            Vec::new(),
        );
    }
}

/// Appends a markdown bullet list.
fn bullet_list(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("- None\n");
    }
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
}

/// Renders `summary.md`.
fn summary_markdown(summary: &TestSummary) -> String {
    let mut out = format!(
        "# System-Test Summary\n\n## Status\n\n- Test: {}\n- Status: {}\n- Duration (ms): {}\n",
        summary.test_name, summary.status, summary.duration_ms
    );
    out.push_str("\n## Notes\n\n");
    bullet_list(&mut out, &summary.notes);
    out.push_str("\n## Artifacts\n\n");
    bullet_list(&mut out, &summary.artifacts);
    out
}
