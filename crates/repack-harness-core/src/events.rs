// crates/repack-harness-core/src/events.rs
// ============================================================================
// Module: Harness Events
// Description: Structured progress events for suite and scenario execution.
// Purpose: Emit JSON-line logs through an explicitly passed sink handle.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The harness never configures a process-wide logger. Callers construct an
//! [`EventSink`] and hand it to the [`crate::SuiteDriver`]; the driver passes
//! the same handle to every scenario run. Sinks are best-effort: a failed log
//! write never fails a scenario.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Severity attached to a harness event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Routine progress.
    Info,
    /// Non-fatal anomaly (skipped or recorded checks).
    Warn,
    /// Step or scenario failure.
    Error,
}

/// Structured harness event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessEvent {
    /// Event identifier, e.g. `tool.invoked`.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event severity.
    pub level: EventLevel,
    /// Suite name when running under a suite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    /// Scenario name when inside a scenario.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Zero-based step index within the scenario.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    /// Artifact the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Digest observed for the artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Human-readable detail.
    pub message: String,
}

impl HarnessEvent {
    /// Creates an info-level event with the current timestamp.
    #[must_use]
    pub fn new(event: &'static str, message: impl Into<String>) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            level: EventLevel::Info,
            suite: None,
            scenario: None,
            step: None,
            artifact: None,
            digest: None,
            message: message.into(),
        }
    }

    /// Sets the event severity.
    #[must_use]
    pub const fn with_level(mut self, level: EventLevel) -> Self {
        self.level = level;
        self
    }

    /// Attaches the suite name.
    #[must_use]
    pub fn with_suite(mut self, suite: &str) -> Self {
        self.suite = Some(suite.to_string());
        self
    }

    /// Attaches the scenario name.
    #[must_use]
    pub fn with_scenario(mut self, scenario: &str) -> Self {
        self.scenario = Some(scenario.to_string());
        self
    }

    /// Attaches the step index.
    #[must_use]
    pub const fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    /// Attaches an artifact name and optional digest.
    #[must_use]
    pub fn with_artifact(mut self, artifact: &str, digest: Option<&str>) -> Self {
        self.artifact = Some(artifact.to_string());
        self.digest = digest.map(str::to_string);
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for harness events.
pub trait EventSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: &HarnessEvent);
}

/// Event sink that writes JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Event sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Captured events in arrival order.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of captured events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the identifiers of captured events in order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans events out to several sinks.
pub struct TeeEventSink {
    /// Downstream sinks, written in order.
    sinks: Vec<std::sync::Arc<dyn EventSink>>,
}

impl TeeEventSink {
    /// Creates a fan-out sink.
    #[must_use]
    pub fn new(sinks: Vec<std::sync::Arc<dyn EventSink>>) -> Self {
        Self {
            sinks,
        }
    }
}

impl EventSink for TeeEventSink {
    fn record(&self, event: &HarnessEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}
