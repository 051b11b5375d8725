// crates/repack-harness-core/src/runner.rs
// ============================================================================
// Module: Scenario Runner
// Description: Executes one scenario's steps against the workspace.
// Purpose: Compose reset, provisioning, invocation, mutation, and verification.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`ScenarioRunner`] takes a validated [`ScenarioSpec`] from `Clean` back to
//! `Clean`. The first failing step aborts the scenario; nothing is retried.
//! A failed scenario leaves its workspace untouched for inspection; the next
//! scenario's entry reset wipes it.
//! Invariants:
//! - The workspace is reset before the first fixture is staged.
//! - Steps run in declared order.
//! - Every digest check produces exactly one [`ObservedDigest`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use serde::Serialize;

use crate::descriptor::DescriptorMutator;
use crate::digest::DigestVerifier;
use crate::digest::VerifyMode;
use crate::error::HarnessError;
use crate::events::EventLevel;
use crate::events::EventSink;
use crate::events::HarnessEvent;
use crate::fixture::FixtureProvisioner;
use crate::invoker::ToolCommand;
use crate::invoker::ToolInvoker;
use crate::scenario::ArtifactCheck;
use crate::scenario::Expectation;
use crate::scenario::FinishPolicy;
use crate::scenario::ScenarioSpec;
use crate::scenario::ScenarioState;
use crate::scenario::Step;
use crate::workspace::Workspace;

// ============================================================================
// SECTION: Harness Context
// ============================================================================

/// Components shared by every scenario of a run.
pub struct HarnessContext {
    /// Scenario workspace.
    pub workspace: Workspace,
    /// Fixture source.
    pub fixtures: FixtureProvisioner,
    /// External tool launcher.
    pub invoker: ToolInvoker,
    /// Digest oracle.
    pub verifier: DigestVerifier,
    /// Mismatch handling.
    pub mode: VerifyMode,
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Final status of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Every step passed.
    Passed,
    /// A step failed.
    Failed,
    /// Skipped because an earlier scenario halted the suite.
    NotRun,
}

/// Result of a single digest check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Digest matched.
    Passed,
    /// Artifact outside the asserted set.
    Skipped,
    /// Mismatch tolerated in record mode.
    Recorded,
}

/// Digest observed during a verify step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedDigest {
    /// Step index of the verify step.
    pub step: usize,
    /// Artifact checked.
    pub artifact: String,
    /// Expected digest (literal, or the reference artifact's digest).
    pub expected: Option<String>,
    /// Observed digest, absent for skipped checks.
    pub digest: Option<String>,
    /// Check result.
    pub status: CheckStatus,
}

/// Failure details for a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioFailure {
    /// Stable error kind label.
    pub kind: &'static str,
    /// Step index that failed, `None` for setup or teardown.
    pub step: Option<usize>,
    /// Error message.
    pub message: String,
}

/// Result of running one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario name.
    pub name: String,
    /// Final status.
    pub status: ScenarioStatus,
    /// Failure details when the scenario failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ScenarioFailure>,
    /// Steps completed before finishing or failing.
    pub steps_completed: usize,
    /// States visited in order.
    pub states: Vec<ScenarioState>,
    /// Digest observations in check order.
    pub observations: Vec<ObservedDigest>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
}

impl ScenarioOutcome {
    /// Creates an outcome for a scenario that never started.
    #[must_use]
    pub fn not_run(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::NotRun,
            failure: None,
            steps_completed: 0,
            states: Vec::new(),
            observations: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Returns true when the scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Returns the observed digest for an artifact at a step.
    #[must_use]
    pub fn observed(&self, step: usize, artifact: &str) -> Option<&str> {
        self.observations
            .iter()
            .find(|obs| obs.step == step && obs.artifact == artifact)
            .and_then(|obs| obs.digest.as_deref())
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs scenarios against a harness context.
pub struct ScenarioRunner<'a> {
    /// Shared components.
    context: &'a HarnessContext,
    /// Event destination.
    events: &'a dyn EventSink,
    /// Suite name attached to events.
    suite: Option<&'a str>,
}

impl<'a> ScenarioRunner<'a> {
    /// Creates a runner.
    #[must_use]
    pub const fn new(context: &'a HarnessContext, events: &'a dyn EventSink) -> Self {
        Self {
            context,
            events,
            suite: None,
        }
    }

    /// Tags events with a suite name.
    #[must_use]
    pub const fn in_suite(mut self, suite: &'a str) -> Self {
        self.suite = Some(suite);
        self
    }

    /// Runs a scenario from `Clean` to `Clean`.
    #[must_use]
    pub fn run(&self, spec: &ScenarioSpec) -> ScenarioOutcome {
        let started = Instant::now();
        let mut outcome = ScenarioOutcome {
            name: spec.name.clone(),
            status: ScenarioStatus::Passed,
            failure: None,
            steps_completed: 0,
            states: Vec::new(),
            observations: Vec::new(),
            duration_ms: 0,
        };
        self.emit(spec, None, HarnessEvent::new("scenario.started", spec.name.clone()));
        let mut failed_step = None;
        let result = spec
            .validate(self.context.verifier)
            .and_then(|_| self.execute(spec, &mut outcome, &mut failed_step));
        if let Err(err) = result {
            self.emit(
                spec,
                failed_step,
                HarnessEvent::new("scenario.failed", err.to_string()).with_level(EventLevel::Error),
            );
            outcome.status = ScenarioStatus::Failed;
            outcome.failure = Some(ScenarioFailure {
                kind: err.kind(),
                step: failed_step,
                message: err.to_string(),
            });
        } else {
            self.emit(spec, None, HarnessEvent::new("scenario.passed", spec.name.clone()));
        }
        outcome.duration_ms = started.elapsed().as_millis();
        outcome
    }

    /// Runs setup, steps, and the finish policy.
    fn execute(
        &self,
        spec: &ScenarioSpec,
        outcome: &mut ScenarioOutcome,
        failed_step: &mut Option<usize>,
    ) -> Result<(), HarnessError> {
        self.reset(spec)?;
        outcome.states.push(ScenarioState::Clean);
        for fixture in &spec.fixtures {
            let staged =
                self.context.fixtures.provision(&spec.case, fixture, &self.context.workspace)?;
            self.emit(
                spec,
                None,
                HarnessEvent::new(
                    "fixture.provisioned",
                    format!(
                        "{} -> {} ({} bytes)",
                        fixture.source, fixture.destination, staged.bytes
                    ),
                ),
            );
        }
        let mut state = ScenarioState::Provisioned;
        outcome.states.push(state);
        for (index, step) in spec.steps.iter().enumerate() {
            *failed_step = Some(index);
            self.run_step(spec, index, step, outcome)?;
            state = state.after(step).map_err(|message| HarnessError::InvalidScenario {
                scenario: spec.name.clone(),
                message,
            })?;
            outcome.states.push(state);
            outcome.steps_completed += 1;
        }
        *failed_step = None;
        match spec.finish {
            FinishPolicy::Reset => {
                self.reset(spec)?;
                outcome.states.push(ScenarioState::Clean);
            }
            FinishPolicy::ClearThenReset => {
                self.invoke(spec, None, ToolCommand::Clear)?;
                self.reset(spec)?;
                outcome.states.push(ScenarioState::Clean);
            }
            FinishPolicy::Keep => {}
        }
        Ok(())
    }

    /// Executes one step.
    fn run_step(
        &self,
        spec: &ScenarioSpec,
        index: usize,
        step: &Step,
        outcome: &mut ScenarioOutcome,
    ) -> Result<(), HarnessError> {
        match step {
            Step::Invoke {
                command,
            } => self.invoke(spec, Some(index), *command),
            Step::Remove {
                path,
            } => {
                self.context.workspace.remove_artifact(path)?;
                self.emit(spec, Some(index), HarnessEvent::new("artifact.removed", path.clone()));
                Ok(())
            }
            Step::Mutate {
                descriptor,
                field,
                value,
            } => {
                let path = self.context.workspace.path(descriptor)?;
                let report = DescriptorMutator.set_field(&path, field, value)?;
                self.emit(
                    spec,
                    Some(index),
                    HarnessEvent::new(
                        "descriptor.mutated",
                        format!(
                            "{field} = {value} ({} occurrence(s), changed: {})",
                            report.replacements, report.changed
                        ),
                    ),
                );
                Ok(())
            }
            Step::Verify {
                checks,
            } => {
                for check in checks {
                    let observed = self.check(spec, index, check)?;
                    outcome.observations.push(observed);
                }
                Ok(())
            }
        }
    }

    /// Evaluates one artifact check.
    fn check(
        &self,
        spec: &ScenarioSpec,
        index: usize,
        check: &ArtifactCheck,
    ) -> Result<ObservedDigest, HarnessError> {
        let artifact = check.artifact.as_str();
        if !spec.asserts(artifact) {
            self.emit(
                spec,
                Some(index),
                HarnessEvent::new("digest.skipped", "artifact outside asserted set")
                    .with_level(EventLevel::Warn)
                    .with_artifact(artifact, None),
            );
            return Ok(ObservedDigest {
                step: index,
                artifact: artifact.to_string(),
                expected: None,
                digest: None,
                status: CheckStatus::Skipped,
            });
        }
        let workspace = &self.context.workspace;
        let path = workspace.path(artifact)?;
        let verifier = self.context.verifier;
        let result = match &check.expect {
            Expectation::Digest(expected) => verifier
                .verify(artifact, &path, expected)
                .map(|actual| (expected.trim().to_ascii_lowercase(), actual.value)),
            Expectation::Matches(reference) => {
                let reference_path = workspace.path(reference)?;
                verifier
                    .verify_same(artifact, &path, &reference_path)
                    .map(|actual| (actual.value.clone(), actual.value))
            }
        };
        match result {
            Ok((expected, actual)) => {
                self.emit(
                    spec,
                    Some(index),
                    HarnessEvent::new("digest.verified", "digest matched")
                        .with_artifact(artifact, Some(&actual)),
                );
                Ok(ObservedDigest {
                    step: index,
                    artifact: artifact.to_string(),
                    expected: Some(expected),
                    digest: Some(actual),
                    status: CheckStatus::Passed,
                })
            }
            Err(HarnessError::DigestMismatch {
                artifact: _,
                expected,
                actual,
            }) if self.context.mode == VerifyMode::Record => {
                self.emit(
                    spec,
                    Some(index),
                    HarnessEvent::new("digest.recorded", format!("expected {expected}"))
                        .with_level(EventLevel::Warn)
                        .with_artifact(artifact, Some(&actual)),
                );
                Ok(ObservedDigest {
                    step: index,
                    artifact: artifact.to_string(),
                    expected: Some(expected),
                    digest: Some(actual),
                    status: CheckStatus::Recorded,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Runs a tool subcommand and logs it.
    fn invoke(
        &self,
        spec: &ScenarioSpec,
        index: Option<usize>,
        command: ToolCommand,
    ) -> Result<(), HarnessError> {
        let report = self.context.invoker.invoke(command)?;
        self.emit(
            spec,
            index,
            HarnessEvent::new(
                "tool.invoked",
                format!("{command} finished in {}ms", report.elapsed.as_millis()),
            ),
        );
        Ok(())
    }

    /// Resets the workspace and logs what was removed.
    fn reset(&self, spec: &ScenarioSpec) -> Result<(), HarnessError> {
        let report = self.context.workspace.reset()?;
        let message = if report.is_empty() {
            "workspace already clean".to_string()
        } else {
            let mut removed = report.removed.clone();
            if report.build_tree_removed {
                removed.insert(0, format!("{}/", self.context.workspace.build_dir_name()));
            }
            format!("removed {}", removed.join(", "))
        };
        self.emit(spec, None, HarnessEvent::new("workspace.reset", message));
        Ok(())
    }

    /// Tags and records an event.
    fn emit(&self, spec: &ScenarioSpec, step: Option<usize>, event: HarnessEvent) {
        let mut event = event.with_scenario(&spec.name);
        if let Some(suite) = self.suite {
            event = event.with_suite(suite);
        }
        if let Some(step) = step {
            event = event.with_step(step);
        }
        self.events.record(&event);
    }
}
