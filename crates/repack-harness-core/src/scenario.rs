// crates/repack-harness-core/src/scenario.rs
// ============================================================================
// Module: Scenario Model
// Description: Data tables describing one scenario and its state machine.
// Purpose: Replace per-scenario control flow with validated step lists.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ScenarioSpec`] is read-only data: which fixtures to stage, which
//! ordered [`Step`]s to run, and how to leave the workspace. Step order is
//! checked against the scenario state machine before anything touches the
//! filesystem:
//!
//! `Clean → Provisioned → Unpacked → Mutated* → Packed → Verified → Clean`
//!
//! Scenarios may loop `Mutated → Packed → Verified → Mutated` to re-pack the
//! same unpack output with several configurations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::descriptor::DEFAULT_DESCRIPTOR;
use crate::descriptor::DescriptorValue;
use crate::digest::DigestVerifier;
use crate::error::HarnessError;
use crate::fixture::FixtureSpec;
use crate::invoker::ToolCommand;
use crate::workspace::validate_relative;

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Expected content of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Recorded hex digest literal.
    Digest(String),
    /// Same digest as another artifact in the workspace.
    Matches(String),
}

/// One artifact assertion inside a verify step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCheck {
    /// Artifact path relative to the workspace.
    pub artifact: String,
    /// Expected content.
    #[serde(flatten)]
    pub expect: Expectation,
}

impl ArtifactCheck {
    /// Asserts the artifact hashes to a literal.
    #[must_use]
    pub fn digest(artifact: &str, expected: &str) -> Self {
        Self {
            artifact: artifact.to_string(),
            expect: Expectation::Digest(expected.to_string()),
        }
    }

    /// Asserts the artifact hashes the same as `reference`.
    #[must_use]
    pub fn matches(artifact: &str, reference: &str) -> Self {
        Self {
            artifact: artifact.to_string(),
            expect: Expectation::Matches(reference.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Returns the default descriptor path for mutate steps.
fn default_descriptor() -> String {
    DEFAULT_DESCRIPTOR.to_string()
}

/// One ordered scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Run a tool subcommand.
    Invoke {
        /// Subcommand to run.
        command: ToolCommand,
    },
    /// Delete one file produced by the tool.
    Remove {
        /// Workspace-relative path.
        path: String,
    },
    /// Rewrite a descriptor field.
    Mutate {
        /// Workspace-relative descriptor path.
        #[serde(default = "default_descriptor")]
        descriptor: String,
        /// Field name.
        field: String,
        /// Replacement value.
        value: DescriptorValue,
    },
    /// Check artifact digests.
    Verify {
        /// Artifact assertions, evaluated in order.
        checks: Vec<ArtifactCheck>,
    },
}

impl Step {
    /// Returns a short label for logs.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Invoke {
                command,
            } => format!("invoke {command}"),
            Self::Remove {
                path,
            } => format!("remove {path}"),
            Self::Mutate {
                field,
                value,
                ..
            } => format!("mutate {field} = {value}"),
            Self::Verify {
                checks,
            } => format!("verify {} artifact(s)", checks.len()),
        }
    }
}

// ============================================================================
// SECTION: Finish Policy
// ============================================================================

/// How a passing scenario leaves the workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishPolicy {
    /// Reset the workspace.
    #[default]
    Reset,
    /// Run the tool's `clear` subcommand, then reset.
    ClearThenReset,
    /// Leave outputs in place (the next scenario resets on entry).
    Keep,
}

impl FinishPolicy {
    /// Returns the stable policy label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::ClearThenReset => "clear_then_reset",
            Self::Keep => "keep",
        }
    }
}

// ============================================================================
// SECTION: State Machine
// ============================================================================

/// Scenario lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    /// Workspace holds no managed artifacts.
    Clean,
    /// Fixtures staged.
    Provisioned,
    /// `unpack` succeeded.
    Unpacked,
    /// Descriptor edited since the last pack.
    Mutated,
    /// `pack` succeeded.
    Packed,
    /// Digest checks passed.
    Verified,
    /// `clear` succeeded; only finishing is allowed.
    Cleared,
}

impl ScenarioState {
    /// Returns the state after `step`, or a reason the step is illegal here.
    ///
    /// # Errors
    ///
    /// Returns a description of the illegal transition.
    pub fn after(self, step: &Step) -> Result<Self, String> {
        let worked = matches!(self, Self::Unpacked | Self::Mutated | Self::Packed | Self::Verified);
        let next = match step {
            Step::Invoke {
                command: ToolCommand::Unpack,
            } if self == Self::Provisioned || worked => Some(Self::Unpacked),
            Step::Invoke {
                command: ToolCommand::Pack,
            } if worked => Some(Self::Packed),
            Step::Invoke {
                command: ToolCommand::Clear,
            } if worked => Some(Self::Cleared),
            Step::Remove {
                ..
            } if worked => Some(self),
            Step::Mutate {
                ..
            } if worked => Some(Self::Mutated),
            Step::Verify {
                ..
            } if matches!(self, Self::Packed | Self::Verified) => Some(Self::Verified),
            _ => None,
        };
        next.ok_or_else(|| format!("{} not allowed in state {self}", step.label()))
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Clean => "clean",
            Self::Provisioned => "provisioned",
            Self::Unpacked => "unpacked",
            Self::Mutated => "mutated",
            Self::Packed => "packed",
            Self::Verified => "verified",
            Self::Cleared => "cleared",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Scenario Spec
// ============================================================================

/// One complete scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpec {
    /// Unique scenario name.
    pub name: String,
    /// Fixture case directory under the fixture root.
    pub case: String,
    /// Fixtures staged after the initial reset.
    pub fixtures: Vec<FixtureSpec>,
    /// Ordered steps.
    pub steps: Vec<Step>,
    /// When set, only checks on these artifacts are enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asserted_artifacts: Option<BTreeSet<String>>,
    /// Workspace handling after the last step passes.
    #[serde(default)]
    pub finish: FinishPolicy,
}

impl ScenarioSpec {
    /// Starts a scenario with no fixtures or steps.
    #[must_use]
    pub fn new(name: &str, case: &str) -> Self {
        Self {
            name: name.to_string(),
            case: case.to_string(),
            fixtures: Vec::new(),
            steps: Vec::new(),
            asserted_artifacts: None,
            finish: FinishPolicy::Reset,
        }
    }

    /// Adds a fixture with inferred compression.
    #[must_use]
    pub fn fixture(mut self, source: &str, destination: &str) -> Self {
        self.fixtures.push(FixtureSpec::new(source, destination));
        self
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends `invoke unpack`.
    #[must_use]
    pub fn unpack(self) -> Self {
        self.step(Step::Invoke {
            command: ToolCommand::Unpack,
        })
    }

    /// Appends `invoke pack`.
    #[must_use]
    pub fn pack(self) -> Self {
        self.step(Step::Invoke {
            command: ToolCommand::Pack,
        })
    }

    /// Appends `invoke clear`.
    #[must_use]
    pub fn clear(self) -> Self {
        self.step(Step::Invoke {
            command: ToolCommand::Clear,
        })
    }

    /// Appends a removal of one tool-produced file.
    #[must_use]
    pub fn remove(self, path: &str) -> Self {
        self.step(Step::Remove {
            path: path.to_string(),
        })
    }

    /// Appends a mutation of the default descriptor.
    #[must_use]
    pub fn mutate(self, field: &str, value: impl Into<DescriptorValue>) -> Self {
        self.step(Step::Mutate {
            descriptor: default_descriptor(),
            field: field.to_string(),
            value: value.into(),
        })
    }

    /// Appends a verify step.
    #[must_use]
    pub fn verify(self, checks: Vec<ArtifactCheck>) -> Self {
        self.step(Step::Verify {
            checks,
        })
    }

    /// Sets the finish policy.
    #[must_use]
    pub const fn finish(mut self, finish: FinishPolicy) -> Self {
        self.finish = finish;
        self
    }

    /// Restricts enforced checks to the named artifacts.
    #[must_use]
    pub fn assert_only(mut self, artifacts: &[&str]) -> Self {
        self.asserted_artifacts = Some(artifacts.iter().map(|name| (*name).to_string()).collect());
        self
    }

    /// Returns whether checks on `artifact` are enforced.
    #[must_use]
    pub fn asserts(&self, artifact: &str) -> bool {
        self.asserted_artifacts.as_ref().is_none_or(|set| set.contains(artifact))
    }

    /// Validates naming, paths, digest literals, and step order.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidScenario`] describing the first problem,
    /// or [`HarnessError::InvalidDigest`] for a malformed literal.
    pub fn validate(&self, verifier: DigestVerifier) -> Result<Vec<ScenarioState>, HarnessError> {
        let invalid = |message: String| HarnessError::InvalidScenario {
            scenario: self.name.clone(),
            message,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("scenario name must not be empty".to_string()));
        }
        if self.case.trim().is_empty() {
            return Err(invalid("fixture case must not be empty".to_string()));
        }
        validate_relative(&self.case).map_err(|err| self.scoped(err))?;
        if self.fixtures.is_empty() {
            return Err(invalid("at least one fixture is required".to_string()));
        }
        for fixture in &self.fixtures {
            validate_relative(&fixture.source).map_err(|err| self.scoped(err))?;
            validate_relative(&fixture.destination).map_err(|err| self.scoped(err))?;
        }
        let mut state = ScenarioState::Provisioned;
        let mut trail = vec![ScenarioState::Clean, state];
        for (index, step) in self.steps.iter().enumerate() {
            self.validate_step(step, verifier)?;
            state =
                state.after(step).map_err(|message| invalid(format!("step {index}: {message}")))?;
            trail.push(state);
        }
        Ok(trail)
    }

    /// Validates the data carried by one step.
    fn validate_step(&self, step: &Step, verifier: DigestVerifier) -> Result<(), HarnessError> {
        match step {
            Step::Invoke {
                ..
            } => Ok(()),
            Step::Remove {
                path,
            } => validate_relative(path).map_err(|err| self.scoped(err)),
            Step::Mutate {
                descriptor,
                field,
                ..
            } => {
                validate_relative(descriptor).map_err(|err| self.scoped(err))?;
                if field.trim().is_empty() {
                    return Err(HarnessError::InvalidScenario {
                        scenario: self.name.clone(),
                        message: "mutate field must not be empty".to_string(),
                    });
                }
                Ok(())
            }
            Step::Verify {
                checks,
            } => {
                if checks.is_empty() {
                    return Err(HarnessError::InvalidScenario {
                        scenario: self.name.clone(),
                        message: "verify step needs at least one check".to_string(),
                    });
                }
                for check in checks {
                    validate_relative(&check.artifact).map_err(|err| self.scoped(err))?;
                    match &check.expect {
                        Expectation::Digest(expected) => {
                            verifier.validate_literal(&check.artifact, expected)?;
                        }
                        Expectation::Matches(reference) => {
                            validate_relative(reference).map_err(|err| self.scoped(err))?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Fills in this scenario's name on an unscoped validation error.
    fn scoped(&self, err: HarnessError) -> HarnessError {
        match err {
            HarnessError::InvalidScenario {
                scenario,
                message,
            } if scenario.is_empty() => HarnessError::InvalidScenario {
                scenario: self.name.clone(),
                message,
            },
            other => other,
        }
    }
}
