// crates/repack-harness-core/src/suite.rs
// ============================================================================
// Module: Suite Driver
// Description: Ordered execution of named scenario sets.
// Purpose: Run scenarios one at a time and aggregate their outcomes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`SuiteDriver`] owns the [`HarnessContext`] and runs one scenario at a
//! time. `run` takes `&mut self`, so a driver can never have two scenarios in
//! flight against its workspace.
//! Invariants:
//! - Scenarios run in declared order.
//! - Every selected scenario appears exactly once in the report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

use crate::error::HarnessError;
use crate::events::EventLevel;
use crate::events::EventSink;
use crate::events::HarnessEvent;
use crate::runner::HarnessContext;
use crate::runner::ScenarioOutcome;
use crate::runner::ScenarioRunner;
use crate::runner::ScenarioStatus;
use crate::scenario::ScenarioSpec;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Ordered, named set of scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteSpec {
    /// Suite name.
    pub name: String,
    /// Scenarios in execution order.
    pub scenarios: Vec<ScenarioSpec>,
}

impl SuiteSpec {
    /// Creates a suite.
    #[must_use]
    pub fn new(name: &str, scenarios: Vec<ScenarioSpec>) -> Self {
        Self {
            name: name.to_string(),
            scenarios,
        }
    }

    /// Returns scenario names in order.
    #[must_use]
    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|scenario| scenario.name.as_str()).collect()
    }

    /// Checks that scenario names are unique.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidScenario`] for an empty suite or a
    /// duplicated scenario name.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.scenarios.is_empty() {
            return Err(HarnessError::InvalidScenario {
                scenario: String::new(),
                message: format!("suite {} has no scenarios", self.name),
            });
        }
        let mut seen = BTreeSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.name.as_str()) {
                return Err(HarnessError::InvalidScenario {
                    scenario: scenario.name.clone(),
                    message: format!("duplicate scenario name in suite {}", self.name),
                });
            }
        }
        Ok(())
    }

    /// Selects scenarios by name, keeping suite order.
    ///
    /// An empty filter selects every scenario.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidScenario`] for a name the suite lacks.
    pub fn select(&self, filter: &[String]) -> Result<Vec<&ScenarioSpec>, HarnessError> {
        if let Some(unknown) =
            filter.iter().find(|name| !self.scenarios.iter().any(|s| &s.name == *name))
        {
            return Err(HarnessError::InvalidScenario {
                scenario: unknown.clone(),
                message: format!("not a scenario of suite {}", self.name),
            });
        }
        Ok(self
            .scenarios
            .iter()
            .filter(|scenario| filter.is_empty() || filter.contains(&scenario.name))
            .collect())
    }
}

/// Behavior after a scenario fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and run the remaining scenarios.
    #[default]
    Continue,
    /// Stop; remaining scenarios are reported as not run.
    Halt,
}

impl FailurePolicy {
    /// Returns the stable policy label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Halt => "halt",
        }
    }
}

/// Outcome counts for a suite run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SuiteCounts {
    /// Scenarios selected.
    pub total: usize,
    /// Scenarios passed.
    pub passed: usize,
    /// Scenarios failed.
    pub failed: usize,
    /// Scenarios skipped after a halt.
    pub not_run: usize,
}

/// Aggregated result of a suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Suite name.
    pub suite: String,
    /// Failure policy applied.
    pub policy: FailurePolicy,
    /// Per-scenario outcomes in execution order.
    pub outcomes: Vec<ScenarioOutcome>,
    /// Outcome counts.
    pub counts: SuiteCounts,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
}

impl SuiteReport {
    /// Returns true when every selected scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.counts.failed == 0 && self.counts.not_run == 0
    }

    /// Returns the outcome for a scenario.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|outcome| outcome.name == name)
    }
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Runs suites sequentially against one harness context.
pub struct SuiteDriver {
    /// Shared components.
    context: HarnessContext,
    /// Event destination passed to every scenario.
    events: Arc<dyn EventSink>,
    /// Behavior after a failure.
    policy: FailurePolicy,
}

impl SuiteDriver {
    /// Creates a driver with [`FailurePolicy::Continue`].
    #[must_use]
    pub fn new(context: HarnessContext, events: Arc<dyn EventSink>) -> Self {
        Self {
            context,
            events,
            policy: FailurePolicy::Continue,
        }
    }

    /// Sets the failure policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the harness context.
    #[must_use]
    pub const fn context(&self) -> &HarnessContext {
        &self.context
    }

    /// Runs the selected scenarios of a suite in order.
    ///
    /// Scenario failures are reported in the [`SuiteReport`]; only problems
    /// with the suite itself surface as errors.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidScenario`] for an invalid suite or an
    /// unknown scenario name in `filter`.
    pub fn run(
        &mut self,
        suite: &SuiteSpec,
        filter: &[String],
    ) -> Result<SuiteReport, HarnessError> {
        suite.validate()?;
        let selected = suite.select(filter)?;
        let started = Instant::now();
        self.events.record(
            &HarnessEvent::new(
                "suite.started",
                format!("{} scenario(s), policy {}", selected.len(), self.policy.as_str()),
            )
            .with_suite(&suite.name),
        );
        let runner = ScenarioRunner::new(&self.context, self.events.as_ref()).in_suite(&suite.name);
        let mut outcomes = Vec::with_capacity(selected.len());
        let mut halted = false;
        for scenario in selected {
            if halted {
                outcomes.push(ScenarioOutcome::not_run(&scenario.name));
                continue;
            }
            let outcome = runner.run(scenario);
            halted = !outcome.passed() && self.policy == FailurePolicy::Halt;
            outcomes.push(outcome);
        }
        let counts = count(&outcomes);
        let level = if counts.failed == 0 { EventLevel::Info } else { EventLevel::Error };
        self.events.record(
            &HarnessEvent::new(
                "suite.finished",
                format!(
                    "{} passed, {} failed, {} not run",
                    counts.passed, counts.failed, counts.not_run
                ),
            )
            .with_level(level)
            .with_suite(&suite.name),
        );
        Ok(SuiteReport {
            suite: suite.name.clone(),
            policy: self.policy,
            outcomes,
            counts,
            duration_ms: started.elapsed().as_millis(),
        })
    }
}

/// Tallies outcomes by status.
fn count(outcomes: &[ScenarioOutcome]) -> SuiteCounts {
    outcomes.iter().fold(
        SuiteCounts {
            total: outcomes.len(),
            ..SuiteCounts::default()
        },
        |mut counts, outcome| {
            match outcome.status {
                ScenarioStatus::Passed => counts.passed += 1,
                ScenarioStatus::Failed => counts.failed += 1,
                ScenarioStatus::NotRun => counts.not_run += 1,
            }
            counts
        },
    )
}
