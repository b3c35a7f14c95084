// system-tests/src/case.rs
// ============================================================================
// Module: Case Runner
// Description: Phase state machine for one deploy/verify/destroy scenario.
// Purpose: Run verification against a scoped deployment and report outcomes.
// Dependencies: crate::{deployment, driver}, ecr-verify-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! A case moves through `Init → Deploy → Verify → Destroy → Done`. A failed
//! deploy skips Verify and goes straight to Destroy. Destroy runs on every
//! path: explicitly after verification, or through the deployment guard when
//! verification panics. Check failures never abort the case; they are
//! collected into the [`CaseReport`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use ecr_verify_core::CheckFailure;
use ecr_verify_core::Checks;
use thiserror::Error;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::deployment::Deployment;
use crate::driver::ComponentCase;
use crate::driver::DeploymentDriver;
use crate::driver::DriverError;
use crate::driver::PlanOutcome;

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Lifecycle phase of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasePhase {
    /// Case constructed, nothing deployed.
    Init,
    /// Component is being deployed.
    Deploy,
    /// Live state is being verified.
    Verify,
    /// Component is being destroyed.
    Destroy,
    /// Case finished.
    Done,
}

impl fmt::Display for CasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "init",
            Self::Deploy => "deploy",
            Self::Verify => "verify",
            Self::Destroy => "destroy",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a case failed.
#[derive(Debug, Error)]
pub enum CaseError {
    /// The component could not be deployed.
    #[error("deploy of {case} failed: {source}")]
    Deploy {
        /// Case label.
        case: String,
        /// Driver error.
        source: DriverError,
    },
    /// The post-verification plan could not run.
    #[error("drift check of {case} failed: {source}")]
    Drift {
        /// Case label.
        case: String,
        /// Driver error.
        source: DriverError,
    },
    /// One or more checks failed.
    #[error("{case} failed {count} check(s):\n{summary}")]
    Checks {
        /// Case label.
        case: String,
        /// Number of failed checks.
        count: usize,
        /// One failure per line.
        summary: String,
        /// Failed checks.
        failures: Vec<CheckFailure>,
    },
    /// The component could not be destroyed.
    #[error("destroy of {case} failed: {source}")]
    Destroy {
        /// Case label.
        case: String,
        /// Driver error.
        source: DriverError,
    },
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of one case.
#[derive(Debug)]
pub struct CaseReport {
    /// `component@stack` label.
    pub case: String,
    /// Phases entered, in order.
    pub phases: Vec<CasePhase>,
    /// Deploy error, when the deploy failed.
    pub deploy_error: Option<DriverError>,
    /// Plan error, when the drift check could not run.
    pub drift_error: Option<DriverError>,
    /// Number of checks that held.
    pub checks_passed: usize,
    /// Failed checks.
    pub failures: Vec<CheckFailure>,
    /// Destroy error, when the destroy failed.
    pub destroy_error: Option<DriverError>,
}

impl CaseReport {
    /// Creates a report in the `Init` phase.
    fn new(case: &ComponentCase) -> Self {
        let mut report = Self {
            case: case.to_string(),
            phases: Vec::new(),
            deploy_error: None,
            drift_error: None,
            checks_passed: 0,
            failures: Vec::new(),
            destroy_error: None,
        };
        report.enter(CasePhase::Init);
        report
    }

    /// Records a phase transition.
    fn enter(&mut self, phase: CasePhase) {
        info!(case = %self.case, phase = %phase, "case phase");
        self.phases.push(phase);
    }

    /// Returns true when the case deployed, verified cleanly, and was destroyed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.deploy_error.is_none()
            && self.drift_error.is_none()
            && self.failures.is_empty()
            && self.destroy_error.is_none()
    }

    /// Returns `pass` or `fail`.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.passed() { "pass" } else { "fail" }
    }

    /// Returns human-readable notes describing the outcome.
    #[must_use]
    pub fn notes(&self) -> Vec<String> {
        let phases: Vec<String> = self.phases.iter().map(ToString::to_string).collect();
        let mut notes = vec![
            format!("case {}", self.case),
            format!("phases: {}", phases.join(" -> ")),
            format!("checks passed: {}", self.checks_passed),
        ];
        if let Some(err) = &self.deploy_error {
            notes.push(format!("deploy error: {err}"));
        }
        if let Some(err) = &self.drift_error {
            notes.push(format!("drift check error: {err}"));
        }
        notes.extend(self.failures.iter().map(|failure| format!("check failed: {failure}")));
        if let Some(err) = &self.destroy_error {
            notes.push(format!("destroy error: {err}"));
        }
        notes
    }

    /// Converts the report into an error when any part of the case failed.
    ///
    /// Deploy errors take precedence, then drift errors, check failures, and
    /// destroy errors.
    ///
    /// # Errors
    ///
    /// Returns the highest-precedence [`CaseError`].
    pub fn into_result(mut self) -> Result<Self, CaseError> {
        let case = self.case.clone();
        if let Some(source) = self.deploy_error.take() {
            return Err(CaseError::Deploy {
                case,
                source,
            });
        }
        if let Some(source) = self.drift_error.take() {
            return Err(CaseError::Drift {
                case,
                source,
            });
        }
        if !self.failures.is_empty() {
            let failures = std::mem::take(&mut self.failures);
            let summary =
                failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n");
            return Err(CaseError::Checks {
                case,
                count: failures.len(),
                summary,
                failures,
            });
        }
        if let Some(source) = self.destroy_error.take() {
            return Err(CaseError::Destroy {
                case,
                source,
            });
        }
        Ok(self)
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Deploys `case`, runs `verify` against the live deployment, and destroys it.
///
/// When `case.drift_check` is set the deployment is re-planned after
/// verification and pending changes are recorded as a failed check.
pub async fn run_case<'a, D, F>(driver: &'a D, case: &'a ComponentCase, verify: F) -> CaseReport
where
    D: DeploymentDriver + ?Sized,
    F: AsyncFnOnce(&Deployment<'a, D>) -> Checks,
{
    let mut report = CaseReport::new(case);
    report.enter(CasePhase::Deploy);
    let deployment = match Deployment::acquire(driver, case) {
        Ok(deployment) => deployment,
        Err(failure) => {
            error!(case = %report.case, error = %failure.error, "deploy failed");
            report.deploy_error = Some(failure.error);
            report.enter(CasePhase::Destroy);
            report.destroy_error = failure.cleanup.err();
            report.enter(CasePhase::Done);
            return report;
        }
    };

    report.enter(CasePhase::Verify);
    let mut checks = verify(&deployment).await;
    if case.drift_check {
        match deployment.plan() {
            Ok(outcome) => {
                checks.equal(&report.case, "plan", &PlanOutcome::NoChanges, &outcome);
            }
            Err(err) => {
                error!(case = %report.case, error = %err, "drift plan failed");
                report.drift_error = Some(err);
            }
        }
    }
    report.checks_passed = checks.passed();
    for failure in checks.failures() {
        warn!(case = %report.case, failure = %failure, "check failed");
    }
    report.failures = checks.into_failures();

    report.enter(CasePhase::Destroy);
    if let Err(err) = deployment.release() {
        error!(case = %report.case, error = %err, "destroy failed");
        report.destroy_error = Some(err);
    }
    report.enter(CasePhase::Done);
    report
}
