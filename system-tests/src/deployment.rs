// system-tests/src/deployment.rs
// ============================================================================
// Module: Scoped Deployment
// Description: Guard that owns a deployed component until it is destroyed.
// Purpose: Guarantee exactly one destroy on every exit path.
// Dependencies: crate::driver, tracing
// ============================================================================

//! ## Overview
//! [`Deployment::acquire`] deploys a case and returns a guard. The guard
//! destroys the case exactly once: explicitly through [`Deployment::release`]
//! or implicitly on drop, which also covers early returns and panics during
//! verification. A failed deploy is cleaned up before the error is returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::error;
use tracing::warn;

use crate::driver::ComponentCase;
use crate::driver::DeploymentDriver;
use crate::driver::DeploymentOutputs;
use crate::driver::DriverError;
use crate::driver::PlanOutcome;

// ============================================================================
// SECTION: Deploy Failure
// ============================================================================

/// A deploy that failed, together with the outcome of its cleanup.
#[derive(Debug)]
pub struct DeployFailure {
    /// Error returned by the deploy.
    pub error: DriverError,
    /// Outcome of the destroy attempted after the failed deploy.
    pub cleanup: Result<(), DriverError>,
}

// ============================================================================
// SECTION: Deployment Guard
// ============================================================================

/// Live deployment of a component case.
pub struct Deployment<'a, D: DeploymentDriver + ?Sized> {
    /// Driver that created the deployment.
    driver: &'a D,
    /// Deployed case.
    case: &'a ComponentCase,
    /// Outputs read after the deploy.
    outputs: DeploymentOutputs,
    /// Set once destroy has been attempted.
    released: bool,
}

impl<'a, D: DeploymentDriver + ?Sized> Deployment<'a, D> {
    /// Deploys `case` and returns the guard.
    ///
    /// # Errors
    ///
    /// Returns [`DeployFailure`] when the deploy fails; the partial deployment
    /// has already been destroyed (or the destroy error is reported).
    pub fn acquire(driver: &'a D, case: &'a ComponentCase) -> Result<Self, DeployFailure> {
        match driver.deploy(case) {
            Ok(outputs) => Ok(Self {
                driver,
                case,
                outputs,
                released: false,
            }),
            Err(error) => {
                warn!(case = %case, error = %error, "deploy failed; destroying partial deployment");
                let cleanup = driver.destroy(case);
                Err(DeployFailure {
                    error,
                    cleanup,
                })
            }
        }
    }

    /// Returns the deployed case.
    #[must_use]
    pub const fn case(&self) -> &ComponentCase {
        self.case
    }

    /// Returns the outputs read after the deploy.
    #[must_use]
    pub const fn outputs(&self) -> &DeploymentOutputs {
        &self.outputs
    }

    /// Re-plans the deployment.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when planning fails.
    pub fn plan(&self) -> Result<PlanOutcome, DriverError> {
        self.driver.plan(self.case)
    }

    /// Counts the resources the deployment manages.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when state cannot be listed.
    pub fn resource_count(&self) -> Result<usize, DriverError> {
        self.driver.resource_count(self.case)
    }

    /// Destroys the deployment and consumes the guard.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the destroy fails.
    pub fn release(mut self) -> Result<(), DriverError> {
        self.released = true;
        self.driver.destroy(self.case)
    }
}

impl<D: DeploymentDriver + ?Sized> Drop for Deployment<'_, D> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let panicking = std::thread::panicking();
        warn!(case = %self.case, panicking, "deployment dropped without release; destroying");
        if let Err(err) = self.driver.destroy(self.case) {
            error!(case = %self.case, error = %err, "destroy on drop failed");
        }
    }
}
