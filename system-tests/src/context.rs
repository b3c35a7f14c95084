// system-tests/src/context.rs
// ============================================================================
// Module: Suite Context
// Description: Per-case handles for the driver, registry reader, and address.
// Purpose: Pass shared account and region state explicitly instead of globally.
// Dependencies: crate::{atmos, config, driver, registry}, ecr-verify-core
// ============================================================================

//! ## Overview
//! A [`SuiteContext`] bundles the deployment driver, registry reader, and the
//! registry address resolved from the caller's account and the configured
//! region. Each test builds its own context.

use ecr_verify_core::RegistryAddress;

use crate::atmos::AtmosDriver;
use crate::config::SystemTestConfig;
use crate::driver::DeploymentDriver;
use crate::registry::EcrRegistryReader;
use crate::registry::RegistryError;
use crate::registry::RegistryReader;

/// Handles a case needs to deploy and verify a component.
#[derive(Debug)]
pub struct SuiteContext<D, R> {
    /// Deployment driver.
    driver: D,
    /// Registry reader.
    reader: R,
    /// Registry coordinates of the active account.
    address: RegistryAddress,
}

impl<D: DeploymentDriver, R: RegistryReader> SuiteContext<D, R> {
    /// Resolves the account id through `reader` and builds the context.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the account id cannot be resolved.
    pub async fn new(driver: D, reader: R, region: &str) -> Result<Self, RegistryError> {
        let account_id = reader.account_id().await?;
        Ok(Self {
            driver,
            reader,
            address: RegistryAddress::new(account_id, region),
        })
    }

    /// Returns the deployment driver.
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns the registry reader.
    pub const fn reader(&self) -> &R {
        &self.reader
    }

    /// Returns the registry address.
    pub const fn address(&self) -> &RegistryAddress {
        &self.address
    }
}

impl SuiteContext<AtmosDriver, EcrRegistryReader> {
    /// Builds a live context from system-test configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the driver cannot be prepared or the account id
    /// cannot be resolved.
    pub async fn live(config: &SystemTestConfig) -> Result<Self, String> {
        let driver = AtmosDriver::from_config(config).map_err(|err| err.to_string())?;
        let reader = EcrRegistryReader::from_config(config).await;
        Self::new(driver, reader, &config.region).await.map_err(|err| err.to_string())
    }
}
