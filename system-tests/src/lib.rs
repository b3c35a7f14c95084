// system-tests/src/lib.rs
// ============================================================================
// Module: ECR Verify System Tests Library
// Description: Harness for deploying and verifying the registry component.
// Purpose: Provide the driver, registry reader, and case runner for suites.
// Dependencies: ecr-verify-core, aws-sdk-ecr, aws-sdk-sts, tokio, tracing
// ============================================================================

//! ## Overview
//! This crate hosts the harness used by the registry component suites in
//! `system-tests/tests`. A case deploys a component through a
//! [`driver::DeploymentDriver`], verifies live state through a
//! [`registry::RegistryReader`], and always destroys what it deployed.
//! Live suites require the `system-tests` feature and real AWS credentials.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifacts;
pub mod atmos;
pub mod case;
pub mod config;
pub mod context;
pub mod deployment;
pub mod driver;
pub mod fixtures;
pub mod logging;
pub mod registry;
pub mod verify;
