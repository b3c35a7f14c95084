// system-tests/src/verify.rs
// ============================================================================
// Module: Registry Verification
// Description: Checks run against a deployed registry component.
// Purpose: Assert outputs, repository attributes, and lifecycle policies.
// Dependencies: crate::{deployment, driver, registry}, ecr-verify-core, tracing
// ============================================================================

//! ## Overview
//! Verification functions record into a [`Checks`] collector and never abort
//! on the first mismatch. Registry read failures and undecodable policies are
//! recorded as failed checks for the affected repository, so the remaining
//! repositories are still verified.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use ecr_verify_core::Checks;
use ecr_verify_core::ExpectedRepository;
use ecr_verify_core::LifecyclePolicy;
use ecr_verify_core::PolicyComparison;
use ecr_verify_core::RegistryAddress;
use ecr_verify_core::compare_policies;
use tracing::info;

use crate::deployment::Deployment;
use crate::driver::DeploymentDriver;
use crate::driver::DeploymentOutputs;
use crate::registry::RegistryReader;

// ============================================================================
// SECTION: Output Names
// ============================================================================

/// Registry host output.
pub const REPOSITORY_HOST_OUTPUT: &str = "repository_host";
/// CI user name output.
pub const USER_NAME_OUTPUT: &str = "ecr_user_name";
/// CI user ARN output.
pub const USER_ARN_OUTPUT: &str = "ecr_user_arn";
/// CI user unique id output.
pub const USER_UNIQUE_ID_OUTPUT: &str = "ecr_user_unique_id";
/// Repository name → ARN output.
pub const REPO_ARN_MAP_OUTPUT: &str = "ecr_repo_arn_map";
/// Repository name → URL output.
pub const REPO_URL_MAP_OUTPUT: &str = "ecr_repo_url_map";

/// Subject used for component-level output checks.
const OUTPUTS_SUBJECT: &str = "outputs";
/// Rendered value of a missing entry.
const ABSENT: &str = "<absent>";

// ============================================================================
// SECTION: Output Checks
// ============================================================================

/// Checks the registry host and that no CI user was created.
pub fn check_registry_outputs(
    address: &RegistryAddress,
    outputs: &DeploymentOutputs,
    checks: &mut Checks,
) {
    match outputs.string(REPOSITORY_HOST_OUTPUT) {
        Ok(host) => {
            checks.equal(OUTPUTS_SUBJECT, REPOSITORY_HOST_OUTPUT, address.host().as_str(), host.as_str());
        }
        Err(err) => {
            checks.fail(OUTPUTS_SUBJECT, REPOSITORY_HOST_OUTPUT, address.host(), err.to_string());
        }
    }
    for name in [USER_NAME_OUTPUT, USER_ARN_OUTPUT, USER_UNIQUE_ID_OUTPUT] {
        match outputs.string_or_empty(name) {
            Ok(value) => {
                checks.is_empty(OUTPUTS_SUBJECT, name, &value);
            }
            Err(err) => checks.fail(OUTPUTS_SUBJECT, name, "<empty>", err.to_string()),
        }
    }
}

/// Decodes a name → value map output, recording a failure when it is unusable.
fn repository_map(
    outputs: &DeploymentOutputs,
    name: &str,
    checks: &mut Checks,
) -> Option<BTreeMap<String, String>> {
    match outputs.decode::<BTreeMap<String, String>>(name) {
        Ok(map) => Some(map),
        Err(err) => {
            checks.fail(OUTPUTS_SUBJECT, name, "map of repository name to string", err.to_string());
            None
        }
    }
}

// ============================================================================
// SECTION: Repository Checks
// ============================================================================

/// Live lifecycle policy together with its comparison to the expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePolicy {
    /// Decoded live policy.
    pub actual: LifecyclePolicy,
    /// Differences against the expected policy.
    pub comparison: PolicyComparison,
}

impl LivePolicy {
    /// Returns true when the live policy differs from the expectation.
    #[must_use]
    pub fn drifted(&self) -> bool {
        !self.comparison.is_equal()
    }
}

/// Outcome of verifying one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryVerdict {
    /// Repository name.
    pub name: String,
    /// Live policy, when it could be read and decoded.
    pub policy: Option<LivePolicy>,
}

/// Verifies the repositories a case requested against the deployment.
///
/// Every name in `expected_names` must appear in the ARN map output, and the
/// map must not list repositories the case did not request. Each listed
/// repository is then checked: live attributes against the hardened
/// expectation (ARN and URL from the outputs, a missing URL entry compared
/// as empty), provider-reported ARN and URL against the derived address, and
/// the lifecycle policy against `expected_policy`. Returns one verdict per
/// repository that could be described.
pub async fn check_repositories<R: RegistryReader + ?Sized>(
    reader: &R,
    address: &RegistryAddress,
    outputs: &DeploymentOutputs,
    expected_names: &[String],
    expected_policy: &LifecyclePolicy,
    checks: &mut Checks,
) -> Vec<RepositoryVerdict> {
    let Some(arns) = repository_map(outputs, REPO_ARN_MAP_OUTPUT, checks) else {
        return Vec::new();
    };
    let urls = repository_map(outputs, REPO_URL_MAP_OUTPUT, checks).unwrap_or_default();

    for name in expected_names {
        let deployed = if arns.contains_key(name) { "present" } else { ABSENT };
        checks.equal(name, "deployed", "present", deployed);
    }
    for name in arns.keys().filter(|name| !expected_names.contains(name)) {
        checks.fail(name, "deployed", "<not requested>", "present");
    }

    let mut verified = Vec::with_capacity(arns.len());
    for (name, arn) in &arns {
        info!(repository = %name, "verifying repository");
        let url = urls.get(name).map_or("", String::as_str);
        let state = match reader.repository(name).await {
            Ok(state) => state,
            Err(err) => {
                checks.fail(name, "describeRepository", "readable repository", err.to_string());
                continue;
            }
        };
        ExpectedRepository::hardened(name.as_str(), arn.as_str(), url).check(&state, checks);
        checks.equal(name, "derivedArn", address.repository_arn(name).as_str(), state.arn.as_str());
        checks.equal(name, "derivedUri", address.repository_url(name).as_str(), state.uri.as_str());
        let policy = check_lifecycle_policy(reader, name, expected_policy, checks).await;
        verified.push(RepositoryVerdict {
            name: name.clone(),
            policy,
        });
    }
    verified
}

/// Fetches, decodes, and compares one repository's lifecycle policy.
///
/// Structural violations of the live policy are recorded as failed
/// `lifecyclePolicyValid` checks alongside the comparison. Returns the live
/// policy when it could be read and decoded.
pub async fn check_lifecycle_policy<R: RegistryReader + ?Sized>(
    reader: &R,
    name: &str,
    expected: &LifecyclePolicy,
    checks: &mut Checks,
) -> Option<LivePolicy> {
    let text = match reader.lifecycle_policy_text(name).await {
        Ok(text) => text,
        Err(err) => {
            checks.fail(name, "lifecyclePolicy", "readable policy", err.to_string());
            return None;
        }
    };
    let actual = match LifecyclePolicy::from_json(&text) {
        Ok(policy) => policy,
        Err(err) => {
            checks.fail(name, "lifecyclePolicy", "well-formed policy document", err.to_string());
            return None;
        }
    };
    for violation in actual.validate() {
        checks.fail(name, "lifecyclePolicyValid", "no violations", violation.to_string());
    }
    let comparison = compare_policies(expected, &actual);
    checks.policy(name, &comparison);
    Some(LivePolicy {
        actual,
        comparison,
    })
}

// ============================================================================
// SECTION: Enabled Flag
// ============================================================================

/// Checks that a disabled component exposes no outputs and manages nothing.
pub fn check_disabled<D: DeploymentDriver + ?Sized>(deployment: &Deployment<'_, D>) -> Checks {
    let mut checks = Checks::new();
    let subject = deployment.case().to_string();
    let outputs = deployment.outputs();
    let names: Vec<&str> = outputs.names().collect();
    checks.equal(&subject, "outputCount", &0, &outputs.len());
    if !names.is_empty() {
        checks.fail(&subject, "outputNames", "<none>", names.join(", "));
    }
    match deployment.resource_count() {
        Ok(count) => {
            checks.equal(&subject, "resourceCount", &0, &count);
        }
        Err(err) => checks.fail(&subject, "resourceCount", "0", err.to_string()),
    }
    checks
}
