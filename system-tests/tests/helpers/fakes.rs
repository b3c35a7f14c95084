// system-tests/tests/helpers/fakes.rs
// ============================================================================
// Module: In-Memory Doubles
// Description: Scripted deployment driver and registry reader.
// Purpose: Exercise case orchestration and verification without AWS.
// Dependencies: system-tests, ecr-verify-core, async-trait, serde_json
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use ecr_verify_core::EncryptionType;
use ecr_verify_core::LifecyclePolicy;
use ecr_verify_core::RegistryAddress;
use ecr_verify_core::RepositoryState;
use ecr_verify_core::TagMutability;
use serde_json::Value;
use serde_json::json;
use system_tests::driver::ComponentCase;
use system_tests::driver::DeploymentDriver;
use system_tests::driver::DeploymentOutputs;
use system_tests::driver::DriverError;
use system_tests::driver::PlanOutcome;
use system_tests::registry::RegistryError;
use system_tests::registry::RegistryReader;
use system_tests::verify::REPO_ARN_MAP_OUTPUT;
use system_tests::verify::REPO_URL_MAP_OUTPUT;
use system_tests::verify::REPOSITORY_HOST_OUTPUT;

/// Account id used by every offline suite.
pub const ACCOUNT_ID: &str = "123456789012";
/// Region used by every offline suite.
pub const REGION: &str = "us-east-2";

/// Registry address for the offline account.
pub fn address() -> RegistryAddress {
    RegistryAddress::new(ACCOUNT_ID, REGION)
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Driver operation recorded by [`FakeDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    /// `deploy`.
    Deploy,
    /// `plan`.
    Plan,
    /// `resource_count`.
    ResourceCount,
    /// `destroy`.
    Destroy,
}

/// Scripted deployment driver that records every call.
#[derive(Debug, Default)]
pub struct FakeDriver {
    outputs: DeploymentOutputs,
    fail_deploy: bool,
    fail_plan: bool,
    fail_destroy: bool,
    plan_outcome: Option<PlanOutcome>,
    resources: usize,
    calls: Mutex<Vec<DriverCall>>,
}

impl FakeDriver {
    /// Driver whose deploy returns `outputs`.
    pub fn with_outputs(outputs: DeploymentOutputs) -> Self {
        Self {
            outputs,
            ..Self::default()
        }
    }

    /// Makes deploy fail.
    pub fn failing_deploy(mut self) -> Self {
        self.fail_deploy = true;
        self
    }

    /// Makes plan fail.
    pub fn failing_plan(mut self) -> Self {
        self.fail_plan = true;
        self
    }

    /// Makes destroy fail.
    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    /// Makes plan report pending changes.
    pub fn drifting(mut self) -> Self {
        self.plan_outcome = Some(PlanOutcome::Changes);
        self
    }

    /// Sets the managed resource count.
    pub fn with_resources(mut self, resources: usize) -> Self {
        self.resources = resources;
        self
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns how many times destroy ran.
    pub fn destroy_count(&self) -> usize {
        self.calls().iter().filter(|call| **call == DriverCall::Destroy).count()
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    fn failure(case: &ComponentCase, sub: &str) -> DriverError {
        DriverError::CommandFailed {
            command: format!("atmos terraform {sub} {} -s {}", case.component, case.stack),
            status: "exit status: 1".to_string(),
            stderr: format!("scripted {sub} failure"),
        }
    }
}

impl DeploymentDriver for FakeDriver {
    fn deploy(&self, case: &ComponentCase) -> Result<DeploymentOutputs, DriverError> {
        self.record(DriverCall::Deploy);
        if self.fail_deploy {
            return Err(Self::failure(case, "deploy"));
        }
        Ok(self.outputs.clone())
    }

    fn plan(&self, case: &ComponentCase) -> Result<PlanOutcome, DriverError> {
        self.record(DriverCall::Plan);
        if self.fail_plan {
            return Err(Self::failure(case, "plan"));
        }
        Ok(self.plan_outcome.unwrap_or(PlanOutcome::NoChanges))
    }

    fn resource_count(&self, _case: &ComponentCase) -> Result<usize, DriverError> {
        self.record(DriverCall::ResourceCount);
        Ok(self.resources)
    }

    fn destroy(&self, case: &ComponentCase) -> Result<(), DriverError> {
        self.record(DriverCall::Destroy);
        if self.fail_destroy {
            return Err(Self::failure(case, "destroy"));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// In-memory registry keyed by repository name.
#[derive(Debug, Default)]
pub struct FakeRegistry {
    repositories: HashMap<String, RepositoryState>,
    policies: HashMap<String, String>,
}

impl FakeRegistry {
    /// Registry holding hardened repositories that all carry `policy`.
    pub fn hardened(names: &[String], policy: &LifecyclePolicy) -> Result<Self, String> {
        let address = address();
        let text = policy.to_json().map_err(|err| err.to_string())?;
        let mut registry = Self::default();
        for name in names {
            registry.repositories.insert(
                name.clone(),
                RepositoryState {
                    name: name.clone(),
                    arn: address.repository_arn(name),
                    uri: address.repository_url(name),
                    tag_mutability: TagMutability::Immutable,
                    scan_on_push: true,
                    encryption_type: EncryptionType::Aes256,
                    kms_key: None,
                },
            );
            registry.policies.insert(name.clone(), text.clone());
        }
        Ok(registry)
    }

    /// Returns a mutable repository for tampering.
    pub fn repository_mut(&mut self, name: &str) -> Option<&mut RepositoryState> {
        self.repositories.get_mut(name)
    }

    /// Replaces the raw policy text of a repository.
    pub fn set_policy_text(&mut self, name: &str, text: impl Into<String>) {
        self.policies.insert(name.to_string(), text.into());
    }

    /// Removes a repository and its policy.
    pub fn remove(&mut self, name: &str) {
        self.repositories.remove(name);
        self.policies.remove(name);
    }
}

#[async_trait]
impl RegistryReader for FakeRegistry {
    async fn account_id(&self) -> Result<String, RegistryError> {
        Ok(ACCOUNT_ID.to_string())
    }

    async fn repository(&self, name: &str) -> Result<RepositoryState, RegistryError> {
        self.repositories.get(name).cloned().ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    async fn lifecycle_policy_text(&self, name: &str) -> Result<String, RegistryError> {
        self.policies.get(name).cloned().ok_or_else(|| RegistryError::Request {
            operation: "GetLifecyclePolicy",
            message: format!("LifecyclePolicyNotFoundException: {name}"),
        })
    }
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Outputs a correct basic deploy exposes for `names`.
pub fn basic_outputs(names: &[String]) -> DeploymentOutputs {
    outputs_with_urls(names, names)
}

/// Outputs listing ARNs for `names` but URLs only for `url_names`.
pub fn outputs_with_urls(names: &[String], url_names: &[String]) -> DeploymentOutputs {
    let address = address();
    let arns: BTreeMap<String, String> =
        names.iter().map(|name| (name.clone(), address.repository_arn(name))).collect();
    let urls: BTreeMap<String, String> =
        url_names.iter().map(|name| (name.clone(), address.repository_url(name))).collect();
    let mut values = BTreeMap::new();
    values.insert(REPOSITORY_HOST_OUTPUT.to_string(), Value::String(address.host()));
    values.insert(REPO_ARN_MAP_OUTPUT.to_string(), json!(arns));
    values.insert(REPO_URL_MAP_OUTPUT.to_string(), json!(urls));
    DeploymentOutputs::new(values)
}
