// system-tests/tests/suites/verification.rs
// ============================================================================
// Module: Verification Tests
// Description: Output, repository, and lifecycle policy checks offline.
// Purpose: Confirm each divergence is reported without hiding the others.
// Dependencies: system-tests helpers
// ============================================================================

use std::collections::BTreeMap;

use ecr_verify_core::CheckFailure;
use ecr_verify_core::Checks;
use ecr_verify_core::LifecyclePolicy;
use ecr_verify_core::TagMutability;
use helpers::fakes::FakeDriver;
use helpers::fakes::FakeRegistry;
use helpers::fakes::address;
use helpers::fakes::basic_outputs;
use helpers::fakes::outputs_with_urls;
use serde_json::Value;
use system_tests::case::run_case;
use system_tests::fixtures::basic_case;
use system_tests::fixtures::basic_image_names;
use system_tests::fixtures::basic_lifecycle_policy;
use system_tests::verify::USER_NAME_OUTPUT;
use system_tests::verify::check_lifecycle_policy;
use system_tests::verify::check_registry_outputs;
use system_tests::verify::check_repositories;

use crate::helpers;

const SUFFIX: &str = "t3st01";

fn names() -> Vec<String> {
    basic_image_names(SUFFIX)
}

fn failure_for<'a>(
    failures: &'a [CheckFailure],
    subject: &str,
    attribute: &str,
) -> Option<&'a CheckFailure> {
    failures.iter().find(|failure| failure.subject == subject && failure.attribute == attribute)
}

#[tokio::test(flavor = "multi_thread")]
async fn hardened_basic_deploy_passes_every_check() -> Result<(), Box<dyn std::error::Error>> {
    let names = names();
    let policy = basic_lifecycle_policy();
    let registry = FakeRegistry::hardened(&names, &policy)?;
    let driver = FakeDriver::with_outputs(basic_outputs(&names));
    let case = basic_case("default-test", SUFFIX);
    let address = address();

    let mut verified = Vec::new();
    let report = run_case(&driver, &case, async |deployment| {
        let mut checks = Checks::new();
        check_registry_outputs(&address, deployment.outputs(), &mut checks);
        verified =
            check_repositories(
                &registry,
                &address,
                deployment.outputs(),
                &names,
                &policy,
                &mut checks,
            )
            .await;
        checks
    })
    .await;

    let verified_names: Vec<&String> = verified.iter().map(|verdict| &verdict.name).collect();
    if verified_names != names.iter().collect::<Vec<_>>() {
        return Err(format!("verified {verified_names:?}, expected {names:?}").into());
    }
    if verified.iter().any(|verdict| verdict.policy.as_ref().is_none_or(|live| live.drifted())) {
        return Err("every repository should carry the expected policy".into());
    }
    if !report.passed() {
        return Err(report.notes().join("\n").into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn each_repository_attribute_fails_independently() -> Result<(), Box<dyn std::error::Error>> {
    let names = names();
    let policy = basic_lifecycle_policy();
    let mut registry = FakeRegistry::hardened(&names, &policy)?;
    let target = names[1].clone();
    let state = registry.repository_mut(&target).ok_or("missing fixture repository")?;
    state.tag_mutability = TagMutability::Mutable;
    state.scan_on_push = false;

    let mut checks = Checks::new();
    let outputs = basic_outputs(&names);
    check_repositories(&registry, &address(), &outputs, &names, &policy, &mut checks).await;
    let failures = checks.failures();

    if failures.len() != 2 {
        return Err(format!("expected 2 failures, got {failures:?}").into());
    }
    let mutability = failure_for(failures, &target, "imageTagMutability")
        .ok_or("missing imageTagMutability failure")?;
    if mutability.expected != "IMMUTABLE" || mutability.actual != "MUTABLE" {
        return Err(format!("unexpected failure: {mutability}").into());
    }
    if failure_for(failures, &target, "scanOnPush").is_none() {
        return Err("missing scanOnPush failure".into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn policy_drift_names_the_changed_field() -> Result<(), Box<dyn std::error::Error>> {
    let names = names();
    let policy = basic_lifecycle_policy();
    let mut registry = FakeRegistry::hardened(&names, &policy)?;
    let mut drifted = basic_lifecycle_policy();
    drifted.rules[2].selection.count_number = 400;
    registry.set_policy_text(&names[0], drifted.to_json()?);

    let mut checks = Checks::new();
    let live = check_lifecycle_policy(&registry, &names[0], &policy, &mut checks)
        .await
        .ok_or("policy should decode")?;

    if live.actual != drifted {
        return Err("live policy should be returned as decoded".into());
    }
    let difference = live.comparison.first().ok_or("expected a difference")?;
    if difference.path != "rules[2].selection.countNumber" {
        return Err(format!("unexpected path: {difference}").into());
    }
    let failure = failure_for(
        checks.failures(),
        &names[0],
        "lifecyclePolicy.rules[2].selection.countNumber",
    )
    .ok_or("missing policy failure")?;
    if failure.expected != "500" || failure.actual != "400" {
        return Err(format!("unexpected failure: {failure}").into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn undecodable_policy_is_a_failed_check() -> Result<(), Box<dyn std::error::Error>> {
    let names = names();
    let policy = basic_lifecycle_policy();
    let mut registry = FakeRegistry::hardened(&names, &policy)?;
    registry.set_policy_text(&names[3], "{\"rules\": [ {\"rulePriority\": \"one\"} ]}");

    let mut checks = Checks::new();
    let outputs = basic_outputs(&names);
    let verified =
        check_repositories(&registry, &address(), &outputs, &names, &policy, &mut checks).await;

    if verified.len() != names.len() || verified[3].policy.is_some() {
        return Err("a bad policy must not stop the other repositories".into());
    }
    let [failure] = checks.failures() else {
        return Err(format!("expected one failure, got {:?}", checks.failures()).into());
    };
    if failure.subject != names[3] || failure.attribute != "lifecyclePolicy" {
        return Err(format!("unexpected failure: {failure}").into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_repository_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let names = names();
    let policy = basic_lifecycle_policy();
    let mut registry = FakeRegistry::hardened(&names, &policy)?;
    registry.remove(&names[0]);

    let mut checks = Checks::new();
    let outputs = basic_outputs(&names);
    let verified =
        check_repositories(&registry, &address(), &outputs, &names, &policy, &mut checks).await;

    let skipped = verified.iter().any(|verdict| verdict.name == names[0]);
    if verified.len() != names.len() - 1 || skipped {
        return Err(format!("unexpected verified set: {verified:?}").into());
    }
    if failure_for(checks.failures(), &names[0], "describeRepository").is_none() {
        return Err("missing describeRepository failure".into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_policy_differs_from_expected_rules() -> Result<(), Box<dyn std::error::Error>> {
    let names = names();
    let policy = basic_lifecycle_policy();
    let mut registry = FakeRegistry::hardened(&names, &policy)?;
    registry.set_policy_text(&names[2], LifecyclePolicy::default().to_json()?);

    let mut checks = Checks::new();
    let live = check_lifecycle_policy(&registry, &names[2], &policy, &mut checks)
        .await
        .ok_or("empty policy should decode")?;
    if live.comparison.differences().len() != 3 || checks.failures().len() != 3 {
        return Err(format!("expected 3 missing rules, got {}", live.comparison).into());
    }
    Ok(())
}

#[test]
fn registry_outputs_require_host_and_no_ci_user() -> Result<(), Box<dyn std::error::Error>> {
    let address = address();
    let mut values = BTreeMap::new();
    values.insert("repository_host".to_string(), Value::String("wrong.example.com".to_string()));
    values.insert(USER_NAME_OUTPUT.to_string(), Value::String("ci-user".to_string()));
    let outputs = system_tests::driver::DeploymentOutputs::new(values);

    let mut checks = Checks::new();
    check_registry_outputs(&address, &outputs, &mut checks);
    let failures = checks.failures();

    let host = failure_for(failures, "outputs", "repository_host").ok_or("missing host failure")?;
    if host.expected != "123456789012.dkr.ecr.us-east-2.amazonaws.com" {
        return Err(format!("unexpected host expectation: {host}").into());
    }
    if failure_for(failures, "outputs", USER_NAME_OUTPUT).is_none() {
        return Err("ci user name should be flagged".into());
    }
    if failures.len() != 2 || checks.passed() != 2 {
        return Err(format!("unexpected failures: {failures:?}").into());
    }
    Ok(())
}

#[test]
fn terraform_output_document_unwraps_values() -> Result<(), Box<dyn std::error::Error>> {
    let text = r#"{
        "repository_host": {"sensitive": false, "type": "string", "value": "h"},
        "ecr_user_arn": {"sensitive": false, "type": "string", "value": null},
        "ecr_repo_arn_map": {"sensitive": false, "type": ["map", "string"], "value": {"a": "arn:a"}}
    }"#;
    let outputs = system_tests::driver::DeploymentOutputs::from_terraform_json(text)?;

    if outputs.string("repository_host")? != "h" {
        return Err("host not unwrapped".into());
    }
    if outputs.len() != 2 || !outputs.string_or_empty("ecr_user_arn")?.is_empty() {
        return Err("null outputs should be dropped and read as empty".into());
    }
    let map: BTreeMap<String, String> = outputs.decode("ecr_repo_arn_map")?;
    if map.get("a").map(String::as_str) != Some("arn:a") {
        return Err(format!("unexpected map: {map:?}").into());
    }
    if outputs.string("ecr_repo_arn_map").is_ok() {
        return Err("map output must not read as a string".into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_deploy_reports_each_missing_repository() -> Result<(), Box<dyn std::error::Error>>
{
    let names = names();
    let policy = basic_lifecycle_policy();
    let registry = FakeRegistry::hardened(&names[.. 1], &policy)?;
    let driver = FakeDriver::with_outputs(basic_outputs(&names[.. 1]));
    let case = basic_case("default-test", SUFFIX);
    let address = address();

    let report = run_case(&driver, &case, async |deployment| {
        let mut checks = Checks::new();
        check_repositories(&registry, &address, deployment.outputs(), &names, &policy, &mut checks)
            .await;
        checks
    })
    .await;

    if report.passed() {
        return Err("a deploy missing requested repositories must fail".into());
    }
    let failures = &report.failures;
    for name in &names[1 ..] {
        let failure = failure_for(failures, name, "deployed").ok_or("missing deployed failure")?;
        if failure.expected != "present" || failure.actual != "<absent>" {
            return Err(format!("unexpected failure: {failure}").into());
        }
    }
    if failures.len() != names.len() - 1 {
        return Err(format!("unexpected failures: {failures:?}").into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unrequested_repository_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let names = names();
    let mut deployed = names.clone();
    deployed.push(format!("stray-{SUFFIX}"));
    let policy = basic_lifecycle_policy();
    let registry = FakeRegistry::hardened(&deployed, &policy)?;
    let outputs = basic_outputs(&deployed);

    let mut checks = Checks::new();
    let verified =
        check_repositories(&registry, &address(), &outputs, &names, &policy, &mut checks).await;

    let [failure] = checks.failures() else {
        return Err(format!("expected one failure, got {:?}", checks.failures()).into());
    };
    if failure.subject != deployed[names.len()]
        || failure.attribute != "deployed"
        || failure.expected != "<not requested>"
    {
        return Err(format!("unexpected failure: {failure}").into());
    }
    if verified.len() != deployed.len() {
        return Err("unrequested repositories are still verified".into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_url_entry_keeps_checking_the_repository() -> Result<(), Box<dyn std::error::Error>>
{
    let names = names();
    let policy = basic_lifecycle_policy();
    let mut registry = FakeRegistry::hardened(&names, &policy)?;
    let target = names[0].clone();
    let state = registry.repository_mut(&target).ok_or("missing fixture repository")?;
    state.tag_mutability = TagMutability::Mutable;
    registry.set_policy_text(&target, LifecyclePolicy::default().to_json()?);
    let outputs = outputs_with_urls(&names, &names[1 ..]);

    let mut checks = Checks::new();
    let verified =
        check_repositories(&registry, &address(), &outputs, &names, &policy, &mut checks).await;
    let failures = checks.failures();

    let uri =
        failure_for(failures, &target, "repositoryUri").ok_or("missing repositoryUri failure")?;
    if !uri.expected.is_empty() {
        return Err(format!("a missing URL entry compares as empty: {uri}").into());
    }
    if failure_for(failures, &target, "imageTagMutability").is_none() {
        return Err("imageTagMutability must still be checked".into());
    }
    let policy_failures = failures
        .iter()
        .filter(|failure| {
            failure.subject == target && failure.attribute.starts_with("lifecyclePolicy.rules[")
        })
        .count();
    if policy_failures != 3 {
        return Err(format!("lifecycle policy must still be compared: {failures:?}").into());
    }
    if verified.len() != names.len() {
        return Err("every repository should be verified".into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn structurally_invalid_live_policy_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let names = names();
    let policy = basic_lifecycle_policy();
    let mut registry = FakeRegistry::hardened(&names, &policy)?;
    let mut invalid = basic_lifecycle_policy();
    invalid.rules[0].selection.tag_prefix_list = None;
    registry.set_policy_text(&names[0], invalid.to_json()?);

    let mut checks = Checks::new();
    check_lifecycle_policy(&registry, &names[0], &policy, &mut checks)
        .await
        .ok_or("policy should decode")?;
    let failures = checks.failures();

    let violation =
        failure_for(failures, &names[0], "lifecyclePolicyValid").ok_or("missing validity failure")?;
    if !violation.actual.contains("without a prefix or pattern list") {
        return Err(format!("unexpected violation: {violation}").into());
    }
    if failure_for(failures, &names[0], "lifecyclePolicy.rules[0].selection.tagPrefixList").is_none()
    {
        return Err("comparison must still run alongside validation".into());
    }
    Ok(())
}
