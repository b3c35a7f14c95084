// system-tests/src/fixtures.rs
// ============================================================================
// Module: Registry Fixtures
// Description: Component identifiers, inputs, and expected retention policy.
// Purpose: Share the declared state of the registry component across suites.
// Dependencies: ecr-verify-core, rand
// ============================================================================

//! ## Overview
//! Fixtures describe what the registry component is configured to produce:
//! the component paths, the image names a basic deploy creates, and the
//! three-rule retention policy every repository should carry.

use ecr_verify_core::LifecyclePolicy;
use ecr_verify_core::Rule;
use ecr_verify_core::Selection;
use ecr_verify_core::TagStatus;
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::driver::ComponentCase;
use crate::driver::ComponentInputs;

// ============================================================================
// SECTION: Component Identifiers
// ============================================================================

/// Component with repositories enabled.
pub const BASIC_COMPONENT: &str = "ecr/basic";
/// Component deployed with `enabled = false`.
pub const DISABLED_COMPONENT: &str = "ecr/disabled";
/// Stack every suite deploys into unless overridden.
pub const DEFAULT_STACK: &str = "default-test";
/// Input carrying repository names.
pub const IMAGES_INPUT: &str = "images";
/// Length of generated name suffixes.
const UNIQUE_ID_LEN: usize = 6;

// ============================================================================
// SECTION: Naming
// ============================================================================

/// Returns a short lowercase alphanumeric suffix for resource names.
#[must_use]
pub fn unique_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UNIQUE_ID_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

/// Repository names created by the basic component.
#[must_use]
pub fn basic_image_names(suffix: &str) -> Vec<String> {
    ["infrastructure", "microservice-a", "microservice-b", "microservice-c"]
        .iter()
        .map(|base| format!("{base}-{suffix}"))
        .collect()
}

/// Basic component case with drift checking enabled.
#[must_use]
pub fn basic_case(stack: &str, suffix: &str) -> ComponentCase {
    let inputs = ComponentInputs::new().with_strings(IMAGES_INPUT, basic_image_names(suffix));
    ComponentCase::new(BASIC_COMPONENT, stack, inputs).with_drift_check()
}

/// Disabled component case.
#[must_use]
pub fn disabled_case(stack: &str) -> ComponentCase {
    ComponentCase::new(DISABLED_COMPONENT, stack, ComponentInputs::new()).disabled()
}

// ============================================================================
// SECTION: Expected Policy
// ============================================================================

/// Retention policy the basic component attaches to every repository.
#[must_use]
pub fn basic_lifecycle_policy() -> LifecyclePolicy {
    LifecyclePolicy::new(vec![
        Rule::expire(
            1,
            "Protects images tagged with prefix prod",
            Selection::image_count_more_than(TagStatus::Tagged, 999_999).with_tag_prefixes(["prod"]),
        ),
        Rule::expire(
            2,
            "Remove untagged images",
            Selection::image_count_more_than(TagStatus::Untagged, 1),
        ),
        Rule::expire(
            3,
            "Rotate images when reach 500 images stored",
            Selection::image_count_more_than(TagStatus::Any, 500),
        ),
    ])
}

// ============================================================================
// SECTION: Tests
// ============================================================================
