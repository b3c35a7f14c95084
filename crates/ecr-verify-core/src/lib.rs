// crates/ecr-verify-core/src/lib.rs
// ============================================================================
// Module: ECR Verify Core Library
// Description: Public API surface for registry policy verification.
// Purpose: Expose the lifecycle policy model, comparator, and state checks.
// Dependencies: crate::{address, checks, comparator, policy, repository}
// ============================================================================

//! ## Overview
//! ECR verify core models a container registry's lifecycle (image-retention)
//! policy, decodes the live JSON document, and compares it structurally
//! against an expected policy. It also models repository attributes and the
//! registry address scheme so deployed state can be asserted field by field.
//! The crate performs no I/O; fetching live state belongs to the harness.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod address;
pub mod checks;
pub mod comparator;
pub mod policy;
pub mod repository;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use address::Partition;
pub use address::RegistryAddress;
pub use checks::CheckFailure;
pub use checks::Checks;
pub use comparator::PolicyComparison;
pub use comparator::PolicyDifference;
pub use comparator::compare_policies;
pub use policy::CountType;
pub use policy::LifecyclePolicy;
pub use policy::PolicyError;
pub use policy::PolicyViolation;
pub use policy::Rule;
pub use policy::Selection;
pub use policy::TagStatus;
pub use repository::EncryptionType;
pub use repository::ExpectedRepository;
pub use repository::RepositoryState;
pub use repository::TagMutability;
