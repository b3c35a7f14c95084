// system-tests/src/registry.rs
// ============================================================================
// Module: Registry Reader
// Description: Read access to live repositories and lifecycle policies.
// Purpose: Resolve deployed registry state through the AWS control plane.
// Dependencies: async-trait, aws-config, aws-sdk-ecr, aws-sdk-sts, tracing
// ============================================================================

//! ## Overview
//! [`RegistryReader`] is the read side of verification: the caller's account
//! id, a repository's attributes, and its raw lifecycle policy text.
//! [`EcrRegistryReader`] implements it with the AWS SDK; tests substitute an
//! in-memory reader.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_ecr::error::DisplayErrorContext;
use aws_sdk_ecr::types::Repository;
use ecr_verify_core::EncryptionType;
use ecr_verify_core::RepositoryState;
use ecr_verify_core::TagMutability;
use thiserror::Error;
use tracing::debug;

use crate::config::SystemTestConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry read errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An AWS request failed.
    #[error("{operation} failed: {message}")]
    Request {
        /// API operation name.
        operation: &'static str,
        /// Rendered error chain.
        message: String,
    },
    /// The repository does not exist.
    #[error("repository {0} not found")]
    NotFound(String),
    /// The response lacks a field verification needs.
    #[error("{subject} response is missing {field}")]
    MissingField {
        /// Repository name or `caller identity`.
        subject: String,
        /// Missing field.
        field: &'static str,
    },
}

impl RegistryError {
    /// Wraps an SDK error with its full context chain.
    fn request<E: std::error::Error>(operation: &'static str, err: E) -> Self {
        Self::Request {
            operation,
            message: DisplayErrorContext(err).to_string(),
        }
    }

    /// Builds a missing-field error.
    fn missing(subject: &str, field: &'static str) -> Self {
        Self::MissingField {
            subject: subject.to_string(),
            field,
        }
    }
}

// ============================================================================
// SECTION: Reader Interface
// ============================================================================

/// Read API over the live registry.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// Returns the account id of the active credentials.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the identity cannot be resolved.
    async fn account_id(&self) -> Result<String, RegistryError>;

    /// Returns the attributes of a repository.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the repository cannot be described.
    async fn repository(&self, name: &str) -> Result<RepositoryState, RegistryError>;

    /// Returns the raw lifecycle policy document of a repository.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the policy cannot be read.
    async fn lifecycle_policy_text(&self, name: &str) -> Result<String, RegistryError>;
}

// ============================================================================
// SECTION: AWS Reader
// ============================================================================

/// Registry reader backed by the ECR and STS APIs.
#[derive(Debug, Clone)]
pub struct EcrRegistryReader {
    /// ECR client.
    ecr: aws_sdk_ecr::Client,
    /// STS client.
    sts: aws_sdk_sts::Client,
}

impl EcrRegistryReader {
    /// Builds clients for the configured region and optional endpoint.
    pub async fn from_config(config: &SystemTestConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let shared = loader.load().await;
        Self {
            ecr: aws_sdk_ecr::Client::new(&shared),
            sts: aws_sdk_sts::Client::new(&shared),
        }
    }
}

#[async_trait]
impl RegistryReader for EcrRegistryReader {
    async fn account_id(&self) -> Result<String, RegistryError> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|err| RegistryError::request("GetCallerIdentity", err))?;
        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| RegistryError::missing("caller identity", "Account"))
    }

    async fn repository(&self, name: &str) -> Result<RepositoryState, RegistryError> {
        debug!(repository = name, "describing repository");
        let output = self
            .ecr
            .describe_repositories()
            .repository_names(name)
            .send()
            .await
            .map_err(|err| RegistryError::request("DescribeRepositories", err))?;
        let repository =
            output.repositories().first().ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        repository_state(name, repository)
    }

    async fn lifecycle_policy_text(&self, name: &str) -> Result<String, RegistryError> {
        debug!(repository = name, "reading lifecycle policy");
        let output = self
            .ecr
            .get_lifecycle_policy()
            .repository_name(name)
            .send()
            .await
            .map_err(|err| RegistryError::request("GetLifecyclePolicy", err))?;
        output
            .lifecycle_policy_text()
            .map(str::to_string)
            .ok_or_else(|| RegistryError::missing(name, "lifecyclePolicyText"))
    }
}

// ============================================================================
// SECTION: Conversion
// ============================================================================

/// Maps a described repository into [`RepositoryState`].
///
/// The name is the one the provider reported, so a response for a different
/// repository than `requested` surfaces as a failed `repositoryName` check.
fn repository_state(
    requested: &str,
    repository: &Repository,
) -> Result<RepositoryState, RegistryError> {
    let name = repository
        .repository_name()
        .ok_or_else(|| RegistryError::missing(requested, "repositoryName"))?;
    let arn = repository
        .repository_arn()
        .ok_or_else(|| RegistryError::missing(requested, "repositoryArn"))?;
    let uri = repository
        .repository_uri()
        .ok_or_else(|| RegistryError::missing(requested, "repositoryUri"))?;
    let tag_mutability = repository
        .image_tag_mutability()
        .map(|mode| TagMutability::from(mode.as_str()))
        .ok_or_else(|| RegistryError::missing(requested, "imageTagMutability"))?;
    let scan_on_push = repository
        .image_scanning_configuration()
        .is_some_and(|scanning| scanning.scan_on_push());
    let encryption = repository
        .encryption_configuration()
        .ok_or_else(|| RegistryError::missing(requested, "encryptionConfiguration"))?;

    Ok(RepositoryState {
        name: name.to_string(),
        arn: arn.to_string(),
        uri: uri.to_string(),
        tag_mutability,
        scan_on_push,
        encryption_type: EncryptionType::from(encryption.encryption_type().as_str()),
        kms_key: encryption.kms_key().map(str::to_string),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
