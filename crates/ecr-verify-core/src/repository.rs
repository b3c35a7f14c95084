// crates/ecr-verify-core/src/repository.rs
// ============================================================================
// Module: Repository State
// Description: Live repository attributes and their expected values.
// Purpose: Assert each deployed repository attribute independently.
// Dependencies: crate::checks
// ============================================================================

//! ## Overview
//! [`RepositoryState`] is the registry's view of a repository as returned by
//! the read API. [`ExpectedRepository`] states what the deployment should have
//! produced; [`ExpectedRepository::check`] records one check per attribute so
//! each divergence is reported on its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::checks::Checks;

// ============================================================================
// SECTION: Attribute Enums
// ============================================================================

/// Whether pushed tags may be overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagMutability {
    /// Tags may be overwritten.
    Mutable,
    /// Tags are write-once.
    Immutable,
    /// A mode this crate does not model.
    Other(String),
}

impl TagMutability {
    /// Returns the wire name of the mode.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mutable => "MUTABLE",
            Self::Immutable => "IMMUTABLE",
            Self::Other(value) => value,
        }
    }
}

impl From<&str> for TagMutability {
    fn from(value: &str) -> Self {
        match value {
            "MUTABLE" => Self::Mutable,
            "IMMUTABLE" => Self::Immutable,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TagMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side encryption applied to stored images.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EncryptionType {
    /// Registry-managed AES-256 keys.
    Aes256,
    /// Customer or AWS managed KMS key.
    Kms,
    /// Dual-layer KMS encryption.
    KmsDsse,
    /// A type this crate does not model.
    Other(String),
}

impl EncryptionType {
    /// Returns the wire name of the encryption type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Aes256 => "AES256",
            Self::Kms => "KMS",
            Self::KmsDsse => "KMS_DSSE",
            Self::Other(value) => value,
        }
    }
}

impl From<&str> for EncryptionType {
    fn from(value: &str) -> Self {
        match value {
            "AES256" => Self::Aes256,
            "KMS" => Self::Kms,
            "KMS_DSSE" => Self::KmsDsse,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EncryptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Repository Types
// ============================================================================

/// Live repository attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryState {
    /// Repository name.
    pub name: String,
    /// Repository ARN.
    pub arn: String,
    /// Repository URI.
    pub uri: String,
    /// Tag mutability mode.
    pub tag_mutability: TagMutability,
    /// Whether images are scanned when pushed.
    pub scan_on_push: bool,
    /// Encryption type.
    pub encryption_type: EncryptionType,
    /// KMS key when KMS encryption is used.
    pub kms_key: Option<String>,
}

/// Attributes a deployed repository is expected to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedRepository {
    /// Repository name.
    pub name: String,
    /// Repository ARN.
    pub arn: String,
    /// Repository URI.
    pub uri: String,
    /// Tag mutability mode.
    pub tag_mutability: TagMutability,
    /// Whether images are scanned when pushed.
    pub scan_on_push: bool,
    /// Encryption type.
    pub encryption_type: EncryptionType,
}

impl ExpectedRepository {
    /// Expected state for a repository with immutable tags, scan-on-push, and
    /// AES-256 encryption.
    #[must_use]
    pub fn hardened(
        name: impl Into<String>,
        arn: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            uri: uri.into(),
            tag_mutability: TagMutability::Immutable,
            scan_on_push: true,
            encryption_type: EncryptionType::Aes256,
        }
    }

    /// Records one check per attribute against the live state.
    pub fn check(&self, actual: &RepositoryState, checks: &mut Checks) {
        let subject = self.name.as_str();
        checks.equal(subject, "repositoryName", self.name.as_str(), actual.name.as_str());
        checks.equal(subject, "repositoryArn", self.arn.as_str(), actual.arn.as_str());
        checks.equal(subject, "repositoryUri", self.uri.as_str(), actual.uri.as_str());
        checks.equal(
            subject,
            "imageTagMutability",
            &self.tag_mutability,
            &actual.tag_mutability,
        );
        checks.equal(subject, "scanOnPush", &self.scan_on_push, &actual.scan_on_push);
        checks.equal(
            subject,
            "encryptionType",
            &self.encryption_type,
            &actual.encryption_type,
        );
    }
}
