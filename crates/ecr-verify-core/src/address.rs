// crates/ecr-verify-core/src/address.rs
// ============================================================================
// Module: Registry Address
// Description: Derivation of registry hosts, repository URLs, and ARNs.
// Purpose: Compute expected identifiers from account id, region, and name.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A private registry is addressed by account and region. The host is
//! `{account}.dkr.ecr.{region}.{dns_suffix}`, a repository URL is
//! `{host}/{name}` and a repository ARN is
//! `arn:{partition}:ecr:{region}:{account}:repository/{name}`.

use std::fmt;

// ============================================================================
// SECTION: Partition
// ============================================================================

/// AWS partition hosting the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Commercial regions.
    Aws,
    /// China regions.
    AwsCn,
    /// `GovCloud` regions.
    AwsUsGov,
}

impl Partition {
    /// Infers the partition from a region name.
    #[must_use]
    pub fn for_region(region: &str) -> Self {
        if region.starts_with("cn-") {
            Self::AwsCn
        } else if region.starts_with("us-gov-") {
            Self::AwsUsGov
        } else {
            Self::Aws
        }
    }

    /// Returns the partition identifier used in ARNs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::AwsCn => "aws-cn",
            Self::AwsUsGov => "aws-us-gov",
        }
    }

    /// Returns the DNS suffix for service endpoints.
    #[must_use]
    pub const fn dns_suffix(self) -> &'static str {
        match self {
            Self::Aws | Self::AwsUsGov => "amazonaws.com",
            Self::AwsCn => "amazonaws.com.cn",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Registry Address
// ============================================================================

/// Account-and-region coordinates of a private registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAddress {
    /// Partition of the region.
    pub partition: Partition,
    /// Twelve-digit account id.
    pub account_id: String,
    /// Region name, e.g. `us-east-2`.
    pub region: String,
}

impl RegistryAddress {
    /// Builds an address, inferring the partition from the region.
    #[must_use]
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            partition: Partition::for_region(&region),
            account_id: account_id.into(),
            region,
        }
    }

    /// Returns the registry host name.
    #[must_use]
    pub fn host(&self) -> String {
        format!("{}.dkr.ecr.{}.{}", self.account_id, self.region, self.partition.dns_suffix())
    }

    /// Returns the pull/push URL of a repository.
    #[must_use]
    pub fn repository_url(&self, name: &str) -> String {
        format!("{}/{name}", self.host())
    }

    /// Returns the ARN of a repository.
    #[must_use]
    pub fn repository_arn(&self, name: &str) -> String {
        format!(
            "arn:{}:ecr:{}:{}:repository/{name}",
            self.partition, self.region, self.account_id
        )
    }
}
