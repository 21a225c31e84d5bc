//! Deployment target types.

use std::fmt;

use crate::error::{CdkError, CdkResult};

/// AWS Account ID (12-digit string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Validate an account ID; it must be exactly 12 ASCII digits.
    pub fn new(id: impl Into<String>) -> CdkResult<Self> {
        let id = id.into();
        if id.len() != 12 || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(CdkError::InvalidAccountId(id));
        }
        Ok(Self(id))
    }

    /// The raw ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// AWS Region identifier, e.g. `eu-west-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AwsRegion(String);

impl AwsRegion {
    /// Validate a region name: non-empty, lowercase ASCII letters, digits and `-`.
    pub fn new(region: impl Into<String>) -> CdkResult<Self> {
        let region = region.into();
        let valid = !region.is_empty()
            && region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(CdkError::InvalidRegion(region));
        }
        Ok(Self(region))
    }

    /// The raw name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The account and region a stack is deployed into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Environment {
    /// Target account.
    pub account: AccountId,
    /// Target region.
    pub region: AwsRegion,
}

impl Environment {
    /// Placeholder used in the cloud assembly for environment-agnostic stacks.
    pub const UNKNOWN_URI: &str = "aws://unknown-account/unknown-region";

    /// Create an environment from an account and a region.
    #[must_use]
    pub fn new(account: AccountId, region: AwsRegion) -> Self {
        Self { account, region }
    }

    /// The `aws://account/region` URI recorded in the assembly manifest.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("aws://{}/{}", self.account, self.region)
    }
}
