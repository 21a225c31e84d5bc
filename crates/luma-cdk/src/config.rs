//! Synthesis configuration.
//!
//! All configuration is driven by environment variables. The deployment target
//! is mandatory: a missing `AWS_ACCOUNT_ID` or `AWS_REGION` is an error, never
//! an empty string.

use std::path::PathBuf;

use crate::error::{CdkError, CdkResult};
use crate::types::{AccountId, AwsRegion, Environment};

/// Variable holding the target account ID.
pub const ACCOUNT_ID_VAR: &str = "AWS_ACCOUNT_ID";
/// Variable holding the target region.
pub const REGION_VAR: &str = "AWS_REGION";
/// Variable set by the deployment CLI to choose the assembly directory.
pub const OUTDIR_VAR: &str = "CDK_OUTDIR";
/// Variable holding the log level filter.
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
/// Variable overriding the API image build context.
pub const API_ASSET_PATH_VAR: &str = "LUMA_API_ASSET_PATH";
/// Variable overriding the web build output directory.
pub const WEB_BUILD_PATH_VAR: &str = "LUMA_WEB_BUILD_PATH";

/// Configuration for one synthesis run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Deployment target shared by every stack.
    pub environment: Environment,
    /// Directory the cloud assembly is written to.
    pub out_dir: PathBuf,
    /// Log level.
    pub log_level: String,
    /// API image build context, when overridden.
    #[serde(default)]
    pub api_asset_path: Option<PathBuf>,
    /// Web build output, when overridden.
    #[serde(default)]
    pub web_build_path: Option<PathBuf>,
}

impl AppConfig {
    /// Default cloud assembly directory.
    pub const DEFAULT_OUT_DIR: &str = "cdk.out";

    /// Load configuration from the process environment.
    pub fn from_env() -> CdkResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> CdkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account = AccountId::new(required(&lookup, ACCOUNT_ID_VAR)?)?;
        let region = AwsRegion::new(required(&lookup, REGION_VAR)?)?;

        Ok(Self {
            environment: Environment::new(account, region),
            out_dir: optional(&lookup, OUTDIR_VAR)
                .map_or_else(|| PathBuf::from(Self::DEFAULT_OUT_DIR), PathBuf::from),
            log_level: optional(&lookup, LOG_LEVEL_VAR).unwrap_or_else(|| "info".to_owned()),
            api_asset_path: optional(&lookup, API_ASSET_PATH_VAR).map(PathBuf::from),
            web_build_path: optional(&lookup, WEB_BUILD_PATH_VAR).map(PathBuf::from),
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> CdkResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| CdkError::MissingEnvVar(key.to_owned()))
}
