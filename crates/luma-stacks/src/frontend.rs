//! Private bucket behind CloudFront, filled from the web build output.

use std::path::PathBuf;
use std::time::Duration;

use luma_cdk::constructs::cloudfront::{
    CACHING_OPTIMIZED, Distribution, DistributionProps, ErrorResponse, ViewerProtocolPolicy,
};
use luma_cdk::constructs::s3::{BlockPublicAccess, Bucket, BucketEncryption, BucketProps};
use luma_cdk::constructs::s3_deployment::{BucketDeployment, BucketDeploymentProps};
use luma_cdk::{CdkResult, RemovalPolicy, Stack, StackProps};
use typed_builder::TypedBuilder;

/// Web build output used when no path is given.
pub const DEFAULT_BUILD_OUTPUT_PATH: &str = "../../apps/luma-web/.svelte-kit/output/client";

const SPA_ENTRY: &str = "/index.html";
const SPA_ERROR_TTL: Duration = Duration::from_secs(60);

/// Options for [`build`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct FrontendStackProps {
    /// Stack-level properties.
    #[builder(default)]
    pub stack: StackProps,
    /// Directory uploaded to the bucket.
    #[builder(default = PathBuf::from(DEFAULT_BUILD_OUTPUT_PATH), setter(into))]
    pub build_output_path: PathBuf,
}

impl Default for FrontendStackProps {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Declare the frontend stack.
pub fn build(id: &str, props: &FrontendStackProps) -> CdkResult<Stack> {
    let mut stack = Stack::new(id, &props.stack);

    let bucket = Bucket::new(
        &mut stack,
        "LumaWebBucket",
        &BucketProps::builder()
            .block_public_access(BlockPublicAccess::BLOCK_ALL)
            .encryption(BucketEncryption::S3Managed)
            .removal_policy(RemovalPolicy::Retain)
            .build(),
    )?;

    let distribution = Distribution::with_s3_origin(
        &mut stack,
        "LumaWebDistribution",
        &bucket,
        &DistributionProps::builder()
            .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
            .cache_policy_id(CACHING_OPTIMIZED)
            .default_root_object("index.html")
            .comment("Luma web frontend")
            .error_responses(
                [403, 404]
                    .into_iter()
                    .map(|status| ErrorResponse::rewrite_to(status, SPA_ENTRY, SPA_ERROR_TTL))
                    .collect(),
            )
            .build(),
    )?;

    BucketDeployment::new(
        &mut stack,
        "LumaWebDeployment",
        &BucketDeploymentProps::builder()
            .sources(vec![props.build_output_path.clone()])
            .destination_bucket(&bucket)
            .distribution(&distribution)
            .distribution_paths(vec!["/*".to_owned()])
            .build(),
    )?;

    tracing::info!(
        stack = %id,
        build_output_path = %props.build_output_path.display(),
        "declared frontend stack",
    );
    Ok(stack)
}
