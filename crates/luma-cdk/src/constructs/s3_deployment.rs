//! Uploading local directories into a bucket at deploy time.
//!
//! A [`BucketDeployment`] is a `Custom::CDKBucketDeployment` resource backed by
//! a Lambda handler that copies zipped assets from the bootstrap bucket into
//! the destination bucket and optionally invalidates a distribution. The
//! handler is a singleton: every deployment in a stack shares one function
//! and one role, and each deployment grants that role its own permissions.
//!
//! The handler code ships with this crate (see [`handler_source`]) and is
//! published as a zip asset next to the deployment's own sources.

use std::path::{Path, PathBuf};

use serde_json::json;
use typed_builder::TypedBuilder;

use crate::asset::AssetKind;
use crate::constructs::cloudfront::Distribution;
use crate::constructs::iam::{PolicyStatement, Role};
use crate::constructs::lambda::BASIC_EXECUTION_POLICY;
use crate::constructs::s3::{Bucket, bucket_arn_from_name};
use crate::error::CdkResult;
use crate::intrinsic::Expr;
use crate::logical_id;
use crate::stack::{CfnResource, RemovalPolicy, Stack};
use crate::synthesizer;

/// Construct ID of the shared handler.
pub const HANDLER_ID: &str = "Custom::CDKBucketDeployment8693BB64968944B69AAFB0CC9EB8756C";

const HANDLER_DIR: &str = "assets/bucket-deployment-handler";
const HANDLER_RUNTIME: &str = "python3.11";
const HANDLER_TIMEOUT_SECS: u64 = 900;

/// Options for [`BucketDeployment`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct BucketDeploymentProps<'a> {
    /// Local directories to upload.
    pub sources: Vec<PathBuf>,
    /// Target bucket.
    pub destination_bucket: &'a Bucket,
    /// Key prefix inside the bucket.
    #[builder(default, setter(strip_option, into))]
    pub destination_key_prefix: Option<String>,
    /// Distribution to invalidate after upload.
    #[builder(default, setter(strip_option))]
    pub distribution: Option<&'a Distribution>,
    /// Paths to invalidate; defaults to `/*` when a distribution is set.
    #[builder(default)]
    pub distribution_paths: Vec<String>,
    /// Delete objects that are not part of the sources.
    #[builder(default = true)]
    pub prune: bool,
}

/// Directory holding the handler code.
#[must_use]
pub fn handler_source() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(HANDLER_DIR)
}

/// A declared bucket deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketDeployment {
    logical_id: String,
}

impl BucketDeployment {
    /// Declare the deployment at construct `id`.
    pub fn new(stack: &mut Stack, id: &str, props: &BucketDeploymentProps<'_>) -> CdkResult<Self> {
        let (role, handler) = ensure_handler(stack)?;

        let object_keys: Vec<Expr> = props
            .sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let asset_id = format!("Asset{}", i + 1);
                let token = stack.add_asset(
                    &[id, asset_id.as_str()],
                    AssetKind::ZipDirectory,
                    source.clone(),
                );
                Expr::literal(format!("{token}.zip"))
            })
            .collect();
        let source_buckets: Vec<Expr> = object_keys
            .iter()
            .map(|_| synthesizer::file_asset_bucket_expr())
            .collect();

        let destination = props.destination_bucket;
        let mut statements = vec![
            PolicyStatement::allow(["s3:GetObject*", "s3:GetBucket*", "s3:List*"]).resources([
                bucket_arn_from_name(synthesizer::file_asset_bucket_expr()),
                Expr::concat([
                    bucket_arn_from_name(synthesizer::file_asset_bucket_expr()),
                    Expr::literal("/*"),
                ]),
            ]),
            PolicyStatement::allow([
                "s3:GetObject*",
                "s3:GetBucket*",
                "s3:List*",
                "s3:DeleteObject*",
                "s3:PutObject",
                "s3:PutObjectLegalHold",
                "s3:PutObjectRetention",
                "s3:PutObjectTagging",
                "s3:PutObjectVersionTagging",
                "s3:Abort*",
            ])
            .resources([destination.bucket_arn(), destination.arn_for_objects("*")]),
        ];
        if props.distribution.is_some() {
            statements.push(
                PolicyStatement::allow([
                    "cloudfront:GetInvalidation",
                    "cloudfront:CreateInvalidation",
                ])
                .resources([Expr::literal("*")]),
            );
        }
        let policy = role.attach_policy(stack, &[id, "HandlerPolicy"], &statements)?;

        let mut properties = json!({
            "ServiceToken": Expr::get_att(&handler, "Arn"),
            "SourceBucketNames": source_buckets,
            "SourceObjectKeys": object_keys,
            "DestinationBucketName": destination.bucket_name(),
            "Prune": props.prune,
        });
        if let Some(prefix) = &props.destination_key_prefix {
            properties["DestinationBucketKeyPrefix"] = json!(prefix);
        }
        if let Some(distribution) = props.distribution {
            let paths = if props.distribution_paths.is_empty() {
                vec!["/*".to_owned()]
            } else {
                props.distribution_paths.clone()
            };
            properties["DistributionId"] = json!(distribution.distribution_id());
            properties["DistributionPaths"] = json!(paths);
        }

        let logical_id = stack.add_resource(
            &[id, "CustomResource", "Default"],
            CfnResource::new("Custom::CDKBucketDeployment", properties)
                .depends_on([policy])
                .removal_policy(RemovalPolicy::Destroy),
        )?;

        tracing::debug!(
            stack = %stack.name(),
            deployment = %id,
            sources = props.sources.len(),
            "declared bucket deployment",
        );
        Ok(Self { logical_id })
    }

    /// Logical ID of the custom resource.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }
}

/// Declare the shared handler on first use and return its role and logical ID.
fn ensure_handler(stack: &mut Stack) -> CdkResult<(Role, String)> {
    let function_path = [HANDLER_ID, "Resource"];
    if stack.has_path(&function_path) {
        return Ok((
            Role::declared_at(&[HANDLER_ID, "ServiceRole"]),
            logical_id::allocate(&function_path),
        ));
    }

    let role = Role::for_service(
        stack,
        &[HANDLER_ID, "ServiceRole"],
        "lambda.amazonaws.com",
        &[BASIC_EXECUTION_POLICY],
    )?;
    let code = stack.add_asset(&[HANDLER_ID, "Code"], AssetKind::ZipDirectory, handler_source());
    let handler = stack.add_resource(
        &function_path,
        CfnResource::new(
            "AWS::Lambda::Function",
            json!({
                "Code": {
                    "S3Bucket": synthesizer::file_asset_bucket_expr(),
                    "S3Key": format!("{code}.zip"),
                },
                "Handler": "index.handler",
                "Role": role.role_arn(),
                "Runtime": HANDLER_RUNTIME,
                "Timeout": HANDLER_TIMEOUT_SECS,
            }),
        )
        .depends_on([role.logical_id()]),
    )?;
    Ok((role, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::cloudfront::DistributionProps;
    use crate::constructs::s3::BucketProps;
    use crate::stack::StackProps;

    fn site_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        dir
    }

    #[test]
    fn test_should_upload_asset_and_invalidate_distribution() {
        let dir = site_dir();
        let mut stack = Stack::new("Web", &StackProps::default());
        let bucket = Bucket::new(&mut stack, "Site", &BucketProps::builder().build()).unwrap();
        let distribution = Distribution::with_s3_origin(
            &mut stack,
            "Cdn",
            &bucket,
            &DistributionProps::builder().build(),
        )
        .unwrap();
        let props = BucketDeploymentProps::builder()
            .sources(vec![dir.path().to_owned()])
            .destination_bucket(&bucket)
            .distribution(&distribution)
            .build();
        BucketDeployment::new(&mut stack, "Deploy", &props).unwrap();

        let synthesized = stack.synthesize().unwrap();
        let site = synthesized
            .assets
            .iter()
            .find(|a| a.asset.source == dir.path())
            .unwrap();
        let hash = &site.hash;
        let template = synthesized.template;
        assert!(template.has_resource_properties(
            "Custom::CDKBucketDeployment",
            &json!({
                "SourceObjectKeys": [format!("{hash}.zip")],
                "DestinationBucketName": { "Ref": bucket.logical_id() },
                "DistributionId": { "Ref": distribution.logical_id() },
                "DistributionPaths": ["/*"],
                "Prune": true,
            })
        ));
        assert!(template.has_resource_properties(
            "AWS::IAM::Policy",
            &json!({ "PolicyDocument": { "Statement": [{}, {}, {
                "Action": ["cloudfront:GetInvalidation", "cloudfront:CreateInvalidation"],
            }] } })
        ));
    }

    #[test]
    fn test_should_share_handler_between_deployments() {
        let dir = site_dir();
        let mut stack = Stack::new("Web", &StackProps::default());
        let bucket = Bucket::new(&mut stack, "Site", &BucketProps::builder().build()).unwrap();
        for id in ["First", "Second"] {
            let props = BucketDeploymentProps::builder()
                .sources(vec![dir.path().to_owned()])
                .destination_bucket(&bucket)
                .build();
            BucketDeployment::new(&mut stack, id, &props).unwrap();
        }

        let template = stack.to_template().unwrap();
        assert_eq!(template.resource_count("AWS::Lambda::Function"), 1);
        assert_eq!(stack.assets().len(), 3);
        assert_eq!(template.resource_count("AWS::IAM::Role"), 1);
        assert_eq!(template.resource_count("AWS::IAM::Policy"), 2);
        assert_eq!(template.resource_count("Custom::CDKBucketDeployment"), 2);
        assert!(!template.has_resource_properties(
            "Custom::CDKBucketDeployment",
            &json!({ "DistributionId": {} })
        ));
    }

    #[test]
    fn test_should_publish_handler_code_as_asset() {
        let dir = site_dir();
        let mut stack = Stack::new("Web", &StackProps::default());
        let bucket = Bucket::new(&mut stack, "Site", &BucketProps::builder().build()).unwrap();
        let props = BucketDeploymentProps::builder()
            .sources(vec![dir.path().to_owned()])
            .destination_bucket(&bucket)
            .build();
        BucketDeployment::new(&mut stack, "Deploy", &props).unwrap();

        let synthesized = stack.synthesize().unwrap();
        let handler = synthesized
            .assets
            .iter()
            .find(|a| a.asset.source == handler_source())
            .unwrap();
        assert_eq!(handler.asset.kind, AssetKind::ZipDirectory);
        assert!(synthesized.template.has_resource_properties(
            "AWS::Lambda::Function",
            &json!({
                "Handler": "index.handler",
                "Code": { "S3Key": format!("{}.zip", handler.hash) },
            })
        ));
        assert!(!synthesized.template.has_resource("AWS::Lambda::LayerVersion"));
    }

    #[test]
    fn test_should_ship_handler_entry_point() {
        assert!(handler_source().join("index.py").is_file());
    }
}
