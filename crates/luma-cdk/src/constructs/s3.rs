//! S3 buckets and bucket policies.

use serde_json::{Value, json};
use typed_builder::TypedBuilder;

use crate::constructs::iam::{PolicyStatement, policy_document};
use crate::error::CdkResult;
use crate::intrinsic::{Expr, Pseudo};
use crate::stack::{CfnResource, RemovalPolicy, Stack};

/// The four public-access block switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPublicAccess {
    /// Reject new public ACLs.
    pub block_public_acls: bool,
    /// Reject public bucket policies.
    pub block_public_policy: bool,
    /// Ignore existing public ACLs.
    pub ignore_public_acls: bool,
    /// Restrict access under public policies to the owner account.
    pub restrict_public_buckets: bool,
}

impl BlockPublicAccess {
    /// Every switch on.
    pub const BLOCK_ALL: Self = Self {
        block_public_acls: true,
        block_public_policy: true,
        ignore_public_acls: true,
        restrict_public_buckets: true,
    };

    fn to_json(self) -> Value {
        json!({
            "BlockPublicAcls": self.block_public_acls,
            "BlockPublicPolicy": self.block_public_policy,
            "IgnorePublicAcls": self.ignore_public_acls,
            "RestrictPublicBuckets": self.restrict_public_buckets,
        })
    }
}

/// Server-side encryption of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketEncryption {
    /// No explicit configuration.
    #[default]
    Unencrypted,
    /// SSE-S3 (`AES256`).
    S3Managed,
}

/// Options for [`Bucket`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct BucketProps {
    /// Public access block; none when unset.
    #[builder(default, setter(strip_option))]
    pub block_public_access: Option<BlockPublicAccess>,
    /// Server-side encryption.
    #[builder(default)]
    pub encryption: BucketEncryption,
    /// Removal policy; buckets are kept by default.
    #[builder(default = RemovalPolicy::Retain)]
    pub removal_policy: RemovalPolicy,
}

/// A declared `AWS::S3::Bucket`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    id: String,
    logical_id: String,
}

impl Bucket {
    /// Declare the bucket at construct `id`.
    pub fn new(stack: &mut Stack, id: &str, props: &BucketProps) -> CdkResult<Self> {
        let mut properties = json!({});
        if let BucketEncryption::S3Managed = props.encryption {
            properties["BucketEncryption"] = json!({
                "ServerSideEncryptionConfiguration": [
                    { "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" } }
                ]
            });
        }
        if let Some(block) = props.block_public_access {
            properties["PublicAccessBlockConfiguration"] = block.to_json();
        }

        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new("AWS::S3::Bucket", properties).removal_policy(props.removal_policy),
        )?;
        Ok(Self {
            id: id.to_owned(),
            logical_id,
        })
    }

    /// Construct ID of the bucket.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Logical ID of the bucket.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Bucket name (`Ref`).
    #[must_use]
    pub fn bucket_name(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// Bucket ARN.
    #[must_use]
    pub fn bucket_arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }

    /// Regional domain name, used as a CloudFront origin.
    #[must_use]
    pub fn bucket_regional_domain_name(&self) -> Expr {
        Expr::get_att(&self.logical_id, "RegionalDomainName")
    }

    /// ARN matching objects under `pattern`, e.g. `*`.
    #[must_use]
    pub fn arn_for_objects(&self, pattern: &str) -> Expr {
        Expr::concat([self.bucket_arn(), Expr::literal(format!("/{pattern}"))])
    }

    /// Declare the bucket policy at `<bucket>/Policy`.
    pub fn add_policy(
        &self,
        stack: &mut Stack,
        statements: &[PolicyStatement],
    ) -> CdkResult<String> {
        stack.add_resource(
            &[self.id.as_str(), "Policy", "Resource"],
            CfnResource::new(
                "AWS::S3::BucketPolicy",
                json!({
                    "Bucket": self.bucket_name(),
                    "PolicyDocument": policy_document(statements),
                }),
            ),
        )
    }
}

/// ARN of a bucket known only by name.
#[must_use]
pub fn bucket_arn_from_name(bucket_name: Expr) -> Expr {
    Expr::concat([
        Expr::literal("arn:"),
        Pseudo::Partition.into(),
        Expr::literal(":s3:::"),
        bucket_name,
    ])
}
