//! CloudFront distributions in front of private S3 buckets.

use std::time::Duration;

use serde_json::{Value, json};
use typed_builder::TypedBuilder;

use crate::constructs::iam::PolicyStatement;
use crate::constructs::s3::Bucket;
use crate::error::CdkResult;
use crate::intrinsic::{Expr, Pseudo};
use crate::logical_id;
use crate::stack::{CfnResource, Stack};

/// Managed `CachingOptimized` cache policy.
pub const CACHING_OPTIMIZED: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

const MAX_OAC_NAME_LEN: usize = 64;

/// What the distribution does with plain HTTP viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerProtocolPolicy {
    /// Serve HTTP and HTTPS.
    #[default]
    AllowAll,
    /// Redirect HTTP to HTTPS.
    RedirectToHttps,
    /// Reject HTTP.
    HttpsOnly,
}

impl ViewerProtocolPolicy {
    /// Template value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllowAll => "allow-all",
            Self::RedirectToHttps => "redirect-to-https",
            Self::HttpsOnly => "https-only",
        }
    }
}

/// Rewrite of an origin error status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Origin status to intercept.
    pub http_status: u16,
    /// Status returned to the viewer.
    pub response_http_status: Option<u16>,
    /// Object served instead, e.g. `/index.html`.
    pub response_page_path: Option<String>,
    /// How long the rewritten response is cached.
    pub ttl: Option<Duration>,
}

impl ErrorResponse {
    /// Serve `page` with status 200 instead of `http_status`.
    #[must_use]
    pub fn rewrite_to(http_status: u16, page: &str, ttl: Duration) -> Self {
        Self {
            http_status,
            response_http_status: Some(200),
            response_page_path: Some(page.to_owned()),
            ttl: Some(ttl),
        }
    }

    fn to_json(&self) -> Value {
        let mut out = json!({ "ErrorCode": self.http_status });
        if let Some(ttl) = self.ttl {
            out["ErrorCachingMinTTL"] = json!(ttl.as_secs());
        }
        if let Some(status) = self.response_http_status {
            out["ResponseCode"] = json!(status);
        }
        if let Some(path) = &self.response_page_path {
            out["ResponsePagePath"] = json!(path);
        }
        out
    }
}

/// Options for [`Distribution`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct DistributionProps {
    /// Viewer protocol policy of the default behavior.
    #[builder(default)]
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    /// Cache policy of the default behavior.
    #[builder(default = CACHING_OPTIMIZED.to_owned(), setter(into))]
    pub cache_policy_id: String,
    /// Object served for `/`.
    #[builder(default, setter(strip_option, into))]
    pub default_root_object: Option<String>,
    /// Free-form comment.
    #[builder(default, setter(strip_option, into))]
    pub comment: Option<String>,
    /// Error rewrites.
    #[builder(default)]
    pub error_responses: Vec<ErrorResponse>,
}

/// A declared `AWS::CloudFront::Distribution`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    logical_id: String,
}

impl Distribution {
    /// Declare a distribution serving `bucket` through an origin access control.
    ///
    /// Also grants the distribution read access in the bucket policy.
    pub fn with_s3_origin(
        stack: &mut Stack,
        id: &str,
        bucket: &Bucket,
        props: &DistributionProps,
    ) -> CdkResult<Self> {
        let oac_path = [id, "Origin1", "S3OriginAccessControl", "Resource"];
        let oac_name: String = format!("{}{}", stack.name(), logical_id::allocate(&oac_path))
            .chars()
            .take(MAX_OAC_NAME_LEN)
            .collect();
        let oac = stack.add_resource(
            &oac_path,
            CfnResource::new(
                "AWS::CloudFront::OriginAccessControl",
                json!({
                    "OriginAccessControlConfig": {
                        "Name": oac_name,
                        "OriginAccessControlOriginType": "s3",
                        "SigningBehavior": "always",
                        "SigningProtocol": "sigv4",
                    }
                }),
            ),
        )?;

        let origin_id = logical_id::allocate(&[id, "Origin1"]);
        let mut config = json!({
            "DefaultCacheBehavior": {
                "CachePolicyId": props.cache_policy_id,
                "Compress": true,
                "TargetOriginId": origin_id,
                "ViewerProtocolPolicy": props.viewer_protocol_policy.as_str(),
            },
            "Enabled": true,
            "HttpVersion": "http2",
            "IPV6Enabled": true,
            "Origins": [{
                "DomainName": bucket.bucket_regional_domain_name(),
                "Id": origin_id,
                "OriginAccessControlId": Expr::get_att(&oac, "Id"),
                "S3OriginConfig": { "OriginAccessIdentity": "" },
            }],
        });
        if let Some(comment) = &props.comment {
            config["Comment"] = json!(comment);
        }
        if let Some(root) = &props.default_root_object {
            config["DefaultRootObject"] = json!(root);
        }
        if !props.error_responses.is_empty() {
            config["CustomErrorResponses"] =
                props.error_responses.iter().map(ErrorResponse::to_json).collect();
        }

        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new(
                "AWS::CloudFront::Distribution",
                json!({ "DistributionConfig": config }),
            ),
        )?;
        let distribution = Self { logical_id };

        bucket.add_policy(
            stack,
            &[PolicyStatement::allow(["s3:GetObject"])
                .resources([bucket.arn_for_objects("*")])
                .service_principal("cloudfront.amazonaws.com")
                .condition(json!({
                    "StringEquals": { "AWS:SourceArn": distribution.distribution_arn() }
                }))],
        )?;

        Ok(distribution)
    }

    /// Logical ID of the distribution.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Distribution ID (`Ref`).
    #[must_use]
    pub fn distribution_id(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// `*.cloudfront.net` domain name.
    #[must_use]
    pub fn domain_name(&self) -> Expr {
        Expr::get_att(&self.logical_id, "DomainName")
    }

    /// Distribution ARN.
    #[must_use]
    pub fn distribution_arn(&self) -> Expr {
        Expr::concat([
            Expr::literal("arn:"),
            Pseudo::Partition.into(),
            Expr::literal(":cloudfront::"),
            Pseudo::AccountId.into(),
            Expr::literal(":distribution/"),
            self.distribution_id(),
        ])
    }
}
