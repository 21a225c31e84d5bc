//! Bootstrap conventions of the default stack synthesizer.
//!
//! Deployments rely on resources created by `cdk bootstrap` (asset bucket,
//! container repository, publishing and deploy roles). Their names embed the
//! bootstrap qualifier and the `${AWS::AccountId}` / `${AWS::Region}`
//! placeholders, which are specialized when the stack environment is known.

use serde_json::{Map, Value, json};

use crate::intrinsic::Expr;
use crate::types::Environment;

/// Default bootstrap qualifier.
pub const QUALIFIER: &str = "hnb659fds";

/// Cloud assembly schema version written to the manifests.
pub const CLOUD_ASSEMBLY_VERSION: &str = "36.0.0";

/// Minimum bootstrap stack version the templates require.
pub const MIN_BOOTSTRAP_VERSION: u32 = 6;

/// Name of the template parameter resolving the bootstrap version.
pub const BOOTSTRAP_VERSION_PARAMETER: &str = "BootstrapVersion";

/// File asset bucket in the bootstrap stack.
#[must_use]
pub fn file_assets_bucket() -> String {
    format!("cdk-{QUALIFIER}-assets-${{AWS::AccountId}}-${{AWS::Region}}")
}

/// Container image repository in the bootstrap stack.
#[must_use]
pub fn container_assets_repository() -> String {
    format!("cdk-{QUALIFIER}-container-assets-${{AWS::AccountId}}-${{AWS::Region}}")
}

/// ARN of a bootstrap role by its short name, e.g. `deploy-role`.
#[must_use]
pub fn role_arn(name: &str) -> String {
    format!(
        "arn:${{AWS::Partition}}:iam::${{AWS::AccountId}}:role/\
         cdk-{QUALIFIER}-{name}-${{AWS::AccountId}}-${{AWS::Region}}"
    )
}

/// SSM parameter holding the bootstrap version.
#[must_use]
pub fn bootstrap_version_ssm_parameter() -> String {
    format!("/cdk-bootstrap/{QUALIFIER}/version")
}

/// Template expression for the bucket holding file assets.
#[must_use]
pub fn file_asset_bucket_expr() -> Expr {
    Expr::sub(file_assets_bucket())
}

/// Template expression for the URI of a published container image.
#[must_use]
pub fn image_uri_expr(tag: &str) -> Expr {
    Expr::sub(format!(
        "${{AWS::AccountId}}.dkr.ecr.${{AWS::Region}}.${{AWS::URLSuffix}}/{}:{tag}",
        container_assets_repository()
    ))
}

/// Replace pseudo-parameter placeholders with concrete values.
///
/// Environment-agnostic stacks keep the placeholders for the CLI to fill in.
#[must_use]
pub fn specialize(template: &str, env: Option<&Environment>) -> String {
    match env {
        Some(env) => template
            .replace("${AWS::AccountId}", env.account.as_str())
            .replace("${AWS::Region}", env.region.as_str())
            .replace("${AWS::Partition}", "aws"),
        None => template.to_owned(),
    }
}

/// Destination key used in asset manifests.
#[must_use]
pub fn destination_id(env: Option<&Environment>) -> String {
    env.map_or_else(
        || "current_account-current_region".to_owned(),
        |env| format!("{}-{}", env.account, env.region),
    )
}

/// `Parameters` section every synthesized template carries.
#[must_use]
pub fn bootstrap_parameters() -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(
        BOOTSTRAP_VERSION_PARAMETER.to_owned(),
        json!({
            "Type": "AWS::SSM::Parameter::Value<String>",
            "Default": bootstrap_version_ssm_parameter(),
            "Description": "Version of the CDK Bootstrap resources in this environment, \
                automatically retrieved from SSM Parameter Store. [cdk:skip]",
        }),
    );
    params
}

/// `Rules` section rejecting deployments into an outdated bootstrap stack.
#[must_use]
pub fn bootstrap_rules() -> Map<String, Value> {
    let outdated: Vec<String> = (1..MIN_BOOTSTRAP_VERSION).map(|v| v.to_string()).collect();

    let mut rules = Map::new();
    rules.insert(
        "CheckBootstrapVersion".to_owned(),
        json!({
            "Assertions": [{
                "Assert": {
                    "Fn::Not": [{
                        "Fn::Contains": [outdated, { "Ref": BOOTSTRAP_VERSION_PARAMETER }]
                    }]
                },
                "AssertDescription": format!(
                    "CDK bootstrap stack version {MIN_BOOTSTRAP_VERSION} required. \
                     Please run 'cdk bootstrap' with a recent version of the CDK CLI."
                ),
            }]
        }),
    );
    rules
}
