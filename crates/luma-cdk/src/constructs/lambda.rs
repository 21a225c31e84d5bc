//! Lambda functions built from container image assets.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::{Map, Value, json};
use typed_builder::TypedBuilder;

use crate::asset::AssetKind;
use crate::constructs::iam::Role;
use crate::error::CdkResult;
use crate::intrinsic::Expr;
use crate::stack::{CfnResource, Stack};
use crate::synthesizer;

/// Managed policy granting CloudWatch Logs access.
pub const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

/// Options for [`DockerImageFunction`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct DockerImageFunctionProps {
    /// Directory containing the `Dockerfile`.
    #[builder(setter(into))]
    pub directory: PathBuf,
    /// Memory in MB.
    #[builder(default = 128)]
    pub memory_size: u32,
    /// Invocation timeout.
    #[builder(default = Duration::from_secs(3))]
    pub timeout: Duration,
    /// Environment variables passed to the function.
    #[builder(default)]
    pub environment: BTreeMap<String, Expr>,
}

/// A declared container-image Lambda function and its execution role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerImageFunction {
    logical_id: String,
    role: Role,
}

impl DockerImageFunction {
    /// Declare the function at construct `id`.
    ///
    /// The image directory is registered as an asset; it is only read when
    /// the stack is synthesized.
    pub fn new(stack: &mut Stack, id: &str, props: &DockerImageFunctionProps) -> CdkResult<Self> {
        let role = Role::for_service(
            stack,
            &[id, "ServiceRole"],
            "lambda.amazonaws.com",
            &[BASIC_EXECUTION_POLICY],
        )?;

        let tag = stack.add_asset(
            &[id, "AssetImage"],
            AssetKind::ContainerImage,
            props.directory.clone(),
        );

        let mut properties = json!({
            "Code": { "ImageUri": synthesizer::image_uri_expr(&tag) },
            "MemorySize": props.memory_size,
            "PackageType": "Image",
            "Role": role.role_arn(),
            "Timeout": props.timeout.as_secs(),
        });
        if !props.environment.is_empty() {
            let variables: Map<String, Value> = props
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            properties["Environment"] = json!({ "Variables": variables });
        }

        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new("AWS::Lambda::Function", properties).depends_on([role.logical_id()]),
        )?;

        Ok(Self { logical_id, role })
    }

    /// Logical ID of the function.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The execution role.
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Function name (`Ref`).
    #[must_use]
    pub fn function_name(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// Function ARN.
    #[must_use]
    pub fn function_arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }
}

/// Declare an `AWS::Lambda::Permission` letting `principal` invoke a function.
pub fn add_invoke_permission<S: AsRef<str>>(
    stack: &mut Stack,
    path: &[S],
    function_arn: Expr,
    principal: &str,
    source_arn: Expr,
) -> CdkResult<String> {
    stack.add_resource(
        path,
        CfnResource::new(
            "AWS::Lambda::Permission",
            json!({
                "Action": "lambda:InvokeFunction",
                "FunctionName": function_arn,
                "Principal": principal,
                "SourceArn": source_arn,
            }),
        ),
    )
}
