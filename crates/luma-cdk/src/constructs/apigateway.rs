//! REST APIs on API Gateway.
//!
//! Construct layout follows the gateway's resource tree: the root resource is
//! `<api>/Default`, children nest under it by path part, and every method
//! lives at `<resource>/<METHOD>`.

use serde_json::{Value, json};
use typed_builder::TypedBuilder;

use crate::constructs::lambda;
use crate::error::CdkResult;
use crate::intrinsic::{Expr, Pseudo};
use crate::stack::{CfnOutput, CfnResource, Stack};

/// Cross-origin settings applied to every resource of an API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsOptions {
    /// Allowed origins.
    pub allow_origins: Vec<String>,
    /// Allowed methods.
    pub allow_methods: Vec<String>,
    /// Allowed request headers.
    pub allow_headers: Vec<String>,
    /// Status code of the preflight response.
    pub status_code: u16,
}

impl CorsOptions {
    /// Every origin.
    pub const ALL_ORIGINS: &'static [&'static str] = &["*"];
    /// Every HTTP method.
    pub const ALL_METHODS: &'static [&'static str] =
        &["OPTIONS", "GET", "PUT", "POST", "DELETE", "PATCH", "HEAD"];

    /// All origins, all methods and all headers.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allow_origins: to_strings(Self::ALL_ORIGINS),
            allow_methods: to_strings(Self::ALL_METHODS),
            allow_headers: vec!["*".to_owned()],
            status_code: 204,
        }
    }

    fn header_value(values: &[String]) -> String {
        format!("'{}'", values.join(","))
    }

    fn preflight_method(&self, api: &Expr, resource: &Expr) -> Value {
        let status = self.status_code.to_string();
        let origin = self.allow_origins.first().map_or("*", String::as_str);
        json!({
            "ApiKeyRequired": false,
            "AuthorizationType": "NONE",
            "HttpMethod": "OPTIONS",
            "Integration": {
                "IntegrationResponses": [{
                    "ResponseParameters": {
                        "method.response.header.Access-Control-Allow-Headers":
                            Self::header_value(&self.allow_headers),
                        "method.response.header.Access-Control-Allow-Origin": format!("'{origin}'"),
                        "method.response.header.Access-Control-Allow-Methods":
                            Self::header_value(&self.allow_methods),
                    },
                    "StatusCode": status,
                }],
                "RequestTemplates": { "application/json": "{ statusCode: 200 }" },
                "Type": "MOCK",
            },
            "MethodResponses": [{
                "ResponseParameters": {
                    "method.response.header.Access-Control-Allow-Headers": true,
                    "method.response.header.Access-Control-Allow-Origin": true,
                    "method.response.header.Access-Control-Allow-Methods": true,
                },
                "StatusCode": status,
            }],
            "ResourceId": resource,
            "RestApiId": api,
        })
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|&v| v.to_owned()).collect()
}

/// Options for [`RestApi`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RestApiProps {
    /// Physical API name.
    #[builder(setter(into))]
    pub rest_api_name: String,
    /// API description.
    #[builder(default, setter(strip_option, into))]
    pub description: Option<String>,
    /// Name of the deployment stage.
    #[builder(default = "prod".to_owned(), setter(into))]
    pub stage_name: String,
    /// Preflight settings added to every resource.
    #[builder(default, setter(strip_option))]
    pub default_cors: Option<CorsOptions>,
}

/// A node of the API's resource tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResource {
    path: Vec<String>,
    resource_id: Expr,
    url_path: String,
}

impl ApiResource {
    /// The resource ID expression.
    #[must_use]
    pub fn resource_id(&self) -> &Expr {
        &self.resource_id
    }

    /// URL path of the resource, e.g. `/api/v1`.
    #[must_use]
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    fn child_path(&self, part: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(part.to_owned());
        path
    }
}

/// A declared `AWS::ApiGateway::RestApi`.
///
/// Call [`RestApi::deploy`] once every method has been added.
#[derive(Debug, Clone)]
pub struct RestApi {
    id: String,
    logical_id: String,
    stage_name: String,
    cors: Option<CorsOptions>,
    methods: Vec<String>,
    /// Resources and methods the deployment snapshots, as `[logical_id, properties]`.
    snapshot: Vec<Value>,
}

impl RestApi {
    /// Declare the API at construct `id`.
    pub fn new(stack: &mut Stack, id: &str, props: &RestApiProps) -> CdkResult<Self> {
        let mut properties = json!({ "Name": props.rest_api_name });
        if let Some(description) = &props.description {
            properties["Description"] = json!(description);
        }
        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new("AWS::ApiGateway::RestApi", properties),
        )?;

        let mut api = Self {
            id: id.to_owned(),
            logical_id,
            stage_name: props.stage_name.clone(),
            cors: props.default_cors.clone(),
            methods: Vec::new(),
            snapshot: Vec::new(),
        };
        let root = api.root();
        api.add_preflight(stack, &root)?;
        Ok(api)
    }

    /// Logical ID of the API.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// API ID (`Ref`).
    #[must_use]
    pub fn rest_api_id(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// Deployment stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// The root (`/`) resource.
    #[must_use]
    pub fn root(&self) -> ApiResource {
        ApiResource {
            path: vec![self.id.clone(), "Default".to_owned()],
            resource_id: Expr::get_att(&self.logical_id, "RootResourceId"),
            url_path: "/".to_owned(),
        }
    }

    /// Declare a child resource under `parent`.
    pub fn add_resource(
        &mut self,
        stack: &mut Stack,
        parent: &ApiResource,
        path_part: &str,
    ) -> CdkResult<ApiResource> {
        let path = parent.child_path(path_part);
        let mut resource_path = path.clone();
        resource_path.push("Resource".to_owned());

        let properties = json!({
            "ParentId": parent.resource_id,
            "PathPart": path_part,
            "RestApiId": self.rest_api_id(),
        });
        let logical_id =
            self.declare(stack, &resource_path, "AWS::ApiGateway::Resource", properties)?;

        let url_path = if parent.url_path == "/" {
            format!("/{path_part}")
        } else {
            format!("{}/{path_part}", parent.url_path)
        };
        let resource = ApiResource {
            path,
            resource_id: Expr::reference(logical_id),
            url_path,
        };
        self.add_preflight(stack, &resource)?;
        Ok(resource)
    }

    /// Add a greedy `{proxy+}` child forwarding every method to a function.
    ///
    /// The `ANY` method uses a Lambda proxy integration; the function gets
    /// invoke permissions for the deployed stage and for test invocations
    /// from the console.
    pub fn add_proxy(
        &mut self,
        stack: &mut Stack,
        parent: &ApiResource,
        function_arn: &Expr,
    ) -> CdkResult<ApiResource> {
        let proxy = self.add_resource(stack, parent, "{proxy+}")?;

        let integration_uri = Expr::concat([
            Expr::literal("arn:"),
            Pseudo::Partition.into(),
            Expr::literal(":apigateway:"),
            Pseudo::Region.into(),
            Expr::literal(":lambda:path/2015-03-31/functions/"),
            function_arn.clone(),
            Expr::literal("/invocations"),
        ]);

        let method_path = proxy.child_path("ANY");
        let stage_arn = self.execute_api_arn(&self.stage_name, &proxy);
        let test_arn = self.execute_api_arn("test-invoke-stage", &proxy);
        for (suffix, source_arn) in [("", stage_arn), (".Test", test_arn)] {
            let mut permission_path = method_path.clone();
            permission_path.push(format!(
                "ApiPermission{}{}{suffix}",
                self.id,
                proxy.url_path.replace(['/', '{', '}', '+'], "")
            ));
            lambda::add_invoke_permission(
                stack,
                &permission_path,
                function_arn.clone(),
                "apigateway.amazonaws.com",
                source_arn,
            )?;
        }

        let mut resource_path = method_path;
        resource_path.push("Resource".to_owned());
        let properties = json!({
            "AuthorizationType": "NONE",
            "HttpMethod": "ANY",
            "Integration": {
                "IntegrationHttpMethod": "POST",
                "Type": "AWS_PROXY",
                "Uri": integration_uri,
            },
            "ResourceId": proxy.resource_id,
            "RestApiId": self.rest_api_id(),
        });
        let method = self.declare(stack, &resource_path, "AWS::ApiGateway::Method", properties)?;
        self.methods.push(method);
        Ok(proxy)
    }

    /// Declare the deployment, the stage and the endpoint output.
    ///
    /// The deployment's logical ID embeds a hash of every resource and method,
    /// so CloudFormation creates a fresh deployment whenever the API changes.
    /// Returns the endpoint URL expression.
    pub fn deploy(self, stack: &mut Stack) -> CdkResult<Expr> {
        let deployment = stack.add_resource(
            &[self.id.as_str(), "Deployment", "Resource"],
            CfnResource::new(
                "AWS::ApiGateway::Deployment",
                json!({
                    "Description": "Automatically created by the RestApi construct",
                    "RestApiId": self.rest_api_id(),
                }),
            )
            .depends_on(self.methods.iter().cloned())
            .logical_id_salt(Value::Array(self.snapshot.clone()).to_string()),
        )?;

        let stage_id = format!("DeploymentStage.{}", self.stage_name);
        let stage = stack.add_resource(
            &[self.id.as_str(), stage_id.as_str(), "Resource"],
            CfnResource::new(
                "AWS::ApiGateway::Stage",
                json!({
                    "DeploymentId": Expr::reference(deployment),
                    "RestApiId": self.rest_api_id(),
                    "StageName": self.stage_name,
                }),
            ),
        )?;

        let endpoint = Expr::concat([
            Expr::literal("https://"),
            self.rest_api_id(),
            Expr::literal(".execute-api."),
            Pseudo::Region.into(),
            Expr::literal("."),
            Pseudo::UrlSuffix.into(),
            Expr::literal("/"),
            Expr::reference(stage),
            Expr::literal("/"),
        ]);
        stack.add_output(
            &[self.id.as_str(), "Endpoint"],
            CfnOutput::new(endpoint.clone()),
        )?;

        tracing::debug!(
            api = %self.id,
            stage = %self.stage_name,
            methods = self.methods.len(),
            "deployed rest api",
        );
        Ok(endpoint)
    }

    fn add_preflight(&mut self, stack: &mut Stack, resource: &ApiResource) -> CdkResult<()> {
        let Some(cors) = &self.cors else {
            return Ok(());
        };
        let properties = cors.preflight_method(&self.rest_api_id(), &resource.resource_id);
        let mut path = resource.child_path("OPTIONS");
        path.push("Resource".to_owned());
        let method = self.declare(stack, &path, "AWS::ApiGateway::Method", properties)?;
        self.methods.push(method);
        Ok(())
    }

    /// Declare a resource or method and record it in the deployment snapshot.
    fn declare(
        &mut self,
        stack: &mut Stack,
        path: &[String],
        resource_type: &str,
        properties: Value,
    ) -> CdkResult<String> {
        let logical_id =
            stack.add_resource(path, CfnResource::new(resource_type, properties.clone()))?;
        self.snapshot.push(json!([logical_id, properties]));
        Ok(logical_id)
    }

    fn execute_api_arn(&self, stage: &str, resource: &ApiResource) -> Expr {
        Expr::concat([
            Expr::literal("arn:"),
            Pseudo::Partition.into(),
            Expr::literal(":execute-api:"),
            Pseudo::Region.into(),
            Expr::literal(":"),
            Pseudo::AccountId.into(),
            Expr::literal(":"),
            self.rest_api_id(),
            Expr::literal(source_arn_suffix(stage, &resource.url_path)),
        ])
    }
}

/// Method-and-path part of an `execute-api` ARN, any method on `url_path`.
fn source_arn_suffix(stage: &str, url_path: &str) -> String {
    format!("/{stage}/*{}", url_path.replace("{proxy+}", "*"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackProps;

    fn api(stack: &mut Stack, cors: bool) -> RestApi {
        let props = RestApiProps {
            rest_api_name: "Test".to_owned(),
            description: Some("test api".to_owned()),
            stage_name: "dev".to_owned(),
            default_cors: cors.then(CorsOptions::permissive),
        };
        RestApi::new(stack, "Api", &props).unwrap()
    }

    #[test]
    fn test_should_build_nested_resource_paths() {
        let mut stack = Stack::new("Test", &StackProps::default());
        let mut api = api(&mut stack, false);
        let root = api.root();
        let v0 = api.add_resource(&mut stack, &root, "api").unwrap();
        let v1 = api.add_resource(&mut stack, &v0, "v1").unwrap();
        assert_eq!(v1.url_path(), "/api/v1");

        let template = stack.to_template().unwrap();
        assert_eq!(template.resource_count("AWS::ApiGateway::Resource"), 2);
        assert!(template.has_resource_properties(
            "AWS::ApiGateway::Resource",
            &json!({
                "PathPart": "api",
                "ParentId": { "Fn::GetAtt": [api.logical_id(), "RootResourceId"] },
            })
        ));
    }

    #[test]
    fn test_should_add_preflight_to_every_resource() {
        let mut stack = Stack::new("Test", &StackProps::default());
        let mut api = api(&mut stack, true);
        let root = api.root();
        api.add_resource(&mut stack, &root, "api").unwrap();

        let template = stack.to_template().unwrap();
        assert_eq!(template.resource_count("AWS::ApiGateway::Method"), 2);
        assert!(template.has_resource_properties(
            "AWS::ApiGateway::Method",
            &json!({
                "HttpMethod": "OPTIONS",
                "Integration": {
                    "Type": "MOCK",
                    "IntegrationResponses": [{
                        "ResponseParameters": {
                            "method.response.header.Access-Control-Allow-Origin": "'*'",
                            "method.response.header.Access-Control-Allow-Headers": "'*'",
                            "method.response.header.Access-Control-Allow-Methods":
                                "'OPTIONS,GET,PUT,POST,DELETE,PATCH,HEAD'",
                        },
                        "StatusCode": "204",
                    }],
                },
            })
        ));
    }

    #[test]
    fn test_should_proxy_any_method_to_function() {
        let mut stack = Stack::new("Test", &StackProps::default());
        let mut api = api(&mut stack, false);
        let root = api.root();
        let v1 = api.add_resource(&mut stack, &root, "v1").unwrap();
        let proxy = api
            .add_proxy(&mut stack, &v1, &Expr::get_att("Fn", "Arn"))
            .unwrap();
        assert_eq!(proxy.url_path(), "/v1/{proxy+}");

        let template = stack.to_template().unwrap();
        assert!(template.has_resource_properties(
            "AWS::ApiGateway::Method",
            &json!({
                "HttpMethod": "ANY",
                "Integration": { "Type": "AWS_PROXY", "IntegrationHttpMethod": "POST" },
            })
        ));
        assert_eq!(template.resource_count("AWS::Lambda::Permission"), 2);
        assert!(template.has_resource_properties(
            "AWS::ApiGateway::Resource",
            &json!({ "PathPart": "{proxy+}" })
        ));
    }

    #[test]
    fn test_should_scope_permissions_to_stage_and_test_invoke() {
        assert_eq!(source_arn_suffix("dev", "/api/v1/{proxy+}"), "/dev/*/api/v1/*");
        assert_eq!(
            source_arn_suffix("test-invoke-stage", "/api/v1/{proxy+}"),
            "/test-invoke-stage/*/api/v1/*"
        );
    }

    #[test]
    fn test_should_deploy_stage_after_methods() {
        let mut stack = Stack::new("Test", &StackProps::default());
        let mut api = api(&mut stack, true);
        let root = api.root();
        api.add_proxy(&mut stack, &root, &Expr::get_att("Fn", "Arn"))
            .unwrap();
        api.deploy(&mut stack).unwrap();

        let template = stack.to_template().unwrap();
        let (_, deployment) = template.find_resources("AWS::ApiGateway::Deployment")[0];
        assert_eq!(deployment["DependsOn"].as_array().unwrap().len(), 3);
        assert!(template.has_resource_properties(
            "AWS::ApiGateway::Stage",
            &json!({ "StageName": "dev" })
        ));
        assert_eq!(template.outputs.len(), 1);
    }

    fn deployment_id(with_proxy: bool) -> String {
        let mut stack = Stack::new("Test", &StackProps::default());
        let mut api = api(&mut stack, true);
        let root = api.root();
        let v1 = api.add_resource(&mut stack, &root, "v1").unwrap();
        if with_proxy {
            api.add_proxy(&mut stack, &v1, &Expr::get_att("Fn", "Arn"))
                .unwrap();
        }
        api.deploy(&mut stack).unwrap();
        let template = stack.to_template().unwrap();
        let (id, _) = template.find_resources("AWS::ApiGateway::Deployment")[0];
        id.to_owned()
    }

    #[test]
    fn test_should_replace_deployment_when_api_changes() {
        let without_proxy = deployment_id(false);
        let with_proxy = deployment_id(true);
        assert!(without_proxy.starts_with("ApiDeployment"));
        assert_ne!(without_proxy, with_proxy);
        assert_eq!(with_proxy, deployment_id(true));
    }

    #[test]
    fn test_should_point_stage_at_hashed_deployment() {
        let mut stack = Stack::new("Test", &StackProps::default());
        let api = api(&mut stack, true);
        api.deploy(&mut stack).unwrap();

        let template = stack.to_template().unwrap();
        let (deployment, _) = template.find_resources("AWS::ApiGateway::Deployment")[0];
        assert!(template.has_resource_properties(
            "AWS::ApiGateway::Stage",
            &json!({ "DeploymentId": { "Ref": deployment } })
        ));
    }
}
