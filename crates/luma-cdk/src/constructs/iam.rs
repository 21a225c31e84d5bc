//! IAM roles, policies and policy documents.

use serde_json::{Value, json};

use crate::error::CdkResult;
use crate::intrinsic::{Expr, Pseudo};
use crate::stack::{CfnResource, Stack};

/// Policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Grant the actions.
    Allow,
    /// Deny the actions.
    Deny,
}

/// A single statement of a policy document.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<Expr>,
    principal: Option<Value>,
    condition: Option<Value>,
}

impl PolicyStatement {
    /// An `Allow` statement for the given actions.
    #[must_use]
    pub fn allow<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: Vec::new(),
            principal: None,
            condition: None,
        }
    }

    /// Restrict the statement to these resources.
    #[must_use]
    pub fn resources(mut self, resources: impl IntoIterator<Item = Expr>) -> Self {
        self.resources.extend(resources);
        self
    }

    /// Apply to a service principal (resource policies only).
    #[must_use]
    pub fn service_principal(mut self, service: &str) -> Self {
        self.principal = Some(json!({ "Service": service }));
        self
    }

    /// Add a condition block.
    #[must_use]
    pub fn condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Render the statement JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = serde_json::Map::new();
        out.insert("Action".to_owned(), one_or_many(&self.actions));
        if let Some(condition) = &self.condition {
            out.insert("Condition".to_owned(), condition.clone());
        }
        out.insert(
            "Effect".to_owned(),
            json!(match self.effect {
                Effect::Allow => "Allow",
                Effect::Deny => "Deny",
            }),
        );
        if let Some(principal) = &self.principal {
            out.insert("Principal".to_owned(), principal.clone());
        }
        match self.resources.as_slice() {
            [] => {}
            [single] => {
                out.insert("Resource".to_owned(), single.to_json());
            }
            many => {
                out.insert(
                    "Resource".to_owned(),
                    Value::Array(many.iter().map(Expr::to_json).collect()),
                );
            }
        }
        Value::Object(out)
    }
}

fn one_or_many(items: &[String]) -> Value {
    match items {
        [single] => json!(single),
        many => json!(many),
    }
}

/// Render a policy document from statements.
#[must_use]
pub fn policy_document(statements: &[PolicyStatement]) -> Value {
    json!({
        "Statement": statements.iter().map(PolicyStatement::to_json).collect::<Vec<_>>(),
        "Version": POLICY_VERSION,
    })
}

/// ARN of an AWS managed policy, e.g. `service-role/AWSLambdaBasicExecutionRole`.
#[must_use]
pub fn managed_policy_arn(name: &str) -> Expr {
    Expr::concat([
        Expr::literal("arn:"),
        Pseudo::Partition.into(),
        Expr::literal(format!(":iam::aws:policy/{name}")),
    ])
}

/// A declared `AWS::IAM::Role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    path: Vec<String>,
    logical_id: String,
}

impl Role {
    /// Declare a role assumable by an AWS service.
    pub fn for_service<S: AsRef<str>>(
        stack: &mut Stack,
        scope: &[S],
        service: &str,
        managed_policies: &[&str],
    ) -> CdkResult<Self> {
        let path: Vec<String> = scope.iter().map(|s| s.as_ref().to_owned()).collect();
        let mut resource_path = path.clone();
        resource_path.push("Resource".to_owned());

        let assume = policy_document(&[PolicyStatement {
            principal: Some(json!({ "Service": service })),
            ..PolicyStatement::allow(["sts:AssumeRole"])
        }]);
        let mut properties = json!({ "AssumeRolePolicyDocument": assume });
        if !managed_policies.is_empty() {
            properties["ManagedPolicyArns"] = managed_policies
                .iter()
                .map(|p| managed_policy_arn(p).to_json())
                .collect();
        }

        let logical_id =
            stack.add_resource(&resource_path, CfnResource::new("AWS::IAM::Role", properties))?;
        Ok(Self { path, logical_id })
    }

    /// Handle to a role already declared under `scope`.
    pub(crate) fn declared_at<S: AsRef<str>>(scope: &[S]) -> Self {
        let path: Vec<String> = scope.iter().map(|s| s.as_ref().to_owned()).collect();
        let mut resource_path = path.clone();
        resource_path.push("Resource".to_owned());
        Self {
            logical_id: crate::logical_id::allocate(&resource_path),
            path,
        }
    }

    /// Logical ID of the role.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Construct path of the role (without the trailing `Resource`).
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Role name (`Ref`).
    #[must_use]
    pub fn role_name(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// Role ARN.
    #[must_use]
    pub fn role_arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }

    /// Attach an inline `AWS::IAM::Policy` at `scope` and return its logical ID.
    pub fn attach_policy<S: AsRef<str>>(
        &self,
        stack: &mut Stack,
        scope: &[S],
        statements: &[PolicyStatement],
    ) -> CdkResult<String> {
        let mut resource_path: Vec<&str> = scope.iter().map(AsRef::as_ref).collect();
        resource_path.push("Resource");
        let policy_name = crate::logical_id::allocate(&resource_path);

        stack.add_resource(
            &resource_path,
            CfnResource::new(
                "AWS::IAM::Policy",
                json!({
                    "PolicyDocument": policy_document(statements),
                    "PolicyName": policy_name,
                    "Roles": [self.role_name()],
                }),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackProps;

    #[test]
    fn test_should_render_single_action_as_string() {
        let statement = PolicyStatement::allow(["s3:GetObject"])
            .resources([Expr::literal("arn:aws:s3:::b/*")])
            .service_principal("cloudfront.amazonaws.com");
        assert_eq!(
            statement.to_json(),
            json!({
                "Action": "s3:GetObject",
                "Effect": "Allow",
                "Principal": { "Service": "cloudfront.amazonaws.com" },
                "Resource": "arn:aws:s3:::b/*",
            })
        );
    }

    #[test]
    fn test_should_declare_service_role_with_managed_policy() {
        let mut stack = Stack::new("Test", &StackProps::default());
        let role = Role::for_service(
            &mut stack,
            &["Fn", "ServiceRole"],
            "lambda.amazonaws.com",
            &["service-role/AWSLambdaBasicExecutionRole"],
        )
        .unwrap();

        let template = stack.to_template().unwrap();
        let props = template.single_resource_properties("AWS::IAM::Role").unwrap();
        assert_eq!(
            props["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            "lambda.amazonaws.com"
        );
        assert_eq!(
            props["ManagedPolicyArns"][0]["Fn::Join"][1][1],
            json!({ "Ref": "AWS::Partition" })
        );
        assert!(role.logical_id().starts_with("FnServiceRole"));
    }

    #[test]
    fn test_should_attach_policy_to_role() {
        let mut stack = Stack::new("Test", &StackProps::default());
        let role =
            Role::for_service(&mut stack, &["Handler", "ServiceRole"], "lambda.amazonaws.com", &[])
                .unwrap();
        role.attach_policy(
            &mut stack,
            &["Handler", "ServiceRole", "DefaultPolicy"],
            &[PolicyStatement::allow(["cloudfront:CreateInvalidation"])
                .resources([Expr::literal("*")])],
        )
        .unwrap();

        let template = stack.to_template().unwrap();
        assert!(template.has_resource_properties(
            "AWS::IAM::Policy",
            &json!({ "Roles": [{ "Ref": role.logical_id() }] })
        ));
    }
}
