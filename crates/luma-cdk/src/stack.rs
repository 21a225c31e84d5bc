//! Stacks: the declaration graph of one deployment unit.
//!
//! A [`Stack`] accumulates resources, outputs and assets. Declarations are
//! write-once: a resource cannot be changed or removed after it is added, and
//! each construct path may be used only once.
//!
//! Values flow between stacks as [`ExportedValue`]s. Resolving one inside a
//! different stack with [`Stack::import`] yields an `Fn::ImportValue` and
//! records a dependency on the producing stack.

use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value, json};
use typed_builder::TypedBuilder;

use crate::asset::{self, Asset, AssetKind, FingerprintedAsset};
use crate::error::{CdkError, CdkResult};
use crate::intrinsic::Expr;
use crate::logical_id;
use crate::synthesizer;
use crate::template::Template;
use crate::types::Environment;

/// Properties shared by every stack.
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct StackProps {
    /// Deployment target. `None` synthesizes an environment-agnostic stack.
    #[builder(default, setter(strip_option))]
    pub env: Option<Environment>,
    /// Template description.
    #[builder(default, setter(strip_option, into))]
    pub description: Option<String>,
}

/// What happens to a resource when it leaves the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Delete the physical resource.
    Destroy,
    /// Keep the physical resource, orphaning it from the stack.
    Retain,
}

impl RemovalPolicy {
    /// Value of `DeletionPolicy` / `UpdateReplacePolicy`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
        }
    }
}

/// A single declared CloudFormation resource.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnResource {
    resource_type: String,
    properties: Value,
    depends_on: Vec<String>,
    removal_policy: Option<RemovalPolicy>,
    id_salt: Option<String>,
}

impl CfnResource {
    /// A resource of the given type with the given properties.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            removal_policy: None,
            id_salt: None,
        }
    }

    /// Add explicit `DependsOn` entries.
    #[must_use]
    pub fn depends_on<I, S>(mut self, logical_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(logical_ids.into_iter().map(Into::into));
        self
    }

    /// Set the removal policy.
    #[must_use]
    pub fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    /// Mix `salt` into the logical ID, so any change to it replaces the resource.
    #[must_use]
    pub fn logical_id_salt(mut self, salt: impl Into<String>) -> Self {
        self.id_salt = Some(salt.into());
        self
    }

    /// The CloudFormation type, e.g. `AWS::S3::Bucket`.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Resource properties.
    #[must_use]
    pub fn properties(&self) -> &Value {
        &self.properties
    }

    fn to_json(&self, path: &str) -> Value {
        let mut out = Map::new();
        out.insert("Type".to_owned(), json!(self.resource_type));
        if !self.properties.is_null() {
            out.insert("Properties".to_owned(), self.properties.clone());
        }
        if !self.depends_on.is_empty() {
            let mut deps = self.depends_on.clone();
            deps.sort();
            deps.dedup();
            out.insert("DependsOn".to_owned(), json!(deps));
        }
        if let Some(policy) = self.removal_policy {
            out.insert("UpdateReplacePolicy".to_owned(), json!(policy.as_str()));
            out.insert("DeletionPolicy".to_owned(), json!(policy.as_str()));
        }
        out.insert("Metadata".to_owned(), json!({ "aws:cdk:path": path }));
        Value::Object(out)
    }
}

/// A template output, optionally exported for other stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnOutput {
    value: Expr,
    description: Option<String>,
    export_name: Option<String>,
}

impl CfnOutput {
    /// An output with the given value.
    #[must_use]
    pub fn new(value: Expr) -> Self {
        Self {
            value,
            description: None,
            export_name: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Export the output under a region-wide name.
    #[must_use]
    pub fn export_name(mut self, name: impl Into<String>) -> Self {
        self.export_name = Some(name.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        if let Some(description) = &self.description {
            out.insert("Description".to_owned(), json!(description));
        }
        out.insert("Value".to_owned(), self.value.to_json());
        if let Some(name) = &self.export_name {
            out.insert("Export".to_owned(), json!({ "Name": name }));
        }
        Value::Object(out)
    }
}

/// A value published by one stack for consumption by others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedValue {
    stack: String,
    export_name: String,
    value: Expr,
}

impl ExportedValue {
    /// Name of the producing stack.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// The export name.
    #[must_use]
    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    /// The expression as seen from inside the producing stack.
    #[must_use]
    pub fn local_value(&self) -> &Expr {
        &self.value
    }
}

#[derive(Debug, Clone)]
struct Declared<T> {
    logical_id: String,
    path: String,
    item: T,
}

/// The declaration graph of one stack.
#[derive(Debug)]
pub struct Stack {
    name: String,
    env: Option<Environment>,
    description: Option<String>,
    resources: Vec<Declared<CfnResource>>,
    outputs: Vec<Declared<CfnOutput>>,
    assets: Vec<Asset>,
    dependencies: BTreeSet<String>,
    paths: HashSet<String>,
    logical_ids: HashSet<String>,
    export_names: HashSet<String>,
}

/// Output of synthesizing a single stack.
#[derive(Debug, Clone)]
pub struct SynthesizedStack {
    /// The rendered template.
    pub template: Template,
    /// Assets with their fingerprints, in declaration order.
    pub assets: Vec<FingerprintedAsset>,
}

impl Stack {
    /// Create an empty stack.
    #[must_use]
    pub fn new(name: impl Into<String>, props: &StackProps) -> Self {
        let name = name.into();
        tracing::debug!(stack = %name, env = ?props.env, "declaring stack");
        Self {
            name,
            env: props.env.clone(),
            description: props.description.clone(),
            resources: Vec::new(),
            outputs: Vec::new(),
            assets: Vec::new(),
            dependencies: BTreeSet::new(),
            paths: HashSet::new(),
            logical_ids: HashSet::new(),
            export_names: HashSet::new(),
        }
    }

    /// Stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deployment target, if any.
    #[must_use]
    pub fn env(&self) -> Option<&Environment> {
        self.env.as_ref()
    }

    /// Names of the stacks this stack imports values from.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(String::as_str)
    }

    /// Declared assets, in declaration order.
    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Whether a construct path has been declared.
    #[must_use]
    pub fn has_path<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.paths.contains(&join_path(path))
    }

    /// Declared resources as `(logical_id, resource)` pairs.
    pub fn resources(&self) -> impl Iterator<Item = (&str, &CfnResource)> {
        self.resources
            .iter()
            .map(|d| (d.logical_id.as_str(), &d.item))
    }

    /// Declare a resource at a construct path and return its logical ID.
    pub fn add_resource<S: AsRef<str>>(
        &mut self,
        path: &[S],
        resource: CfnResource,
    ) -> CdkResult<String> {
        let (logical_id, path) = self.claim(path, resource.id_salt.as_deref())?;
        tracing::debug!(
            stack = %self.name,
            logical_id = %logical_id,
            resource_type = %resource.resource_type,
            "declared resource",
        );
        self.resources.push(Declared {
            logical_id: logical_id.clone(),
            path,
            item: resource,
        });
        Ok(logical_id)
    }

    /// Declare an output at a construct path and return its logical ID.
    pub fn add_output<S: AsRef<str>>(
        &mut self,
        path: &[S],
        output: CfnOutput,
    ) -> CdkResult<String> {
        if let Some(name) = &output.export_name {
            if self.export_names.contains(name) {
                return Err(CdkError::DuplicateExport {
                    stack: self.name.clone(),
                    export_name: name.clone(),
                });
            }
        }
        let (logical_id, path) = self.claim(path, None)?;
        if let Some(name) = &output.export_name {
            self.export_names.insert(name.clone());
        }
        self.outputs.push(Declared {
            logical_id: logical_id.clone(),
            path,
            item: output,
        });
        Ok(logical_id)
    }

    /// Declare an exported output and return the handle other stacks consume.
    pub fn export_value(
        &mut self,
        id: &str,
        value: Expr,
        description: &str,
        export_name: &str,
    ) -> CdkResult<ExportedValue> {
        let output = CfnOutput::new(value.clone())
            .description(description)
            .export_name(export_name);
        self.add_output(&[id], output)?;
        Ok(ExportedValue {
            stack: self.name.clone(),
            export_name: export_name.to_owned(),
            value,
        })
    }

    /// Resolve an exported value for use inside this stack.
    ///
    /// Values from this stack resolve to their local expression; values from
    /// another stack become `Fn::ImportValue` and add a stack dependency.
    pub fn import(&mut self, exported: &ExportedValue) -> Expr {
        if exported.stack == self.name {
            return exported.value.clone();
        }
        if self.dependencies.insert(exported.stack.clone()) {
            tracing::debug!(
                stack = %self.name,
                dependency = %exported.stack,
                "added stack dependency",
            );
        }
        Expr::import(&exported.export_name)
    }

    /// Register an asset and return the placeholder for its fingerprint.
    pub fn add_asset<S: AsRef<str>>(
        &mut self,
        path: &[S],
        kind: AssetKind,
        source: impl Into<std::path::PathBuf>,
    ) -> String {
        let index = self.assets.len();
        self.assets.push(Asset {
            kind,
            source: source.into(),
            construct_path: self.full_path(&join_path(path)),
        });
        asset::hash_token(index)
    }

    /// Render the template. Fingerprints assets, so missing sources fail here.
    pub fn to_template(&self) -> CdkResult<Template> {
        Ok(self.synthesize()?.template)
    }

    /// Fingerprint assets and render the template.
    pub fn synthesize(&self) -> CdkResult<SynthesizedStack> {
        let assets = self
            .assets
            .iter()
            .map(|a| {
                asset::fingerprint(&a.source).map(|hash| FingerprintedAsset {
                    asset: a.clone(),
                    hash,
                })
            })
            .collect::<CdkResult<Vec<_>>>()?;

        let tokens: Vec<(String, &str)> = assets
            .iter()
            .enumerate()
            .map(|(i, a)| (asset::hash_token(i), a.hash.as_str()))
            .collect();

        let mut resources = Map::new();
        for declared in &self.resources {
            let mut json = declared.item.to_json(&declared.path);
            substitute_tokens(&mut json, &tokens);
            resources.insert(declared.logical_id.clone(), json);
        }

        let mut outputs = Map::new();
        for declared in &self.outputs {
            let mut json = declared.item.to_json();
            substitute_tokens(&mut json, &tokens);
            outputs.insert(declared.logical_id.clone(), json);
        }

        Ok(SynthesizedStack {
            template: Template {
                description: self.description.clone(),
                parameters: synthesizer::bootstrap_parameters(),
                rules: synthesizer::bootstrap_rules(),
                resources,
                outputs,
            },
            assets,
        })
    }

    fn full_path(&self, relative: &str) -> String {
        format!("{}/{relative}", self.name)
    }

    /// Reserve a construct path and allocate its logical ID.
    fn claim<S: AsRef<str>>(
        &mut self,
        path: &[S],
        salt: Option<&str>,
    ) -> CdkResult<(String, String)> {
        let joined = join_path(path);
        if self.paths.contains(&joined) {
            return Err(CdkError::DuplicateConstructPath(self.full_path(&joined)));
        }
        let mut logical_id = logical_id::allocate(path);
        if let Some(salt) = salt.filter(|_| !logical_id.is_empty()) {
            logical_id = logical_id::salted(&logical_id, salt);
        }
        if logical_id.is_empty() || self.logical_ids.contains(&logical_id) {
            return Err(CdkError::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id,
            });
        }
        self.paths.insert(joined.clone());
        self.logical_ids.insert(logical_id.clone());
        Ok((logical_id, self.full_path(&joined)))
    }
}

fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("/")
}

/// Replace asset placeholders in every string of a JSON tree.
fn substitute_tokens(value: &mut Value, tokens: &[(String, &str)]) {
    match value {
        Value::String(s) => {
            if s.contains("${Token[") {
                for (token, hash) in tokens {
                    *s = s.replace(token.as_str(), hash);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_tokens(item, tokens);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_tokens(item, tokens);
            }
        }
        _ => {}
    }
}
