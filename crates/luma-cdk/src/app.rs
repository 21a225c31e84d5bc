//! The app: an ordered set of stacks and the cloud assembly they synthesize to.
//!
//! [`App::synth`] writes, under the output directory:
//!
//! ```text
//! cdk.out                    schema version marker
//! manifest.json              artifacts, environments, stack dependencies
//! <Stack>.template.json      one CloudFormation template per stack
//! <Stack>.assets.json        what the CLI must publish before deploying
//! asset.<hash>/              staged copies of every asset source
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::asset::{self, AssetKind, AssetManifest};
use crate::error::{CdkError, CdkResult};
use crate::stack::Stack;
use crate::synthesizer;
use crate::template::Template;
use crate::types::Environment;

/// Root of the declaration graph.
#[derive(Debug)]
pub struct App {
    out_dir: PathBuf,
    stacks: Vec<Stack>,
}

/// A synthesized stack inside a [`CloudAssembly`].
#[derive(Debug, Clone)]
pub struct StackArtifact {
    /// Stack name.
    pub name: String,
    /// Rendered template.
    pub template: Template,
    /// Path of the written template file.
    pub template_file: PathBuf,
    /// `aws://account/region` of the stack.
    pub environment: String,
    /// Stacks that must be deployed first.
    pub dependencies: Vec<String>,
}

/// The result of synthesis.
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    /// Assembly directory.
    pub directory: PathBuf,
    /// Stacks in deployment order.
    pub stacks: Vec<StackArtifact>,
}

impl CloudAssembly {
    /// Look up a stack artifact by name.
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&StackArtifact> {
        self.stacks.iter().find(|s| s.name == name)
    }
}

impl App {
    /// Create an app that synthesizes into `out_dir`.
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            stacks: Vec::new(),
        }
    }

    /// Assembly output directory.
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Add a fully declared stack.
    pub fn add_stack(&mut self, stack: Stack) -> CdkResult<()> {
        if self.stack(stack.name()).is_some() {
            return Err(CdkError::DuplicateStack(stack.name().to_owned()));
        }
        self.stacks.push(stack);
        Ok(())
    }

    /// Look up a stack by name.
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Stacks in the order they were added.
    #[must_use]
    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Check that every stack's dependencies were added before it.
    pub fn validate(&self) -> CdkResult<()> {
        for (i, stack) in self.stacks.iter().enumerate() {
            for dependency in stack.dependencies() {
                if !self.stacks[..i].iter().any(|s| s.name() == dependency) {
                    return Err(CdkError::UnknownDependency {
                        stack: stack.name().to_owned(),
                        dependency: dependency.to_owned(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Synthesize every stack and write the cloud assembly.
    pub fn synth(&self) -> CdkResult<CloudAssembly> {
        self.validate()?;

        let dir = &self.out_dir;
        fs::create_dir_all(dir).map_err(CdkError::io(dir))?;
        tracing::info!(
            out_dir = %dir.display(),
            stacks = self.stacks.len(),
            "synthesizing cloud assembly",
        );

        let mut artifacts = Map::new();
        let mut stacks = Vec::with_capacity(self.stacks.len());

        for stack in &self.stacks {
            let artifact = self.synth_stack(stack, &mut artifacts)?;
            tracing::info!(
                stack = %artifact.name,
                resources = artifact.template.resources.len(),
                outputs = artifact.template.outputs.len(),
                "synthesized stack",
            );
            stacks.push(artifact);
        }

        let manifest = json!({
            "version": synthesizer::CLOUD_ASSEMBLY_VERSION,
            "artifacts": artifacts,
        });
        write_json(&dir.join("manifest.json"), &manifest)?;
        write_json(
            &dir.join("cdk.out"),
            &json!({ "version": synthesizer::CLOUD_ASSEMBLY_VERSION }),
        )?;

        Ok(CloudAssembly {
            directory: dir.clone(),
            stacks,
        })
    }

    fn synth_stack(
        &self,
        stack: &Stack,
        artifacts: &mut Map<String, Value>,
    ) -> CdkResult<StackArtifact> {
        let dir = &self.out_dir;
        let synthesized = stack.synthesize()?;
        let env = stack.env();

        let template_name = format!("{}.template.json", stack.name());
        let template_file = dir.join(&template_name);
        let template_json = synthesized.template.to_json_pretty()?;
        fs::write(&template_file, &template_json).map_err(CdkError::io(&template_file))?;

        let mut manifest = AssetManifest::new(env);
        for fingerprinted in &synthesized.assets {
            let staged = format!("asset.{}", fingerprinted.hash);
            asset::stage(&fingerprinted.asset.source, &dir.join(&staged))?;
            manifest.add(fingerprinted.asset.kind, &fingerprinted.hash, &staged);
        }
        let template_hash = hex::encode(Sha256::digest(template_json.as_bytes()).as_slice());
        manifest.add(AssetKind::File, &template_hash, &template_name);

        let assets_name = format!("{}.assets.json", stack.name());
        write_json(&dir.join(&assets_name), &manifest.to_json())?;

        let assets_artifact = format!("{}.assets", stack.name());
        artifacts.insert(
            assets_artifact.clone(),
            json!({
                "type": "cdk:asset-manifest",
                "properties": {
                    "file": assets_name,
                    "requiresBootstrapStackVersion": synthesizer::MIN_BOOTSTRAP_VERSION,
                    "bootstrapStackVersionSsmParameter":
                        synthesizer::bootstrap_version_ssm_parameter(),
                }
            }),
        );

        let environment = env.map_or_else(|| Environment::UNKNOWN_URI.to_owned(), Environment::uri);
        let dependencies: Vec<String> = stack.dependencies().map(str::to_owned).collect();
        let mut manifest_deps = dependencies.clone();
        manifest_deps.push(assets_artifact);

        let specialize = |s: &str| synthesizer::specialize(s, env);
        let bootstrap_parameter = synthesizer::bootstrap_version_ssm_parameter();
        artifacts.insert(
            stack.name().to_owned(),
            json!({
                "type": "aws:cloudformation:stack",
                "environment": environment,
                "properties": {
                    "templateFile": template_name,
                    "validateOnSynth": false,
                    "assumeRoleArn": specialize(&synthesizer::role_arn("deploy-role")),
                    "cloudFormationExecutionRoleArn":
                        specialize(&synthesizer::role_arn("cfn-exec-role")),
                    "stackTemplateAssetObjectUrl": format!(
                        "s3://{}/{template_hash}.json",
                        specialize(&synthesizer::file_assets_bucket())
                    ),
                    "requiresBootstrapStackVersion": synthesizer::MIN_BOOTSTRAP_VERSION,
                    "bootstrapStackVersionSsmParameter": bootstrap_parameter,
                },
                "dependencies": manifest_deps,
                "displayName": stack.name(),
            }),
        );

        Ok(StackArtifact {
            name: stack.name().to_owned(),
            template: synthesized.template,
            template_file,
            environment,
            dependencies,
        })
    }
}

fn write_json(path: &Path, value: &Value) -> CdkResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(CdkError::io(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsic::Expr;
    use crate::stack::{CfnResource, StackProps};
    use crate::types::{AccountId, AwsRegion};

    fn env() -> Environment {
        Environment::new(
            AccountId::new("123456789012").unwrap(),
            AwsRegion::new("us-east-1").unwrap(),
        )
    }

    fn producer_and_consumer() -> (Stack, Stack) {
        let props = StackProps::builder().env(env()).build();
        let mut producer = Stack::new("Producer", &props);
        let exported = producer
            .export_value("Id", Expr::reference("Pool"), "id", "PoolId")
            .unwrap();

        let mut consumer = Stack::new("Consumer", &props);
        let imported = consumer.import(&exported);
        consumer
            .add_resource(
                &["Param"],
                CfnResource::new(
                    "AWS::SSM::Parameter",
                    json!({ "Type": "String", "Value": imported }),
                ),
            )
            .unwrap();
        (producer, consumer)
    }

    #[test]
    fn test_should_reject_duplicate_stack_names() {
        let mut app = App::new("unused");
        app.add_stack(Stack::new("A", &StackProps::default())).unwrap();
        let err = app
            .add_stack(Stack::new("A", &StackProps::default()))
            .unwrap_err();
        assert!(matches!(err, CdkError::DuplicateStack(name) if name == "A"));
    }

    #[test]
    fn test_should_reject_consumer_added_before_producer() {
        let (producer, consumer) = producer_and_consumer();
        let mut app = App::new("unused");
        app.add_stack(consumer).unwrap();
        app.add_stack(producer).unwrap();

        let err = app.validate().unwrap_err();
        assert!(matches!(
            err,
            CdkError::UnknownDependency { ref stack, ref dependency }
                if stack == "Consumer" && dependency == "Producer"
        ));
    }

    #[test]
    fn test_should_write_cloud_assembly() {
        let out = tempfile::tempdir().unwrap();
        let (producer, consumer) = producer_and_consumer();
        let mut app = App::new(out.path());
        app.add_stack(producer).unwrap();
        app.add_stack(consumer).unwrap();

        let assembly = app.synth().unwrap();

        assert!(out.path().join("cdk.out").is_file());
        assert!(out.path().join("Producer.template.json").is_file());
        assert!(out.path().join("Consumer.assets.json").is_file());

        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(out.path().join("manifest.json")).unwrap())
                .unwrap();
        let consumer = &manifest["artifacts"]["Consumer"];
        assert_eq!(consumer["type"], "aws:cloudformation:stack");
        assert_eq!(consumer["environment"], "aws://123456789012/us-east-1");
        assert_eq!(consumer["dependencies"], json!(["Producer", "Consumer.assets"]));
        assert_eq!(
            consumer["properties"]["assumeRoleArn"],
            "arn:aws:iam::123456789012:role/cdk-hnb659fds-deploy-role-123456789012-us-east-1"
        );

        let artifact = assembly.stack("Consumer").unwrap();
        assert_eq!(artifact.dependencies, vec!["Producer"]);
        assert!(artifact.template.has_resource_properties(
            "AWS::SSM::Parameter",
            &json!({ "Value": { "Fn::ImportValue": "PoolId" } })
        ));
    }

    #[test]
    fn test_should_round_trip_written_template() {
        let out = tempfile::tempdir().unwrap();
        let (producer, _) = producer_and_consumer();
        let mut app = App::new(out.path());
        app.add_stack(producer).unwrap();

        let assembly = app.synth().unwrap();
        let artifact = assembly.stack("Producer").unwrap();
        let written =
            Template::from_json(&fs::read_to_string(&artifact.template_file).unwrap()).unwrap();
        assert_eq!(written, artifact.template);
    }
}
