//! Full-app synthesis into a cloud assembly.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use luma_cdk::CdkError;
    use luma_cdk::asset::fingerprint;
    use luma_cdk::constructs::s3_deployment::handler_source;
    use luma_stacks::{AssetPaths, compose};
    use serde_json::{Value, json};

    use crate::app_config;

    struct Workspace {
        root: tempfile::TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let root = tempfile::tempdir().expect("tempdir");
            let api = root.path().join("api");
            let web = root.path().join("web");
            fs::create_dir_all(&api).expect("api dir");
            fs::create_dir_all(web.join("assets")).expect("web dir");
            fs::write(api.join("Dockerfile"), "FROM scratch\n").expect("dockerfile");
            fs::write(web.join("index.html"), "<!doctype html>").expect("index");
            fs::write(web.join("assets").join("app.js"), "console.log(1)").expect("js");
            Self { root }
        }

        fn path(&self, name: &str) -> std::path::PathBuf {
            self.root.path().join(name)
        }

        fn assets(&self) -> AssetPaths {
            AssetPaths::builder()
                .docker_asset_path(self.path("api"))
                .build_output_path(self.path("web"))
                .build()
        }
    }

    fn read_json(path: &Path) -> Value {
        let text = fs::read_to_string(path).expect("read json");
        serde_json::from_str(&text).expect("parse json")
    }

    #[test]
    fn test_should_write_cloud_assembly_for_all_stacks() {
        let workspace = Workspace::new();
        let out_dir = workspace.path("cdk.out");
        let config = app_config(&out_dir);

        let assembly = compose(&config, &workspace.assets())
            .expect("compose")
            .synth()
            .expect("synth");

        let names: Vec<&str> = assembly.stacks.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["LumaAuthStack", "LumaApiStack", "LumaFrontendStack"]);

        let manifest = read_json(&out_dir.join("manifest.json"));
        for name in &names {
            assert!(out_dir.join(format!("{name}.template.json")).is_file());
            assert!(out_dir.join(format!("{name}.assets.json")).is_file());
            let artifact = &manifest["artifacts"][*name];
            assert_eq!(artifact["type"], "aws:cloudformation:stack");
            assert_eq!(artifact["environment"], "aws://123456789012/eu-west-1");
        }

        let api = assembly.stack("LumaApiStack").expect("api artifact");
        assert_eq!(api.dependencies, ["LumaAuthStack"]);
        assert!(
            fs::read_dir(&out_dir)
                .expect("list assembly")
                .filter_map(Result::ok)
                .any(|e| e.file_name().to_string_lossy().starts_with("asset."))
        );
    }

    #[test]
    fn test_should_wire_api_to_auth_exports() {
        let workspace = Workspace::new();
        let config = app_config(&workspace.path("cdk.out"));
        let assembly = compose(&config, &workspace.assets())
            .expect("compose")
            .synth()
            .expect("synth");

        let auth = &assembly.stack("LumaAuthStack").expect("auth").template;
        assert_eq!(
            auth.export_names(),
            [
                "LumaIdentityPoolId",
                "LumaUserPoolArn",
                "LumaUserPoolClientId",
                "LumaUserPoolId",
            ]
        );

        let api = &assembly.stack("LumaApiStack").expect("api").template;
        let function = api
            .single_resource_properties("AWS::Lambda::Function")
            .expect("one function");
        let variables = &function["Environment"]["Variables"];
        assert_eq!(
            variables["LUMA_USER_POOL_CLIENT_ID"],
            json!({ "Fn::ImportValue": "LumaUserPoolClientId" })
        );
        assert_eq!(
            variables["LUMA_USER_POOL_ID"],
            json!({ "Fn::ImportValue": "LumaUserPoolId" })
        );
        let provider = variables["LUMA_USER_POOL_PROVIDER_NAME"].to_string();
        assert!(provider.contains("LumaUserPoolId"));
        assert!(!provider.to_lowercase().contains("placeholder"));
    }

    #[test]
    fn test_should_keep_frontend_private_behind_https() {
        let workspace = Workspace::new();
        let config = app_config(&workspace.path("cdk.out"));
        let assembly = compose(&config, &workspace.assets())
            .expect("compose")
            .synth()
            .expect("synth");

        let frontend = &assembly.stack("LumaFrontendStack").expect("frontend").template;
        assert!(frontend.has_resource_properties(
            "AWS::S3::Bucket",
            &json!({ "PublicAccessBlockConfiguration": { "BlockPublicPolicy": true } })
        ));
        assert!(frontend.has_resource_properties(
            "AWS::CloudFront::Distribution",
            &json!({ "DistributionConfig": {
                "DefaultCacheBehavior": { "ViewerProtocolPolicy": "redirect-to-https" }
            } })
        ));
        assert_eq!(frontend.resource_count("Custom::CDKBucketDeployment"), 1);
    }

    #[test]
    fn test_should_fail_synthesis_for_missing_asset_directory() {
        let workspace = Workspace::new();
        let config = app_config(&workspace.path("cdk.out"));
        let assets = AssetPaths::builder()
            .docker_asset_path(workspace.path("does-not-exist"))
            .build_output_path(workspace.path("web"))
            .build();

        let app = compose(&config, &assets).expect("declaration does not touch disk");
        let err = app.synth().expect_err("missing asset");
        assert!(matches!(
            err,
            CdkError::AssetNotFound(path) if path.ends_with("does-not-exist")
        ));
    }

    #[test]
    fn test_should_publish_deployment_handler_next_to_site_assets() {
        let workspace = Workspace::new();
        let out_dir = workspace.path("cdk.out");
        let config = app_config(&out_dir);
        compose(&config, &workspace.assets())
            .expect("compose")
            .synth()
            .expect("synth");

        let handler_hash = fingerprint(&handler_source()).expect("handler hash");
        let site_hash = fingerprint(&workspace.path("web")).expect("site hash");
        let manifest = read_json(&out_dir.join("LumaFrontendStack.assets.json"));
        for hash in [&handler_hash, &site_hash] {
            let entry = &manifest["files"][hash.as_str()];
            assert_eq!(entry["source"]["packaging"], "zip", "asset {hash}");
            assert_eq!(
                entry["destinations"]["123456789012-eu-west-1"]["objectKey"],
                format!("{hash}.zip")
            );
            let staged = entry["source"]["path"].as_str().expect("staged path");
            assert!(out_dir.join(staged).is_dir());
        }
        assert!(
            out_dir
                .join(format!("asset.{handler_hash}"))
                .join("index.py")
                .is_file()
        );

        let template = read_json(&out_dir.join("LumaFrontendStack.template.json"));
        let resources = template["Resources"].as_object().expect("resources");
        let handler = resources
            .values()
            .find(|r| r["Type"] == "AWS::Lambda::Function")
            .expect("handler function");
        assert_eq!(
            handler["Properties"]["Code"]["S3Key"],
            format!("{handler_hash}.zip")
        );
        let deployment = resources
            .values()
            .find(|r| r["Type"] == "Custom::CDKBucketDeployment")
            .expect("deployment");
        assert_eq!(
            deployment["Properties"]["SourceObjectKeys"],
            json!([format!("{site_hash}.zip")])
        );
        assert!(
            !resources
                .values()
                .any(|r| r["Type"] == "AWS::Lambda::LayerVersion")
        );
    }

    #[test]
    fn test_should_build_api_image_from_repository_sources() {
        let workspace = Workspace::new();
        let out_dir = workspace.path("cdk.out");
        let mut config = app_config(&out_dir);
        config.web_build_path = Some(workspace.path("web"));
        let infra_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../apps/luma-infra");

        let assets = AssetPaths::resolve(&config, &infra_dir);
        compose(&config, &assets)
            .expect("compose")
            .synth()
            .expect("synth from another working directory");

        let api_dir = infra_dir.join(luma_stacks::api::DEFAULT_DOCKER_ASSET_PATH);
        let image_hash = fingerprint(&api_dir).expect("api hash");
        let manifest = read_json(&out_dir.join("LumaApiStack.assets.json"));
        let image = &manifest["dockerImages"][image_hash.as_str()];
        assert_eq!(
            image["destinations"]["123456789012-eu-west-1"]["imageTag"],
            image_hash.as_str()
        );
        let staged = out_dir.join(format!("asset.{image_hash}"));
        assert!(staged.join("Dockerfile").is_file());
        assert!(staged.join("docker").join("Cargo.toml").is_file());
        assert!(staged.join("src").join("main.rs").is_file());
    }
}
