//! Wiring the three stacks into one app.

use std::path::{Path, PathBuf};

use luma_cdk::{App, AppConfig, CdkResult, StackProps};
use typed_builder::TypedBuilder;

use crate::api::{self, ApiStackProps};
use crate::auth::{AuthStack, AuthStackProps};
use crate::frontend::{self, FrontendStackProps};

/// Name of the auth stack.
pub const AUTH_STACK_NAME: &str = "LumaAuthStack";
/// Name of the API stack.
pub const API_STACK_NAME: &str = "LumaApiStack";
/// Name of the frontend stack.
pub const FRONTEND_STACK_NAME: &str = "LumaFrontendStack";

/// Local inputs of the app; unset fields fall back to the stack defaults.
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct AssetPaths {
    /// Build context of the API image.
    #[builder(default, setter(strip_option, into))]
    pub docker_asset_path: Option<PathBuf>,
    /// Web build output.
    #[builder(default, setter(strip_option, into))]
    pub build_output_path: Option<PathBuf>,
}

impl AssetPaths {
    /// Resolve both inputs for a synth run started from `infra_dir`.
    ///
    /// Overrides in `config` win. Otherwise the stack defaults are joined onto
    /// `infra_dir`, so the result no longer depends on the working directory.
    pub fn resolve(config: &AppConfig, infra_dir: &Path) -> Self {
        let docker_asset_path = config
            .api_asset_path
            .clone()
            .unwrap_or_else(|| infra_dir.join(api::DEFAULT_DOCKER_ASSET_PATH));
        let build_output_path = config
            .web_build_path
            .clone()
            .unwrap_or_else(|| infra_dir.join(frontend::DEFAULT_BUILD_OUTPUT_PATH));
        Self {
            docker_asset_path: Some(docker_asset_path),
            build_output_path: Some(build_output_path),
        }
    }
}

/// Build the app: auth first, then the API wired to it, then the frontend.
pub fn compose(config: &AppConfig, assets: &AssetPaths) -> CdkResult<App> {
    let stack_props = StackProps::builder()
        .env(config.environment.clone())
        .build();

    let auth = AuthStack::build(
        AUTH_STACK_NAME,
        &AuthStackProps::builder().stack(stack_props.clone()).build(),
    )?;

    let mut api_props = ApiStackProps::builder()
        .stack(stack_props.clone())
        .user_pool(&auth)
        .build();
    if let Some(path) = &assets.docker_asset_path {
        api_props.docker_asset_path.clone_from(path);
    }
    let api = api::build(API_STACK_NAME, &api_props)?;

    let mut frontend_props = FrontendStackProps::builder().stack(stack_props).build();
    if let Some(path) = &assets.build_output_path {
        frontend_props.build_output_path.clone_from(path);
    }
    let frontend = frontend::build(FRONTEND_STACK_NAME, &frontend_props)?;

    let mut app = App::new(&config.out_dir);
    app.add_stack(auth.into_stack())?;
    app.add_stack(api)?;
    app.add_stack(frontend)?;
    app.validate()?;

    tracing::info!(
        environment = %config.environment.uri(),
        stacks = app.stacks().len(),
        "composed app",
    );
    Ok(app)
}
