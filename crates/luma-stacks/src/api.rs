//! Container-image Lambda behind a REST API proxying `/api/v1/{proxy+}`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use luma_cdk::constructs::apigateway::{CorsOptions, RestApi, RestApiProps};
use luma_cdk::constructs::lambda::{DockerImageFunction, DockerImageFunctionProps};
use luma_cdk::{CdkResult, Stack, StackProps};
use typed_builder::TypedBuilder;

use crate::auth::AuthStack;

/// Image build context used when no path is given.
pub const DEFAULT_DOCKER_ASSET_PATH: &str = "../../apps/luma-api/";
/// Stage used when no name is given.
pub const DEFAULT_STAGE_NAME: &str = "dev";

/// Function variable holding the user pool ID.
pub const USER_POOL_ID_ENV: &str = "LUMA_USER_POOL_ID";
/// Function variable holding the web client ID.
pub const USER_POOL_CLIENT_ID_ENV: &str = "LUMA_USER_POOL_CLIENT_ID";
/// Function variable holding the user pool provider name.
pub const USER_POOL_PROVIDER_NAME_ENV: &str = "LUMA_USER_POOL_PROVIDER_NAME";

/// Options for [`build`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ApiStackProps<'a> {
    /// Stack-level properties.
    #[builder(default)]
    pub stack: StackProps,
    /// Build context of the function image.
    #[builder(default = PathBuf::from(DEFAULT_DOCKER_ASSET_PATH), setter(into))]
    pub docker_asset_path: PathBuf,
    /// Gateway stage name.
    #[builder(default = DEFAULT_STAGE_NAME.to_owned(), setter(into))]
    pub stage_name: String,
    /// Auth stack whose pool the function is told about.
    #[builder(default, setter(strip_option))]
    pub user_pool: Option<&'a AuthStack>,
}

/// Declare the API stack.
pub fn build(id: &str, props: &ApiStackProps<'_>) -> CdkResult<Stack> {
    let mut stack = Stack::new(id, &props.stack);

    let mut environment = BTreeMap::new();
    if let Some(auth) = props.user_pool {
        environment.insert(
            USER_POOL_ID_ENV.to_owned(),
            stack.import(auth.user_pool_id()),
        );
        environment.insert(
            USER_POOL_CLIENT_ID_ENV.to_owned(),
            stack.import(auth.user_pool_client_id()),
        );
        environment.insert(
            USER_POOL_PROVIDER_NAME_ENV.to_owned(),
            auth.user_pool_provider_name(&mut stack),
        );
    }

    let function = DockerImageFunction::new(
        &mut stack,
        "LumaApiLambda",
        &DockerImageFunctionProps::builder()
            .directory(props.docker_asset_path.clone())
            .memory_size(128)
            .timeout(Duration::from_secs(30))
            .environment(environment)
            .build(),
    )?;

    let mut api = RestApi::new(
        &mut stack,
        "LumaApi",
        &RestApiProps::builder()
            .rest_api_name("LumaApi")
            .description("Luma API Gateway")
            .stage_name(props.stage_name.clone())
            .default_cors(CorsOptions::permissive())
            .build(),
    )?;
    let root = api.root();
    let api_resource = api.add_resource(&mut stack, &root, "api")?;
    let v1 = api.add_resource(&mut stack, &api_resource, "v1")?;
    api.add_proxy(&mut stack, &v1, &function.function_arn())?;
    api.deploy(&mut stack)?;

    tracing::info!(
        stack = %id,
        stage = %props.stage_name,
        docker_asset_path = %props.docker_asset_path.display(),
        auth = props.user_pool.is_some(),
        "declared api stack",
    );
    Ok(stack)
}
