//! Luma infrastructure synthesizer.
//!
//! Builds the auth, API and frontend stacks and writes the cloud assembly
//! for the deployment CLI. Default asset locations are resolved against this
//! crate's directory, so the binary can be run from anywhere.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AWS_ACCOUNT_ID` | *(required)* | Target account |
//! | `AWS_REGION` | *(required)* | Target region |
//! | `CDK_OUTDIR` | `cdk.out` | Cloud assembly directory |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `LUMA_API_ASSET_PATH` | `apps/luma-api` | Build context of the API image |
//! | `LUMA_WEB_BUILD_PATH` | `apps/luma-web/.svelte-kit/output/client` | Web build output |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::path::Path;

use anyhow::{Context, Result};
use luma_cdk::AppConfig;
use luma_stacks::{AssetPaths, compose};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Uses `RUST_LOG` if set, otherwise the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to resolve deployment environment")?;

    init_tracing(&config.log_level)?;

    let assets = AssetPaths::resolve(&config, Path::new(env!("CARGO_MANIFEST_DIR")));

    info!(
        environment = %config.environment.uri(),
        out_dir = %config.out_dir.display(),
        api_assets = ?assets.docker_asset_path,
        web_assets = ?assets.build_output_path,
        "synthesizing Luma",
    );

    let app = compose(&config, &assets).context("failed to compose stacks")?;
    let assembly = app.synth().context("failed to synthesize cloud assembly")?;

    for stack in &assembly.stacks {
        info!(
            stack = %stack.name,
            template = %stack.template_file.display(),
            dependencies = ?stack.dependencies,
            "wrote stack",
        );
    }
    Ok(())
}
