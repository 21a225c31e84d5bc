//! Luma API server.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` | `8080` | Listen port on every interface |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use luma_api::{ApiConfig, ApiService, server};

const VERSION: &str = env!("CARGO_PKG_VERSION");

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

#[tokio::main]
async fn main() -> Result<()> {
    let config = ApiConfig::from_env().context("failed to load configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        listen_addr = %config.listen_addr,
        version = VERSION,
        "starting Luma API",
    );

    let listener = server::bind(&config)
        .await
        .with_context(|| format!("cannot bind {}", config.listen_addr))?;

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    server::serve(listener, ApiService::new(), shutdown).await?;
    Ok(())
}
