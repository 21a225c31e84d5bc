//! End-to-end tests for Luma.
//!
//! The API tests spawn the stub in-process on an ephemeral port; the synthesis
//! tests write a full cloud assembly into a temporary directory. Both run
//! with a plain `cargo test`.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Once;

use luma_api::{ApiService, server};
use luma_cdk::AppConfig;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A stub server running on the test runtime.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), luma_api::ApiError>>,
}

impl TestServer {
    /// Bind `127.0.0.1:0` and start serving.
    pub async fn start() -> anyhow::Result<Self> {
        init_tracing();
        let listener = server::bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(server::serve(listener, ApiService::new(), async {
            rx.await.ok();
        }));
        Ok(Self {
            addr,
            shutdown: Some(tx),
            handle,
        })
    }

    /// Absolute URL of `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Signal shutdown and wait for the drain to finish.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        self.handle.await??;
        Ok(())
    }
}

/// HTTP client that reports redirects instead of following them.
#[must_use]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("build http client")
}

/// Synthesis config targeting a fixed test account.
#[must_use]
pub fn app_config(out_dir: &Path) -> AppConfig {
    init_tracing();
    let out_dir = out_dir.display().to_string();
    let vars: HashMap<&str, &str> = [
        ("AWS_ACCOUNT_ID", "123456789012"),
        ("AWS_REGION", "eu-west-1"),
        ("CDK_OUTDIR", out_dir.as_str()),
    ]
    .into_iter()
    .collect();
    AppConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned())).expect("test config")
}

#[cfg(test)]
mod test_api;
#[cfg(test)]
mod test_synth;
