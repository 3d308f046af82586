//! Test server harness for E2E testing
//!
//! Provides `TestTokenServer` for spawning real Token Issuer instances in tests.

use crate::fixtures::test_config;
use std::net::SocketAddr;
use std::sync::Arc;
use token_service::config::Config;
use token_service::routes::{self, AppState};
use tokio::task::JoinHandle;

/// Test harness for spawning the Token Issuer in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_token_flow() -> Result<()> {
///     let server = TestTokenServer::spawn_configured().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .post(server.token_url())
///         .json(&serde_json::json!({ "username": "alice" }))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestTokenServer {
    addr: SocketAddr,
    config: Config,
    handle: JoinHandle<()>,
}

impl TestTokenServer {
    /// Spawn a server using `config`.
    ///
    /// The server binds to a random available port (127.0.0.1:0) and runs
    /// the real router in the background.
    pub async fn spawn(config: Config) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState {
            config: config.clone(),
        });

        // The global recorder can only be installed once per test process.
        // Later servers get a standalone recorder instead.
        let metrics_handle = match routes::init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            handle,
        })
    }

    /// Spawn a server with the full test configuration.
    pub async fn spawn_configured() -> Result<Self, anyhow::Error> {
        Self::spawn(test_config()).await
    }

    /// Base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.url())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestTokenServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
