//! Universe Explorer server
//!
//! Entry point: loads configuration and serves the site.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;

use universe_explorer::config::AppConfig;
use universe_explorer::{server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenv();

    telemetry::init();

    let config = Arc::new(AppConfig::load()?);
    info!(
        name: "config.loaded",
        port = config.server.port,
        timeout_disabled = config.resilience.timeout_disabled,
        "Configuration loaded"
    );

    server::start_server(config).await
}
