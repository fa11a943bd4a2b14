//! NeuroFeel Fixture Server

use anyhow::Context;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neurofeel_fixture::{AppState, Config, Fixture};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "neurofeel_fixture=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("NeuroFeel fixture server starting...");

    let fixture = match &config.fixture_path {
        Some(path) => {
            tracing::info!("Fixture: {}", path.display());
            Fixture::load(path)
        }
        None => {
            tracing::info!("Fixture: embedded demo data");
            Fixture::demo()
        }
    }
    .context("failed to load fixture")?;

    if !config.failing_samples.is_empty() {
        tracing::warn!("Injecting failures for {} sample(s)", config.failing_samples.len());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Fixture backend listening on http://{}", addr);

    neurofeel_fixture::serve(listener, AppState::new(fixture, config))
        .await
        .context("server error")
}
