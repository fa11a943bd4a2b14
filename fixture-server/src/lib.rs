//! NeuroFeel Fixture Backend
//!
//! Replays recorded demo predictions and dashboard payloads over the same
//! HTTP contract as the emotion recognition API, so clients can be developed
//! and tested without the trained models.
//!
//! ```text
//! /cross_dataset/model/*        health, samples, predict, models
//! /cross_dataset/dataserving/*  overview, confusion matrices, domain gap,
//!                               feature mapping, class distribution
//! /wesad/model/*                subjects, per-subject predictions and
//!                               evaluations, overall performance
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::Fixture;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub fixture: Arc<Fixture>,
    pub config: Config,
}

impl AppState {
    pub fn new(fixture: Fixture, config: Config) -> Self {
        Self {
            fixture: Arc::new(fixture),
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let cross_model_routes = Router::new()
        .route("/health", get(handlers::health::cross_dataset))
        .route("/available-samples", get(handlers::cross_model::available_samples))
        .route("/samples/:direction/:index", get(handlers::cross_model::sample_details))
        .route("/predict", post(handlers::cross_model::predict))
        .route("/models", get(handlers::cross_model::model_info));

    let dataserving_routes = Router::new()
        .route("/overview", get(handlers::dataserving::overview))
        .route("/visualize/confusion_matrices", get(handlers::dataserving::confusion_matrices))
        .route("/visualize/domain_gap", get(handlers::dataserving::domain_gap))
        .route("/visualize/class_distribution", get(handlers::dataserving::class_distribution))
        .route("/features/mapping", get(handlers::dataserving::feature_mapping));

    let wesad_routes = Router::new()
        .route("/subjects", get(handlers::wesad::subjects))
        .route("/predict/:subject_id", get(handlers::wesad::predict))
        .route("/evaluate/:subject_id", get(handlers::wesad::evaluate))
        .route("/overall_performance", get(handlers::wesad::overall_performance));

    Router::new()
        .route("/health", get(handlers::health::check))
        .nest("/cross_dataset/model", cross_model_routes)
        .nest("/cross_dataset/dataserving", dataserving_routes)
        .nest("/wesad/model", wesad_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

/// Serve on an already bound listener until the server stops
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, create_router(state)).await
}

/// Bind an ephemeral local port and serve in the background
pub async fn spawn(state: AppState) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!("Fixture server stopped: {}", e);
        }
    });

    Ok(addr)
}
