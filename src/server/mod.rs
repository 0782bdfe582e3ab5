//! # Server Module
//!
//! Routes, handlers, and shared state for the relay's HTTP surface.

pub mod handlers;
pub mod state;

pub use handlers::completions;
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{self, TraceLayer},
};
use tracing::Level;

/// Create the router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // AI endpoints consumed by the IDE front-end
        .route("/api/ai/completions", post(handlers::completions))
        .route("/api/ai/generate-image", post(handlers::generate_image))
        .route("/api/ai/analyze-code", post(handlers::analyze_code))
        .route("/api/ai/analyze-image", post(handlers::analyze_image))
        // Health check endpoints for monitoring
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
