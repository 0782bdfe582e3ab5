//! # grok-relay
//!
//! Streaming relay between the Grok IDE front-end and the xAI
//! chat-completions API. An inbound chat request is forwarded upstream by
//! the [`gateway::CompletionGateway`]; streaming responses are re-emitted to
//! the browser as `data: {"content": ...}` SSE frames by the [`relay`]
//! module, with a single non-streaming fallback if the stream fails or
//! stalls before its terminal marker.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grok_relay::{AppState, Config, create_router};
//! use std::net::SocketAddr;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::parse_args();
//!     let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
//!
//!     let state = AppState::new(config);
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - CLI / environment configuration
//! - [`error`] - error taxonomy and HTTP status mapping
//! - [`schemas`] - wire data structures
//! - [`gateway`] - upstream completion calls, model selection, token budget
//! - [`relay`] - SSE reassembly, safety timeout, fallback state machine
//! - [`analysis`] - prompt builders for the analysis endpoints
//! - [`server`] - axum routes, handlers, shared state

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod gateway;
pub mod relay;
pub mod schemas;
pub mod server;

pub use config::Config;
pub use core::http_client::HttpClientBuilder;
pub use error::RelayError;
pub use gateway::CompletionGateway;
pub use relay::{pump_events, relay_stream, StreamOutcome};
pub use schemas::{ChatMessage, CompletionRequest, MessageContent, StreamChunk};
pub use server::{create_router, AppState};

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, RelayError>;
