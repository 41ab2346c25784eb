//! HTTP front end for IdeaScope.
//!
//! Routes:
//! - `POST /chat` runs one evaluation and answers `{ "reply": ... }`
//! - `GET /health` is a liveness probe

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ideascope_core::Pipeline;
use ideascope_shared::{IdeaScopeError, Result, ServerConfig};

pub use error::{ApiError, ERROR_PREFIX};
pub use routes::ChatResponse;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

/// Build the router. An empty `cors_origins` allows any origin.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/chat", post(routes::chat_handler))
        .route("/health", get(routes::health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([CONTENT_TYPE, ACCEPT]);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers([CONTENT_TYPE, ACCEPT])
}

/// Bind the listener and serve until Ctrl-C.
pub async fn run_server(config: &ServerConfig, pipeline: Arc<Pipeline>) -> Result<()> {
    let app = router(AppState::new(pipeline), &config.cors_origins);

    let listener = TcpListener::bind((config.bind.as_str(), config.port))
        .await
        .map_err(|e| {
            IdeaScopeError::Network(format!("failed to bind {}:{}: {e}", config.bind, config.port))
        })?;
    let addr = listener
        .local_addr()
        .map_err(|e| IdeaScopeError::Network(e.to_string()))?;

    let cors = if config.cors_origins.is_empty() {
        "*".to_string()
    } else {
        config.cors_origins.join(", ")
    };
    info!(%addr, %cors, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| IdeaScopeError::Network(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, stopping server");
}
