//! HTTP/WebSocket API for the relay.
//!
//! Hosts open rooms, joiners enter them, and the relay forwards opaque
//! message text between the two sides. It never reads the game messages.
//!
//! # Modules
//!
//! - [`rooms`]: room registry and frame routing
//! - [`websocket`]: the per-socket frame protocol
//! - [`rate_limiter`]: per-socket flood protection
//!
//! # Endpoints Overview
//!
//! - `GET /ws` - Relay WebSocket
//! - `GET /health` - Relay health status
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pu_relay::{api::{create_router, RelayState}, config::RelayConfig};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let app = create_router(RelayState::new(RelayConfig::default()));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:7878").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively so browser clients can reach the relay.

pub mod rate_limiter;
pub mod rooms;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;

use crate::config::RelayConfig;
use rooms::Rooms;

/// State shared across all HTTP handlers and WebSocket connections.
///
/// Cloned for each request; the registry sits behind an `Arc<Mutex<_>>` and
/// is never held across an await.
#[derive(Clone)]
pub struct RelayState {
    rooms: Arc<Mutex<Rooms>>,
    pub config: Arc<RelayConfig>,
}

impl RelayState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(Rooms::new(config.max_rooms))),
            config: Arc::new(config),
        }
    }

    /// Locks the room registry. A panic elsewhere can't leave the registry
    /// half-updated, so poisoning is ignored.
    pub fn rooms(&self) -> MutexGuard<'_, Rooms> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create the relay router.
///
/// ```text
/// GET  /health                         - Health check
/// GET  /ws                             - Relay WebSocket
/// ```
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:7878/health
/// # {"status":"healthy","version":"0.1.0","rooms":{"open":2,"max":1024}}
/// ```
async fn health_check(State(state): State<RelayState>) -> impl IntoResponse {
    let open = state.rooms().len();
    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": {
            "open": open,
            "max": state.config.max_rooms,
        },
    });

    (StatusCode::OK, Json(response))
}
