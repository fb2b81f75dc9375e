//! Transport Layer
//!
//! The core depends on the transport only through the [`Connection`] trait:
//! an ordered, reliable message stream per connection that accepts encoded
//! outbound frames and a close status on termination.
//!
//! The shipped adapter bridges axum WebSocket upgrades to the dispatcher:
//!
//! - `GET /ws` upgrades to a WebSocket and binds it to a new session
//! - each connection gets a receive loop feeding the dispatcher (frames
//!   handled strictly in arrival order) and a single writer task draining
//!   the session's outbound queue
//! - the peer's close frame is mapped to a [`CloseStatus`] and reported
//!   through `SessionDispatcher::on_close`

mod ws;

pub use ws::websocket_handler;

use async_trait::async_trait;
use axum::{routing::get, Router};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::dispatch::frame::CloseStatus;
use crate::dispatch::SessionDispatcher;

/// Errors raised by a transport connection
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying connection is gone
    #[error("Connection closed")]
    ConnectionClosed,

    /// Any other transport failure
    #[error("Transport failure: {0}")]
    Io(String),
}

/// One live duplex connection, as seen by the core
///
/// Implementations must deliver writes in call order for a given
/// connection; the dispatcher guarantees a single writer per session.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Write one encoded frame to the peer
    async fn send(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Close the connection with a status
    async fn close(&self, status: CloseStatus) -> Result<(), TransportError>;
}

/// Build the axum router exposing the WebSocket endpoint
pub fn build_router(dispatcher: Arc<SessionDispatcher>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health/live", get(liveness))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(dispatcher)
}

async fn liveness() -> &'static str {
    "OK"
}

/// Start the server and run until a shutdown signal arrives
pub async fn serve(dispatcher: Arc<SessionDispatcher>, addr: &str) -> std::io::Result<()> {
    let router = build_router(dispatcher);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("wsframe listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("wsframe shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::SessionDispatcher;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_live() {
        let dispatcher = Arc::new(SessionDispatcher::builder().build().unwrap());
        let app = build_router(dispatcher);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let dispatcher = Arc::new(SessionDispatcher::builder().build().unwrap());
        let app = build_router(dispatcher);

        // A plain GET without the upgrade headers must be rejected
        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::OK);
    }
}
