//! # wsframe
//!
//! Reactive WebSocket messaging framework - session registry, template
//! path routing, and selector-based event fan-out over axum.
//!
//! ## Features
//!
//! - **Session registry**: thread-safe add/remove/lookup/snapshot with
//!   predicate-filtered broadcast
//! - **Path routing**: `{var}` / `{var?}` templates with startup ambiguity
//!   detection and literal-specificity resolution
//! - **Event selectors**: compiled boolean expressions filtering which
//!   sessions receive each application event
//! - **Ordered delivery**: per-session single-writer outbound queue with
//!   configurable overflow policy
//! - **Clean close**: idempotent teardown with an exactly-once close
//!   notification per session
//!
//! ## Modules
//!
//! - [`session`]: session lifecycle and the session registry
//! - [`routing`]: path templates and the route table
//! - [`selector`]: selector expression parsing and matching
//! - [`dispatch`]: the dispatcher tying connections, routes, and events
//!   together
//! - [`transport`]: the [`Connection`] seam and the axum WebSocket adapter
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use wsframe::{handler_fn, event_handler_fn, AppEvent, OutboundFrame, SessionDispatcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Arc::new(
//!         SessionDispatcher::builder()
//!             .route(
//!                 "/rooms/{room}",
//!                 handler_fn(|ctx, payload| async move {
//!                     Ok(Some(json!({
//!                         "room": ctx.variables.value("room"),
//!                         "echo": payload,
//!                     })))
//!                 }),
//!             )
//!             .event_selector(
//!                 "announcement",
//!                 "payload.audience eq 'all'",
//!                 event_handler_fn(|_session, event| {
//!                     Some(OutboundFrame::new("/announcements", event.payload.clone()))
//!                 }),
//!             )
//!             .build()?,
//!     );
//!
//!     // Push an event to every matching open session
//!     dispatcher
//!         .on_application_event(&AppEvent::new(
//!             "announcement",
//!             json!({"audience": "all", "text": "maintenance at noon"}),
//!         ))
//!         .await;
//!
//!     // Serve the WebSocket endpoint
//!     wsframe::transport::serve(dispatcher, "0.0.0.0:8082").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod routing;
pub mod selector;
pub mod session;
pub mod transport;

// Re-export top-level types for convenience
pub use dispatch::{
    close_handler_fn, event_handler_fn, handler_fn, typed_json, AppEvent, CloseHandler,
    CloseNotification, CloseStatus, DispatchError, DispatchResult, DispatcherBuilder,
    DispatcherConfig, EventHandler, FrameHandler, HandlerContext, HandlerError, InboundFrame,
    OutboundFrame, SessionDispatcher,
};

pub use session::{
    OverflowPolicy, RegistryError, Session, SessionError, SessionRegistry, SessionState,
};

pub use routing::{PathRouter, PathTemplate, PathValue, PathVariables, RouteError, RouteResult};

pub use selector::{CompiledSelector, ContextShape, FieldKind, SelectorError, SelectorResult};

pub use auth::{AllowAll, Authorizer, Identity};

pub use codec::{CodecError, CodecResult, FrameCodec, JsonCodec};

pub use transport::{build_router, serve, websocket_handler, Connection, TransportError};

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig};
