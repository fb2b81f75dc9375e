//! Handler traits and adapters
//!
//! Routes bind a path template to a [`FrameHandler`]; event selectors bind
//! an event type and predicate to an [`EventHandler`]; close-status
//! collaborators implement [`CloseHandler`]. Handlers declared as plain
//! async closures go through [`handler_fn`]; handlers with a declared
//! payload type go through [`typed_json`], which surfaces decode failures
//! as [`HandlerError::Decode`] on the handler's error path without closing
//! the session.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::auth::Identity;
use crate::dispatch::frame::{AppEvent, CloseNotification, CloseStatus, OutboundFrame};
use crate::routing::PathVariables;
use crate::selector::CompiledSelector;
use crate::session::Session;

/// Errors surfaced by a frame handler invocation
///
/// Per-frame errors resolve to that invocation alone; only
/// [`HandlerError::CloseRequested`] terminates the session.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Payload could not be decoded into the handler's declared type
    #[error("Payload decode error: {0}")]
    Decode(String),

    /// Handler-level application failure
    #[error("Handler failed: {0}")]
    Failed(String),

    /// Handler explicitly requests session closure
    #[error("Handler requested session close (code {})", .0.code)]
    CloseRequested(CloseStatus),
}

/// Context passed to a frame handler invocation
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// The session the frame arrived on
    pub session: Arc<Session>,
    /// Variables extracted from the resolved path
    pub variables: PathVariables,
    /// Identity bound to the session at connect time
    pub identity: Identity,
}

/// Handles inbound frames resolved to a route
///
/// Returning `Ok(Some(value))` writes a response frame back on the same
/// session; `Ok(None)` produces no response.
#[async_trait]
pub trait FrameHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Value,
    ) -> Result<Option<Value>, HandlerError>;
}

/// Maps a matched event to an outbound frame for one session
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// `None` suppresses delivery for this session
    async fn on_event(&self, session: &Session, event: &AppEvent) -> Option<OutboundFrame>;
}

/// Receives each [`CloseNotification`] exactly once, after the session has
/// been removed from the registry; ordering between handlers is unspecified
#[async_trait]
pub trait CloseHandler: Send + Sync {
    async fn on_session_closed(&self, notification: &CloseNotification);
}

/// A handler paired with its compiled selector and event type
pub struct EventBinding {
    pub event_type: String,
    pub selector: CompiledSelector,
    pub handler: Arc<dyn EventHandler>,
}

impl std::fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinding")
            .field("event_type", &self.event_type)
            .field("selector", &self.selector.source())
            .finish()
    }
}

/// Frame handler backed by an async closure
pub struct FnHandler<F>(F);

/// Wrap an async closure as a [`FrameHandler`]
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(HandlerContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, HandlerError>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> FrameHandler for FnHandler<F>
where
    F: Fn(HandlerContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, HandlerError>> + Send,
{
    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Value,
    ) -> Result<Option<Value>, HandlerError> {
        (self.0)(ctx.clone(), payload).await
    }
}

/// Frame handler with a declared, typed payload
pub struct TypedJson<T, F> {
    inner: F,
    _payload: PhantomData<fn() -> T>,
}

/// Wrap an async closure taking a deserialized payload of type `T`
pub fn typed_json<T, F, Fut>(f: F) -> TypedJson<T, F>
where
    T: DeserializeOwned + Send,
    F: Fn(HandlerContext, T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, HandlerError>> + Send,
{
    TypedJson {
        inner: f,
        _payload: PhantomData,
    }
}

#[async_trait]
impl<T, F, Fut> FrameHandler for TypedJson<T, F>
where
    T: DeserializeOwned + Send,
    F: Fn(HandlerContext, T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>, HandlerError>> + Send,
{
    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Value,
    ) -> Result<Option<Value>, HandlerError> {
        let typed: T =
            serde_json::from_value(payload).map_err(|e| HandlerError::Decode(e.to_string()))?;
        (self.inner)(ctx.clone(), typed).await
    }
}

/// Event handler backed by a plain closure
pub struct FnEventHandler<F>(F);

/// Wrap a closure as an [`EventHandler`]
pub fn event_handler_fn<F>(f: F) -> FnEventHandler<F>
where
    F: Fn(&Session, &AppEvent) -> Option<OutboundFrame> + Send + Sync,
{
    FnEventHandler(f)
}

#[async_trait]
impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&Session, &AppEvent) -> Option<OutboundFrame> + Send + Sync,
{
    async fn on_event(&self, session: &Session, event: &AppEvent) -> Option<OutboundFrame> {
        (self.0)(session, event)
    }
}

/// Close handler backed by a plain closure
pub struct FnCloseHandler<F>(F);

/// Wrap a closure as a [`CloseHandler`]
pub fn close_handler_fn<F>(f: F) -> FnCloseHandler<F>
where
    F: Fn(&CloseNotification) + Send + Sync,
{
    FnCloseHandler(f)
}

#[async_trait]
impl<F> CloseHandler for FnCloseHandler<F>
where
    F: Fn(&CloseNotification) + Send + Sync,
{
    async fn on_session_closed(&self, notification: &CloseNotification) {
        (self.0)(notification)
    }
}
