//! Session Dispatcher
//!
//! The dispatcher is the composition root of a deployment: it owns the
//! registry, the route table, the compiled event bindings, the codec, and
//! the security collaborator. Built once at startup through
//! [`DispatcherBuilder`]; construction fails fast on ambiguous routes and
//! invalid selector expressions so a misconfigured deployment never accepts
//! a connection.
//!
//! At runtime the dispatcher reacts to three stimuli: a new connection, an
//! inbound frame, and an application event. Per-frame failures resolve to
//! an error frame on the triggering session; only an explicit close request
//! or the peer disconnecting terminates a session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::{AllowAll, Authorizer, Identity};
use crate::codec::{FrameCodec, JsonCodec};
use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::dispatch::frame::{AppEvent, CloseNotification, CloseStatus, OutboundFrame};
use crate::dispatch::handler::{
    CloseHandler, EventBinding, EventHandler, FrameHandler, HandlerContext, HandlerError,
};
use crate::routing::{PathRouter, RouteError};
use crate::selector::{CompiledSelector, ContextShape, FieldKind};
use crate::session::{OverflowPolicy, Session, SessionError, SessionRegistry};
use crate::transport::Connection;

fn default_max_sessions() -> usize {
    1000
}

fn default_queue_capacity() -> usize {
    256
}

fn default_close_grace_ms() -> u64 {
    5000
}

/// Dispatcher tuning knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum number of live sessions; further connections are rejected
    pub max_sessions: usize,
    /// Per-session outbound queue capacity, in frames
    pub outbound_queue_capacity: usize,
    /// What to do when a session's outbound queue is full
    pub overflow_policy: OverflowPolicy,
    /// How long close waits for the outbound queue to drain
    pub close_grace_ms: u64,
    /// Close the session on an authorization failure instead of replying
    /// with an error frame
    pub close_on_forbidden: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            outbound_queue_capacity: default_queue_capacity(),
            overflow_policy: OverflowPolicy::default(),
            close_grace_ms: default_close_grace_ms(),
            close_on_forbidden: false,
        }
    }
}

/// Builder collecting routes, event selectors, and collaborators
///
/// `build` validates everything up front: route templates are parsed and
/// checked for ambiguity, selector expressions are compiled, and selectors
/// for event types with a declared [`ContextShape`] are validated against
/// it. Any failure aborts construction.
pub struct DispatcherBuilder {
    routes: Vec<(String, Arc<dyn FrameHandler>)>,
    selectors: Vec<(String, String, Arc<dyn EventHandler>)>,
    shapes: HashMap<String, ContextShape>,
    codec: Arc<dyn FrameCodec>,
    authorizer: Arc<dyn Authorizer>,
    close_handlers: Vec<Arc<dyn CloseHandler>>,
    config: DispatcherConfig,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            selectors: Vec::new(),
            shapes: HashMap::new(),
            codec: Arc::new(JsonCodec),
            authorizer: Arc::new(AllowAll),
            close_handlers: Vec::new(),
            config: DispatcherConfig::default(),
        }
    }
}

impl DispatcherBuilder {
    /// Bind a path template to a frame handler
    pub fn route(mut self, template: &str, handler: impl FrameHandler + 'static) -> Self {
        self.routes.push((template.to_string(), Arc::new(handler)));
        self
    }

    /// Subscribe sessions to an event type, filtered by a selector
    /// expression
    pub fn event_selector(
        mut self,
        event_type: &str,
        expression: &str,
        handler: impl EventHandler + 'static,
    ) -> Self {
        self.selectors.push((
            event_type.to_string(),
            expression.to_string(),
            Arc::new(handler),
        ));
        self
    }

    /// Declare the context shape for an event type
    ///
    /// The shape describes the `payload.*` fields of the event. Selectors
    /// for this event type are validated against it at build time; the
    /// session-scoped fields (`type`, `session.id`, `session.created_at`)
    /// are added automatically.
    pub fn event_shape(mut self, event_type: &str, shape: ContextShape) -> Self {
        let shape = shape
            .field("type", FieldKind::String)
            .field("session.id", FieldKind::String)
            .field("session.created_at", FieldKind::String);
        self.shapes.insert(event_type.to_string(), shape);
        self
    }

    /// Replace the default JSON codec
    pub fn codec(mut self, codec: impl FrameCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Replace the default allow-all authorizer
    pub fn authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Register a close-status collaborator
    pub fn close_handler(mut self, handler: impl CloseHandler + 'static) -> Self {
        self.close_handlers.push(Arc::new(handler));
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and construct the dispatcher
    pub fn build(self) -> DispatchResult<SessionDispatcher> {
        let mut router = PathRouter::new();
        for (template, handler) in self.routes {
            router.register(&template, handler)?;
        }

        let mut bindings: HashMap<String, Vec<Arc<EventBinding>>> = HashMap::new();
        for (event_type, expression, handler) in self.selectors {
            let selector = match self.shapes.get(&event_type) {
                Some(shape) => CompiledSelector::compile_checked(&expression, shape)?,
                None => CompiledSelector::compile(&expression)?,
            };
            bindings
                .entry(event_type.clone())
                .or_default()
                .push(Arc::new(EventBinding {
                    event_type,
                    selector,
                    handler,
                }));
        }

        tracing::debug!(
            routes = router.len(),
            event_types = bindings.len(),
            "Dispatcher built"
        );

        Ok(SessionDispatcher {
            registry: SessionRegistry::new(),
            router,
            bindings,
            codec: self.codec,
            authorizer: self.authorizer,
            close_handlers: self.close_handlers,
            config: self.config,
        })
    }
}

/// Routes connections, frames, and events to their handlers
pub struct SessionDispatcher {
    registry: SessionRegistry,
    router: PathRouter<Arc<dyn FrameHandler>>,
    bindings: HashMap<String, Vec<Arc<EventBinding>>>,
    codec: Arc<dyn FrameCodec>,
    authorizer: Arc<dyn Authorizer>,
    close_handlers: Vec<Arc<dyn CloseHandler>>,
    config: DispatcherConfig,
}

impl SessionDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// The session registry backing this dispatcher
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Accept a new connection and bring its session to `Open`
    ///
    /// The session is registered, its event subscriptions installed, and
    /// the single outbound writer task spawned before the transition to
    /// `Open`, so a registered-but-not-yet-open session can never receive
    /// frames.
    pub async fn on_connect(
        &self,
        connection: Arc<dyn Connection>,
        identity: Identity,
    ) -> DispatchResult<Arc<Session>> {
        // Check-then-register can overshoot by a few sessions under a
        // connect storm; the limit is a guardrail, not an exact quota.
        let live = self.registry.len().await;
        if live >= self.config.max_sessions {
            tracing::warn!(live, "Connection rejected, session limit reached");
            return Err(DispatchError::MaxSessions(live));
        }

        let session = Arc::new(Session::new(
            connection,
            identity,
            self.config.outbound_queue_capacity,
            self.config.overflow_policy,
        ));
        session.install_subscriptions(&self.bindings);
        self.registry.register(Arc::clone(&session)).await?;

        self.spawn_writer(&session);
        session.set_open();

        tracing::info!(
            session_id = %session.id(),
            identity = %session.identity().display(),
            "Session connected"
        );
        Ok(session)
    }

    /// Handle one inbound frame from a session's connection
    ///
    /// The caller invokes this serially per session, which is what makes
    /// frame handling ordered within a session; frames from different
    /// sessions proceed concurrently. Decode failures, unknown paths,
    /// missing path variables, denials, and handler errors each produce an
    /// error frame back on the session and leave it open.
    pub async fn on_inbound_frame(
        &self,
        session: &Arc<Session>,
        bytes: &[u8],
    ) -> DispatchResult<()> {
        if !session.is_open() {
            return Err(SessionError::Closed(session.id().to_string()).into());
        }

        let frame = match self.codec.decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(
                    session_id = %session.id(),
                    error = %e,
                    "Inbound frame rejected by codec"
                );
                // No destination path was recoverable from the bytes
                self.send_error(session, "", &e.to_string());
                return Ok(());
            }
        };

        let matched = match self.router.resolve(&frame.path) {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                tracing::debug!(session_id = %session.id(), path = %frame.path, "No route for path");
                self.send_error(session, &frame.path, "no route for path");
                return Ok(());
            }
            Err(e @ RouteError::MissingPathVariable { .. }) => {
                self.send_error(session, &frame.path, &e.to_string());
                return Ok(());
            }
            // Template errors cannot occur after a successful build
            Err(e) => return Err(e.into()),
        };

        if !self
            .authorizer
            .authorize(session.identity(), &frame.path)
            .await
        {
            tracing::warn!(
                session_id = %session.id(),
                identity = %session.identity().display(),
                path = %frame.path,
                "Access denied"
            );
            if self.config.close_on_forbidden {
                self.on_close(session, CloseStatus::policy_violation("access denied"))
                    .await;
            } else {
                self.send_error(session, &frame.path, "access denied");
            }
            return Ok(());
        }

        let handler = Arc::clone(matched.handler);
        let ctx = HandlerContext {
            session: Arc::clone(session),
            variables: matched.variables,
            identity: session.identity().clone(),
        };

        match handler.handle(&ctx, frame.payload).await {
            Ok(Some(value)) => {
                if let Err(e) = session.enqueue(OutboundFrame::new(frame.path, value)) {
                    tracing::debug!(
                        session_id = %session.id(),
                        error = %e,
                        "Response delivery dropped"
                    );
                }
            }
            Ok(None) => {}
            Err(HandlerError::CloseRequested(status)) => {
                self.on_close(session, status).await;
            }
            Err(e) => {
                tracing::debug!(
                    session_id = %session.id(),
                    path = %frame.path,
                    error = %e,
                    "Handler error"
                );
                self.send_error(session, &frame.path, &e.to_string());
            }
        }

        Ok(())
    }

    /// Offer an application event to every subscribed open session
    ///
    /// The selector context is built once per session (event fields plus
    /// session-scoped fields) and every binding for the event type is
    /// evaluated against it. Returns the number of frames delivered;
    /// per-session delivery failures are logged and skipped.
    ///
    /// Sessions are visited sequentially and each matching event handler is
    /// awaited inline, so handlers must return quickly: a slow handler
    /// delays delivery to every session later in the snapshot. Enqueueing
    /// itself never blocks here, the session queue's overflow policy
    /// absorbs slow consumers.
    pub async fn on_application_event(&self, event: &AppEvent) -> usize {
        let snapshot = self.registry.snapshot().await;
        let mut delivered = 0;

        for session in snapshot {
            if !session.is_open() {
                continue;
            }
            let bindings = session.subscriptions_for(&event.event_type);
            if bindings.is_empty() {
                continue;
            }

            let context =
                event.selector_context(session.id(), &session.created_at().to_rfc3339());

            for binding in bindings {
                if !binding.selector.matches(&context) {
                    continue;
                }
                if let Some(frame) = binding.handler.on_event(&session, event).await {
                    match session.enqueue(frame) {
                        Ok(()) => delivered += 1,
                        Err(e) => {
                            tracing::debug!(
                                session_id = %session.id(),
                                error = %e,
                                "Event delivery dropped"
                            );
                        }
                    }
                }
            }
        }

        tracing::trace!(event_type = %event.event_type, delivered, "Application event dispatched");
        delivered
    }

    /// Close a session and emit its close notification exactly once
    ///
    /// Idempotent: local close and peer disconnect race freely, and only
    /// the first caller performs the teardown. Queued outbound frames get a
    /// bounded grace period to drain before the connection is torn down.
    pub async fn on_close(&self, session: &Arc<Session>, status: CloseStatus) {
        if !session.begin_close() {
            return;
        }

        session.seal_outbound();
        let grace = Duration::from_millis(self.config.close_grace_ms);
        if tokio::time::timeout(grace, session.drained()).await.is_err() {
            tracing::debug!(
                session_id = %session.id(),
                pending = session.outbound_depth(),
                "Close grace period elapsed with frames still queued"
            );
        }

        session.finalize_close();
        session.clear_subscriptions();
        self.registry.unregister(session.id()).await;

        if let Err(e) = session.connection().close(status.clone()).await {
            tracing::trace!(session_id = %session.id(), error = %e, "Transport close failed");
        }

        let notification = CloseNotification {
            session_id: session.id().to_string(),
            status,
        };
        for handler in &self.close_handlers {
            handler.on_session_closed(&notification).await;
        }

        tracing::info!(
            session_id = %session.id(),
            code = notification.status.code,
            "Session closed"
        );
    }

    /// Spawn the single writer task draining the session's outbound queue
    fn spawn_writer(&self, session: &Arc<Session>) {
        let session = Arc::clone(session);
        let codec = Arc::clone(&self.codec);
        tokio::spawn(async move {
            while let Some(frame) = session.next_outbound().await {
                let bytes = match codec.encode(&frame) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!(
                            session_id = %session.id(),
                            error = %e,
                            "Failed to encode outbound frame"
                        );
                        continue;
                    }
                };
                if let Err(e) = session.connection().send(bytes).await {
                    tracing::debug!(
                        session_id = %session.id(),
                        error = %e,
                        "Outbound write failed, writer stopping"
                    );
                    break;
                }
            }
            tracing::trace!(session_id = %session.id(), "Writer task finished");
        });
    }

    fn send_error(&self, session: &Session, path: &str, message: &str) {
        if let Err(e) = session.enqueue(OutboundFrame::error(path, message)) {
            tracing::trace!(session_id = %session.id(), error = %e, "Error frame dropped");
        }
    }
}
