//! Session lifecycle and outbound queue
//!
//! Sessions move through `Connecting → Open → Closing → Closed`. They are
//! created and mutated only by the owning dispatcher; once `Closed` they are
//! inert and every further push fails with [`SessionError::Closed`].
//!
//! Outbound delivery is single-writer: concurrent producers (handler
//! responses, event fan-out, broadcast) enqueue into a bounded queue that
//! exactly one writer task drains, so writes to the underlying connection
//! are never interleaved.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::auth::Identity;
use crate::dispatch::frame::OutboundFrame;
use crate::dispatch::handler::EventBinding;
use crate::transport::Connection;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// What to do when a session's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the oldest queued frame to make room (lossy, bounded memory)
    #[default]
    DropOldest,
    /// Reject the new frame with [`SessionError::QueueFull`]
    Backpressure,
}

/// Errors raised by per-session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation against a session that is closing or closed
    #[error("Session {0} is closed")]
    Closed(String),

    /// Outbound queue full under the backpressure policy
    #[error("Outbound queue full for session {0}")]
    QueueFull(String),
}

/// One live, addressable connection and its subscription state
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    identity: Identity,
    connection: Arc<dyn Connection>,
    state: RwLock<SessionState>,
    outbound: OutboundQueue,
    subscriptions: RwLock<HashMap<String, Vec<Arc<EventBinding>>>>,
}

impl Session {
    /// Create a session in `Connecting` with a freshly generated identifier
    pub(crate) fn new(
        connection: Arc<dyn Connection>,
        identity: Identity,
        queue_capacity: usize,
        overflow: OverflowPolicy,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            identity,
            connection,
            state: RwLock::new(SessionState::Connecting),
            outbound: OutboundQueue::new(queue_capacity, overflow),
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Unique session identifier, immutable and never reused
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub(crate) fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap()
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Number of frames currently waiting in the outbound queue
    pub fn outbound_depth(&self) -> usize {
        self.outbound.len()
    }

    /// Enqueue an outbound frame for the writer task
    ///
    /// Fails with [`SessionError::Closed`] unless the session is `Open`.
    /// Overflow behavior follows the configured [`OverflowPolicy`].
    pub fn enqueue(&self, frame: OutboundFrame) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(SessionError::Closed(self.id.clone()));
        }
        self.outbound.push(&self.id, frame)
    }

    /// Next frame for the single writer; `None` once closed and drained
    pub(crate) async fn next_outbound(&self) -> Option<OutboundFrame> {
        self.outbound.pop().await
    }

    /// Wait until the outbound queue is empty
    pub(crate) async fn drained(&self) {
        self.outbound.drained().await
    }

    /// `Connecting → Open`, after successful registration
    pub(crate) fn set_open(&self) {
        let mut state = self.state.write().unwrap();
        if *state == SessionState::Connecting {
            *state = SessionState::Open;
        }
    }

    /// `Open/Connecting → Closing`; returns false when already closing or
    /// closed, making close idempotent and race-safe
    pub(crate) fn begin_close(&self) -> bool {
        let mut state = self.state.write().unwrap();
        match *state {
            SessionState::Closing | SessionState::Closed => false,
            _ => {
                *state = SessionState::Closing;
                true
            }
        }
    }

    /// `Closing → Closed`; the session is inert afterwards
    pub(crate) fn finalize_close(&self) {
        *self.state.write().unwrap() = SessionState::Closed;
        self.outbound.close();
    }

    /// Stop accepting new outbound frames while the writer drains
    pub(crate) fn seal_outbound(&self) {
        self.outbound.seal();
    }

    pub(crate) fn install_subscriptions(&self, bindings: &HashMap<String, Vec<Arc<EventBinding>>>) {
        *self.subscriptions.write().unwrap() = bindings.clone();
    }

    /// Compiled bindings registered for an event type
    pub(crate) fn subscriptions_for(&self, event_type: &str) -> Vec<Arc<EventBinding>> {
        self.subscriptions
            .read()
            .unwrap()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Event types this session is subscribed to
    pub fn subscribed_event_types(&self) -> Vec<String> {
        self.subscriptions.read().unwrap().keys().cloned().collect()
    }

    pub(crate) fn clear_subscriptions(&self) {
        self.subscriptions.write().unwrap().clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Bounded multi-producer, single-consumer frame queue
///
/// `sealed` stops producers while the writer keeps draining; `closed`
/// additionally ends the writer once the queue is empty.
struct OutboundQueue {
    frames: Mutex<VecDeque<OutboundFrame>>,
    notify: Notify,
    drain_notify: Notify,
    capacity: usize,
    overflow: OverflowPolicy,
    sealed: AtomicBool,
    closed: AtomicBool,
}

impl OutboundQueue {
    fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            drain_notify: Notify::new(),
            capacity: capacity.max(1),
            overflow,
            sealed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    fn push(&self, session_id: &str, frame: OutboundFrame) -> Result<(), SessionError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(SessionError::Closed(session_id.to_string()));
        }

        {
            let mut frames = self.frames.lock().unwrap();
            if frames.len() >= self.capacity {
                match self.overflow {
                    OverflowPolicy::Backpressure => {
                        return Err(SessionError::QueueFull(session_id.to_string()));
                    }
                    OverflowPolicy::DropOldest => {
                        frames.pop_front();
                        tracing::debug!(
                            session_id = %session_id,
                            "Outbound queue overflow, dropped oldest frame"
                        );
                    }
                }
            }
            frames.push_back(frame);
        }

        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self) -> Option<OutboundFrame> {
        loop {
            // Arm the notification before checking to avoid a lost wakeup
            let notified = self.notify.notified();
            {
                let mut frames = self.frames.lock().unwrap();
                if let Some(frame) = frames.pop_front() {
                    if frames.is_empty() {
                        self.drain_notify.notify_waiters();
                    }
                    return Some(frame);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            notified.await;
        }
    }

    async fn drained(&self) {
        loop {
            let notified = self.drain_notify.notified();
            if self.frames.lock().unwrap().is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    fn close(&self) {
        self.sealed.store(true, Ordering::Release);
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.drain_notify.notify_waiters();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use serde_json::json;

    /// Connection that discards everything, for session-level tests
    pub(crate) struct NullConnection;

    #[async_trait]
    impl Connection for NullConnection {
        async fn send(&self, _payload: Vec<u8>) -> Result<(), TransportError> {
            Ok(())
        }

        async fn close(
            &self,
            _status: crate::dispatch::frame::CloseStatus,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    pub(crate) fn open_session(capacity: usize, overflow: OverflowPolicy) -> Session {
        let session = Session::new(
            Arc::new(NullConnection),
            Identity::anonymous(),
            capacity,
            overflow,
        );
        session.set_open();
        session
    }

    fn frame(i: usize) -> OutboundFrame {
        OutboundFrame::new("/test", json!({ "seq": i }))
    }

    #[test]
    fn test_new_session_is_connecting() {
        let session = Session::new(
            Arc::new(NullConnection),
            Identity::anonymous(),
            16,
            OverflowPolicy::default(),
        );
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.is_open());
        assert!(!session.id().is_empty());
    }

    #[test]
    fn test_state_transitions() {
        let session = open_session(16, OverflowPolicy::default());
        assert_eq!(session.state(), SessionState::Open);

        assert!(session.begin_close());
        assert_eq!(session.state(), SessionState::Closing);

        // Second close attempt is a no-op
        assert!(!session.begin_close());

        session.finalize_close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.begin_close());
    }

    #[test]
    fn test_enqueue_fails_when_not_open() {
        let session = Session::new(
            Arc::new(NullConnection),
            Identity::anonymous(),
            16,
            OverflowPolicy::default(),
        );
        assert!(matches!(
            session.enqueue(frame(0)),
            Err(SessionError::Closed(_))
        ));

        session.set_open();
        session.begin_close();
        assert!(matches!(
            session.enqueue(frame(0)),
            Err(SessionError::Closed(_))
        ));
    }

    #[test]
    fn test_drop_oldest_overflow() {
        let session = open_session(2, OverflowPolicy::DropOldest);

        session.enqueue(frame(0)).unwrap();
        session.enqueue(frame(1)).unwrap();
        session.enqueue(frame(2)).unwrap();

        assert_eq!(session.outbound_depth(), 2);
    }

    #[test]
    fn test_backpressure_overflow() {
        let session = open_session(2, OverflowPolicy::Backpressure);

        session.enqueue(frame(0)).unwrap();
        session.enqueue(frame(1)).unwrap();
        assert!(matches!(
            session.enqueue(frame(2)),
            Err(SessionError::QueueFull(_))
        ));
        assert_eq!(session.outbound_depth(), 2);
    }

    #[tokio::test]
    async fn test_writer_sees_frames_in_order() {
        let session = Arc::new(open_session(16, OverflowPolicy::default()));

        for i in 0..5 {
            session.enqueue(frame(i)).unwrap();
        }

        for i in 0..5 {
            let next = session.next_outbound().await.unwrap();
            assert_eq!(next.payload["seq"], i);
        }
        assert_eq!(session.outbound_depth(), 0);
    }

    #[tokio::test]
    async fn test_writer_ends_after_close_and_drain() {
        let session = Arc::new(open_session(16, OverflowPolicy::default()));
        session.enqueue(frame(0)).unwrap();

        session.begin_close();
        session.finalize_close();

        // Remaining frame is still drained, then the writer ends
        assert!(session.next_outbound().await.is_some());
        assert!(session.next_outbound().await.is_none());
    }

    #[tokio::test]
    async fn test_drained_wakes_when_queue_empties() {
        let session = Arc::new(open_session(16, OverflowPolicy::default()));
        session.enqueue(frame(0)).unwrap();

        let drainer = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.drained().await })
        };

        session.next_outbound().await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), drainer)
            .await
            .expect("drained() should complete")
            .unwrap();
    }

    #[test]
    fn test_overflow_policy_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: OverflowPolicy,
        }

        let w: Wrapper = toml::from_str("policy = \"drop_oldest\"").unwrap();
        assert_eq!(w.policy, OverflowPolicy::DropOldest);
        let w: Wrapper = toml::from_str("policy = \"backpressure\"").unwrap();
        assert_eq!(w.policy, OverflowPolicy::Backpressure);
    }
}
