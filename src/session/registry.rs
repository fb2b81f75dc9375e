//! Session Registry
//!
//! Owns the set of live sessions. Registry operations are high-frequency
//! and concurrent (connect/disconnect storms, broadcast under load), so
//! broadcast iterates a point-in-time snapshot instead of holding the lock
//! for the whole fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::dispatch::frame::OutboundFrame;
use crate::session::session::Session;

/// Errors raised by registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A live session with this identifier already exists
    #[error("Duplicate session id: {0}")]
    DuplicateSession(String),
}

/// Thread-safe registry of live sessions
///
/// Holds at most one live session per identifier. Cheap to clone; clones
/// share the same underlying collection.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session
    ///
    /// Fails with [`RegistryError::DuplicateSession`] when the identifier is
    /// already present. Cannot happen under correct identifier generation,
    /// but is checked.
    pub async fn register(&self, session: Arc<Session>) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.id()) {
            return Err(RegistryError::DuplicateSession(session.id().to_string()));
        }

        tracing::info!(session_id = %session.id(), "Session registered");
        sessions.insert(session.id().to_string(), session);
        Ok(())
    }

    /// Atomically remove and return a session; no-op when absent
    ///
    /// Absence is not an error: local close and peer disconnect race, and
    /// whichever arrives second must be harmless.
    pub async fn unregister(&self, session_id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.write().await.remove(session_id);
        if removed.is_some() {
            tracing::info!(session_id = %session_id, "Session unregistered");
        }
        removed
    }

    /// Read-only lookup
    pub async fn find(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Point-in-time view of all live sessions
    ///
    /// Safe to iterate while concurrent register/unregister proceed; the
    /// lock is held only while the snapshot is taken.
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Enqueue a produced frame on every snapshot session satisfying the
    /// predicate; returns the number of successful deliveries
    ///
    /// Delivery failures (closed session, queue overflow under
    /// backpressure) are logged and never abort delivery to other sessions.
    pub async fn broadcast<P, F>(&self, predicate: P, produce: F) -> usize
    where
        P: Fn(&Session) -> bool,
        F: Fn(&Session) -> OutboundFrame,
    {
        let snapshot = self.snapshot().await;
        let mut delivered = 0;

        for session in snapshot.iter().filter(|s| predicate(s)) {
            match session.enqueue(produce(session)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(
                        session_id = %session.id(),
                        error = %e,
                        "Delivery dropped during broadcast"
                    );
                }
            }
        }

        tracing::trace!(delivered, "Broadcast complete");
        delivered
    }
}
