//! Sessions and the Session Registry
//!
//! A [`Session`] is one live, addressable connection: its identifier, its
//! lifecycle state, its event subscriptions, and a bounded outbound queue
//! drained by exactly one writer. The [`SessionRegistry`] owns the set of
//! live sessions and provides thread-safe add/remove/lookup/snapshot plus
//! predicate-filtered broadcast.

mod registry;
pub(crate) mod session;

pub use registry::{RegistryError, SessionRegistry};
pub use session::{OverflowPolicy, Session, SessionError, SessionState};
