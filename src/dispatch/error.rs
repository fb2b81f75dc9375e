//! Dispatch error types
//!
//! Startup errors (ambiguous routes, invalid selectors) abort dispatcher
//! construction; runtime errors resolve to the session or frame they
//! concern and never take down the dispatcher.

use thiserror::Error;

use crate::codec::CodecError;
use crate::dispatch::handler::HandlerError;
use crate::routing::RouteError;
use crate::selector::SelectorError;
use crate::session::{RegistryError, SessionError};

/// Errors raised while building or running a dispatcher
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Connection rejected because the session limit is reached
    #[error("Session limit reached ({0} live sessions)")]
    MaxSessions(usize),

    /// Identity not permitted to connect or to access a path
    #[error("Identity '{identity}' is not authorized for '{path}'")]
    Forbidden { identity: String, path: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;
