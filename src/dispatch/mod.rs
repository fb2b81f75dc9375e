//! Session Dispatcher Framework
//!
//! Everything between the transport and application handlers: frame and
//! event value types, the handler traits, and the [`SessionDispatcher`]
//! that wires connections, routes, selectors, and collaborators together.

mod dispatcher;
mod error;
pub mod frame;
pub mod handler;

pub use dispatcher::{DispatcherBuilder, DispatcherConfig, SessionDispatcher};
pub use error::{DispatchError, DispatchResult};
pub use frame::{AppEvent, CloseNotification, CloseStatus, InboundFrame, OutboundFrame};
pub use handler::{
    close_handler_fn, event_handler_fn, handler_fn, typed_json, CloseHandler, EventHandler,
    FrameHandler, HandlerContext, HandlerError,
};
