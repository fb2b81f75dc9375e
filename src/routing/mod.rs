//! Path Routing
//!
//! Maps declared path templates to handlers and resolves inbound frame
//! destinations to a handler plus extracted path variables.
//!
//! # Templates
//!
//! A template is a `/`-separated sequence of literal and variable segments:
//!
//! ```text
//! /rooms/general          literals only
//! /rooms/{id}             required variable
//! /rooms/{id}/{detail?}   trailing optional variable
//! ```
//!
//! Required variables fail resolution with `MissingPathVariable` when the
//! path is too short; optional variables bind to [`PathValue::Absent`] so
//! handlers can distinguish "not supplied" from "supplied empty".
//!
//! The route table is built once at startup; structurally ambiguous
//! templates are rejected at registration. Resolution is purely functional
//! over the immutable table, and when several templates match the one with
//! the most literal specificity (fewest variable segments) wins.

mod error;
mod router;
mod template;

pub use error::{RouteError, RouteResult};
pub use router::{PathRouter, RouteMatch};
pub use template::{PathTemplate, PathValue, PathVariables, Segment};
