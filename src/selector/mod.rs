//! Event Selector Engine
//!
//! Compiles predicate expressions and evaluates them against per-event
//! context to decide whether an event is delivered to a session's handler.
//!
//! # Expression Language
//!
//! ```text
//! payload.type eq 'CHAT'
//! payload.priority gte 5 and payload.room ne 'lobby'
//! not (session.state eq 'CLOSING') or payload.urgent
//! ```
//!
//! Supported constructs: dotted field access into the event context,
//! single-quoted string literals, numbers, booleans and `null`, comparison
//! operators in word (`eq ne gt gte lt lte`) and symbolic (`== != > >= < <=`)
//! form, and `and` / `or` / `not` with parentheses.
//!
//! Selectors are compiled once at startup ([`CompiledSelector::compile`],
//! or [`CompiledSelector::compile_checked`] to validate field references
//! against a declared [`ContextShape`]) and evaluated many times, from many
//! tasks, against many events. Evaluation is pure and takes `&self`.

mod ast;
mod error;
mod matcher;
mod parser;

pub use ast::{Expr, Literal, Operator};
pub use error::{SelectorError, SelectorResult};
pub use matcher::{CompiledSelector, ContextShape, FieldKind};
pub use parser::parse_selector;
