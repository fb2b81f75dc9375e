//! Selector error types
//!
//! All selector errors are startup-time configuration errors: selectors are
//! compiled and validated before the dispatcher accepts connections, never
//! at dispatch time.

use thiserror::Error;

/// Errors raised while compiling a selector expression
#[derive(Error, Debug)]
pub enum SelectorError {
    /// Expression could not be parsed
    #[error("Invalid selector expression: {0}")]
    Parse(String),

    /// Expression references a field the event context does not declare
    #[error("Invalid selector expression: unknown field '{0}'")]
    UnknownField(String),

    /// Operator applied to operands of an incompatible kind
    #[error("Invalid selector expression: {op} is not applicable to field '{field}' ({reason})")]
    TypeMismatch {
        field: String,
        op: &'static str,
        reason: String,
    },
}

/// Result type for selector operations
pub type SelectorResult<T> = Result<T, SelectorError>;
