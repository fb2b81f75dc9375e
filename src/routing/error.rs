//! Routing error types

use thiserror::Error;

/// Errors raised while registering or resolving routes
#[derive(Error, Debug)]
pub enum RouteError {
    /// Template string could not be parsed
    #[error("Invalid route template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Template is structurally ambiguous with an already registered one
    #[error("Ambiguous route: '{template}' collides with registered template '{existing}'")]
    AmbiguousRoute { template: String, existing: String },

    /// A required path variable could not be extracted from the path
    #[error("Missing required path variable '{variable}' for template '{template}'")]
    MissingPathVariable { variable: String, template: String },
}

/// Result type for routing operations
pub type RouteResult<T> = Result<T, RouteError>;
