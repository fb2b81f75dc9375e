//! Security Collaborator
//!
//! The core never makes authorization decisions itself: the glue layer
//! supplies an [`Authorizer`] and the dispatcher consults it with a single
//! capability check per decision point. Denial surfaces as a `Forbidden`
//! condition handled per-frame.

use async_trait::async_trait;

/// Authenticated identity attached to a session at connect time
///
/// Connections without a principal are anonymous rather than rejected;
/// whether anonymous access is acceptable is the authorizer's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    principal: Option<String>,
}

impl Identity {
    /// Identity without a principal
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    /// Identity with an authenticated principal
    pub fn named(principal: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
        }
    }

    /// The principal, if authenticated
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.principal.is_none()
    }

    /// Display form for logs and error messages
    pub fn display(&self) -> &str {
        self.principal.as_deref().unwrap_or("<anonymous>")
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Authorization capability consulted before a handler is invoked
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Whether the identity may send frames to the given path
    async fn authorize(&self, identity: &Identity, path: &str) -> bool;
}

/// Authorizer that permits everything (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _identity: &Identity, _path: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity() {
        let identity = Identity::anonymous();
        assert!(identity.is_anonymous());
        assert_eq!(identity.principal(), None);
        assert_eq!(identity.display(), "<anonymous>");
    }

    #[test]
    fn test_named_identity() {
        let identity = Identity::named("alice");
        assert!(!identity.is_anonymous());
        assert_eq!(identity.principal(), Some("alice"));
        assert_eq!(identity.display(), "alice");
    }

    #[tokio::test]
    async fn test_allow_all() {
        assert!(AllowAll.authorize(&Identity::anonymous(), "/rooms/42").await);
    }
}
