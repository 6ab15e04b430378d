//! Authentication capability.
//!
//! The chat client does not implement any login protocol itself. It asks an
//! [`AuthProvider`] whether a user is signed in and which bearer token, if
//! any, to attach to requests.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AuthError, Result};

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Stable identifier.
    pub id: String,
    /// Display name, when known.
    pub name: Option<String>,
}

/// Source of identity and credentials for chat requests.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Whether a user is currently signed in.
    fn is_authenticated(&self) -> bool;

    /// Signs in and returns the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider refuses or cannot log in.
    async fn login(&mut self) -> Result<User>;

    /// Signs out. Signing out when not signed in is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot complete the logout.
    async fn logout(&mut self) -> Result<()>;

    /// The signed-in user, if any.
    fn current_user(&self) -> Option<&User>;

    /// Bearer token to attach to requests while signed in.
    fn bearer_token(&self) -> Option<&str> {
        None
    }
}

/// Provider for endpoints without authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

#[async_trait]
impl AuthProvider for Anonymous {
    fn name(&self) -> &'static str {
        "anonymous"
    }

    fn is_authenticated(&self) -> bool {
        false
    }

    async fn login(&mut self) -> Result<User> {
        Err(AuthError::Unsupported {
            provider: self.name(),
        }
        .into())
    }

    async fn logout(&mut self) -> Result<()> {
        Ok(())
    }

    fn current_user(&self) -> Option<&User> {
        None
    }
}

/// Provider backed by a pre-issued API token.
///
/// The token is only handed out between `login` and `logout`.
#[derive(Debug, Clone)]
pub struct StaticTokenAuth {
    token: String,
    user: User,
    signed_in: bool,
}

impl StaticTokenAuth {
    /// Creates a signed-out provider for `token`, identifying as `user_id`.
    #[must_use]
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: User {
                id: user_id.into(),
                name: None,
            },
            signed_in: false,
        }
    }

    /// Sets the display name reported for the user.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.user.name = Some(name.into());
        self
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    fn name(&self) -> &'static str {
        "static-token"
    }

    fn is_authenticated(&self) -> bool {
        self.signed_in
    }

    async fn login(&mut self) -> Result<User> {
        if self.token.trim().is_empty() {
            return Err(AuthError::LoginFailed("token is empty".to_string()).into());
        }
        self.signed_in = true;
        tracing::debug!(user = %self.user.id, "signed in with static token");
        Ok(self.user.clone())
    }

    async fn logout(&mut self) -> Result<()> {
        self.signed_in = false;
        Ok(())
    }

    fn current_user(&self) -> Option<&User> {
        self.signed_in.then_some(&self.user)
    }

    fn bearer_token(&self) -> Option<&str> {
        self.signed_in.then_some(self.token.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn anonymous_cannot_login() {
        let mut auth = Anonymous;
        assert!(!auth.is_authenticated());
        let err = auth.login().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Unsupported { .. })));
        assert!(auth.logout().await.is_ok());
        assert!(auth.bearer_token().is_none());
    }

    #[tokio::test]
    async fn static_token_login_logout() {
        let mut auth = StaticTokenAuth::new("secret", "alice").with_name("Alice");
        assert!(!auth.is_authenticated());
        assert!(auth.current_user().is_none());
        assert!(auth.bearer_token().is_none());

        let user = auth.login().await.unwrap();
        assert_eq!(user.id, "alice");
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert!(auth.is_authenticated());
        assert_eq!(auth.bearer_token(), Some("secret"));

        auth.logout().await.unwrap();
        assert!(!auth.is_authenticated());
        assert!(auth.bearer_token().is_none());
    }

    #[tokio::test]
    async fn static_token_rejects_blank_token() {
        let mut auth = StaticTokenAuth::new("  ", "bob");
        let err = auth.login().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::LoginFailed(_))));
        assert!(!auth.is_authenticated());
    }
}
