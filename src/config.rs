//! Resolved runtime configuration.
//!
//! [`Config`] is built from parsed command-line arguments (which already
//! carry environment fallbacks) and validated before any session is opened.

use std::path::PathBuf;
use std::time::Duration;

use crate::chat::{DEFAULT_FALLBACK_TEXT, SessionSettings};
use crate::cli::Cli;
use crate::client::{ChatClient, DEFAULT_ENDPOINT, RequestShape};
use crate::error::{Error, Result};
use crate::storage::default_db_path;
use crate::stream::Framing;

/// User id reported for token-based sign-in.
pub const TOKEN_USER_ID: &str = "streamchat";

/// Settings for one invocation of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Chat endpoint URL.
    pub endpoint: String,
    /// Request body shape.
    pub request_shape: RequestShape,
    /// Stream framing mode.
    pub framing: Framing,
    /// Text committed when a reply fails.
    pub fallback_text: String,
    /// History database location.
    pub db_path: PathBuf,
    /// Conversation name within the database.
    pub conversation: String,
    /// Connect timeout for the HTTP client.
    pub connect_timeout: Duration,
    /// Bearer token, if any.
    pub api_token: Option<String>,
    /// Refuse to send without a signed-in provider.
    pub require_auth: bool,
    /// Keep history in memory only.
    pub ephemeral: bool,
}

impl Config {
    /// Resolves defaults from parsed arguments and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any setting is invalid.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Self {
            endpoint: cli
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            request_shape: cli.shape.into(),
            framing: cli.framing.into(),
            fallback_text: cli
                .fallback_text
                .clone()
                .unwrap_or_else(|| DEFAULT_FALLBACK_TEXT.to_string()),
            db_path: cli.db_path.clone().unwrap_or_else(default_db_path),
            conversation: cli.conversation.clone(),
            connect_timeout: Duration::from_secs(cli.connect_timeout),
            api_token: cli.token.clone().filter(|t| !t.trim().is_empty()),
            require_auth: cli.require_auth,
            ephemeral: cli.ephemeral,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a malformed or non-HTTP endpoint, an
    /// empty conversation name, or a zero connect timeout.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| Error::Config {
            message: format!("invalid endpoint {:?}: {e}", self.endpoint),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("endpoint must be http or https, got {}", url.scheme()),
            });
        }
        if self.conversation.trim().is_empty() {
            return Err(Error::Config {
                message: "conversation name must not be empty".to_string(),
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::Config {
                message: "connect timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Builds the HTTP client for this configuration.
    #[must_use]
    pub fn client(&self) -> ChatClient {
        ChatClient::new()
            .endpoint(self.endpoint.as_str())
            .connect_timeout(self.connect_timeout)
    }

    /// Session settings derived from this configuration.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            request_shape: self.request_shape,
            framing: self.framing,
            fallback_text: self.fallback_text.clone(),
            require_auth: self.require_auth,
        }
    }
}
