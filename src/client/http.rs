//! HTTP transport for the chat endpoint.

use bytes::Bytes;
use futures_util::Stream;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use std::time::Duration;

use crate::client::request::ChatRequest;
use crate::error::{Result, StreamError};

/// Default endpoint for a locally running backend.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/chat/stream";

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error response body kept in [`StreamError::HttpStatus`].
pub const MAX_ERROR_BODY: usize = 4096;

/// Client for a streaming chat endpoint.
///
/// # Example
///
/// ```no_run
/// use streamchat::client::ChatClient;
///
/// let client = ChatClient::new()
///     .endpoint("http://localhost:8000/api/chat/stream");
/// ```
#[derive(Debug, Clone)]
pub struct ChatClient {
    /// Endpoint receiving the POST.
    pub(crate) endpoint: String,
    /// Connect timeout applied when the HTTP client is built.
    pub(crate) connect_timeout: Duration,
    /// Shared HTTP client.
    pub(crate) http: reqwest::Client,
}

impl ChatClient {
    /// Creates a client for [`DEFAULT_ENDPOINT`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            http: build_http(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Overrides the endpoint URL.
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Overrides the connect timeout.
    ///
    /// There is no overall request timeout: replies stream for as long as
    /// the endpoint keeps producing.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.http = build_http(timeout);
        self
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint
    }

    /// Posts `request` and returns the response body as a byte stream.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Transport`] if the request cannot be sent
    /// - [`StreamError::HttpStatus`] for a non-success status
    /// - [`StreamError::UnsupportedStream`] if the body is not a text stream
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
        bearer: Option<&str>,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static> {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "text/event-stream, text/plain")
            .json(request);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(endpoint = %self.endpoint, "sending chat request");
        let response = builder.send().await.map_err(StreamError::from)?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), "chat response received");

        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(StreamError::HttpStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        check_streamable(status, response.headers())?;
        Ok(response.bytes_stream())
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads at most [`MAX_ERROR_BODY`] bytes of an error response.
async fn read_error_body(mut response: reqwest::Response) -> String {
    let mut buf = Vec::new();
    while let Ok(Some(chunk)) = response.chunk().await {
        buf.extend_from_slice(&chunk);
        if buf.len() > MAX_ERROR_BODY {
            break;
        }
    }
    cap_body(&buf)
}

/// Decodes `bytes` lossily, truncated to [`MAX_ERROR_BODY`] bytes with a
/// trailing `...` when longer.
fn cap_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_ERROR_BODY {
        return text.into_owned();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn build_http(connect_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Rejects successful responses that carry no text stream.
fn check_streamable(status: StatusCode, headers: &HeaderMap) -> Result<()> {
    if status == StatusCode::NO_CONTENT {
        return Err(StreamError::UnsupportedStream {
            reason: "204 No Content".to_string(),
        }
        .into());
    }

    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(());
    };
    let content_type = value.to_str().unwrap_or_default().trim();
    if content_type.to_ascii_lowercase().starts_with("text/") {
        Ok(())
    } else {
        Err(StreamError::UnsupportedStream {
            reason: format!("content type {content_type:?}"),
        }
        .into())
    }
}
