//! One conversation with the endpoint.
//!
//! [`ChatSession`] owns the message list and runs send operations: it
//! records the user's text, posts the conversation, streams the reply into a
//! [`SnapshotSink`] and commits the outcome to the [`HistoryStore`].

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthProvider;
use crate::client::{ChatClient, ChatRequest, RequestShape};
use crate::core::{Message, StreamPhase, Termination};
use crate::error::{AuthError, Error, Result};
use crate::storage::HistoryStore;
use crate::stream::{Framing, SnapshotSink, StreamConsumer};

/// Text committed in place of a reply that failed.
pub const DEFAULT_FALLBACK_TEXT: &str = "An error occurred.";

/// Behaviour of a [`ChatSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Request body shape.
    pub request_shape: RequestShape,
    /// Stream framing mode.
    pub framing: Framing,
    /// Assistant text recorded when a reply fails.
    pub fallback_text: String,
    /// Refuse to send unless the auth provider is signed in.
    pub require_auth: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            request_shape: RequestShape::default(),
            framing: Framing::default(),
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            require_auth: false,
        }
    }
}

/// Successful result of a send operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Committed assistant text.
    pub text: String,
    /// How the stream ended.
    pub termination: Termination,
    /// Chunks read from the response body.
    pub chunks: usize,
}

/// A conversation bound to an endpoint, a history store and an auth provider.
pub struct ChatSession {
    client: ChatClient,
    history: Box<dyn HistoryStore>,
    auth: Box<dyn AuthProvider>,
    settings: SessionSettings,
    messages: Vec<Message>,
    phase: StreamPhase,
}

impl ChatSession {
    /// Creates a session, loading existing history from `history`.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be loaded.
    pub fn new(
        client: ChatClient,
        history: Box<dyn HistoryStore>,
        auth: Box<dyn AuthProvider>,
        settings: SessionSettings,
    ) -> Result<Self> {
        let messages = history.load()?;
        tracing::debug!(messages = messages.len(), "session history loaded");
        Ok(Self {
            client,
            history,
            auth,
            settings,
            messages,
            phase: StreamPhase::Idle,
        })
    }

    /// Messages of the conversation, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Phase of the most recent send operation.
    #[must_use]
    pub const fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Session settings.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The auth provider.
    #[must_use]
    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    /// Mutable access to the auth provider, for login and logout.
    pub fn auth_mut(&mut self) -> &mut dyn AuthProvider {
        self.auth.as_mut()
    }

    /// Deletes the conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn clear(&mut self) -> Result<()> {
        self.history.clear()?;
        self.messages.clear();
        self.phase = StreamPhase::Idle;
        Ok(())
    }

    /// Sends `text` and streams the reply into `sink`.
    ///
    /// The user message is committed before the request goes out. On success
    /// the reply is committed; a cancelled reply is committed with whatever
    /// text arrived. Cancelling while the endpoint has not yet answered
    /// returns an empty [`Termination::Cancelled`] reply.
    ///
    /// On failure the fallback text is added as an error message,
    /// `sink.failed` is called, and the stream error is returned. A failure
    /// to persist the fallback is logged and does not replace that error.
    ///
    /// If the reply streams but cannot be persisted, it is dropped from
    /// [`Self::messages`], the phase becomes [`StreamPhase::Errored`] and
    /// the storage error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyMessage`] for blank input (nothing is recorded)
    /// - [`AuthError::NotAuthenticated`] when auth is required but missing
    /// - [`crate::StreamError`] variants for transport, status or body failures
    /// - [`crate::StorageError`] when the user message or the reply cannot be saved
    pub async fn send<K>(
        &mut self,
        text: &str,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<Reply>
    where
        K: SnapshotSink + ?Sized,
    {
        if text.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        if self.settings.require_auth && !self.auth.is_authenticated() {
            return Err(AuthError::NotAuthenticated.into());
        }

        self.messages.push(Message::user(text));
        self.history.save(&self.messages)?;

        self.phase = StreamPhase::Streaming;
        let request = ChatRequest::build(self.settings.request_shape, &self.messages);
        let mut consumer = StreamConsumer::new(self.settings.framing);

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            opened = self.client.open_stream(&request, self.auth.bearer_token()) => Some(opened),
        };
        let Some(opened) = opened else {
            self.phase = StreamPhase::Cancelled;
            tracing::debug!("send cancelled before response headers");
            return Ok(Reply {
                text: String::new(),
                termination: Termination::Cancelled,
                chunks: 0,
            });
        };

        let result = match opened {
            Ok(stream) => consumer.consume(stream, sink, cancel).await,
            Err(e) => {
                sink.failed(&e.to_string());
                Err(e)
            }
        };

        match result {
            Ok(outcome) => {
                self.phase = consumer.phase();
                if !outcome.text.is_empty() {
                    self.messages.push(Message::assistant(outcome.text.as_str()));
                    if let Err(e) = self.history.save(&self.messages) {
                        self.messages.pop();
                        self.phase = StreamPhase::Errored;
                        return Err(e);
                    }
                }
                tracing::info!(
                    termination = ?outcome.termination,
                    chars = outcome.text.len(),
                    "reply committed"
                );
                Ok(Reply {
                    text: outcome.text,
                    termination: outcome.termination,
                    chunks: outcome.chunks,
                })
            }
            Err(e) => {
                self.phase = StreamPhase::Errored;
                tracing::warn!(error = %e, "reply failed");
                self.messages
                    .push(Message::error(self.settings.fallback_text.as_str()));
                if let Err(save_err) = self.history.save(&self.messages) {
                    tracing::warn!(error = %save_err, "failed to record fallback message");
                }
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("endpoint", &self.client.endpoint_url())
            .field("auth", &self.auth.name())
            .field("settings", &self.settings)
            .field("messages", &self.messages.len())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Anonymous, StaticTokenAuth};
    use crate::error::StorageError;
    use crate::storage::MemoryHistoryStore;
    use std::time::Duration;
    use crate::stream::NullSink;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event_stream(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
    }

    fn served_session(server: &MockServer, settings: SessionSettings) -> ChatSession {
        ChatSession::new(
            ChatClient::new().endpoint(format!("{}/chat", server.uri())),
            Box::new(MemoryHistoryStore::new()),
            Box::new(Anonymous),
            settings,
        )
        .unwrap()
    }

    fn session(settings: SessionSettings) -> ChatSession {
        // Endpoint is never contacted by these tests
        ChatSession::new(
            ChatClient::new().endpoint("http://127.0.0.1:9/unused"),
            Box::new(MemoryHistoryStore::new()),
            Box::new(Anonymous),
            settings,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn blank_message_rejected_without_recording() {
        let mut session = session(SessionSettings::default());
        let err = session
            .send("   \n", &mut NullSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyMessage));
        assert!(session.messages().is_empty());
        assert_eq!(session.phase(), StreamPhase::Idle);
    }

    #[tokio::test]
    async fn auth_required_but_missing() {
        let mut session = session(SessionSettings {
            require_auth: true,
            ..SessionSettings::default()
        });
        let err = session
            .send("hi", &mut NullSink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::NotAuthenticated)));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn auth_mut_allows_login() {
        let mut session = ChatSession::new(
            ChatClient::new(),
            Box::new(MemoryHistoryStore::new()),
            Box::new(StaticTokenAuth::new("t", "me")),
            SessionSettings::default(),
        )
        .unwrap();
        assert!(!session.auth().is_authenticated());
        session.auth_mut().login().await.unwrap();
        assert!(session.auth().is_authenticated());
    }

    #[test]
    fn new_loads_existing_history() {
        let store = MemoryHistoryStore::with_messages(vec![
            Message::user("a"),
            Message::assistant("b"),
        ]);
        let mut session = ChatSession::new(
            ChatClient::new(),
            Box::new(store),
            Box::new(Anonymous),
            SessionSettings::default(),
        )
        .unwrap();
        assert_eq!(session.messages().len(), 2);

        session.clear().unwrap();
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn send_commits_streamed_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(event_stream("data: Hel\n\ndata: lo\n\ndata: [DONE]\n\n"))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = served_session(&server, SessionSettings::default());
        let mut snapshots = Vec::new();
        let mut sink = |s: &str| snapshots.push(s.to_string());
        let reply = session
            .send("hi", &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.text, "Hello");
        assert_eq!(reply.termination, Termination::Sentinel);
        assert_eq!(snapshots, vec!["Hel", "Hello"]);
        assert_eq!(session.phase(), StreamPhase::Completed);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].content, "Hello");
    }

    #[tokio::test]
    async fn failed_send_commits_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut session = served_session(
            &server,
            SessionSettings {
                fallback_text: "Sorry.".to_string(),
                ..SessionSettings::default()
            },
        );
        let err = session
            .send("hi", &mut NullSink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Stream(crate::StreamError::HttpStatus { status: 500, .. })
        ));
        assert_eq!(session.phase(), StreamPhase::Errored);
        let last = session.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.content, "Sorry.");
    }

    #[tokio::test]
    async fn error_messages_not_sent_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(event_stream("data: ok\n\n"))
            .mount(&server)
            .await;

        let store = MemoryHistoryStore::with_messages(vec![
            Message::user("first"),
            Message::error("An error occurred."),
        ]);
        let mut session = ChatSession::new(
            ChatClient::new().endpoint(server.uri()),
            Box::new(store),
            Box::new(Anonymous),
            SessionSettings::default(),
        )
        .unwrap();
        session
            .send("second", &mut NullSink, &CancellationToken::new())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let sent: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(sent, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn bearer_token_attached_after_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(event_stream("data: welcome\n\n"))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = ChatSession::new(
            ChatClient::new().endpoint(server.uri()),
            Box::new(MemoryHistoryStore::new()),
            Box::new(StaticTokenAuth::new("secret", "me")),
            SessionSettings {
                require_auth: true,
                ..SessionSettings::default()
            },
        )
        .unwrap();
        session.auth_mut().login().await.unwrap();

        let reply = session
            .send("hi", &mut NullSink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.text, "welcome");
        assert_eq!(reply.termination, Termination::EndOfStream);
    }

    #[tokio::test]
    async fn cancelled_before_reply_commits_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(event_stream("data: late\n\n"))
            .mount(&server)
            .await;

        let mut session = served_session(&server, SessionSettings::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let reply = session.send("hi", &mut NullSink, &cancel).await.unwrap();

        assert_eq!(reply.termination, Termination::Cancelled);
        assert!(reply.text.is_empty());
        assert_eq!(session.phase(), StreamPhase::Cancelled);
        assert_eq!(session.messages().len(), 1);
    }

    /// Store whose saves start failing after `saves_left` successes.
    struct FlakyStore {
        saves_left: usize,
        messages: Vec<Message>,
    }

    impl FlakyStore {
        fn new(saves_left: usize) -> Self {
            Self {
                saves_left,
                messages: Vec::new(),
            }
        }
    }

    impl HistoryStore for FlakyStore {
        fn load(&self) -> Result<Vec<Message>> {
            Ok(self.messages.clone())
        }

        fn save(&mut self, messages: &[Message]) -> Result<()> {
            if self.saves_left == 0 {
                return Err(StorageError::Database("disk full".to_string()).into());
            }
            self.saves_left -= 1;
            self.messages = messages.to_vec();
            Ok(())
        }
    }

    fn flaky_session(server: &MockServer, saves_left: usize) -> ChatSession {
        ChatSession::new(
            ChatClient::new().endpoint(server.uri()),
            Box::new(FlakyStore::new(saves_left)),
            Box::new(Anonymous),
            SessionSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(event_stream("data: slow\n\n").set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let mut session = served_session(&server, SessionSettings::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let reply = tokio::time::timeout(
            Duration::from_secs(5),
            session.send("hi", &mut NullSink, &cancel),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(reply.termination, Termination::Cancelled);
        assert!(reply.text.is_empty());
        assert_eq!(reply.chunks, 0);
        assert_eq!(session.phase(), StreamPhase::Cancelled);
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn fallback_save_failure_keeps_stream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let mut session = flaky_session(&server, 1);
        let err = session
            .send("hi", &mut NullSink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Stream(crate::StreamError::HttpStatus { status: 503, .. })
        ));
        assert_eq!(session.phase(), StreamPhase::Errored);
    }

    #[tokio::test]
    async fn reply_save_failure_drops_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(event_stream("data: lost\n\ndata: [DONE]\n\n"))
            .mount(&server)
            .await;

        let mut session = flaky_session(&server, 1);
        let err = session
            .send("hi", &mut NullSink, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
        assert_eq!(session.phase(), StreamPhase::Errored);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, "hi");
    }

    #[test]
    fn default_settings() {
        let settings = SessionSettings::default();
        assert_eq!(settings.fallback_text, DEFAULT_FALLBACK_TEXT);
        assert_eq!(settings.framing, Framing::EventStream);
        assert_eq!(settings.request_shape, RequestShape::Conversation);
        assert!(!settings.require_auth);
    }
}
