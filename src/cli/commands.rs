//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::auth::{Anonymous, AuthProvider, StaticTokenAuth};
use crate::chat::ChatSession;
use crate::cli::output::{
    OutputFormat, format_cleared, format_conversations, format_error, format_history,
    format_reply, format_status,
};
use crate::cli::parser::{Cli, Commands};
use crate::config::{Config, TOKEN_USER_ID};
use crate::error::{CommandError, Error, IoError, Result, StorageError};
use crate::storage::{HistoryStore, MemoryHistoryStore, SqliteHistoryStore};
use crate::stream::{NullSink, SnapshotSink};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success. Streaming commands write the reply
/// to stdout as it arrives and return only what follows it.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the command fails.
pub async fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = Config::from_cli(cli)?;
    tracing::debug!(
        db_path = %config.db_path.display(),
        conversation = %config.conversation,
        "configuration resolved"
    );

    match &cli.command {
        Commands::Send { message } => cmd_send(&config, message.as_deref(), format).await,
        Commands::Chat => cmd_chat(&config, format).await,
        Commands::History { limit } => cmd_history(&config, *limit, format),
        Commands::Clear { yes } => cmd_clear(&config, *yes, format),
        Commands::Conversations => cmd_conversations(&config, format),
        Commands::Status => cmd_status(&config, format),
    }
}

/// Opens the database and creates the schema if needed.
fn open_store(config: &Config) -> Result<SqliteHistoryStore> {
    let mut store = SqliteHistoryStore::open(&config.db_path, config.conversation.as_str())?;
    store.init()?;
    Ok(store)
}

/// Opens the history backing the session, in memory for ephemeral runs.
fn open_history(config: &Config) -> Result<Box<dyn HistoryStore>> {
    if config.ephemeral {
        return Ok(Box::new(MemoryHistoryStore::new()));
    }
    Ok(Box::new(open_store(config)?))
}

async fn open_session(config: &Config) -> Result<ChatSession> {
    let auth: Box<dyn AuthProvider> = match &config.api_token {
        Some(token) => {
            let mut auth = StaticTokenAuth::new(token.as_str(), TOKEN_USER_ID);
            auth.login().await?;
            Box::new(auth)
        }
        None => Box::new(Anonymous),
    };
    tracing::info!(
        endpoint = %config.endpoint,
        auth = auth.name(),
        ephemeral = config.ephemeral,
        "opening chat session"
    );

    ChatSession::new(
        config.client(),
        open_history(config)?,
        auth,
        config.session_settings(),
    )
}

async fn cmd_send(config: &Config, message: Option<&str>, format: OutputFormat) -> Result<String> {
    let text = match message {
        Some(m) => m.to_string(),
        None => read_stdin().await?,
    };
    let mut session = open_session(config).await?;

    let interrupt = CancelOnInterrupt::install();
    let result = match format {
        OutputFormat::Text => {
            let mut sink = TerminalSink::default();
            session.send(&text, &mut sink, interrupt.token()).await
        }
        OutputFormat::Json => session.send(&text, &mut NullSink, interrupt.token()).await,
    };
    drop(interrupt);

    let reply = result?;
    Ok(format_reply(&reply, format))
}

async fn cmd_chat(config: &Config, format: OutputFormat) -> Result<String> {
    let mut session = open_session(config).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if format == OutputFormat::Text {
            write_stdout("> ")?;
        }
        let Some(line) = lines.next_line().await.map_err(|e| IoError::ReadFailed {
            reason: e.to_string(),
        })?
        else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                let deleted = session.messages().len();
                session.clear()?;
                write_stdout(&format_cleared(&config.conversation, deleted, format))?;
                continue;
            }
            _ => {}
        }

        let interrupt = CancelOnInterrupt::install();
        let result = match format {
            OutputFormat::Text => {
                write_stdout("Bot: ")?;
                let mut sink = TerminalSink::default();
                session.send(&line, &mut sink, interrupt.token()).await
            }
            OutputFormat::Json => session.send(&line, &mut NullSink, interrupt.token()).await,
        };
        drop(interrupt);

        // A failed reply does not end the chat
        match result {
            Ok(reply) => write_stdout(&format_reply(&reply, format))?,
            Err(e) => match format {
                OutputFormat::Text => {
                    write_stdout("\n")?;
                    write_stderr(&format!("Error: {}\n", format_error(&e, format)))?;
                }
                OutputFormat::Json => write_stdout(&format!("{}\n", format_error(&e, format)))?,
            },
        }
    }

    Ok(String::new())
}

fn cmd_history(config: &Config, limit: Option<usize>, format: OutputFormat) -> Result<String> {
    if limit == Some(0) {
        return Err(
            CommandError::InvalidArgument("--limit must be greater than zero".to_string()).into(),
        );
    }

    let store = open_history(config)?;
    let messages = store.load()?;
    let skip = limit.map_or(0, |n| messages.len().saturating_sub(n));
    Ok(format_history(&config.conversation, &messages[skip..], format))
}

fn cmd_clear(config: &Config, yes: bool, format: OutputFormat) -> Result<String> {
    if !yes {
        return Err(CommandError::ExecutionFailed(format!(
            "Use --yes to confirm. This will delete conversation '{}'.",
            config.conversation
        ))
        .into());
    }
    if config.ephemeral {
        return Ok(format_cleared(&config.conversation, 0, format));
    }

    let mut store = open_store(config)?;
    let deleted = match store.delete_conversation(&config.conversation) {
        Ok(n) => n,
        Err(Error::Storage(StorageError::ConversationNotFound { .. })) => 0,
        Err(e) => return Err(e),
    };
    Ok(format_cleared(&config.conversation, deleted, format))
}

fn cmd_conversations(config: &Config, format: OutputFormat) -> Result<String> {
    let store = open_store(config)?;
    let conversations = store.list_conversations()?;
    Ok(format_conversations(&conversations, format))
}

fn cmd_status(config: &Config, format: OutputFormat) -> Result<String> {
    let store = open_store(config)?;
    let stats = store.stats()?;
    Ok(format_status(&stats, &config.db_path, format))
}

async fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .map_err(|e| IoError::ReadFailed {
            reason: format!("stdin: {e}"),
        })?;
    Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
}

fn write_stdout(text: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(text.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| {
            IoError::WriteFailed {
                reason: e.to_string(),
            }
            .into()
        })
}

fn write_stderr(text: &str) -> Result<()> {
    io::stderr().lock().write_all(text.as_bytes()).map_err(|e| {
        IoError::WriteFailed {
            reason: e.to_string(),
        }
        .into()
    })
}

/// Prints each snapshot's new suffix so the reply grows in place.
#[derive(Debug, Default)]
struct TerminalSink {
    printed: usize,
}

impl SnapshotSink for TerminalSink {
    fn snapshot(&mut self, text: &str) {
        // Snapshots only ever extend the previous one
        if let Some(delta) = text.get(self.printed..) {
            let mut out = io::stdout().lock();
            let _ = out.write_all(delta.as_bytes());
            let _ = out.flush();
        }
        self.printed = text.len();
    }
}

/// Cancels a token when Ctrl-C is pressed, until dropped.
struct CancelOnInterrupt {
    token: CancellationToken,
    watcher: JoinHandle<()>,
}

impl CancelOnInterrupt {
    fn install() -> Self {
        let token = CancellationToken::new();
        let watcher = tokio::spawn({
            let token = token.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::debug!("interrupt received, cancelling reply");
                    token.cancel();
                }
            }
        });
        Self { token, watcher }
    }

    const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CancelOnInterrupt {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cli(dir: &TempDir, endpoint: &str, args: &[&str]) -> Cli {
        let db_path = dir.path().join("history.db");
        let mut argv = vec![
            "streamchat".to_string(),
            "--db-path".to_string(),
            db_path.to_string_lossy().to_string(),
            "--endpoint".to_string(),
            endpoint.to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        argv.extend(args.iter().map(ToString::to_string));
        Cli::try_parse_from(argv).unwrap()
    }

    async fn reply_server(body: &'static str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_history_empty() {
        let dir = TempDir::new().unwrap();
        let output = execute(&cli(&dir, "http://localhost:1/", &["history"]))
            .await
            .unwrap();
        assert!(output.contains("\"messages\": []"));
    }

    #[tokio::test]
    async fn test_history_limit_zero_rejected() {
        let dir = TempDir::new().unwrap();
        let err = execute(&cli(&dir, "http://localhost:1/", &["history", "-n", "0"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Command(CommandError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_clear_requires_yes() {
        let dir = TempDir::new().unwrap();
        let err = execute(&cli(&dir, "http://localhost:1/", &["clear"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--yes"));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = execute(&cli(&dir, "nowhere", &["history"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_send_then_history() {
        let server = reply_server("data: Hi \n\ndata: there\n\ndata: [DONE]\n\n").await;
        let dir = TempDir::new().unwrap();

        let output = execute(&cli(&dir, &server.uri(), &["send", "hello"]))
            .await
            .unwrap();
        let reply: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(reply["text"], "Hi there");
        assert_eq!(reply["termination"], "sentinel");

        let output = execute(&cli(&dir, &server.uri(), &["history"]))
            .await
            .unwrap();
        let history: serde_json::Value = serde_json::from_str(&output).unwrap();
        let messages = history["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["content"], "Hi there");

        let output = execute(&cli(&dir, &server.uri(), &["history", "-n", "1"]))
            .await
            .unwrap();
        assert!(!output.contains("hello"));

        let output = execute(&cli(&dir, &server.uri(), &["conversations"]))
            .await
            .unwrap();
        assert!(output.contains("\"message_count\": 2"));

        let output = execute(&cli(&dir, &server.uri(), &["clear", "--yes"]))
            .await
            .unwrap();
        assert!(output.contains("\"deleted\": 2"));
    }

    #[tokio::test]
    async fn test_ephemeral_send_leaves_database_empty() {
        let server = reply_server("data: ok\n\n").await;
        let dir = TempDir::new().unwrap();

        execute(&cli(&dir, &server.uri(), &["--ephemeral", "send", "hello"]))
            .await
            .unwrap();

        let output = execute(&cli(&dir, &server.uri(), &["status"]))
            .await
            .unwrap();
        assert!(output.contains("\"message_count\": 0"));
    }

    #[tokio::test]
    async fn test_send_failure_records_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();

        let err = execute(&cli(&dir, &server.uri(), &["send", "hello"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));

        let output = execute(&cli(&dir, &server.uri(), &["history"]))
            .await
            .unwrap();
        assert!(output.contains("An error occurred."));
        assert!(output.contains("\"is_error\": true"));
    }

    #[tokio::test]
    async fn test_require_auth_without_token() {
        let dir = TempDir::new().unwrap();
        let err = execute(&cli(&dir, "http://localhost:1/", &["--require-auth", "send", "hi"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
