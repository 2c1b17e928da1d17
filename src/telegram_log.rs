//! Forwards log lines to a Telegram chat, with secrets redacted.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const MAX_MESSAGE_CHARS: usize = 4000;
const FLUSH_LINES: usize = 50;

static BOT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{6,12}:[A-Za-z0-9_-]{30,}").expect("static regex"));
static KEY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&]key=)[^&\s]+").expect("static regex"));

/// Log message with priority.
enum LogMessage {
    /// High priority (WARN/ERROR) - send immediately
    Urgent(String),
    /// Low priority (INFO) - batch and send periodically
    Info(String),
}

/// Replaces known secrets and anything that looks like one.
#[derive(Clone)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new(secrets: Vec<String>) -> Self {
        let secrets = secrets.into_iter().filter(|s| !s.is_empty()).collect();
        Self { secrets }
    }

    pub fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        for secret in &self.secrets {
            output = output.replace(secret.as_str(), "[REDACTED]");
        }
        output = BOT_TOKEN.replace_all(&output, "[TELEGRAM_TOKEN]").into_owned();
        KEY_PARAM.replace_all(&output, "${1}[REDACTED]").into_owned()
    }
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<LogMessage>,
    redactor: Redactor,
}

impl TelegramLogLayer {
    pub fn new(bot: Bot, chat_id: ChatId, redactor: Redactor) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogMessage>();

        tokio::spawn(async move {
            let mut info_buffer: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(Duration::from_secs(5));

            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        match msg {
                            Some(LogMessage::Urgent(text)) => {
                                send_log(&bot, chat_id, &text).await;
                            }
                            Some(LogMessage::Info(text)) => {
                                info_buffer.push(text);
                                if info_buffer.len() >= FLUSH_LINES {
                                    flush_buffer(&bot, chat_id, &mut info_buffer).await;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = interval.tick() => {
                        if !info_buffer.is_empty() {
                            flush_buffer(&bot, chat_id, &mut info_buffer).await;
                        }
                    }
                }
            }
        });

        Self { tx, redactor }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_MESSAGE_CHARS {
        let truncated: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

async fn send_log(bot: &Bot, chat_id: ChatId, text: &str) {
    // Can't log through tracing here without looping back into this layer
    if let Err(e) = bot.send_message(chat_id, truncate(text)).await {
        eprintln!("Failed to send log to Telegram: {e}");
    }
}

async fn flush_buffer(bot: &Bot, chat_id: ChatId, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(bot, chat_id, &combined).await;
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

fn format_line(level: Level, message: &str) -> Option<LogMessage> {
    // Only INFO, WARN, ERROR go to Telegram
    if level > Level::INFO {
        return None;
    }
    Some(match level {
        Level::ERROR => LogMessage::Urgent(format!("❌ {}", message)),
        Level::WARN => LogMessage::Urgent(format!("⚠️ {}", message)),
        _ => LogMessage::Info(message.to_string()),
    })
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        // Our own HTTP traffic would feed back into the channel
        if event.metadata().target().starts_with("teloxide") || event.metadata().target().starts_with("reqwest") {
            return;
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        let Some(msg) = format_line(level, &self.redactor.redact(&visitor.message)) else {
            return;
        };

        if self.tx.send(msg).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_known_secret() {
        let redactor = Redactor::new(vec!["abc123secret".into()]);
        assert_eq!(redactor.redact("key abc123secret leaked"), "key [REDACTED] leaked");
    }

    #[test]
    fn test_redacts_bot_token_shape() {
        let redactor = Redactor::new(vec![]);
        let line = "request to bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw failed";
        let redacted = redactor.redact(line);
        assert!(!redacted.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));
    }

    #[test]
    fn test_redacts_key_query_param() {
        let redactor = Redactor::new(vec![]);
        let redacted = redactor.redact("GET https://pixabay.com/api/?key=zzz&q=cats");
        assert_eq!(redacted, "GET https://pixabay.com/api/?key=[REDACTED]&q=cats");
    }

    #[test]
    fn test_empty_secret_ignored() {
        let redactor = Redactor::new(vec![String::new()]);
        assert_eq!(redactor.redact("plain"), "plain");
    }

    #[test]
    fn test_levels() {
        assert!(matches!(format_line(Level::ERROR, "x"), Some(LogMessage::Urgent(m)) if m == "❌ x"));
        assert!(matches!(format_line(Level::WARN, "x"), Some(LogMessage::Urgent(_))));
        assert!(matches!(format_line(Level::INFO, "x"), Some(LogMessage::Info(m)) if m == "x"));
        assert!(format_line(Level::DEBUG, "x").is_none());
    }

    #[test]
    fn test_truncate() {
        let long = "я".repeat(MAX_MESSAGE_CHARS + 10);
        let out = truncate(&long);
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS + 3);
        assert_eq!(truncate("short"), "short");
    }
}
