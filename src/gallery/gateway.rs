//! Outbound chat operations the gallery needs.

use async_trait::async_trait;
use thiserror::Error;

use crate::gallery::pager::Controls;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

/// Chat transport. Message and chat ids are Telegram's, widened to i64.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError>;

    /// Send a single photo by url.
    async fn send_photo(&self, chat_id: i64, url: &str) -> Result<i64, GatewayError>;

    /// Send 2 to 10 photos by url as one album. Returns the message ids in
    /// order.
    async fn send_media_group(&self, chat_id: i64, urls: &[String]) -> Result<Vec<i64>, GatewayError>;

    /// Send `text` with inline Prev/Next buttons as selected by `controls`.
    async fn send_controls(&self, chat_id: i64, text: &str, controls: Controls) -> Result<i64, GatewayError>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), GatewayError>;

    /// Acknowledge a button press, optionally with a short notice.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), GatewayError>;
}
