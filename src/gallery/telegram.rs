//! Telegram client using teloxide.

use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia,
    InputMediaPhoto, MessageId,
};
use tracing::{info, warn};

use crate::gallery::gateway::{ChatGateway, GatewayError};
use crate::gallery::pager::{Controls, Navigation};
use crate::gallery::views::{NEXT_LABEL, PREV_LABEL};

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn parse_url(url: &str) -> Result<Url, GatewayError> {
    Url::parse(url).map_err(|e| failed(&format!("parse image url {url}"), e))
}

fn failed(what: &str, e: impl std::fmt::Display) -> GatewayError {
    let msg = format!("Failed to {what}: {e}");
    warn!("{}", msg);
    GatewayError(msg)
}

pub fn keyboard(controls: Controls) -> InlineKeyboardMarkup {
    let mut row = Vec::new();
    if controls.prev {
        row.push(InlineKeyboardButton::callback(PREV_LABEL, Navigation::Prev.callback_data()));
    }
    if controls.next {
        row.push(InlineKeyboardButton::callback(NEXT_LABEL, Navigation::Next.callback_data()));
    }
    InlineKeyboardMarkup::new(vec![row])
}

#[async_trait]
impl ChatGateway for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|msg| i64::from(msg.id.0))
            .map_err(|e| failed("send", e))
    }

    async fn send_photo(&self, chat_id: i64, url: &str) -> Result<i64, GatewayError> {
        info!("📷 Sending photo to chat {}", chat_id);

        let input_file = InputFile::url(parse_url(url)?);
        self.bot
            .send_photo(ChatId(chat_id), input_file)
            .await
            .map(|msg| i64::from(msg.id.0))
            .map_err(|e| failed("send photo", e))
    }

    async fn send_media_group(&self, chat_id: i64, urls: &[String]) -> Result<Vec<i64>, GatewayError> {
        info!("📷 Sending {} photo(s) to chat {}", urls.len(), chat_id);

        let media = urls
            .iter()
            .map(|u| parse_url(u).map(|url| InputMedia::Photo(InputMediaPhoto::new(InputFile::url(url)))))
            .collect::<Result<Vec<_>, _>>()?;

        let messages = self
            .bot
            .send_media_group(ChatId(chat_id), media)
            .await
            .map_err(|e| failed("send media group", e))?;

        Ok(messages.iter().map(|m| i64::from(m.id.0)).collect())
    }

    async fn send_controls(&self, chat_id: i64, text: &str, controls: Controls) -> Result<i64, GatewayError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(keyboard(controls))
            .await
            .map(|msg| i64::from(msg.id.0))
            .map_err(|e| failed("send controls", e))
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), GatewayError> {
        info!("🗑️ Deleting message {} in chat {}", message_id, chat_id);

        let message_id = i32::try_from(message_id)
            .map_err(|e| failed(&format!("convert message id {message_id}"), e))?;

        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(|e| failed("delete message", e))?;

        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), GatewayError> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));

        if let Some(text) = text {
            request = request.text(text);
        }

        request.await.map_err(|e| failed("answer callback", e))?;
        Ok(())
    }
}
