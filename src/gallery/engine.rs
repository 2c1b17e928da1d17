//! Gallery engine - runs searches and pages through results per chat.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::gallery::gateway::{ChatGateway, GatewayError};
use crate::gallery::inflight::{FlightGuard, InFlight};
use crate::gallery::pager::{page_media, total_pages, Controls, Navigation};
use crate::gallery::search::{normalize_query, ImageRef, ImageSearch};
use crate::gallery::session::{Session, SessionStore};
use crate::gallery::views;

/// Result of a new search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Rendered { total_pages: u32 },
    NothingFound,
    Busy,
    Failed,
}

/// Result of a Prev/Next press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Rendered { page: u32 },
    Busy,
    Expired,
    Failed,
}

impl NavOutcome {
    /// What to tell the user when a press didn't render.
    pub fn notice(self) -> Option<&'static str> {
        match self {
            Self::Rendered { .. } => None,
            Self::Busy => Some(views::IN_PROGRESS),
            Self::Expired => Some(views::SESSION_EXPIRED),
            Self::Failed => Some(views::SEARCH_FAILED),
        }
    }
}

pub struct GalleryEngine {
    search: Arc<dyn ImageSearch>,
    gateway: Arc<dyn ChatGateway>,
    sessions: SessionStore,
    inflight: InFlight,
    page_size: u32,
}

impl GalleryEngine {
    pub fn new(
        search: Arc<dyn ImageSearch>,
        gateway: Arc<dyn ChatGateway>,
        sessions: SessionStore,
        page_size: u32,
    ) -> Self {
        Self {
            search,
            gateway,
            sessions,
            inflight: InFlight::new(),
            page_size,
        }
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Greeting for /start and /help.
    pub async fn start(&self, chat_id: i64) {
        if let Err(e) = self.gateway.send_text(chat_id, views::WELCOME).await {
            warn!("Failed to greet chat {}: {}", chat_id, e);
        }
    }

    /// Search `text` and show its first page, replacing whatever the chat
    /// was viewing.
    pub async fn new_query(&self, chat_id: i64, text: &str) -> QueryOutcome {
        let Some(_guard) = self.inflight.try_acquire(chat_id) else {
            info!("⏳ Chat {} already has a request running", chat_id);
            self.notify(chat_id, views::IN_PROGRESS).await;
            return QueryOutcome::Busy;
        };

        let query = normalize_query(text);
        if query.is_empty() {
            self.notify(chat_id, views::NOTHING_FOUND).await;
            return QueryOutcome::NothingFound;
        }

        let page = match self.search.search(&query, 1).await {
            Ok(page) => page,
            Err(e) => {
                error!("Search \"{}\" failed for chat {}: {}", query, chat_id, e);
                self.notify(chat_id, views::SEARCH_FAILED).await;
                return QueryOutcome::Failed;
            }
        };

        if page.total_hits == 0 {
            info!("Nothing found for \"{}\" (chat {})", query, chat_id);
            self.notify(chat_id, views::NOTHING_FOUND).await;
            return QueryOutcome::NothingFound;
        }

        if let Some(previous) = self.sessions.get(chat_id).await {
            self.delete_pending(chat_id, &previous.pending_message_ids).await;
        }

        let pages = total_pages(page.total_hits, self.page_size);
        info!("📨 Chat {}: \"{}\" has {} hit(s), {} page(s)", chat_id, query, page.total_hits, pages);
        self.sessions.put(chat_id, Session::new(query, pages)).await;
        debug!("{} active session(s)", self.sessions.len().await);
        if !self.render(chat_id, 1, pages, &page.items).await {
            self.notify(chat_id, views::SEARCH_FAILED).await;
            return QueryOutcome::Failed;
        }

        QueryOutcome::Rendered { total_pages: pages }
    }

    /// Move the chat's current search one page back or forward.
    pub async fn navigate(&self, chat_id: i64, nav: Navigation) -> NavOutcome {
        match self.claim(chat_id, nav).await {
            Ok((_guard, session)) => self.turn_page(chat_id, nav, session).await,
            Err(outcome) => outcome,
        }
    }

    /// Handle a button press end to end. The press is acknowledged before
    /// any search runs; a failure after that is reported as a message.
    pub async fn handle_callback(&self, callback_id: &str, chat_id: i64, data: &str) -> Option<NavOutcome> {
        let Some(nav) = Navigation::from_callback_data(data) else {
            debug!("Ignoring callback data {:?} from chat {}", data, chat_id);
            self.answer(callback_id, chat_id, None).await;
            return None;
        };

        let (_guard, session) = match self.claim(chat_id, nav).await {
            Ok(claimed) => claimed,
            Err(outcome) => {
                self.answer(callback_id, chat_id, outcome.notice()).await;
                return Some(outcome);
            }
        };

        // Telegram refuses answers to presses that are too old
        self.answer(callback_id, chat_id, None).await;

        let outcome = self.turn_page(chat_id, nav, session).await;
        if let Some(notice) = outcome.notice() {
            self.notify(chat_id, notice).await;
        }
        Some(outcome)
    }

    /// Take the chat's guard and its session, or the reason a press can't
    /// go ahead.
    async fn claim(&self, chat_id: i64, nav: Navigation) -> Result<(FlightGuard, Session), NavOutcome> {
        let Some(guard) = self.inflight.try_acquire(chat_id) else {
            info!("⏳ Chat {} pressed {:?} while busy", chat_id, nav);
            return Err(NavOutcome::Busy);
        };

        let Some(session) = self.sessions.get(chat_id).await else {
            info!("Chat {} pressed {:?} without a session", chat_id, nav);
            return Err(NavOutcome::Expired);
        };

        Ok((guard, session))
    }

    /// Caller holds the chat's guard.
    async fn turn_page(&self, chat_id: i64, nav: Navigation, session: Session) -> NavOutcome {
        let target = nav.apply(session.current_page);
        debug!("Chat {}: page {} -> {}", chat_id, session.current_page, target);

        let page = match self.search.search(&session.query, target).await {
            Ok(page) => page,
            Err(e) => {
                error!("Search \"{}\" page {} failed for chat {}: {}", session.query, target, chat_id, e);
                return NavOutcome::Failed;
            }
        };

        self.delete_pending(chat_id, &session.pending_message_ids).await;

        // An out-of-range page reports no hits; keep the known page count
        let pages = if page.total_hits > 0 {
            total_pages(page.total_hits, self.page_size)
        } else {
            session.total_pages
        };
        self.sessions
            .update(chat_id, |s| {
                s.current_page = target;
                s.total_pages = pages;
                s.pending_message_ids.clear();
            })
            .await;

        if !self.render(chat_id, target, pages, &page.items).await {
            return NavOutcome::Failed;
        }
        NavOutcome::Rendered { page: target }
    }

    async fn answer(&self, callback_id: &str, chat_id: i64, notice: Option<&str>) {
        if let Err(e) = self.gateway.answer_callback(callback_id, notice).await {
            warn!("Failed to answer callback in chat {}: {}", chat_id, e);
        }
    }

    async fn notify(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.gateway.send_text(chat_id, text).await {
            warn!("Failed to notify chat {}: {}", chat_id, e);
        }
    }

    /// Delete in order; failures are logged and skipped.
    async fn delete_pending(&self, chat_id: i64, message_ids: &[i64]) {
        for &message_id in message_ids {
            if let Err(e) = self.gateway.delete_message(chat_id, message_id).await {
                warn!("Could not delete message {} in chat {}: {}", message_id, chat_id, e);
            }
        }
    }

    /// Send one page and remember what was sent. The controls prompt goes
    /// out even when the photos don't. Returns false if the photos failed.
    async fn render(&self, chat_id: i64, page: u32, pages: u32, items: &[ImageRef]) -> bool {
        let media = page_media(items, self.page_size);
        if media.is_empty() {
            info!("Chat {}: page {} is empty", chat_id, page);
            return true;
        }

        let (mut sent, delivered) = match self.send_photos(chat_id, &media).await {
            Ok(ids) => (ids, true),
            Err(e) => {
                warn!("Failed to send page {} to chat {}: {}", page, chat_id, e);
                (Vec::new(), false)
            }
        };

        let controls = Controls::for_page(page, pages);
        if !controls.is_empty() {
            match self.gateway.send_controls(chat_id, views::CHOOSE_ACTION, controls).await {
                Ok(id) => sent.push(id),
                Err(e) => warn!("Failed to send controls to chat {}: {}", chat_id, e),
            }
        }

        self.sessions
            .update(chat_id, |s| s.pending_message_ids = sent)
            .await;
        delivered
    }

    /// Albums take 2 to 10 photos; a lone photo is sent on its own.
    async fn send_photos(&self, chat_id: i64, media: &[String]) -> Result<Vec<i64>, GatewayError> {
        match media {
            [url] => self.gateway.send_photo(chat_id, url).await.map(|id| vec![id]),
            _ => self.gateway.send_media_group(chat_id, media).await,
        }
    }
}
