//! Per-conversation pagination state.
//!
//! Sessions live in a bounded cache: least recently used entries are
//! evicted at capacity, idle ones after the configured time.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

/// Pagination state of one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Normalized search text.
    pub query: String,
    /// 1-based page being shown.
    pub current_page: u32,
    pub total_pages: u32,
    /// Messages shown for the current page (media, then the controls prompt).
    pub pending_message_ids: Vec<i64>,
}

impl Session {
    pub fn new(query: String, total_pages: u32) -> Self {
        Self {
            query,
            current_page: 1,
            total_pages,
            pending_message_ids: Vec::new(),
        }
    }
}

/// Owner of all sessions, keyed by chat id.
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache<i64, Session>,
}

impl SessionStore {
    pub fn new(max_capacity: u64, time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(time_to_idle)
            .build();
        Self { cache }
    }

    pub async fn get(&self, chat_id: i64) -> Option<Session> {
        self.cache.get(&chat_id).await
    }

    /// Replace the whole record.
    pub async fn put(&self, chat_id: i64, session: Session) {
        debug!(
            "Session {}: \"{}\" page {}/{} ({} pending)",
            chat_id,
            session.query,
            session.current_page,
            session.total_pages,
            session.pending_message_ids.len()
        );
        self.cache.insert(chat_id, session).await;
    }

    /// Apply `f` to a copy of the session and store it. Fields `f` does
    /// not touch are kept. Returns false if there was no session.
    pub async fn update<F>(&self, chat_id: i64, f: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let Some(mut session) = self.get(chat_id).await else {
            return false;
        };
        f(&mut session);
        self.put(chat_id, session).await;
        true
    }

    /// Approximate number of live sessions.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
