//! Per-conversation single-flight guard.
//!
//! At most one task per chat touches its session at a time. Other chats
//! are never blocked.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Default)]
pub struct InFlight {
    chats: Arc<Mutex<HashSet<i64>>>,
}

/// Held while a chat's task runs; releases the chat on drop.
pub struct FlightGuard {
    chat_id: i64,
    chats: Arc<Mutex<HashSet<i64>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `chat_id`, or `None` if a task for it is already running.
    pub fn try_acquire(&self, chat_id: i64) -> Option<FlightGuard> {
        if !lock(&self.chats).insert(chat_id) {
            return None;
        }
        Some(FlightGuard {
            chat_id,
            chats: self.chats.clone(),
        })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        lock(&self.chats).remove(&self.chat_id);
    }
}

// The set stays consistent even if a holder panicked.
fn lock(chats: &Mutex<HashSet<i64>>) -> MutexGuard<'_, HashSet<i64>> {
    chats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
