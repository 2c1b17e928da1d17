//! Gallery module - keyword image search with inline paging.

pub mod engine;
pub mod gateway;
pub mod inflight;
pub mod pager;
pub mod search;
pub mod session;
pub mod telegram;
pub mod views;


pub use engine::GalleryEngine;
pub use search::PixabayClient;
pub use session::SessionStore;
pub use telegram::TelegramClient;
