mod config;
mod gallery;
mod telegram_log;

use std::path::PathBuf;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};
use tracing_subscriber::prelude::*;

use config::Config;
use gallery::{GalleryEngine, PixabayClient, SessionStore, TelegramClient};
use telegram_log::{Redactor, TelegramLogLayer};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    /// Greeting.
    Start,
    /// Same greeting.
    Help,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = tracing_appender::rolling::daily(&log_dir, "pixabot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let redactor = Redactor::new(vec![
            config.pixabay_access_key.clone(),
            config.telegram_bot_token.clone(),
        ]);
        let tg_layer = TelegramLogLayer::new(bot.clone(), log_chat_id, redactor);
        registry.with(tg_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting pixabot...");
    match &config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("Loaded config from environment"),
    }
    info!(
        "Page size {}, up to {} sessions idle for {:?}",
        config.page_size, config.session_capacity, config.session_idle
    );

    let search = match PixabayClient::new(
        config.pixabay_access_key.clone(),
        config.pixabay_api_url.clone(),
        config.page_size,
        config.search_timeout,
        config.large_image_fallback,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create search client: {e}");
            std::process::exit(1);
        }
    };

    let engine = Arc::new(GalleryEngine::new(
        Arc::new(search),
        Arc::new(TelegramClient::new(bot.clone())),
        SessionStore::new(config.session_capacity, config.session_idle),
        config.page_size,
    ));

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(dptree::filter(|msg: Message| is_query(&msg)).endpoint(handle_query)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .default_handler(|upd| async move {
            debug!("Unhandled update {:?}", upd.id);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Any text that isn't a command is a search.
fn is_query(msg: &Message) -> bool {
    msg.text().is_some_and(|t| !t.starts_with('/'))
}

async fn handle_command(msg: Message, cmd: Command, engine: Arc<GalleryEngine>) -> ResponseResult<()> {
    match cmd {
        Command::Start | Command::Help => engine.start(msg.chat.id.0).await,
    }
    Ok(())
}

async fn handle_query(msg: Message, engine: Arc<GalleryEngine>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let chat_id = msg.chat.id.0;
    let text_preview: String = text.chars().take(100).collect();
    info!("Query from chat {}: \"{}\"", chat_id, text_preview);

    // Run detached so other updates from this chat keep flowing
    let text = text.to_string();
    tokio::spawn(async move {
        let outcome = engine.new_query(chat_id, &text).await;
        debug!("Chat {} query finished: {:?}", chat_id, outcome);
    });
    Ok(())
}

async fn handle_callback(q: CallbackQuery, engine: Arc<GalleryEngine>) -> ResponseResult<()> {
    let callback_id = q.id.0.clone();
    let data = q.data.clone().unwrap_or_default();

    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id.0) else {
        debug!("Callback {} without a message", callback_id);
        return Ok(());
    };

    tokio::spawn(async move {
        let outcome = engine.handle_callback(&callback_id, chat_id, &data).await;
        debug!("Chat {} callback {:?} finished: {:?}", chat_id, data, outcome);
    });
    Ok(())
}
