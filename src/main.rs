use std::sync::Arc;

use teloxide::prelude::*;

use psych_support_bot::bot_state::BotState;
use psych_support_bot::config::Config;
use psych_support_bot::handlers;
use psych_support_bot::store::PgStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting psychology support bot...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Configuration error: {err}");
            std::process::exit(1);
        }
    };

    let store = match PgStore::connect(&config.database_url).await {
        Ok(store) => store,
        Err(err) => {
            log::error!("Failed to connect to database: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = store.init().await {
        log::error!("Failed to initialize database schema: {err}");
        std::process::exit(1);
    }
    log::info!("Database initialized successfully");

    let state = BotState::new(Arc::new(store), config);
    let bot = Bot::from_env();

    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            log::warn!("Unhandled update: {upd:?}");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
