//! services/bot/src/bin/bot.rs

use async_openai::{config::OpenAIConfig, Client};
use bot_lib::{
    adapters::{JsonFileStore, OpenAiTutorAdapter},
    config::Config,
    error::BotError,
    startup::{load_catalog, load_known_users},
    telegram::{schema, AppState, Command},
};
use learning_assistant_core::PersonaSettings;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), BotError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting bot...");

    // --- 2. Open the Record Store & Load Startup Data ---
    let store = Arc::new(JsonFileStore::open(&config.data_dir).await?);
    let known_users = Arc::new(load_known_users(&config.known_users_path).await?);
    let catalog = Arc::new(load_catalog(config.catalog_path.as_deref()).await?);

    // --- 3. Initialize the Text Generation Adapter ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(config.gemini_api_key.clone())
        .with_api_base(config.llm_api_base.clone());
    let generator = Arc::new(OpenAiTutorAdapter::new(
        Client::with_config(openai_config),
        config.llm_model.clone(),
    ));
    info!(model = %config.llm_model, api_base = %config.llm_api_base, "Text generator ready");

    // --- 4. Connect to Telegram ---
    let bot = Bot::new(config.telegram_token.clone());
    let me = bot.get_me().await?;
    info!(username = %me.username(), "Connected to Telegram");
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register the command menu");
    }

    // --- 5. Build the Shared AppState ---
    let persona = PersonaSettings::new(&config.bot_name, &config.bot_aliases)?
        .with_handle(me.username())?;
    let app_state = Arc::new(AppState::new(
        config.clone(),
        store,
        catalog,
        known_users,
        generator,
        persona,
    ));

    // --- 6. Start Long Polling ---
    info!(bot_name = %config.bot_name, "Bot is running. Press Ctrl+C to stop.");
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![app_state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped.");
    Ok(())
}
