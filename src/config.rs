use anyhow::{Context, Result};
use sea_orm::Database;

use crate::extract::ReceiptExtractor;
use crate::schemas::AppState;

/// Application configuration, read once from the environment at
/// startup and passed down explicitly inside [`AppState`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    /// Telegram bot token; signing key source for login verification.
    pub bot_token: String,
    /// Shared secret embedded in the bot webhook path.
    pub webhook_secret: String,
    /// HMAC key for issued access tokens.
    pub token_secret: String,
    /// Access token lifetime in seconds.
    pub token_ttl_secs: i64,
    pub extractor_api_url: String,
    pub extractor_api_key: String,
    pub extractor_model: String,
}

impl AppConfig {
    /// Loads configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://moneta.db".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            bot_token: std::env::var("BOT_TOKEN").unwrap_or_default(),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .context("WEBHOOK_SECRET must be set")?,
            token_secret: std::env::var("TOKEN_SECRET")
                .context("TOKEN_SECRET must be set")?,
            token_ttl_secs: std::env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(86_400),
            extractor_api_url: std::env::var("EXTRACTOR_API_URL").unwrap_or_else(|_| {
                "https://api.openai.com/v1/chat/completions".to_string()
            }),
            extractor_api_key: std::env::var("EXTRACTOR_API_KEY").unwrap_or_default(),
            extractor_model: std::env::var("EXTRACTOR_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        })
    }
}

/// Connects to the database and assembles the shared application state.
pub async fn initialize_app_state(config: AppConfig) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    let extractor = ReceiptExtractor::new(
        &config.extractor_api_url,
        &config.extractor_api_key,
        &config.extractor_model,
    );

    Ok(AppState {
        db,
        config,
        extractor,
    })
}
