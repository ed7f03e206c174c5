use std::sync::Arc;

use poise::serenity_prelude::Http;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden::services::moderation::{MuteRegistry, PgMuteStore, SerenityPlatform, SystemClock};
use warden::{bot, config::Settings, db};

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Warden Discord Bot");

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match db::pool::create_pool(&settings.database_url, settings.database_max_connections).await {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::pool::run_migrations(&pool).await {
        error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    info!("Database initialized successfully");

    // Mutes must be loaded before any command or sweep can touch them
    let http = Arc::new(Http::new(&settings.discord_token));
    let mutes = match MuteRegistry::initialize(
        Arc::new(PgMuteStore::new(pool.clone())),
        Arc::new(SerenityPlatform::new(http)),
        Arc::new(SystemClock),
    )
    .await
    {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to load active mutes: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = bot::framework::run(settings, pool, mutes).await {
        error!("Bot error: {}", e);
        std::process::exit(1);
    }
}
