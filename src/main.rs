//! # Broadcast Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, starts the
//! broadcast scheduler and health server, and runs the Telegram bot.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use broadcast_bot::bot::handlers::{BotContext, BotHandler};
use broadcast_bot::config::Config;
use broadcast_bot::database::connection::DatabaseManager;
use broadcast_bot::services::broadcast::BroadcastService;
use broadcast_bot::services::health::HealthService;
use broadcast_bot::services::scheduler::BroadcastScheduler;
use broadcast_bot::services::transport::TelegramTransport;
use broadcast_bot::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "broadcast_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    info!("Starting Broadcast Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Send delay: {}ms",
        config.database_url,
        config.http_port,
        config.send_delay.as_millis()
    );
    if config.admin_user_ids.is_empty() {
        tracing::warn!("ADMIN_USER_IDS is empty - nobody can run admin commands");
    }

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    let db = Arc::new(db_manager);
    info!("Database initialized successfully");

    let bot = Bot::new(&config.telegram_bot_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone(), config.text_format));
    let broadcaster = Arc::new(BroadcastService::new(
        db.clone(),
        transport,
        config.send_delay,
    ));

    let mut scheduler = match config.scheduled_message_id {
        Some(message_id) => {
            let mut scheduler =
                BroadcastScheduler::new(broadcaster.clone(), message_id, config.broadcast_interval)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to create broadcast scheduler: {}", e))?;
            if let Err(e) = scheduler.start().await {
                tracing::error!("Failed to start broadcast scheduler: {}", e);
            }
            Some(scheduler)
        }
        None => {
            info!("SCHEDULED_MESSAGE_ID not set - scheduled broadcasts are disabled");
            None
        }
    };

    let handler = BotHandler::new(BotContext {
        db: db.clone(),
        broadcaster,
        config: config.clone(),
    });

    let health_service = HealthService::new(db.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);
    log_system_event("startup", Some("bot and health server running"));

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.stop().await {
            tracing::warn!("Error stopping broadcast scheduler: {}", e);
        }
    }

    log_system_event("shutdown", None);
    info!("Application stopped");
    Ok(())
}
