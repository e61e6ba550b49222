// This is the entry point of the moderation bot.
//
// This file's job is to:
// 1. Load configuration and logging
// 2. Initialize stores and services (dependency injection)
// 3. Start the background reconciliation loops and the metrics endpoint
// 4. Feed inbound group messages to the handler until Ctrl-C
//
// The platform transport is pluggable; this binary reads updates as
// newline-delimited JSON on stdin, which is how the bot is driven locally.

use anyhow::Context;
use chat_moderation_bot::chat::{IncomingMessage, MessageHandler};
use chat_moderation_bot::config::BotConfig;
use chat_moderation_bot::core::metrics::ModerationMetrics;
use chat_moderation_bot::core::moderation::{ModerationOptions, ModerationService};
use chat_moderation_bot::core::platform::ChatPlatform;
use chat_moderation_bot::core::reconciliation::{
    Janitor, MuteGaugeUpdater, Reconciler, TemporaryMessageSweeper,
};
use chat_moderation_bot::infra::metrics::{serve_metrics, PrometheusMetrics};
use chat_moderation_bot::infra::platform::HttpPlatformClient;
use chat_moderation_bot::infra::sqlite;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let pool = sqlite::connect(&config.database_url)
        .await
        .context("Failed to open moderation database")?;
    let stores = sqlite::open_stores(pool)
        .await
        .context("Failed to migrate moderation database")?;

    let prometheus = Arc::new(PrometheusMetrics::new());
    let metrics: Arc<dyn ModerationMetrics> = prometheus.clone();

    let platform: Arc<dyn ChatPlatform> = Arc::new(
        HttpPlatformClient::new(&config.platform_api_url, &config.bot_token)
            .context("Failed to create platform client")?,
    );

    let service = Arc::new(ModerationService::new(
        stores.clone(),
        ModerationOptions {
            enable_cache: config.enable_cache,
            rate_limit: config.rate_limit_messages,
            rate_limit_window: config.rate_limit_window,
        },
        metrics.clone(),
    ));

    let handler = MessageHandler::new(
        service.clone(),
        platform.clone(),
        metrics.clone(),
        config.default_mute_duration,
    );

    let reconciler = Reconciler::new(
        TemporaryMessageSweeper::new(stores.temporary_messages.clone(), platform, metrics.clone()),
        MuteGaugeUpdater::new(stores.mutes.clone(), metrics),
        Janitor::new(service.rate_limiter(), stores.link_tokens.clone()),
    );

    let metrics_listener = tokio::net::TcpListener::bind(config.metrics_addr)
        .await
        .with_context(|| format!("Failed to bind metrics endpoint on {}", config.metrics_addr))?;

    // ========================================================================
    // RUN
    // ========================================================================

    let shutdown = CancellationToken::new();
    let mut background = reconciler.start(shutdown.clone());
    background.push(tokio::spawn(serve_metrics(
        metrics_listener,
        prometheus.clone(),
        shutdown.clone(),
    )));
    tracing::info!(
        database = %config.database_url,
        cache = config.enable_cache,
        "Moderation bot started"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match serde_json::from_str::<IncomingMessage>(&line) {
                    Ok(message) => {
                        // Enforcement runs detached; the handle is not needed here
                        let _ = handler.handle_group_message(message).await;
                    }
                    Err(e) => tracing::warn!(error = %e, "Skipping malformed update"),
                },
                Ok(None) => {
                    tracing::info!("Update feed closed, waiting for Ctrl-C");
                    tokio::signal::ctrl_c()
                        .await
                        .context("Failed to listen for Ctrl-C")?;
                    break;
                }
                Err(e) => return Err(e).context("Failed to read update feed"),
            },
        }
    }

    shutdown.cancel();
    for handle in background {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }

    tracing::info!("Moderation bot stopped");
    Ok(())
}
