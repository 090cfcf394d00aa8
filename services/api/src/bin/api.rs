//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, ReflectionsFileSource, RetryPolicy, TableLayout, TablePageSource,
        WhatsAppAdapter, ZenQuotesAdapter,
    },
    config::Config,
    error::ApiError,
    scheduler::run_periodic_scrape,
    web::{self, AppState},
};
use daily_reading_core::ports::{ReadingRepository, ReadingSource};
use daily_reading_core::{MemoryCache, MemoryRepository, ReadingStore, ResponseGenerator, Scraper};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Outbound WhatsApp calls give up after this long.
const WHATSAPP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");
    tokio::fs::create_dir_all(&config.reading_files_dir).await?;

    // --- 2. Connect to Database & Run Migrations ---
    let repository: Arc<dyn ReadingRepository> = if config.database_url == "memory" {
        warn!("DATABASE_URL is 'memory', readings will not survive a restart");
        Arc::new(MemoryRepository::new())
    } else {
        info!("Connecting to database...");
        let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
        let db_pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let db_adapter = DbAdapter::new(db_pool);
        info!("Running database migrations...");
        db_adapter.run_migrations().await?;
        info!("Database migrations complete.");
        Arc::new(db_adapter)
    };
    let store = ReadingStore::new(Arc::new(MemoryCache::new()), repository);

    // --- 3. Initialize Service Adapters ---
    let page_client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let whatsapp_client = reqwest::Client::builder()
        .timeout(WHATSAPP_TIMEOUT)
        .build()?;
    let retry = RetryPolicy {
        attempts: config.retry_attempts,
        delay: config.retry_delay,
    };

    let sources: Vec<Arc<dyn ReadingSource>> = vec![
        Arc::new(ReflectionsFileSource::new(config.reflections_path())),
        Arc::new(TablePageSource::new(
            TableLayout::Jft,
            config.jft_url.clone(),
            page_client.clone(),
            retry,
        )),
        Arc::new(TablePageSource::new(
            TableLayout::Spad,
            config.spad_url.clone(),
            page_client.clone(),
            retry,
        )),
    ];
    let scraper = Arc::new(Scraper::new(store, sources));
    let quotes = Arc::new(ZenQuotesAdapter::new(page_client, config.zen_quotes_url.clone()));
    let responses = Arc::new(ResponseGenerator::new(scraper.clone(), quotes));
    let sender = Arc::new(WhatsAppAdapter::new(
        whatsapp_client,
        &config.graph_api_version,
        &config.phone_number_id,
        config.access_token.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), scraper.clone(), responses, sender));

    // --- 5. Start the Periodic Scrape ---
    let cancel = CancellationToken::new();
    let scheduler = tokio::spawn(run_periodic_scrape(
        scraper,
        config.scrape_interval,
        cancel.clone(),
    ));

    // --- 6. Start the Server ---
    let app = web::router(app_state);
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl-C");
                shutdown.cancelled().await;
            }
            info!("Shutting down...");
            shutdown.cancel();
        })
        .await?;

    scheduler
        .await
        .map_err(|e| ApiError::Internal(format!("Scheduler task failed: {}", e)))?;
    Ok(())
}
