//! Application entry point for the `smartaqua-alerts` trigger service.
//!
//! This binary orchestrates the full startup sequence, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool and creating the schema
//! - Loading the saved thresholds (or seeding the defaults)
//! - Building the delivery channels, the dispatcher and the monitor
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `AQUA_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AQUA_SPAN_EVENTS` (optional) – span event mode for tracing
//! - see [`smartaqua_alerts::config`] for the rest
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use smartaqua_alerts::{
    channels::{ExpoPush, HttpEmailRelay, PgActivityLog},
    config,
    routes::{self, AppState},
    schema,
    store::PgStore,
    Dispatcher, Monitor, ThresholdConfig,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    let store = PgStore::new(pool.clone());
    let thresholds = match store.load_thresholds().await? {
        Some(saved) => saved,
        None => {
            tracing::info!("No thresholds saved yet, seeding defaults");
            let defaults = ThresholdConfig::default();
            store.save_thresholds(&defaults).await?;
            defaults
        }
    };
    let (thresholds_tx, thresholds_rx) = watch::channel(thresholds);

    // Transports own their timeouts; the dispatcher only records outcomes.
    let http = reqwest::Client::builder()
        .timeout(cfg.channel_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let activity_log = PgActivityLog::new(pool.clone(), cfg.channel_timeout);
    let mut dispatcher = Dispatcher::new(Arc::new(activity_log.clone())).with_push(Arc::new(ExpoPush::new(
        http.clone(),
        cfg.push_api_url.clone(),
        cfg.push_access_token.clone(),
        cfg.channel_timeout,
    )));
    match &cfg.email_relay_url {
        Some(url) => {
            dispatcher = dispatcher.with_email(Arc::new(HttpEmailRelay::new(http, url.clone(), cfg.channel_timeout)));
        }
        None => tracing::warn!("EMAIL_RELAY_URL not set, email alerts will be skipped"),
    }

    let monitor = Monitor::with_cooldown(dispatcher, thresholds_rx, Arc::new(store.clone()), cfg.alert_cooldown);

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(AppState {
        store,
        activity_log,
        monitor: Arc::new(monitor),
        thresholds: Arc::new(thresholds_tx),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AQUA_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `AQUA_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AQUA_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AQUA_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
