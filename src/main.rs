use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_api::api::{create_router, AppStateInner, RateLimiters};
use course_api::auth::ConfiguredAuthenticator;
use course_api::background::start_window_purge_job;
use course_api::config::Config;
use course_api::metrics;
use course_api::store::MemoryCourseStore;

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Starting graceful shutdown...");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,course_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Course Authoring API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize metrics
    metrics::registry::init_metrics();
    info!("Metrics registry initialized");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    if config.auth.admin_email.is_none() || config.auth.admin_password_sha256.is_none() {
        warn!("AUTH_ADMIN_EMAIL or AUTH_ADMIN_PASSWORD_SHA256 unset; every login will be refused");
    }

    let state = Arc::new(AppStateInner {
        courses: Arc::new(MemoryCourseStore::new()),
        authenticator: Arc::new(ConfiguredAuthenticator::new(&config.auth)),
    });

    // Rate limiters are shared between the router and the purge job
    let limiters = RateLimiters::from_config(&config.rate_limit);
    let _purge_handle = start_window_purge_job(limiters.all(), config.rate_limit.purge_interval);

    // Create router
    let app = create_router(state, &config, &limiters);

    // Start server
    let addr = config.server_address();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind server")?;

    info!("Server listening on {}", addr);

    // Serve with graceful shutdown; peer addresses key the rate limiters
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}
