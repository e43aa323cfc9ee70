//! Logbook server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, extract::DefaultBodyLimit, http::StatusCode, middleware, routing::get};
use logbook_api::{AppState, actor_middleware, health, router as api_router};
use logbook_common::Config;
use logbook_core::TracingEventPublisher;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Full HTTP application: API routes, actor resolution and the middleware stack.
fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            actor_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    REQUEST_TIMEOUT,
                )),
        )
        .with_state(state)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "logbook=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    // LOG_FORMAT=json for log shippers, human-readable otherwise
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match dotenvy::dotenv() {
        Err(e) if !e.not_found() => return Err(e).context("failed to read .env"),
        _ => {}
    }

    init_tracing();

    info!("Starting logbook server...");

    // LOGBOOK_CONFIG points at a single file instead of the config/ directory
    let config = match std::env::var("LOGBOOK_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        Err(_) => Config::load().context("failed to load configuration")?,
    };

    let db = logbook_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    logbook_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let state = AppState::new(
        &db,
        &config.attendance,
        Some(Arc::new(TracingEventPublisher)),
    )?;

    let app = app(state);

    let ip = config
        .server
        .host
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("invalid server host {}", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
