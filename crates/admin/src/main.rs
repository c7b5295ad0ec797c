//! Emporium Admin - privileged API for claim assignment and product writes.
//!
//! Serves on port 3001 by default. Every request carries a Firebase ID token
//! as `Authorization: Bearer`; the token is verified with the identity
//! service and the caller's current claims must include `admin: true`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use emporium_admin::config::AdminConfig;
use emporium_admin::routes;
use emporium_admin::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "emporium_admin=info,emporium_storefront=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AdminConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let _sentry_guard = init_sentry(&config);
    init_tracing(config.json_logs);

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Admin API stopped");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: AdminConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr();
    let state = AppState::from_config(config)?;
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("admin API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
