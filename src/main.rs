use std::sync::Arc;

use delivery_pairing::api;
use delivery_pairing::config::{Config, LogFormat};
use delivery_pairing::engine::scheduler::run_scheduler;
use delivery_pairing::error::AppError;
use delivery_pairing::state::AppState;
use delivery_pairing::store::InMemoryStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let store = Arc::new(InMemoryStore::new());
    let app_state = AppState::new(store, config.pairing.clone(), config.event_buffer_size)
        .with_scheduler(config.scheduler.clone())
        .with_api_token(config.api_token.clone());
    let shared_state = Arc::new(app_state);

    if config.scheduler.enabled {
        tokio::spawn(run_scheduler(
            shared_state.clone(),
            config.scheduler.interval_secs,
            config.scheduler.window_minutes,
        ));
    }

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        auth = config.api_token.is_some(),
        max_radius_km = config.pairing.max_radius_km,
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
