// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use nagarseva_api::config::Config;
use nagarseva_api::state::AppState;
use nagarseva_api::store::PgStore;
use nagarseva_api::{db, routes};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nagarseva_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let port = config.port;

    // Initialize DB pool and bring the schema up to date
    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let state = AppState::new(Arc::new(PgStore::new(pool)), config);
    tracing::info!(
        push_notifications = state.notifier.is_enabled(),
        report_rate_limit = state.config.report_rate_limit,
        "application state ready"
    );

    // Forget idle IPs so the limiter does not grow without bound
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(300));
        loop {
            tick.tick().await;
            limiter.prune().await;
        }
    });

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
