// src/db/mod.rs

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, Pool, Postgres};

use crate::config::Config;

pub async fn connect(config: &Config) -> anyhow::Result<Pool<Postgres>> {
    let statement_timeout = format!("SET statement_timeout = {}", config.db_statement_timeout_ms);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .after_connect(move |conn, _meta| {
            let stmt = statement_timeout.clone();
            Box::pin(async move {
                conn.execute(stmt.as_str()).await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        statement_timeout_ms = config.db_statement_timeout_ms,
        "connected to PostgreSQL"
    );
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Postgres>) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations applied");
    Ok(())
}
