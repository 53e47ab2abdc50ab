// src/config.rs

use std::env;
use std::str::FromStr;

use anyhow::Context;

use crate::auth::jwt::JwtConfig;

pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "https://placeholder.co/600x400.png";

/// Runtime configuration, read once at startup.
///
/// | Env Var                    | Default                              |
/// |----------------------------|--------------------------------------|
/// | `DATABASE_URL`             | required                             |
/// | `JWT_SECRET`               | required                             |
/// | `JWT_EXPIRY_HOURS`         | `24`                                 |
/// | `STATE_ADMIN_SECRET`       | required                             |
/// | `PORT`                     | `8080`                               |
/// | `DB_MAX_CONNECTIONS`       | `10`                                 |
/// | `DB_STATEMENT_TIMEOUT_MS`  | `5000`                               |
/// | `REQUEST_TIMEOUT_SECS`     | `30`                                 |
/// | `REPORT_RATE_LIMIT`        | `20`                                 |
/// | `REPORT_RATE_WINDOW_SECS`  | `3600`                               |
/// | `PUSH_API_URL`             | unset (notifications disabled)       |
/// | `PLACEHOLDER_IMAGE_URL`    | `https://placeholder.co/600x400.png` |
/// | `RESOLUTION_REWARD_POINTS` | `10`                                 |
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_statement_timeout_ms: u64,
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub state_admin_secret: String,
    pub report_rate_limit: u32,
    pub report_rate_window_secs: u64,
    pub push_api_url: Option<String>,
    pub placeholder_image_url: String,
    pub resolution_reward_points: i32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!jwt_secret.is_empty(), "JWT_SECRET must not be empty");
        let state_admin_secret =
            env::var("STATE_ADMIN_SECRET").context("STATE_ADMIN_SECRET must be set")?;

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            db_statement_timeout_ms: parse_or("DB_STATEMENT_TIMEOUT_MS", 5000)?,
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30)?,
            jwt: JwtConfig {
                secret: jwt_secret,
                expiry_hours: parse_or("JWT_EXPIRY_HOURS", 24)?,
            },
            state_admin_secret,
            report_rate_limit: parse_or("REPORT_RATE_LIMIT", 20)?,
            report_rate_window_secs: parse_or("REPORT_RATE_WINDOW_SECS", 3600)?,
            push_api_url: env::var("PUSH_API_URL").ok().filter(|s| !s.trim().is_empty()),
            placeholder_image_url: env::var("PLACEHOLDER_IMAGE_URL")
                .unwrap_or_else(|_| DEFAULT_PLACEHOLDER_IMAGE.into()),
            resolution_reward_points: parse_or("RESOLUTION_REWARD_POINTS", 10)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
