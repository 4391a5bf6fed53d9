//! Session Maintenance Entry Point
//!
//! Checks the auth configuration, brings the schema up to date and prunes
//! session rows that expired longer ago than the retention window.
//! Uses `anyhow` for startup errors; library errors are `auth::AuthError`.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use auth::{AuthConfig, PgSessionStore};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Read an optional numeric setting
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number")),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maintenance=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fail fast on a config the session manager would refuse
    let auth_config = AuthConfig::from_env().context("Invalid auth configuration")?;
    tracing::info!(config = ?auth_config, "Auth configuration loaded");

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let max_connections: u32 = env_or("DATABASE_MAX_CONNECTIONS", 5)?;
    let acquire_timeout_secs: u64 = env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?;
    let retention_days: i64 = env_or("SESSION_RETENTION_DAYS", 30)?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections, "Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let retention = chrono::Duration::try_days(retention_days)
        .filter(|d| *d >= chrono::Duration::zero())
        .context("SESSION_RETENTION_DAYS out of range")?;
    let cutoff = chrono::Utc::now() - retention;

    let store = PgSessionStore::new(pool.clone());
    match store.prune_expired(cutoff).await {
        Ok(sessions) => {
            tracing::info!(
                sessions_deleted = sessions,
                retention_days,
                "Auth session pruning completed"
            );
        }
        Err(e) => {
            e.log();
            return Err(e).context("Auth session pruning failed");
        }
    }

    pool.close().await;
    Ok(())
}
