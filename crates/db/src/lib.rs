//! Persistence layer: connection pools, migrations, repositories, and the
//! [`VitalStore`](store::VitalStore) adapter used by the pipeline.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod replica;
pub mod repositories;
pub mod store;

pub use replica::ReplicaSet;

pub type DbPool = sqlx::PgPool;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Write target (`DATABASE_URL_PRIMARY`).
    pub primary_url: String,
    /// Read targets, comma-separated in `DATABASE_URL_REPLICAS`.
    /// Reads go to the primary when empty.
    pub replica_urls: Vec<String>,
    /// Per-pool connection cap (default: `20`).
    pub max_connections: u32,
    /// How long a query may wait for a pooled connection (default: `5`).
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default  |
    /// |---------------------------|----------|
    /// | `DATABASE_URL_PRIMARY`    | required |
    /// | `DATABASE_URL_REPLICAS`   | (none)   |
    /// | `DB_MAX_CONNECTIONS`      | `20`     |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | `5`      |
    pub fn from_env() -> Self {
        let primary_url =
            std::env::var("DATABASE_URL_PRIMARY").expect("DATABASE_URL_PRIMARY must be set");

        let replica_urls: Vec<String> = std::env::var("DATABASE_URL_REPLICAS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        let acquire_timeout_secs: u64 = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("DB_ACQUIRE_TIMEOUT_SECS must be a valid u64");

        Self {
            primary_url,
            replica_urls,
            max_connections,
            acquire_timeout_secs,
        }
    }
}

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Connect the primary and every replica.
pub async fn connect(config: &DbConfig) -> Result<ReplicaSet<DbPool>, sqlx::Error> {
    let primary = create_pool(&config.primary_url, config).await?;

    let mut replicas = Vec::with_capacity(config.replica_urls.len());
    for url in &config.replica_urls {
        replicas.push(create_pool(url, config).await?);
    }

    tracing::info!(replicas = replicas.len(), "Database pools created");
    Ok(ReplicaSet::new(primary, replicas))
}

/// Round-trip a trivial query to verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`. Run against the primary only.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
