//! Storage selection.
use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config;
use crate::repository::{MemoryStore, PgStore, Store};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "identity";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// PostgreSQL connection pool.
#[derive(Clone)]
pub struct Database {
    pub postgres: PgPool,
}

impl Database {
    /// Init database connections.
    pub async fn new(
        hostname: &str,
        username: &str,
        password: &str,
        db: &str,
        pool: u32,
    ) -> Result<Self, sqlx::Error> {
        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new().max_connections(pool);
        let postgres = pool.connect(&addr).await?;

        tracing::info!(%hostname, %db, "postgres connected");

        Ok(Self { postgres })
    }

    /// Connect using `postgres` configuration entry and run migrations.
    pub async fn connect(
        config: &config::Postgres,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Self::new(
            &config.address,
            config.username.as_deref().unwrap_or(DEFAULT_CREDENTIALS),
            config.password.as_deref().unwrap_or(DEFAULT_CREDENTIALS),
            config.database.as_deref().unwrap_or(DEFAULT_DATABASE_NAME),
            config.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
        )
        .await?;

        // execute migrations scripts on start.
        sqlx::migrate!().run(&db.postgres).await?;

        Ok(db)
    }
}

/// Open the configured [`Store`].
///
/// Without a `postgres` entry, users only live as long as the process.
pub async fn store(
    config: Option<&config::Postgres>,
) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config {
        Some(config) => {
            let db = Database::connect(config).await?;
            Ok(Arc::new(PgStore::new(db.postgres)))
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, users are kept in memory"
            );
            Ok(Arc::new(MemoryStore::new()))
        },
    }
}
