//! Relational storage: identity providers, readers and book licences.

mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub mod tests;

use std::{sync::Arc, time::Duration};

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

enum Backend {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(sqlx::PgPool),
}

/// Connection pool plus one repository of each kind bound to it.
pub struct DbPool {
    backend: Backend,
    idps: Arc<dyn IdpRepo>,
    book_idps: Arc<dyn BookIdpRepo>,
    users: Arc<dyn UserRepo>,
}

impl DbPool {
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        Self {
            idps: Arc::new(sqlite::SqliteIdpRepo::new(pool.clone())),
            book_idps: Arc::new(sqlite::SqliteBookIdpRepo::new(pool.clone())),
            users: Arc::new(sqlite::SqliteUserRepo::new(pool.clone())),
            backend: Backend::Sqlite(pool),
        }
    }

    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(pool: sqlx::PgPool) -> Self {
        Self {
            idps: Arc::new(postgres::PostgresIdpRepo::new(pool.clone())),
            book_idps: Arc::new(postgres::PostgresBookIdpRepo::new(pool.clone())),
            users: Arc::new(postgres::PostgresUserRepo::new(pool.clone())),
            backend: Backend::Postgres(pool),
        }
    }

    /// Open the configured database. `DatabaseConfig::None` is
    /// [`DbError::NotConfigured`].
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

                let journal = match cfg.wal_mode {
                    true => SqliteJournalMode::Wal,
                    false => SqliteJournalMode::Delete,
                };
                let options = SqliteConnectOptions::new()
                    .filename(&cfg.path)
                    .create_if_missing(cfg.create_if_missing)
                    .journal_mode(journal)
                    .busy_timeout(Duration::from_millis(cfg.busy_timeout_ms));
                let pool = SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(options)
                    .await?;

                tracing::info!(path = %cfg.path, "Opened SQLite database");
                Ok(Self::from_sqlite(pool))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .min_connections(cfg.min_connections)
                    .max_connections(cfg.max_connections)
                    .acquire_timeout(Duration::from_secs(cfg.connect_timeout_secs))
                    .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
                    .connect(&cfg.url)
                    .await?;

                tracing::info!(
                    max_connections = cfg.max_connections,
                    "Connected to PostgreSQL"
                );
                Ok(Self::from_postgres(pool))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            #[cfg(feature = "database-sqlite")]
            Backend::Sqlite(_) => "sqlite",
            #[cfg(feature = "database-postgres")]
            Backend::Postgres(_) => "postgres",
        }
    }

    /// Apply the embedded migrations for this backend. Already-applied
    /// migrations are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        tracing::info!(backend = self.backend_name(), "Running migrations");
        match self.backend {
            #[cfg(feature = "database-sqlite")]
            Backend::Sqlite(ref pool) => sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?,
            #[cfg(feature = "database-postgres")]
            Backend::Postgres(ref pool) => {
                sqlx::migrate!("./migrations_sqlx/postgres").run(pool).await?
            }
        }
        tracing::info!(backend = self.backend_name(), "Migrations applied");
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> DbResult<()> {
        match self.backend {
            #[cfg(feature = "database-sqlite")]
            Backend::Sqlite(ref pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            #[cfg(feature = "database-postgres")]
            Backend::Postgres(ref pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(())
    }

    pub fn idps(&self) -> Arc<dyn IdpRepo> {
        self.idps.clone()
    }

    pub fn book_idps(&self) -> Arc<dyn BookIdpRepo> {
        self.book_idps.clone()
    }

    pub fn users(&self) -> Arc<dyn UserRepo> {
        self.users.clone()
    }
}
