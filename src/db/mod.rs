mod error;
mod memory;
pub mod paths;
mod recommendations;
#[cfg(feature = "database-sqlite")]
mod sqlite;
mod store;

#[cfg(test)]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use memory::MemoryDocumentStore;
pub use paths::{CollectionPath, DocumentPath, resolve_document_path};
pub use recommendations::{PROGRESS_DONE, RecommendationsRepo, STATUS_END};
#[cfg(feature = "database-sqlite")]
pub use sqlite::SqliteDocumentStore;
pub use store::{Document, DocumentStore, WriteOp};

use crate::{config::DatabaseConfig, optimizer::Clock};

enum PoolStorage {
    Memory,
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
}

/// Opened document storage.
///
/// The store trait object is created once, so handing out repositories
/// only clones an `Arc`.
pub struct DocumentPool {
    inner: PoolStorage,
    store: Arc<dyn DocumentStore>,
}

impl DocumentPool {
    /// A process-local pool.
    pub fn memory() -> Self {
        Self {
            inner: PoolStorage::Memory,
            store: Arc::new(MemoryDocumentStore::new()),
        }
    }

    /// Create a pool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        Self {
            store: Arc::new(SqliteDocumentStore::new(pool.clone())),
            inner: PoolStorage::Sqlite(pool),
        }
    }

    /// Open the store described by `config`, running migrations when the
    /// backend asks for them.
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::Memory => {
                tracing::info!("Using in-memory document store");
                Ok(Self::memory())
            }
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                tracing::info!(path = %cfg.path, "Opening SQLite document store");
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                let db = Self::from_sqlite(pool);
                if cfg.run_migrations {
                    db.run_migrations().await?;
                }
                Ok(db)
            }
        }
    }

    /// Bring the schema up to date. A no-op for the in-memory store.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            PoolStorage::Memory => Ok(()),
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Recommendation documents, stamped with `clock`.
    pub fn recommendations(&self, clock: Arc<dyn Clock>) -> RecommendationsRepo {
        RecommendationsRepo::new(self.store(), clock)
    }
}
