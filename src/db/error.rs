use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("query name '{0}' is invalid")]
    InvalidQuery(String),

    /// One operation of a transaction failed; nothing was applied.
    #[error("{op}() failed on '{path}': {source}")]
    Transaction {
        op: &'static str,
        path: String,
        #[source]
        source: Box<DbError>,
    },

    #[error("commit failed for customer '{customer_id}': {source}")]
    Commit {
        customer_id: String,
        #[source]
        source: Box<DbError>,
    },

    #[cfg(feature = "database-sqlite")]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[cfg(feature = "database-sqlite")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;
