use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::error::{DbError, DbResult};
use super::paths::{CollectionPath, DocumentPath};
use super::store::{Document, DocumentStore, WriteOp, merge_fields};

/// Document store backed by a single `documents` table.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_body(path: &str, body: &str) -> DbResult<Document> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(path = %path, error = %e, "Stored document is not a JSON object");
        DbError::Json(e)
    })
}

async fn fetch_body(conn: &mut SqliteConnection, path: &DocumentPath) -> DbResult<Option<Document>> {
    let row = sqlx::query("SELECT body FROM documents WHERE path = ?")
        .bind(path.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| parse_body(path.as_str(), &row.get::<String, _>("body")))
        .transpose()
}

async fn upsert(conn: &mut SqliteConnection, path: &DocumentPath, body: &Document) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (path, parent, body, updated_at)
        VALUES (?, ?, ?, datetime('now'))
        ON CONFLICT(path) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
        "#,
    )
    .bind(path.as_str())
    .bind(path.parent().as_str())
    .bind(serde_json::to_string(body)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn apply(conn: &mut SqliteConnection, op: &WriteOp) -> DbResult<()> {
    match op {
        WriteOp::Delete(path) => {
            sqlx::query("DELETE FROM documents WHERE path = ?")
                .bind(path.as_str())
                .execute(&mut *conn)
                .await?;
        }
        WriteOp::Create(path, body) => {
            sqlx::query(
                r#"
                INSERT INTO documents (path, parent, body, updated_at)
                VALUES (?, ?, ?, datetime('now'))
                "#,
            )
            .bind(path.as_str())
            .bind(path.parent().as_str())
            .bind(serde_json::to_string(body)?)
            .execute(&mut *conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    DbError::Conflict(format!("document '{path}' already exists"))
                }
                _ => DbError::from(e),
            })?;
        }
        WriteOp::Update(path, fields) => {
            let mut body = fetch_body(conn, path).await?.ok_or(DbError::NotFound)?;
            merge_fields(&mut body, fields.clone());
            upsert(conn, path, &body).await?;
        }
        WriteOp::SetMerge(path, fields) => {
            let mut body = fetch_body(conn, path).await?.unwrap_or_default();
            merge_fields(&mut body, fields.clone());
            upsert(conn, path, &body).await?;
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, path: &DocumentPath) -> DbResult<Option<Document>> {
        let mut conn = self.pool.acquire().await?;
        fetch_body(&mut *conn, path).await
    }

    async fn list(&self, collection: &CollectionPath) -> DbResult<Vec<(DocumentPath, Document)>> {
        let rows = sqlx::query("SELECT path, body FROM documents WHERE parent = ? ORDER BY path")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let path: String = row.get("path");
                let body = parse_body(&path, &row.get::<String, _>("body"))?;
                Ok((DocumentPath::parse(&path)?, body))
            })
            .collect()
    }

    async fn run_transaction(&self, ops: Vec<WriteOp>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for op in &ops {
            // Dropping `tx` on error rolls everything back.
            apply(&mut *tx, op).await.map_err(|e| op.failed(e))?;
        }

        tx.commit().await?;
        Ok(())
    }
}
