use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::{DbError, DbResult};
use super::paths::{CollectionPath, DocumentPath};

/// Body of a stored document: a JSON object.
pub type Document = Map<String, Value>;

/// One write of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Removes the document. Absent documents are not an error.
    Delete(DocumentPath),
    /// Creates the document. Fails with `Conflict` if it exists.
    Create(DocumentPath, Document),
    /// Overwrites the given top-level fields. Fails with `NotFound` if the
    /// document does not exist.
    Update(DocumentPath, Document),
    /// Overwrites the given top-level fields, creating the document if needed.
    SetMerge(DocumentPath, Document),
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Delete(_) => "Delete",
            Self::Create(..) => "Create",
            Self::Update(..) => "Update",
            Self::SetMerge(..) => "Set",
        }
    }

    pub fn path(&self) -> &DocumentPath {
        match self {
            Self::Delete(path)
            | Self::Create(path, _)
            | Self::Update(path, _)
            | Self::SetMerge(path, _) => path,
        }
    }

    /// Wraps an error raised while applying this operation.
    pub(crate) fn failed(&self, source: DbError) -> DbError {
        DbError::Transaction {
            op: self.name(),
            path: self.path().to_string(),
            source: Box::new(source),
        }
    }
}

/// Hierarchical document storage.
///
/// Implementations must apply [`run_transaction`](Self::run_transaction)
/// atomically: either every operation lands or none does.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocumentPath) -> DbResult<Option<Document>>;

    /// Documents directly inside `collection`, ordered by path.
    async fn list(&self, collection: &CollectionPath) -> DbResult<Vec<(DocumentPath, Document)>>;

    /// Applies `ops` in order, all or nothing.
    async fn run_transaction(&self, ops: Vec<WriteOp>) -> DbResult<()>;

    async fn create(&self, path: &DocumentPath, body: Document) -> DbResult<()> {
        single(self, WriteOp::Create(path.clone(), body)).await
    }

    async fn delete(&self, path: &DocumentPath) -> DbResult<()> {
        single(self, WriteOp::Delete(path.clone())).await
    }

    async fn update(&self, path: &DocumentPath, fields: Document) -> DbResult<()> {
        single(self, WriteOp::Update(path.clone(), fields)).await
    }

    async fn set_merge(&self, path: &DocumentPath, fields: Document) -> DbResult<()> {
        single(self, WriteOp::SetMerge(path.clone(), fields)).await
    }
}

/// Runs one operation, reporting its own error rather than the
/// transaction wrapper.
async fn single<S: DocumentStore + ?Sized>(store: &S, op: WriteOp) -> DbResult<()> {
    match store.run_transaction(vec![op]).await {
        Err(DbError::Transaction { source, .. }) => Err(*source),
        other => other,
    }
}

/// Copies `fields` over the top-level fields of `target`.
pub(crate) fn merge_fields(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}
