use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::{DbError, DbResult};
use super::paths::{CollectionPath, DocumentPath};
use super::store::{Document, DocumentStore, WriteOp, merge_fields};

/// Process-local document store.
///
/// Transactions are applied to a staged copy that replaces the live map only
/// once every operation succeeded.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<BTreeMap<DocumentPath, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

fn apply(docs: &mut BTreeMap<DocumentPath, Document>, op: &WriteOp) -> DbResult<()> {
    match op {
        WriteOp::Delete(path) => {
            docs.remove(path);
        }
        WriteOp::Create(path, body) => {
            if docs.contains_key(path) {
                return Err(DbError::Conflict(format!("document '{path}' already exists")));
            }
            docs.insert(path.clone(), body.clone());
        }
        WriteOp::Update(path, fields) => {
            let existing = docs.get_mut(path).ok_or(DbError::NotFound)?;
            merge_fields(existing, fields.clone());
        }
        WriteOp::SetMerge(path, fields) => {
            merge_fields(docs.entry(path.clone()).or_default(), fields.clone());
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> DbResult<Option<Document>> {
        Ok(self.docs.read().get(path).cloned())
    }

    async fn list(&self, collection: &CollectionPath) -> DbResult<Vec<(DocumentPath, Document)>> {
        let docs = self.docs.read();
        Ok(docs
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, body)| (path.clone(), body.clone()))
            .collect())
    }

    async fn run_transaction(&self, ops: Vec<WriteOp>) -> DbResult<()> {
        let mut docs = self.docs.write();
        let mut staged = docs.clone();
        for op in &ops {
            apply(&mut staged, op).map_err(|source| op.failed(source))?;
        }
        *docs = staged;
        Ok(())
    }
}
