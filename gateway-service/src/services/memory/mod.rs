//! In-process document store.
//!
//! Keeps documents in insertion order behind a single lock. Used for local
//! runs (`STORE_BACKEND=memory`) and as the backend of the test suites.

mod filter;
mod update;

use crate::services::convert::ID_FIELD;
use crate::services::store::{DocumentStore, UpdateCounts};
use async_trait::async_trait;
use filter::{bson_eq, Filter};
use mongodb::bson::{oid::ObjectId, Bson, Document};
use service_core::error::AppError;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

/// Give the document an ObjectId `_id` (as its first field) when it has none.
fn with_id(document: Document) -> (Bson, Document) {
    if let Some(id) = document.get(ID_FIELD) {
        return (id.clone(), document);
    }

    let id = Bson::ObjectId(ObjectId::new());
    let mut stored = Document::new();
    stored.insert(ID_FIELD, id.clone());
    for (key, value) in document {
        stored.insert(key, value);
    }
    (id, stored)
}

fn ensure_unique(documents: &[Document], id: &Bson) -> Result<(), AppError> {
    let taken = documents
        .iter()
        .any(|doc| doc.get(ID_FIELD).is_some_and(|existing| bson_eq(existing, id)));
    if taken {
        return Err(AppError::DatabaseError(anyhow::anyhow!(
            "E11000 duplicate key error: _id {}",
            id
        )));
    }
    Ok(())
}

/// Apply `update` to a copy so a failing operator leaves the stored document intact.
fn updated_copy(doc: &Document, update: &Document) -> Result<Option<Document>, AppError> {
    let mut copy = doc.clone();
    Ok(update::apply(&mut copy, update)?.then_some(copy))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, document: Document) -> Result<Bson, AppError> {
        let (id, document) = with_id(document);
        let mut documents = self.documents.write().await;
        ensure_unique(&documents, &id)?;
        documents.push(document);
        Ok(id)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>, AppError> {
        if documents.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "at least one document is required"
            )));
        }

        // Ordered insert: documents before the first failure stay inserted.
        let mut stored = self.documents.write().await;
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let (id, document) = with_id(document);
            ensure_unique(&stored, &id)?;
            stored.push(document);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn find(&self, filter: Document) -> Result<Vec<Document>, AppError> {
        let filter = Filter::parse(&filter)?;
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, AppError> {
        let filter = Filter::parse(&filter)?;
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|doc| filter.matches(doc)).cloned())
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateCounts, AppError> {
        let filter = Filter::parse(&filter)?;
        update::validate(&update)?;

        let mut documents = self.documents.write().await;
        let Some(doc) = documents.iter_mut().find(|doc| filter.matches(doc)) else {
            return Ok(UpdateCounts::default());
        };

        let mut counts = UpdateCounts {
            matched_count: 1,
            modified_count: 0,
        };
        if let Some(next) = updated_copy(doc, &update)? {
            *doc = next;
            counts.modified_count = 1;
        }
        Ok(counts)
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateCounts, AppError> {
        let filter = Filter::parse(&filter)?;
        update::validate(&update)?;

        let mut documents = self.documents.write().await;
        let mut counts = UpdateCounts::default();
        for doc in documents.iter_mut().filter(|doc| filter.matches(doc)) {
            counts.matched_count += 1;
            if let Some(next) = updated_copy(doc, &update)? {
                *doc = next;
                counts.modified_count += 1;
            }
        }
        Ok(counts)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, AppError> {
        let filter = Filter::parse(&filter)?;
        let mut documents = self.documents.write().await;
        match documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, AppError> {
        let filter = Filter::parse(&filter)?;
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|doc| !filter.matches(doc));
        Ok((before - documents.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
