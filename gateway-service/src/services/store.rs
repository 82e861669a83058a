use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use service_core::error::AppError;

/// Counts reported by an update call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCounts {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// The collection the gateway routes operate on.
///
/// Filters and update documents are handed over as-is; matching and update
/// semantics belong to the backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the `_id` of the stored document.
    async fn insert_one(&self, document: Document) -> Result<Bson, AppError>;

    /// Returns the `_id`s in input order.
    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>, AppError>;

    async fn find(&self, filter: Document) -> Result<Vec<Document>, AppError>;

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, AppError>;

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateCounts, AppError>;

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateCounts, AppError>;

    /// Returns the number of deleted documents (0 or 1).
    async fn delete_one(&self, filter: Document) -> Result<u64, AppError>;

    async fn delete_many(&self, filter: Document) -> Result<u64, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
