use crate::services::store::{DocumentStore, UpdateCounts};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    Client as MongoClient, Collection, Database,
};
use service_core::error::AppError;

/// MongoDB-backed store over a single collection, opened once at startup.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    collection: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        let collection = db.collection::<Document>(collection);
        tracing::info!(
            database = %database,
            collection = %collection.name(),
            "Successfully connected to MongoDB database"
        );
        Ok(Self { db, collection })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, document: Document) -> Result<Bson, AppError> {
        let result = self
            .collection
            .insert_one(document, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert document: {}", e);
                AppError::from(e)
            })?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>, AppError> {
        let result = self
            .collection
            .insert_many(documents, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert documents: {}", e);
                AppError::from(e)
            })?;

        // The driver reports ids keyed by input position.
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn find(&self, filter: Document) -> Result<Vec<Document>, AppError> {
        let cursor = self.collection.find(filter, None).await.map_err(|e| {
            tracing::error!("Failed to query documents: {}", e);
            AppError::from(e)
        })?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, AppError> {
        self.collection
            .find_one(filter, None)
            .await
            .map_err(AppError::from)
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateCounts, AppError> {
        let result = self
            .collection
            .update_one(filter, update, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update document: {}", e);
                AppError::from(e)
            })?;
        Ok(UpdateCounts {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateCounts, AppError> {
        let result = self
            .collection
            .update_many(filter, update, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update documents: {}", e);
                AppError::from(e)
            })?;
        Ok(UpdateCounts {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, AppError> {
        let result = self
            .collection
            .delete_one(filter, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete document: {}", e);
                AppError::from(e)
            })?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, AppError> {
        let result = self
            .collection
            .delete_many(filter, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete documents: {}", e);
                AppError::from(e)
            })?;
        Ok(result.deleted_count)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}
