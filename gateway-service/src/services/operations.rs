//! One function per gateway route: parse the body, coerce the identifier,
//! make the store call, shape the result.
//!
//! Everything here is transport-free; failures come back as [`AppError`]
//! kinds and the handlers decide how to render them.

use crate::dtos::{
    DeleteManyData, DeleteOneData, FindData, InsertManyData, InsertOneData, UpdateManyData,
    UpdateOneData, UpdateRequest,
};
use crate::services::convert::{
    coerce_id, document_to_json, map_to_document, to_document, to_documents, to_plain_json,
    ID_FIELD,
};
use crate::services::store::DocumentStore;
use mongodb::bson::Document;
use serde::de::DeserializeOwned;
use serde_json::Value;
use service_core::error::AppError;
use validator::Validate;

pub async fn insert_one(store: &dyn DocumentStore, body: &[u8]) -> Result<InsertOneData, AppError> {
    let document = to_document(parse_body(body)?)?;
    let id = store.insert_one(document).await?;

    tracing::info!(inserted_id = %id, "Inserted single document");
    Ok(InsertOneData {
        id: to_plain_json(id),
    })
}

pub async fn insert_many(
    store: &dyn DocumentStore,
    body: &[u8],
) -> Result<InsertManyData, AppError> {
    let documents = to_documents(parse_body(body)?)?;
    let ids = store.insert_many(documents).await?;

    tracing::info!(num_inserted = ids.len(), "Inserted multiple documents");
    Ok(InsertManyData {
        num_inserted: ids.len(),
        ids: ids.into_iter().map(to_plain_json).collect(),
    })
}

pub async fn find(store: &dyn DocumentStore, body: &[u8]) -> Result<FindData, AppError> {
    let query = parse_query(body)?;
    let documents = store.find(query).await?;

    tracing::info!(num_docs = documents.len(), "Found documents");
    Ok(FindData {
        num_docs: documents.len(),
        docs: documents.into_iter().map(document_to_json).collect(),
    })
}

pub async fn update_one(store: &dyn DocumentStore, body: &[u8]) -> Result<UpdateOneData, AppError> {
    let (query, update) = parse_update(body)?;

    let before = store.find_one(query).await?.ok_or_else(no_match)?;
    // Target the snapshot by `_id` so both snapshots describe the same document.
    let target = by_id(&before)?;
    let counts = store.update_one(target.clone(), update).await?;
    let after = store.find_one(target).await?;

    tracing::info!(
        matched_count = counts.matched_count,
        modified_count = counts.modified_count,
        "Updated single document"
    );
    Ok(UpdateOneData {
        matched_count: counts.matched_count,
        modified_count: counts.modified_count,
        document_before_update: document_to_json(before),
        document_after_update: after.map(document_to_json).unwrap_or(Value::Null),
    })
}

pub async fn update_many(
    store: &dyn DocumentStore,
    body: &[u8],
) -> Result<UpdateManyData, AppError> {
    let (query, update) = parse_update(body)?;

    store.find_one(query.clone()).await?.ok_or_else(no_match)?;
    let counts = store.update_many(query, update).await?;

    tracing::info!(
        matched_count = counts.matched_count,
        modified_count = counts.modified_count,
        "Updated multiple documents"
    );
    Ok(UpdateManyData {
        matched_count: counts.matched_count,
        modified_count: counts.modified_count,
    })
}

pub async fn delete_one(store: &dyn DocumentStore, body: &[u8]) -> Result<DeleteOneData, AppError> {
    let query = parse_query(body)?;

    let snapshot = store.find_one(query).await?.ok_or_else(no_match)?;
    let deleted_count = store.delete_one(by_id(&snapshot)?).await?;

    tracing::info!(deleted_count, "Deleted single document");
    Ok(DeleteOneData {
        deleted_count,
        deleted_document: document_to_json(snapshot),
    })
}

pub async fn delete_many(
    store: &dyn DocumentStore,
    body: &[u8],
) -> Result<DeleteManyData, AppError> {
    let query = parse_query(body)?;

    store.find_one(query.clone()).await?.ok_or_else(no_match)?;
    let deleted_count = store.delete_many(query).await?;

    tracing::info!(deleted_count, "Deleted multiple documents");
    Ok(DeleteManyData { deleted_count })
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("malformed JSON body: {}", e)))
}

fn parse_query(body: &[u8]) -> Result<Document, AppError> {
    coerce_id(to_document(parse_body(body)?)?)
}

fn parse_update(body: &[u8]) -> Result<(Document, Document), AppError> {
    let request: UpdateRequest = parse_body(body)?;
    request.validate()?;

    let query = coerce_id(map_to_document(request.query)?)?;
    let update = map_to_document(request.update)?;
    Ok((query, update))
}

fn by_id(document: &Document) -> Result<Document, AppError> {
    let Some(id) = document.get(ID_FIELD) else {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "stored document has no _id"
        )));
    };
    let mut filter = Document::new();
    filter.insert(ID_FIELD, id.clone());
    Ok(filter)
}

fn no_match() -> AppError {
    AppError::NotFound(anyhow::anyhow!("query does not match any document"))
}
