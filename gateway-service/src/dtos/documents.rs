use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

/// Body of the update routes.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRequest {
    pub query: Map<String, Value>,
    #[validate(custom(function = "validate_update_operators"))]
    pub update: Map<String, Value>,
}

/// Updates are expressed with operators (`$set`, `$inc`, ...), never as a
/// replacement document.
fn validate_update_operators(update: &Map<String, Value>) -> Result<(), ValidationError> {
    if update.is_empty() {
        return Err(ValidationError::new("empty_update"));
    }
    if !update.keys().all(|key| key.starts_with('$')) {
        return Err(ValidationError::new("update_requires_operators"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct InsertOneData {
    #[serde(rename = "_id")]
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct InsertManyData {
    pub num_inserted: usize,
    #[serde(rename = "_ids")]
    pub ids: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct FindData {
    pub num_docs: usize,
    pub docs: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct UpdateOneData {
    pub matched_count: u64,
    pub modified_count: u64,
    pub document_before_update: Value,
    pub document_after_update: Value,
}

#[derive(Debug, Serialize)]
pub struct UpdateManyData {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteOneData {
    pub deleted_count: u64,
    pub deleted_document: Value,
}

#[derive(Debug, Serialize)]
pub struct DeleteManyData {
    pub deleted_count: u64,
}
