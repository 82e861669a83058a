//! Conversions between request/response JSON and the BSON the store speaks.
//!
//! Incoming JSON is decoded with extended-JSON rules, so `{"$oid": "..."}`
//! and friends arrive as native BSON values. Outgoing documents are rendered
//! as plain JSON: object ids become their 24-character hex string and dates
//! become RFC 3339 strings.

use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde_json::{Map, Value};
use service_core::error::AppError;

pub const ID_FIELD: &str = "_id";

/// Decode a JSON object into a BSON document.
pub fn to_document(value: Value) -> Result<Document, AppError> {
    match value {
        Value::Object(map) => map_to_document(map),
        other => Err(AppError::BadRequest(anyhow::anyhow!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

/// Decode a non-empty JSON array of objects into BSON documents.
pub fn to_documents(value: Value) -> Result<Vec<Document>, AppError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "expected a JSON array of objects, got {}",
                json_type(&other)
            )));
        }
    };

    if items.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "at least one document is required"
        )));
    }

    items.into_iter().map(to_document).collect()
}

pub fn map_to_document(map: Map<String, Value>) -> Result<Document, AppError> {
    Document::try_from(map)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid document: {}", e)))
}

/// Replace a string `_id` in a query with the ObjectId it spells.
///
/// Any other `_id` value (or none) leaves the query untouched.
pub fn coerce_id(mut query: Document) -> Result<Document, AppError> {
    let Some(Bson::String(raw)) = query.get(ID_FIELD) else {
        return Ok(query);
    };
    let oid = ObjectId::parse_str(raw).map_err(|_| AppError::InvalidId(raw.clone()))?;
    query.insert(ID_FIELD, oid);
    Ok(query)
}

pub fn to_plain_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| Value::from(dt.timestamp_millis())),
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(to_plain_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

pub fn document_to_json(doc: Document) -> Value {
    Value::Object(
        doc.into_iter()
            .map(|(key, value)| (key, to_plain_json(value)))
            .collect(),
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
