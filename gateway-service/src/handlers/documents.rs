//! The `/api/*` routes. Each one delegates to [`crate::services::operations`]
//! and wraps the outcome in an [`Envelope`].

use crate::dtos::{Envelope, Operation, RouteError};
use crate::services::operations;
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
};
use metrics::counter;
use serde::Serialize;
use service_core::error::AppError;

/// Bodies are read as raw bytes so that malformed JSON, and bodies the
/// extractor refuses, become failure envelopes instead of axum rejections.
pub async fn insert_one(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Envelope, RouteError> {
    let body = read_body(Operation::InsertOne, body)?;
    respond(
        Operation::InsertOne,
        operations::insert_one(state.store.as_ref(), &body).await,
    )
}

pub async fn insert_many(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Envelope, RouteError> {
    let body = read_body(Operation::InsertMany, body)?;
    respond(
        Operation::InsertMany,
        operations::insert_many(state.store.as_ref(), &body).await,
    )
}

pub async fn find(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Envelope, RouteError> {
    let body = read_body(Operation::Find, body)?;
    respond(
        Operation::Find,
        operations::find(state.store.as_ref(), &body).await,
    )
}

pub async fn update_one(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Envelope, RouteError> {
    let body = read_body(Operation::UpdateOne, body)?;
    respond(
        Operation::UpdateOne,
        operations::update_one(state.store.as_ref(), &body).await,
    )
}

pub async fn update_many(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Envelope, RouteError> {
    let body = read_body(Operation::UpdateMany, body)?;
    respond(
        Operation::UpdateMany,
        operations::update_many(state.store.as_ref(), &body).await,
    )
}

pub async fn delete_one(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Envelope, RouteError> {
    let body = read_body(Operation::DeleteOne, body)?;
    respond(
        Operation::DeleteOne,
        operations::delete_one(state.store.as_ref(), &body).await,
    )
}

pub async fn delete_many(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Envelope, RouteError> {
    let body = read_body(Operation::DeleteMany, body)?;
    respond(
        Operation::DeleteMany,
        operations::delete_many(state.store.as_ref(), &body).await,
    )
}

fn read_body(
    operation: Operation,
    body: Result<Bytes, BytesRejection>,
) -> Result<Bytes, RouteError> {
    body.map_err(|rejection| {
        RouteError::new(
            operation,
            AppError::BadRequest(anyhow::anyhow!("unreadable request body: {}", rejection)),
        )
    })
}

fn respond<T: Serialize>(
    operation: Operation,
    result: Result<T, AppError>,
) -> Result<Envelope, RouteError> {
    let data = result
        .and_then(|data| {
            serde_json::to_value(data).map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("failed to serialize response: {}", e))
            })
        })
        .map_err(|error| RouteError::new(operation, error))?;

    counter!(
        "gateway_operations_total",
        "operation" => operation.name(),
        "outcome" => "success"
    )
    .increment(1);

    Ok(Envelope::success(operation, data))
}
