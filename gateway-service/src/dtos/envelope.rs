//! The `{status, message, data}` wrapper every gateway route answers with.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use service_core::error::AppError;
use std::fmt;
use thiserror::Error;

pub const NOT_FOUND_MESSAGE: &str = "Error! Query does not match any document";
pub const MALFORMED_ID_MESSAGE: &str = "Error! Malformed document identifier";

/// Status carried by every failure envelope, whatever went wrong.
pub const FAILURE_STATUS: u16 = 404;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InsertOne,
    InsertMany,
    Find,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::InsertOne => "insert_one",
            Operation::InsertMany => "insert_many",
            Operation::Find => "find",
            Operation::UpdateOne => "update_one",
            Operation::UpdateMany => "update_many",
            Operation::DeleteOne => "delete_one",
            Operation::DeleteMany => "delete_many",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Operation::InsertOne => "Single document insertion successful",
            Operation::InsertMany => "Multiple documents insertion successful",
            Operation::Find => "Finding documents successful",
            Operation::UpdateOne => "Single document update successful",
            Operation::UpdateMany => "Multiple documents update successful",
            Operation::DeleteOne => "Single document deletion successful",
            Operation::DeleteMany => "Deletion of multiple documents successful",
        }
    }

    /// Message for failures that are neither "not found" nor a malformed id.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::InsertOne => "Error! Could not insert document.",
            Operation::InsertMany => "Error! Could not insert documents.",
            Operation::Find => "Error! Problem occured while searching documents",
            Operation::UpdateOne => "Error! Could not update document",
            Operation::UpdateMany => "Error! Could not update documents",
            Operation::DeleteOne | Operation::DeleteMany => "Error! Could not delete documents",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: u16,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub fn success(operation: Operation, data: Value) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: operation.success_message().to_string(),
            data,
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            status: FAILURE_STATUS,
            message: message.to_string(),
            data: json!({}),
        }
    }
}

/// Envelopes always travel as HTTP 200; the outcome lives in `status`.
impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    MalformedId,
    Generic,
}

impl FailureKind {
    pub fn name(self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::MalformedId => "malformed_id",
            FailureKind::Generic => "generic",
        }
    }
}

/// A failed gateway operation, rendered as a failure envelope.
#[derive(Debug, Error)]
#[error("{operation} failed: {error}")]
pub struct RouteError {
    pub operation: Operation,
    #[source]
    pub error: AppError,
}

impl RouteError {
    pub fn new(operation: Operation, error: AppError) -> Self {
        Self { operation, error }
    }

    pub fn kind(&self) -> FailureKind {
        match self.error {
            AppError::NotFound(_) => FailureKind::NotFound,
            AppError::InvalidId(_) => FailureKind::MalformedId,
            _ => FailureKind::Generic,
        }
    }

    pub fn envelope(&self) -> Envelope {
        match self.kind() {
            FailureKind::NotFound => Envelope::failure(NOT_FOUND_MESSAGE),
            FailureKind::MalformedId => Envelope::failure(MALFORMED_ID_MESSAGE),
            FailureKind::Generic => Envelope::failure(self.operation.failure_message()),
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match kind {
            FailureKind::Generic => tracing::error!(
                operation = %self.operation,
                error = %self.error,
                "Operation failed"
            ),
            _ => tracing::info!(
                operation = %self.operation,
                error = %self.error,
                "Operation rejected"
            ),
        }

        counter!(
            "gateway_operations_total",
            "operation" => self.operation.name(),
            "outcome" => kind.name()
        )
        .increment(1);

        self.envelope().into_response()
    }
}
