pub mod documents;
pub mod envelope;

pub use documents::{
    DeleteManyData, DeleteOneData, FindData, InsertManyData, InsertOneData, UpdateManyData,
    UpdateOneData, UpdateRequest,
};
pub use envelope::{Envelope, FailureKind, Operation, RouteError};
