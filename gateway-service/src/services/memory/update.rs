//! Update operators for the in-memory store: `$set`, `$unset` and `$inc`.

use super::filter::{as_f64, bson_eq, lookup};
use crate::services::convert::ID_FIELD;
use mongodb::bson::{Bson, Document};
use service_core::error::AppError;

const SUPPORTED: [&str; 3] = ["$set", "$unset", "$inc"];

const IMMUTABLE_ID: &str =
    "performing an update on the path '_id' would modify the immutable field '_id'";

/// Reject update documents the store cannot apply, before touching any data.
pub(crate) fn validate(update: &Document) -> Result<(), AppError> {
    if update.is_empty() {
        return Err(bad_update("update document must not be empty".to_string()));
    }

    for (op, arg) in update {
        if !op.starts_with('$') {
            return Err(bad_update(format!(
                "update document requires atomic operators, found '{}'",
                op
            )));
        }
        if !SUPPORTED.contains(&op.as_str()) {
            return Err(bad_update(format!("unsupported update operator: {}", op)));
        }
        if !matches!(arg, Bson::Document(_)) {
            return Err(bad_update(format!("{} needs an object argument", op)));
        }
    }

    Ok(())
}

/// Apply `update` to `doc` in place. Returns whether anything changed.
///
/// On error `doc` may be partially updated; callers apply to a copy.
pub(crate) fn apply(doc: &mut Document, update: &Document) -> Result<bool, AppError> {
    validate(update)?;
    let before = doc.clone();

    for (op, arg) in update {
        let Bson::Document(fields) = arg else {
            continue;
        };

        for (path, value) in fields {
            match op.as_str() {
                "$set" => {
                    guard_id(doc, path, Some(value))?;
                    set_path(doc, path, value.clone())?;
                }
                "$unset" => {
                    guard_id(doc, path, None)?;
                    remove_path(doc, path);
                }
                "$inc" => {
                    guard_id(doc, path, None)?;
                    let delta = numeric(path, value)?;
                    let next = match lookup(doc, path) {
                        None => delta.clone(),
                        Some(current) => add(current, delta).ok_or_else(|| non_numeric(path))?,
                    };
                    set_path(doc, path, next)?;
                }
                other => {
                    let message = format!("unsupported update operator: {}", other);
                    return Err(bad_update(message));
                }
            }
        }
    }

    Ok(*doc != before)
}

/// `_id` is immutable; setting it to its current value is tolerated.
fn guard_id(doc: &Document, path: &str, new_value: Option<&Bson>) -> Result<(), AppError> {
    if path != ID_FIELD && !path.starts_with("_id.") {
        return Ok(());
    }
    match (doc.get(ID_FIELD), new_value) {
        (Some(current), Some(value)) if path == ID_FIELD && bson_eq(current, value) => Ok(()),
        _ => Err(bad_update(IMMUTABLE_ID.to_string())),
    }
}

fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<(), AppError> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !doc.contains_key(head) {
                doc.insert(head, Document::new());
            }
            match doc.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(bad_update(format!(
                    "cannot create field '{}' in element '{}'",
                    rest, head
                ))),
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

fn numeric<'a>(path: &str, value: &'a Bson) -> Result<&'a Bson, AppError> {
    match as_f64(value) {
        Some(_) => Ok(value),
        None => Err(bad_update(format!(
            "cannot increment '{}' with a non-numeric argument",
            path
        ))),
    }
}

fn non_numeric(path: &str) -> AppError {
    bad_update(format!(
        "cannot apply $inc to non-numeric field '{}'",
        path
    ))
}

fn add(a: &Bson, b: &Bson) -> Option<Bson> {
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => match x.checked_add(*y) {
            Some(sum) => Some(Bson::Int32(sum)),
            None => Some(Bson::Int64(i64::from(*x) + i64::from(*y))),
        },
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            as_i64(a)?.checked_add(as_i64(b)?).map(Bson::Int64)
        }
        _ => Some(Bson::Double(as_f64(a)? + as_f64(b)?)),
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

fn bad_update(message: String) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(message))
}
