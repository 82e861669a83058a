//! Query matching for the in-memory store.
//!
//! Covers the subset of the MongoDB query language the gateway is exercised
//! with: field equality (dotted paths, array membership), comparison and set
//! operators, `$exists`, and top-level `$and` / `$or`.

use mongodb::bson::{Bson, Document};
use service_core::error::AppError;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Field {
        path: String,
        conditions: Vec<Condition>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Condition {
    Eq(Bson),
    Ne(Bson),
    Gt(Bson),
    Gte(Bson),
    Lt(Bson),
    Lte(Bson),
    In(Vec<Bson>),
    Nin(Vec<Bson>),
    Exists(bool),
}

impl Filter {
    pub(crate) fn parse(query: &Document) -> Result<Self, AppError> {
        let mut clauses = Vec::with_capacity(query.len());

        for (key, value) in query {
            match key.as_str() {
                "$and" => clauses.push(Filter::And(parse_clause_list(key, value)?)),
                "$or" => clauses.push(Filter::Or(parse_clause_list(key, value)?)),
                op if op.starts_with('$') => {
                    return Err(unsupported(format!("unknown top level operator: {}", op)))
                }
                path => clauses.push(Filter::Field {
                    path: path.to_string(),
                    conditions: parse_conditions(value)?,
                }),
            }
        }

        Ok(Filter::And(clauses))
    }

    pub(crate) fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::And(clauses) => clauses.iter().all(|c| c.matches(doc)),
            Filter::Or(clauses) => clauses.iter().any(|c| c.matches(doc)),
            Filter::Field { path, conditions } => {
                let value = lookup(doc, path);
                conditions.iter().all(|c| c.matches(value))
            }
        }
    }
}

impl Condition {
    fn matches(&self, value: Option<&Bson>) -> bool {
        match self {
            Condition::Eq(expected) => value_eq(value, expected),
            Condition::Ne(expected) => !value_eq(value, expected),
            Condition::Gt(bound) => value_cmp(value, bound, |o| o == Ordering::Greater),
            Condition::Gte(bound) => value_cmp(value, bound, |o| o != Ordering::Less),
            Condition::Lt(bound) => value_cmp(value, bound, |o| o == Ordering::Less),
            Condition::Lte(bound) => value_cmp(value, bound, |o| o != Ordering::Greater),
            Condition::In(candidates) => candidates.iter().any(|c| value_eq(value, c)),
            Condition::Nin(candidates) => !candidates.iter().any(|c| value_eq(value, c)),
            Condition::Exists(expected) => value.is_some() == *expected,
        }
    }
}

fn parse_clause_list(op: &str, value: &Bson) -> Result<Vec<Filter>, AppError> {
    let items = match value {
        Bson::Array(items) if !items.is_empty() => items,
        _ => return Err(unsupported(format!("{} must be a nonempty array", op))),
    };

    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Filter::parse(clause),
            _ => Err(unsupported(format!("{} entries must be objects", op))),
        })
        .collect()
}

fn parse_conditions(value: &Bson) -> Result<Vec<Condition>, AppError> {
    let operators = match value {
        Bson::Document(inner) if is_operator_document(inner) => inner,
        other => return Ok(vec![Condition::Eq(other.clone())]),
    };

    operators
        .iter()
        .map(|(op, arg)| {
            Ok(match op.as_str() {
                "$eq" => Condition::Eq(arg.clone()),
                "$ne" => Condition::Ne(arg.clone()),
                "$gt" => Condition::Gt(arg.clone()),
                "$gte" => Condition::Gte(arg.clone()),
                "$lt" => Condition::Lt(arg.clone()),
                "$lte" => Condition::Lte(arg.clone()),
                "$in" => Condition::In(array_arg(op, arg)?),
                "$nin" => Condition::Nin(array_arg(op, arg)?),
                "$exists" => Condition::Exists(truthy(arg)),
                other => return Err(unsupported(format!("unknown operator: {}", other))),
            })
        })
        .collect()
}

/// `{ "$gt": 1 }` is an operator expression; `{ "city": "Oslo" }` is a value
/// to compare against.
fn is_operator_document(doc: &Document) -> bool {
    !doc.is_empty() && doc.keys().all(|k| k.starts_with('$'))
}

fn array_arg(op: &str, arg: &Bson) -> Result<Vec<Bson>, AppError> {
    match arg {
        Bson::Array(items) => Ok(items.clone()),
        _ => Err(unsupported(format!("{} needs an array", op))),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        other => as_f64(other).map_or(true, |n| n != 0.0),
    }
}

/// Resolve a dotted path such as `address.city` inside nested documents.
pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => doc.get(path),
        Some((head, rest)) => match doc.get(head)? {
            Bson::Document(inner) => lookup(inner, rest),
            _ => None,
        },
    }
}

/// Equality the way queries see it: a missing field equals `null`, numbers
/// compare by value across widths, and an array field matches when any
/// element does.
fn value_eq(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(actual) => bson_eq(actual, expected) || array_contains(actual, expected),
    }
}

fn array_contains(value: &Bson, expected: &Bson) -> bool {
    match value {
        Bson::Array(items) => items.iter().any(|item| bson_eq(item, expected)),
        _ => false,
    }
}

fn value_cmp(value: Option<&Bson>, bound: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        None => false,
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| bson_cmp(item, bound).is_some_and(&accept)),
        Some(actual) => bson_cmp(actual, bound).is_some_and(accept),
    }
}

pub(crate) fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering between two values of comparable types; `None` otherwise.
fn bson_cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub(crate) fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn unsupported(message: String) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(message))
}
