//! Filter evaluation for in-memory documents.
//!
//! Supports the subset of the store's filter language that single-document
//! facade calls lean on: implicit equality (with array membership), dotted
//! paths, the comparison operators, `$in`/`$nin`, `$exists`, `$not`, and the
//! `$and`/`$or`/`$nor` combinators. Anything else is rejected the way the store
//! rejects it: as a store error.

use std::cmp::Ordering;

use bson::{Bson, Document as BsonDocument, oid::ObjectId};

use docfacade_core::error::{DocumentStoreError, DocumentStoreResult};

/// Comparable representation of BSON values.
///
/// Numeric types are normalized to `f64` so that `1` and `1.0` compare equal,
/// as they do in the store.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    /// Embedded documents compare field by field, in stored order
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Types the evaluator has no ordering for
    Other,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Other,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path against a document. Numeric segments index into arrays.
pub(crate) fn lookup<'a>(document: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(doc) => doc.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

fn store_error(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::Store(message.into())
}

fn is_operator_document(doc: &BsonDocument) -> DocumentStoreResult<bool> {
    let operators = doc.keys().filter(|k| k.starts_with('$')).count();

    match operators {
        0 => Ok(false),
        n if n == doc.len() => Ok(true),
        _ => Err(store_error("unknown operator: cannot mix operators and fields in a filter")),
    }
}

/// Implicit equality: a missing field equals `null`, and an array field matches
/// if the array itself or any of its elements equals the target.
fn equals(value: Option<&Bson>, target: &Bson) -> bool {
    let target = Comparable::from(target);

    match value {
        None => target == Comparable::Null,
        Some(array @ Bson::Array(items)) => {
            Comparable::from(array) == target
                || items.iter().any(|item| Comparable::from(item) == target)
        }
        Some(value) => Comparable::from(value) == target,
    }
}

fn compares(value: Option<&Bson>, operand: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);
    let check = |v: &Bson| {
        Comparable::from(v)
            .partial_cmp(&operand)
            .is_some_and(accept)
    };

    match value {
        None => false,
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(value) => check(value),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a BsonDocument,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a BsonDocument) -> Self {
        Self { document }
    }

    /// Returns whether the document satisfies every clause of `filter`.
    pub fn matches(&self, filter: &BsonDocument) -> DocumentStoreResult<bool> {
        for (key, condition) in filter {
            let satisfied = match key.as_str() {
                "$and" => self.all(key, condition)?,
                "$or" => self.any(key, condition)?,
                "$nor" => !self.any(key, condition)?,
                op if op.starts_with('$') => {
                    return Err(store_error(format!("unknown top level operator: {op}")));
                }
                path => self.matches_field(path, condition)?,
            };

            if !satisfied {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn all(&self, key: &str, condition: &Bson) -> DocumentStoreResult<bool> {
        for clause in self.clauses(key, condition)? {
            if !self.matches(clause)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn any(&self, key: &str, condition: &Bson) -> DocumentStoreResult<bool> {
        for clause in self.clauses(key, condition)? {
            if self.matches(clause)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn clauses<'c>(&self, key: &str, condition: &'c Bson) -> DocumentStoreResult<Vec<&'c BsonDocument>> {
        let Bson::Array(items) = condition else {
            return Err(store_error(format!("{key} must be an array")));
        };
        if items.is_empty() {
            return Err(store_error(format!("{key} must be a nonempty array")));
        }

        items
            .iter()
            .map(|item| {
                item.as_document()
                    .ok_or_else(|| store_error(format!("{key} argument's entries must be objects")))
            })
            .collect()
    }

    fn matches_field(&self, path: &str, condition: &Bson) -> DocumentStoreResult<bool> {
        let value = lookup(self.document, path);

        match condition {
            Bson::Document(ops) if is_operator_document(ops)? => {
                for (op, operand) in ops {
                    if !self.apply_operator(op, value, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(equals(value, condition)),
        }
    }

    fn apply_operator(&self, op: &str, value: Option<&Bson>, operand: &Bson) -> DocumentStoreResult<bool> {
        Ok(match op {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compares(value, operand, |o| o == Ordering::Greater),
            "$gte" => compares(value, operand, |o| o != Ordering::Less),
            "$lt" => compares(value, operand, |o| o == Ordering::Less),
            "$lte" => compares(value, operand, |o| o != Ordering::Greater),
            "$in" | "$nin" => {
                let Bson::Array(candidates) = operand else {
                    return Err(store_error(format!("{op} needs an array")));
                };
                let found = candidates.iter().any(|candidate| equals(value, candidate));
                if op == "$in" { found } else { !found }
            }
            "$exists" => value.is_some() == truthy(operand),
            "$not" => {
                let Bson::Document(inner) = operand else {
                    return Err(store_error("$not needs an object"));
                };
                let mut all = true;
                for (inner_op, inner_operand) in inner {
                    all &= self.apply_operator(inner_op, value, inner_operand)?;
                }
                !all
            }
            other => return Err(store_error(format!("unknown operator: {other}"))),
        })
    }
}
