//! Update operator application for in-memory documents.
//!
//! Supports `$set`, `$unset` and `$inc`. Named fields are overwritten as a whole:
//! a nested document or array given to `$set` replaces the stored value, it is
//! never merged into it.

use bson::{Bson, Document as BsonDocument};

use docfacade_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    id::ID_FIELD,
};

use crate::evaluator::lookup;

const SUPPORTED: [&str; 3] = ["$set", "$unset", "$inc"];

fn store_error(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::Store(message.into())
}

/// Checks the shape of an update document without applying it.
pub(crate) fn validate_update(update: &BsonDocument) -> DocumentStoreResult<()> {
    if update.is_empty() {
        return Err(store_error("update document must not be empty"));
    }

    for (op, payload) in update {
        if !op.starts_with('$') {
            return Err(store_error("update document requires atomic operators"));
        }
        if !SUPPORTED.contains(&op.as_str()) {
            return Err(store_error(format!("unknown modifier: {op}")));
        }
        let Bson::Document(fields) = payload else {
            return Err(store_error(format!(
                "modifiers operate on fields but {op} was given {:?}",
                payload.element_type()
            )));
        };
        for path in fields.keys() {
            if path.is_empty() || path.split('.').any(str::is_empty) {
                return Err(store_error(format!("invalid field path {path:?} in {op}")));
            }
        }
    }

    Ok(())
}

/// Applies a validated update to `document` and returns the result.
///
/// `document` itself is left untouched, so a failing update has no effect.
pub(crate) fn apply_update(
    document: &BsonDocument,
    update: &BsonDocument,
) -> DocumentStoreResult<BsonDocument> {
    validate_update(update)?;
    let mut updated = document.clone();

    for (op, payload) in update {
        let Bson::Document(fields) = payload else {
            continue;
        };

        for (path, operand) in fields {
            match op.as_str() {
                "$set" => set_path(&mut updated, path, operand.clone())?,
                "$unset" => remove_path(&mut updated, path),
                "$inc" => {
                    let incremented = increment(lookup(&updated, path), operand, path)?;
                    set_path(&mut updated, path, incremented)?;
                }
                _ => unreachable!("validated above"),
            }
        }
    }

    if updated.get(ID_FIELD) != document.get(ID_FIELD) {
        return Err(store_error(format!(
            "performing an update on the path '{ID_FIELD}' would modify the immutable field '{ID_FIELD}'"
        )));
    }

    Ok(updated)
}

fn set_path(document: &mut BsonDocument, path: &str, value: Bson) -> DocumentStoreResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, BsonDocument::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(store_error(format!(
                    "cannot create field '{rest}' in non-document field '{head}'"
                ))),
            }
        }
    }
}

fn remove_path(document: &mut BsonDocument, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

fn increment(current: Option<&Bson>, by: &Bson, path: &str) -> DocumentStoreResult<Bson> {
    let non_numeric = || store_error(format!("cannot increment '{path}' with non-numeric argument"));

    Ok(match (current, by) {
        (_, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) if current.is_none() => by.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(i64::from(*a) + i64::from(*b))),
        (Some(Bson::Int32(a)), Bson::Int64(b)) => Bson::Int64(add_i64(i64::from(*a), *b, path)?),
        (Some(Bson::Int64(a)), Bson::Int32(b)) => Bson::Int64(add_i64(*a, i64::from(*b), path)?),
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(add_i64(*a, *b, path)?),
        (Some(current @ (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))), by) => {
            match (as_f64(current), as_f64(by)) {
                (Some(a), Some(b)) => Bson::Double(a + b),
                _ => return Err(non_numeric()),
            }
        }
        (Some(_), Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => {
            return Err(store_error(format!(
                "cannot apply $inc to a value of non-numeric type at '{path}'"
            )));
        }
        _ => return Err(non_numeric()),
    })
}

fn add_i64(a: i64, b: i64, path: &str) -> DocumentStoreResult<i64> {
    a.checked_add(b)
        .ok_or_else(|| store_error(format!("integer overflow applying $inc to '{path}'")))
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}
