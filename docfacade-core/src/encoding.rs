//! Conversion between [`Document`]s and the store's binary encoding (BSON).
//!
//! Encoding runs before every write and decoding after every read. A failure in
//! either direction aborts the operation before (or instead of) handing anything
//! to the caller. Values and field order round-trip.

use bson::{Bson, Document as BsonDocument, spec::ElementType};

use crate::{
    document::{Document, Value},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Encodes a document for the store.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Encoding`] if a field name contains a NUL byte,
/// which the encoding cannot represent.
pub fn encode_document(document: &Document) -> DocumentStoreResult<BsonDocument> {
    let mut encoded = BsonDocument::new();

    for (field, value) in document {
        encoded.insert(encode_key(field)?, encode_value(value)?);
    }

    Ok(encoded)
}

/// Decodes a document returned by the store.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Encoding`] if the document holds a value type
/// with no [`Value`] counterpart. The message names the dotted path of the
/// offending field.
pub fn decode_document(document: BsonDocument) -> DocumentStoreResult<Document> {
    decode_fields(document).map_err(DocumentStoreError::from)
}

fn encode_key(field: &str) -> DocumentStoreResult<&str> {
    if field.contains('\0') {
        return Err(DocumentStoreError::Encoding(format!(
            "field name {field:?} contains a NUL byte"
        )));
    }
    Ok(field)
}

fn encode_value(value: &Value) -> DocumentStoreResult<Bson> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(
            items
                .iter()
                .map(encode_value)
                .collect::<DocumentStoreResult<Vec<_>>>()?,
        ),
        Value::Object(doc) => Bson::Document(encode_document(doc)?),
        Value::Id(id) => Bson::from(*id),
    })
}

/// A value with no [`Value`] counterpart, found at `path` (innermost segment first).
struct Unsupported {
    path: Vec<String>,
    element_type: ElementType,
}

impl Unsupported {
    fn within(mut self, segment: impl ToString) -> Self {
        self.path.push(segment.to_string());
        self
    }
}

impl From<Unsupported> for DocumentStoreError {
    fn from(unsupported: Unsupported) -> Self {
        let path: Vec<_> = unsupported.path.iter().rev().map(String::as_str).collect();

        DocumentStoreError::Encoding(format!(
            "field `{}`: unsupported value type {:?}",
            path.join("."),
            unsupported.element_type
        ))
    }
}

fn decode_fields(document: BsonDocument) -> Result<Document, Unsupported> {
    document
        .into_iter()
        .map(|(field, value)| match decode_value(value) {
            Ok(decoded) => Ok((field, decoded)),
            Err(unsupported) => Err(unsupported.within(field)),
        })
        .collect()
}

fn decode_value(value: Bson) -> Result<Value, Unsupported> {
    Ok(match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::Int(i64::from(i)),
        Bson::Int64(i) => Value::Int(i),
        Bson::Double(f) => Value::Float(f),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| decode_value(item).map_err(|e| e.within(index)))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Bson::Document(doc) => Value::Object(decode_fields(doc)?),
        Bson::ObjectId(oid) => Value::Id(oid.into()),
        other => {
            return Err(Unsupported {
                path: Vec::new(),
                element_type: other.element_type(),
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};

    use super::*;
    use crate::id::DocumentId;

    fn sample() -> Document {
        Document::new()
            .with("item", "a")
            .with("qty", 3)
            .with("price", 2.25)
            .with("active", true)
            .with("note", Value::Null)
            .with("tags", vec!["x", "y"])
            .with("dims", Document::new().with("h", 10).with("w", Value::Array(vec![])))
    }

    #[test]
    fn values_round_trip() {
        let original = sample();
        let decoded = decode_document(encode_document(&original).unwrap()).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn identifiers_round_trip_as_object_ids() {
        let id = DocumentId::generate();
        let encoded = encode_document(&Document::by_id(id)).unwrap();

        assert_eq!(encoded.get("_id"), Some(&Bson::ObjectId(id.as_object_id())));
        assert_eq!(decode_document(encoded).unwrap().id(), Some(id));
    }

    #[test]
    fn nested_fields_keep_their_order_on_the_wire() {
        let filter = Document::new().with("dims", Document::new().with("w", 1).with("h", 2));
        let encoded = encode_document(&filter).unwrap();

        let dims = encoded.get_document("dims").unwrap();
        assert_eq!(dims.keys().map(String::as_str).collect::<Vec<_>>(), ["w", "h"]);

        let sort = Document::new().with(
            "$push",
            Document::new().with(
                "scores",
                Document::new()
                    .with("$each", vec![1])
                    .with("$sort", Document::new().with("score", -1).with("age", 1)),
            ),
        );
        let encoded = encode_document(&sort).unwrap();
        let order = encoded
            .get_document("$push")
            .and_then(|push| push.get_document("scores"))
            .and_then(|scores| scores.get_document("$sort"))
            .unwrap();
        assert_eq!(order.keys().map(String::as_str).collect::<Vec<_>>(), ["score", "age"]);
    }

    #[test]
    fn decoding_keeps_stored_field_order() {
        let decoded = decode_document(doc! { "_id": ObjectId::new(), "z": 1, "a": 2 }).unwrap();

        assert_eq!(decoded.keys().map(String::as_str).collect::<Vec<_>>(), ["_id", "z", "a"]);
    }

    #[test]
    fn field_order_is_not_significant_for_equality() {
        let oid = ObjectId::new();
        let a = decode_document(doc! { "_id": oid, "b": 1_i32, "a": 2_i64 }).unwrap();
        let b = decode_document(doc! { "a": 2_i64, "b": 1_i64, "_id": oid }).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn rejects_nul_in_field_names() {
        let err = encode_document(&Document::new().with("bad\0key", 1)).unwrap_err();

        assert!(matches!(err, DocumentStoreError::Encoding(_)));

        let nested = Document::new().with("outer", Document::new().with("in\0ner", 1));
        assert!(matches!(
            encode_document(&nested),
            Err(DocumentStoreError::Encoding(_))
        ));
    }

    #[test]
    fn rejects_types_outside_the_value_model() {
        let raw = doc! { "when": bson::DateTime::from_millis(0) };
        let err = decode_document(raw).unwrap_err();

        assert!(matches!(err, DocumentStoreError::Encoding(ref msg) if msg.contains("when")));
    }

    #[test]
    fn nested_failures_name_the_full_path_once() {
        let raw = doc! { "outer": { "list": [1, { "inner": bson::DateTime::from_millis(0) }] } };
        let err = decode_document(raw).unwrap_err();

        assert!(matches!(
            err,
            DocumentStoreError::Encoding(ref msg)
                if msg == "field `outer.list.1.inner`: unsupported value type DateTime"
        ));
    }

    #[test]
    fn operators_are_forwarded_verbatim() {
        let update = Document::new().with("$set", Document::new().with("item", "b"));

        assert_eq!(encode_document(&update).unwrap(), doc! { "$set": { "item": "b" } });
    }
}
