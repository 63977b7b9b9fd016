//! Store-assigned document identifiers.
//!
//! At the interface an identifier is an opaque 24-character hex string. Underneath
//! it is the store's fixed-width 12-byte object id. Parsing is strict and happens
//! locally, so a malformed identifier never reaches the store.

use std::{fmt, str::FromStr};

use bson::{Bson, oid::ObjectId};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Name of the identifier field carried by every stored document.
pub const ID_FIELD: &str = "_id";

/// Length of the hex rendering of an identifier.
const HEX_LEN: usize = 24;

/// The opaque, store-generated identifier of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Generates a fresh identifier. Used by backends that assign identifiers themselves.
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// Parses the hex rendering of an identifier.
    ///
    /// Accepts exactly 24 ASCII hex digits in either case.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`] for any other input.
    pub fn parse(input: &str) -> DocumentStoreResult<Self> {
        if input.len() != HEX_LEN {
            return Err(DocumentStoreError::InvalidIdentifier(format!(
                "expected {HEX_LEN} hex characters, got {} in {input:?}",
                input.len(),
            )));
        }

        if let Some(bad) = input.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(DocumentStoreError::InvalidIdentifier(format!(
                "unexpected character {bad:?} in {input:?}"
            )));
        }

        ObjectId::parse_str(input)
            .map(Self)
            .map_err(|e| DocumentStoreError::InvalidIdentifier(e.to_string()))
    }

    /// Returns the lowercase hex rendering of this identifier.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Returns the underlying object id.
    pub fn as_object_id(&self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl From<DocumentId> for ObjectId {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl FromStr for DocumentId {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::parse(&hex).map_err(de::Error::custom)
    }
}
