//! Result of a single-document mutation.

use bson::Document as BsonDocument;

use crate::{
    document::Document,
    encoding::decode_document,
    error::DocumentStoreResult,
};

/// What a find-and-modify operation matched.
///
/// Together with the surrounding `Result`, this gives the three states a caller
/// needs to branch on: a matched document, no match, or a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A document matched. For updates this is the post-update document, for
    /// removals the pre-deletion document.
    Matched(Document),
    /// No document matched the filter.
    NotFound,
}

impl Outcome {
    /// Decodes the raw answer of a backend find-and-modify call.
    pub(crate) fn decode(raw: Option<BsonDocument>) -> DocumentStoreResult<Self> {
        Ok(match raw {
            Some(doc) => Outcome::Matched(decode_document(doc)?),
            None => Outcome::NotFound,
        })
    }

    /// Returns `true` if no document matched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound)
    }

    /// Returns the matched document, if any.
    pub fn document(&self) -> Option<&Document> {
        match self {
            Outcome::Matched(doc) => Some(doc),
            Outcome::NotFound => None,
        }
    }

    /// Converts into the matched document, or `None` if nothing matched.
    pub fn into_option(self) -> Option<Document> {
        match self {
            Outcome::Matched(doc) => Some(doc),
            Outcome::NotFound => None,
        }
    }
}

impl From<Outcome> for Option<Document> {
    fn from(outcome: Outcome) -> Self {
        outcome.into_option()
    }
}
