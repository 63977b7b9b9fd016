//! The collection handle: the document-store access facade.
//!
//! A [`Collection`] names one collection within one database of a connected store
//! and exposes the facade operations over it. Each operation:
//!
//! 1. validates and encodes its inputs (no store traffic on failure),
//! 2. issues exactly one backend call inside a fresh [`CallScope`],
//! 3. decodes the store's answer back into generic [`Document`]s.
//!
//! Handles are cheap, immutable and freely shared between tasks. Concurrency
//! control is left to the store's atomic single-document operations.
//!
//! # Update operators
//!
//! Update specifications are forwarded to the store verbatim. The caller is
//! responsible for operator correctness; a malformed or unsupported operator is
//! reported by the store as [`DocumentStoreError::Store`]. Fields named inside an
//! operator payload are overwritten as a whole: a nested object or array given as
//! a replacement value replaces the stored one, it is not deep-merged.
//!
//! # Example
//!
//! ```ignore
//! use docfacade::prelude::*;
//!
//! let items = store.database("test").collection("items");
//! let id = items.add(&Document::new().with("item", "a")).await?;
//!
//! let set = Document::new().with("$set", Document::new().with("item", "b"));
//! match items.update_by_id(&id.to_hex(), &set).await? {
//!     Outcome::Matched(doc) => println!("updated: {doc:?}"),
//!     Outcome::NotFound => println!("gone"),
//! }
//! ```

use std::time::Duration;

use bson::Document as BsonDocument;
use futures::{StreamExt, TryStreamExt};
use tracing::instrument;

use crate::{
    backend::{Namespace, StoreBackend},
    cursor::DocumentCursor,
    document::Document,
    encoding::{decode_document, encode_document},
    error::{DocumentStoreError, DocumentStoreResult},
    id::{DocumentId, ID_FIELD},
    outcome::Outcome,
    scope::CallScope,
};

/// A handle to one collection of a store.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    namespace: Namespace,
    backend: &'a B,
    timeout: Duration,
}

impl<B: StoreBackend> Clone for Collection<'_, B> {
    fn clone(&self) -> Self {
        self.with_timeout(self.timeout)
    }
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(namespace: Namespace, backend: &'a B, timeout: Duration) -> Self {
        Self {
            namespace,
            backend,
            timeout,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.namespace.collection
    }

    /// The database and collection this handle addresses.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the timeout applied to each call made through this handle.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns a handle to the same collection whose calls are bounded by `timeout`.
    ///
    /// ```ignore
    /// items.with_timeout(Duration::from_secs(2)).get_all().await?;
    /// ```
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            namespace: self.namespace.clone(),
            backend: self.backend,
            timeout,
        }
    }

    fn scope(&self, operation: &'static str) -> CallScope {
        CallScope::new(operation, self.timeout)
    }

    /// Inserts a document and returns the identifier the store assigned to it.
    ///
    /// Either the document exists afterwards with the returned identifier, or it
    /// does not exist at all.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::Encoding`] if the document cannot be encoded or
    ///   already carries an `_id` field (identifiers are assigned by the store).
    /// - [`DocumentStoreError::Store`] / [`DocumentStoreError::Timeout`] if the
    ///   insert is rejected or does not complete in time.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn add(&self, document: &Document) -> DocumentStoreResult<DocumentId> {
        if document.contains_key(ID_FIELD) {
            return Err(DocumentStoreError::Encoding(format!(
                "field `{ID_FIELD}` is assigned by the store"
            )));
        }
        let encoded = encode_document(document)?;

        self.scope("add")
            .run(self.backend.insert_one(&self.namespace, encoded))
            .await
    }

    /// Applies `update` to the first document matching `filter`.
    ///
    /// Returns the post-update document, or [`Outcome::NotFound`] if nothing
    /// matched. At most one document is affected; which one is unspecified
    /// unless the filter is unique.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn update(&self, filter: &Document, update: &Document) -> DocumentStoreResult<Outcome> {
        let filter = encode_document(filter)?;
        self.find_and_update(filter, update).await
    }

    /// Applies `update` to the document with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`] if `id` is not a
    /// well-formed identifier; the store is not contacted in that case.
    #[instrument(skip_all, fields(namespace = %self.namespace, id = id))]
    pub async fn update_by_id(&self, id: &str, update: &Document) -> DocumentStoreResult<Outcome> {
        let filter = encode_document(&Document::by_id(DocumentId::parse(id)?))?;
        self.find_and_update(filter, update).await
    }

    async fn find_and_update(
        &self,
        filter: BsonDocument,
        update: &Document,
    ) -> DocumentStoreResult<Outcome> {
        let update = encode_document(update)?;

        let raw = self
            .scope("update")
            .run(self.backend.find_one_and_update(&self.namespace, filter, update))
            .await?;

        Outcome::decode(raw)
    }

    /// Deletes the first document matching `filter` and returns it as it was
    /// before deletion, or [`Outcome::NotFound`] if nothing matched.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn remove(&self, filter: &Document) -> DocumentStoreResult<Outcome> {
        let filter = encode_document(filter)?;
        self.find_and_delete(filter).await
    }

    /// Deletes the document with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`] if `id` is not a
    /// well-formed identifier; the store is not contacted in that case.
    #[instrument(skip_all, fields(namespace = %self.namespace, id = id))]
    pub async fn remove_by_id(&self, id: &str) -> DocumentStoreResult<Outcome> {
        let filter = encode_document(&Document::by_id(DocumentId::parse(id)?))?;
        self.find_and_delete(filter).await
    }

    async fn find_and_delete(&self, filter: BsonDocument) -> DocumentStoreResult<Outcome> {
        let raw = self
            .scope("remove")
            .run(self.backend.find_one_and_delete(&self.namespace, filter))
            .await?;

        Outcome::decode(raw)
    }

    /// Reads every document of the collection into memory.
    ///
    /// The whole scan runs in a single call scope. If it cannot start or is
    /// interrupted, the documents read so far are discarded. The store cursor is
    /// released on every exit path. Intended for small collections; see
    /// [`scan`](Self::scan) for incremental reads.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn get_all(&self) -> DocumentStoreResult<Vec<Document>> {
        self.scope("get_all")
            .run(async {
                self.backend
                    .find(&self.namespace, BsonDocument::new())
                    .await?
                    .map(|raw| raw.and_then(decode_document))
                    .try_collect::<Vec<_>>()
                    .await
            })
            .await
    }

    /// Opens a lazy scan over every document of the collection.
    ///
    /// Opening the scan and each subsequent advance run in their own call scopes.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn scan(&self) -> DocumentStoreResult<DocumentCursor> {
        let stream = self
            .scope("scan")
            .run(self.backend.find(&self.namespace, BsonDocument::new()))
            .await?;

        Ok(DocumentCursor::new(stream, self.timeout))
    }
}
