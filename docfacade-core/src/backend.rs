//! Storage backend abstraction for the document store facade.
//!
//! The [`StoreBackend`] trait is the complete capability set the facade needs from
//! a database client: single-document insert, atomic find-and-update returning the
//! post-image, atomic find-and-delete returning the pre-image, and a filtered scan
//! with cursor semantics. Nothing store-specific beyond that is assumed.
//!
//! Backends speak the wire encoding ([`bson::Document`]); conversion to and from
//! the generic [`Document`](crate::document::Document) model happens in the
//! facade, before and after each backend call.
//!
//! # Examples
//!
//! ```ignore
//! use docfacade::backend::{Namespace, StoreBackend};
//! use bson::doc;
//!
//! let ns = Namespace::new("test", "items");
//! let id = backend.insert_one(&ns, doc! { "item": "a" }).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt::{self, Debug};

use async_trait::async_trait;
use bson::Document as BsonDocument;
use futures::stream::BoxStream;

use crate::{error::DocumentStoreResult, id::DocumentId};

/// A stream of raw documents produced by a scan. Dropping it releases the
/// underlying cursor.
pub type DocumentStream = BoxStream<'static, DocumentStoreResult<BsonDocument>>;

/// Fully-qualified name of one collection within one database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    /// Creates a namespace for `collection` within `database`.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations are shared by every collection handle of a store and must
/// support concurrent calls. The find-and-modify operations must be atomic with
/// respect to each other on the matched document.
///
/// # Error Handling
///
/// Failures reported by the store are [`DocumentStoreError::Store`](crate::error::DocumentStoreError::Store).
/// "No document matched" is not a failure: the find-and-modify operations return `None`.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one document and returns the identifier the store assigned to it.
    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: BsonDocument,
    ) -> DocumentStoreResult<DocumentId>;

    /// Atomically applies `update` to the first document matching `filter` and
    /// returns the document as it is after the update.
    ///
    /// At most one document is modified, even if several match. The update
    /// operators are the store's own and are passed through uninterpreted.
    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> DocumentStoreResult<Option<BsonDocument>>;

    /// Atomically deletes the first document matching `filter` and returns it as
    /// it was before deletion.
    async fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: BsonDocument,
    ) -> DocumentStoreResult<Option<BsonDocument>>;

    /// Opens a scan over the documents matching `filter`, in the store's natural order.
    async fn find(
        &self,
        namespace: &Namespace,
        filter: BsonDocument,
    ) -> DocumentStoreResult<DocumentStream>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: BsonDocument,
    ) -> DocumentStoreResult<DocumentId> {
        (*self).insert_one(namespace, document).await
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        (*self)
            .find_one_and_update(namespace, filter, update)
            .await
    }

    async fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: BsonDocument,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        (*self).find_one_and_delete(namespace, filter).await
    }

    async fn find(
        &self,
        namespace: &Namespace,
        filter: BsonDocument,
    ) -> DocumentStoreResult<DocumentStream> {
        (*self).find(namespace, filter).await
    }
}

/// Factory for backend instances, typically performing connection setup.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
