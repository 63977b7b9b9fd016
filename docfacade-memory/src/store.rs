//! In-memory storage implementation of the facade's backend.
//!
//! Collections are insertion-ordered vectors of BSON documents behind one
//! async-aware read-write lock, which makes every find-and-modify atomic.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, oid::ObjectId};
use futures::{StreamExt, stream};
use mea::rwlock::RwLock;
use tracing::trace;

use docfacade_core::{
    backend::{DocumentStream, Namespace, StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    id::{DocumentId, ID_FIELD},
};

use crate::{
    evaluator::DocumentEvaluator,
    update::{apply_update, validate_update},
};

type CollectionDocs = Vec<BsonDocument>;
type StoreMap = HashMap<Namespace, CollectionDocs>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so
/// clones share the same underlying data.
///
/// # Performance
///
/// Filters scan the whole collection (no indexing). Intended for tests,
/// development, and small data sets.
///
/// # Example
///
/// ```ignore
/// use docfacade_memory::InMemoryStore;
/// use docfacade::backend::{Namespace, StoreBackend};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let ns = Namespace::new("test", "items");
/// let id = store.insert_one(&ns, doc! { "item": "a" }).await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// namespace -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Number of documents currently held in `namespace`.
    pub async fn count(&self, namespace: &Namespace) -> usize {
        self.store
            .read()
            .await
            .get(namespace)
            .map_or(0, Vec::len)
    }
}

fn position(docs: &[BsonDocument], filter: &BsonDocument) -> DocumentStoreResult<Option<usize>> {
    for (index, doc) in docs.iter().enumerate() {
        if DocumentEvaluator::new(doc).matches(filter)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, namespace: &Namespace, document: BsonDocument) -> DocumentStoreResult<DocumentId> {
        let oid = match document.get(ID_FIELD) {
            None => ObjectId::new(),
            Some(Bson::ObjectId(oid)) => *oid,
            Some(other) => {
                return Err(DocumentStoreError::Store(format!(
                    "identifiers of type {:?} are not supported",
                    other.element_type()
                )));
            }
        };

        let mut store = self.store.write().await;
        let docs = store.entry(namespace.clone()).or_default();

        if docs.iter().any(|doc| doc.get(ID_FIELD) == Some(&Bson::ObjectId(oid))) {
            return Err(DocumentStoreError::Store(format!(
                "duplicate key error collection: {namespace} index: {ID_FIELD}_ dup key: {oid}"
            )));
        }

        // the store keeps the identifier as the first field
        let mut stored = BsonDocument::new();
        stored.insert(ID_FIELD, oid);
        for (field, value) in document {
            if field != ID_FIELD {
                stored.insert(field, value);
            }
        }
        docs.push(stored);

        trace!(%namespace, id = %oid, "inserted document");

        Ok(DocumentId::from(oid))
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        validate_update(&update)?;

        let mut store = self.store.write().await;
        let Some(docs) = store.get_mut(namespace) else {
            return Ok(None);
        };
        let Some(index) = position(docs, &filter)? else {
            return Ok(None);
        };

        let updated = apply_update(&docs[index], &update)?;
        docs[index] = updated.clone();

        Ok(Some(updated))
    }

    async fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: BsonDocument,
    ) -> DocumentStoreResult<Option<BsonDocument>> {
        let mut store = self.store.write().await;
        let Some(docs) = store.get_mut(namespace) else {
            return Ok(None);
        };
        let Some(index) = position(docs, &filter)? else {
            return Ok(None);
        };

        Ok(Some(docs.remove(index)))
    }

    async fn find(&self, namespace: &Namespace, filter: BsonDocument) -> DocumentStoreResult<DocumentStream> {
        let store = self.store.read().await;
        let matching = match store.get(namespace) {
            Some(docs) => docs
                .iter()
                .filter_map(|doc| match DocumentEvaluator::new(doc).matches(&filter) {
                    Ok(true) => Some(Ok(doc.clone())),
                    Ok(false) => None,
                    Err(e) => Some(Err(e)),
                })
                .collect::<DocumentStoreResult<Vec<_>>>()?,
            None => vec![],
        };

        Ok(stream::iter(matching.into_iter().map(Ok)).boxed())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance. Always succeeds.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
