//! Main document store interface.
//!
//! A [`DocumentStore`] owns a connected backend (one client session) together
//! with the store-wide [`StoreConfig`]. Collection handles borrow from it, so the
//! session outlives every handle and the caller decides when to shut it down.
//!
//! # Example
//!
//! ```ignore
//! use docfacade::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let items = store.database("test").collection("items");
//! ```

use std::time::Duration;

use crate::{
    backend::{Namespace, StoreBackend},
    collection::Collection,
    config::StoreConfig,
    error::DocumentStoreResult,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    config: StoreConfig,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend and default settings.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    /// Creates a store over `backend` with explicit settings.
    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        Self { backend, config }
    }

    /// The settings handles of this store inherit.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns a reference to the underlying storage backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a handle to the named database.
    pub fn database<'a>(&'a self, name: &str) -> Database<'a, B> {
        Database {
            name: name.to_string(),
            backend: &self.backend,
            timeout: self.config.call_timeout,
        }
    }

    /// Shorthand for `store.database(database).collection(collection)`.
    pub fn collection<'a>(&'a self, database: &str, collection: &str) -> Collection<'a, B> {
        self.database(database).collection(collection)
    }

    /// Shuts down the underlying backend.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

/// A handle to one database of a store.
#[derive(Debug)]
pub struct Database<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
    timeout: Duration,
}

impl<'a, B: StoreBackend> Database<'a, B> {
    /// The database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets a handle to the named collection.
    pub fn collection(&self, name: &str) -> Collection<'a, B> {
        Collection::new(
            Namespace::new(self.name.clone(), name),
            self.backend,
            self.timeout,
        )
    }
}
