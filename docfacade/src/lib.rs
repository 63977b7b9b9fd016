//! A timeout-bounded CRUD facade over a document database.
//!
//! This crate is the primary entry point of the docfacade project. It re-exports
//! the core types and the available storage backends.
//!
//! Every operation opens a fresh call scope (30 seconds unless configured
//! otherwise), encodes its inputs, issues exactly one store call, and decodes the
//! answer into generic [`Document`](document::Document)s. The facade keeps no
//! state of its own and never retries.
//!
//! # Quick Start
//!
//! ```ignore
//! use docfacade::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let items = store.database("test").collection("items");
//!
//!     // Add returns the store-assigned identifier
//!     let id = items.add(&Document::new().with("item", "a")).await?;
//!
//!     // Update by identifier returns the post-update document
//!     let set = Document::new().with("$set", Document::new().with("item", "b"));
//!     if let Outcome::Matched(doc) = items.update_by_id(&id.to_hex(), &set).await? {
//!         println!("updated: {doc:?}");
//!     }
//!
//!     // Remove by identifier returns the pre-deletion document
//!     items.remove_by_id(&id.to_hex()).await?;
//!
//!     assert!(items.get_all().await?.is_empty());
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process storage for development and testing
//! - [`mongodb`] - MongoDB over the official driver (requires `mongodb` feature)

pub mod prelude;

pub use docfacade_core::{
    backend, collection, config, cursor, document, encoding, error, id, outcome, scope, store,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docfacade_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docfacade_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}

/// Connects to the MongoDB server at `address` (a bare host or service name)
/// and wraps the session in a [`DocumentStore`](store::DocumentStore) with default settings.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Connection`](error::DocumentStoreError::Connection)
/// if the client cannot be constructed or the server does not answer within 30 seconds.
#[cfg(feature = "mongodb")]
pub async fn connect(
    address: &str,
) -> error::DocumentStoreResult<store::DocumentStore<mongodb::MongoDbStore>> {
    Ok(store::DocumentStore::new(
        mongodb::MongoDbStore::connect(address).await?,
    ))
}
