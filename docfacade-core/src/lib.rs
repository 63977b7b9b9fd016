//! A timeout-bounded CRUD facade over a document database.
//!
//! This crate is the core of the docfacade project and provides:
//!
//! - **Document model** ([`document`]) - A closed value type and the generic document map
//! - **Identifiers** ([`id`]) - Strictly parsed, store-assigned document identifiers
//! - **Encoding** ([`encoding`]) - Conversion between documents and BSON
//! - **Store backend abstraction** ([`backend`]) - The capability set a database client must offer
//! - **Collections interface** ([`collection`]) - The facade operations on one collection
//! - **Document store** ([`store`]) - Owner of a connected backend and its settings
//! - **Call scopes** ([`scope`]) - Per-call timeouts
//! - **Cursors** ([`cursor`]) - Lazy collection scans
//! - **Outcomes** ([`outcome`]) - Matched / not-found results of single-document mutations
//! - **Configuration** ([`config`]) - Timeouts and connection settings
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docfacade::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let items = store.collection("test", "items");
//!
//! let id = items.add(&Document::new().with("item", "a")).await?;
//! let removed = items.remove_by_id(&id.to_hex()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docfacade_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod cursor;
pub mod document;
pub mod encoding;
pub mod error;
pub mod id;
pub mod outcome;
pub mod scope;
pub mod store;
