//! In-memory document storage backend for docfacade.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreBackend` trait. It mirrors the store semantics the facade depends on
//! (store-assigned identifiers, atomic find-and-modify, filter and update
//! operators) closely enough for development and tests without a database server.
//!
//! # Quick Start
//!
//! ```ignore
//! use docfacade::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());
//!     let items = store.collection("test", "items");
//!
//!     let id = items.add(&Document::new().with("item", "a")).await.unwrap();
//!     println!("added {id}");
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docfacade_memory;

pub mod evaluator;
pub mod store;
pub mod update;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
