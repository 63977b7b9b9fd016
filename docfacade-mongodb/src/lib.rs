//! MongoDB backend implementation for docfacade.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait
//! on top of the official async driver. The driver owns connection pooling, the
//! wire protocol, and server selection; this crate only adapts its single-document
//! insert, find-and-modify, and find calls to the facade.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docfacade = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! [`MongoDbStore::connect`] takes a bare host or service name, turns it into
//! `mongodb://<address>:27017` and waits up to 30 seconds for the server to answer.
//!
//! # Example
//!
//! ```ignore
//! use docfacade::{prelude::*, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(MongoDbStore::connect("localhost").await?);
//!     let items = store.collection("test", "items");
//!
//!     let id = items.add(&Document::new().with("item", "a")).await?;
//!     println!("added {id}");
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docfacade_mongodb;

pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
