//! Convenient re-exports of commonly used types from docfacade.
//!
//! ```ignore
//! use docfacade::prelude::*;
//! ```

pub use docfacade_core::{
    backend::{Namespace, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::{ConnectConfig, StoreConfig},
    cursor::DocumentCursor,
    document::{Document, Value},
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    outcome::Outcome,
    store::{Database, DocumentStore},
};
