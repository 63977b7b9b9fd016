use async_trait::async_trait;
use bson::{Document, doc};
use futures::{StreamExt, TryStreamExt};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, ReturnDocument},
};
use tracing::{info, warn};

use docfacade_core::{
    backend::{DocumentStream, Namespace, StoreBackend, StoreBackendBuilder},
    config::ConnectConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
};

fn store_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Store(err.to_string())
}

fn connection_error(err: impl ToString) -> DocumentStoreError {
    DocumentStoreError::Connection(err.to_string())
}

/// A connected MongoDB client session.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    /// Wraps an already constructed client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Creates a builder for a connection to `address`.
    pub fn builder(address: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(address)
    }

    /// Connects to the server at `address` (a bare host or service name) using
    /// the fixed scheme, port and 30 second connection bound.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Connection`] if the client cannot be
    /// constructed or the server does not answer in time. No retry is attempted.
    pub async fn connect(address: &str) -> DocumentStoreResult<Self> {
        Self::builder(address).build().await
    }

    /// Returns the underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, namespace: &Namespace) -> MongoCollection<Document> {
        self.client
            .database(&namespace.database)
            .collection(&namespace.collection)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_one(&self, namespace: &Namespace, document: Document) -> DocumentStoreResult<DocumentId> {
        let result = self
            .get_collection(namespace)
            .insert_one(document)
            .await
            .map_err(store_error)?;

        result
            .inserted_id
            .as_object_id()
            .map(DocumentId::from)
            .ok_or_else(|| {
                DocumentStoreError::Store(format!(
                    "store assigned a non-object-id identifier: {}",
                    result.inserted_id
                ))
            })
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(namespace)
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_error)
    }

    async fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: Document,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(namespace)
            .find_one_and_delete(filter)
            .await
            .map_err(store_error)
    }

    async fn find(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<DocumentStream> {
        Ok(self
            .get_collection(namespace)
            .find(filter)
            .await
            .map_err(store_error)?
            .map_err(store_error)
            .boxed())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

/// Builder for [`MongoDbStore`] connections.
pub struct MongoDbStoreBuilder {
    address: String,
    config: ConnectConfig,
}

impl MongoDbStoreBuilder {
    /// Starts a builder for `address` with the default [`ConnectConfig`].
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            config: ConnectConfig::default(),
        }
    }

    /// Overrides the scheme, port, timeout or application name.
    pub fn config(mut self, config: ConnectConfig) -> Self {
        self.config = config;
        self
    }

    /// The connection string the builder will use.
    pub fn uri(&self) -> String {
        self.config.uri_for(&self.address)
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let uri = self.uri();
        let connect_timeout = self.config.connect_timeout;

        let mut options = ClientOptions::parse(&uri).await.map_err(connection_error)?;
        options.connect_timeout = Some(connect_timeout);
        options.server_selection_timeout = Some(connect_timeout);
        if let Some(app_name) = self.config.app_name {
            options.app_name = Some(app_name);
        }
        let client = Client::with_options(options).map_err(connection_error)?;

        // the driver connects lazily; a ping forces the session up front
        match tokio::time::timeout(
            connect_timeout,
            client.database("admin").run_command(doc! { "ping": 1 }),
        )
        .await
        {
            Ok(Ok(_)) => {
                info!(%uri, "connected");
                Ok(MongoDbStore::from_client(client))
            }
            Ok(Err(e)) => {
                warn!(%uri, error = %e, "connection rejected");
                Err(connection_error(e))
            }
            Err(_) => {
                warn!(%uri, ?connect_timeout, "connection timed out");
                Err(DocumentStoreError::Connection(format!(
                    "no answer from {uri} within {connect_timeout:?}"
                )))
            }
        }
    }
}
