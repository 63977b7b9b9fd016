//! Lazy, cursor-backed document scans.

use std::time::Duration;

use futures::{Stream, StreamExt, stream};

use crate::{
    backend::DocumentStream,
    document::Document,
    encoding::decode_document,
    error::DocumentStoreResult,
    scope::CallScope,
};

/// A scan over a collection that yields decoded documents one at a time.
///
/// Each advance runs in its own call scope. The cursor is finite and fused: once
/// it is exhausted, fails, or is closed it yields `None` forever and cannot be
/// restarted. Dropping the cursor releases the store-side cursor.
pub struct DocumentCursor {
    stream: Option<DocumentStream>,
    timeout: Duration,
}

impl DocumentCursor {
    pub(crate) fn new(stream: DocumentStream, timeout: Duration) -> Self {
        Self {
            stream: Some(stream),
            timeout,
        }
    }

    /// Fetches the next document.
    ///
    /// Returns `None` once the scan is over. An error ends the scan.
    pub async fn next(&mut self) -> Option<DocumentStoreResult<Document>> {
        let stream = self.stream.as_mut()?;

        let advanced = CallScope::new("scan_next", self.timeout)
            .run(async { Ok(stream.next().await) })
            .await;

        match advanced {
            Ok(Some(Ok(raw))) => match decode_document(raw) {
                Ok(doc) => Some(Ok(doc)),
                Err(e) => {
                    self.close();
                    Some(Err(e))
                }
            },
            Ok(Some(Err(e))) | Err(e) => {
                self.close();
                Some(Err(e))
            }
            Ok(None) => {
                self.close();
                None
            }
        }
    }

    /// Drains the remaining documents into memory.
    ///
    /// On error the documents read so far are discarded.
    pub async fn collect_all(mut self) -> DocumentStoreResult<Vec<Document>> {
        let mut documents = Vec::new();

        while let Some(doc) = self.next().await {
            documents.push(doc?);
        }

        Ok(documents)
    }

    /// Releases the underlying cursor. Later calls to [`next`](Self::next) return `None`.
    pub fn close(&mut self) {
        self.stream = None;
    }

    /// Whether the scan is over, because it was exhausted, failed, or was closed.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Adapts the cursor into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = DocumentStoreResult<Document>> + Send {
        stream::unfold(self, |mut cursor| async move {
            cursor.next().await.map(|item| (item, cursor))
        })
    }
}

impl std::fmt::Debug for DocumentCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCursor")
            .field("closed", &self.is_closed())
            .field("timeout", &self.timeout)
            .finish()
    }
}
