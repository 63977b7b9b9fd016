//! Bounded-duration call scopes.
//!
//! Every facade operation runs its backend call inside a fresh [`CallScope`].
//! Scopes are created and torn down per call and are never shared or nested.
//! When a scope elapses the in-flight future is dropped and
//! [`DocumentStoreError::Timeout`] is returned; nothing is rolled back and the
//! store is not queried for what happened.

use std::{future::Future, time::Duration};

use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A bounded-duration scope for exactly one backend call.
#[derive(Debug, Clone, Copy)]
pub struct CallScope {
    operation: &'static str,
    timeout: Duration,
}

impl CallScope {
    /// Opens a scope for `operation` that elapses after `timeout`.
    pub fn new(operation: &'static str, timeout: Duration) -> Self {
        Self { operation, timeout }
    }

    /// Name of the operation, as reported in logs and timeout errors.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// How long the scope lasts.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `call` to completion or until the scope elapses, whichever is first.
    pub async fn run<T, F>(self, call: F) -> DocumentStoreResult<T>
    where
        F: Future<Output = DocumentStoreResult<T>>,
    {
        let started = Instant::now();

        match timeout(self.timeout, call).await {
            Ok(result) => {
                debug!(
                    operation = self.operation,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ok = result.is_ok(),
                    "call scope closed",
                );
                result
            }
            Err(_) => {
                warn!(
                    operation = self.operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "call scope elapsed, abandoning operation",
                );
                Err(DocumentStoreError::Timeout {
                    operation: self.operation,
                    after: self.timeout,
                })
            }
        }
    }
}
