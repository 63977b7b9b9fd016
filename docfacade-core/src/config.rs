//! Configuration for document stores and connections.
//!
//! Nothing here is read from the environment or from files. Hosts that want to
//! load these from their own configuration can deserialize them with serde.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bound applied to every facade call unless overridden.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound applied to connection establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Scheme prepended to bare addresses.
pub const DEFAULT_SCHEME: &str = "mongodb";

/// Port appended to bare addresses.
pub const DEFAULT_PORT: u16 = 27017;

/// Store-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Timeout of each call scope. Individual collection handles may override it.
    pub call_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Returns this configuration with a different per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// How a bare address is turned into a client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// URI scheme, `mongodb` unless overridden.
    pub scheme: String,
    /// Port appended to the address.
    pub port: u16,
    /// How long connection establishment may take.
    pub connect_timeout: Duration,
    /// Application name reported to the server.
    pub app_name: Option<String>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            app_name: None,
        }
    }
}

impl ConnectConfig {
    /// Builds the connection URI for a bare host or service name.
    pub fn uri_for(&self, address: &str) -> String {
        format!("{}://{}:{}", self.scheme, address, self.port)
    }
}
