//! Client configuration.
use std::{num::NonZeroUsize, thread, time::Duration};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings used to build a [`Client`](crate::client::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `host:port`, an absolute UNIX socket path, or `unix:<path>`.
    pub address: String,
    /// User to start sessions as.
    pub user: String,
    /// Number of pooled sessions, fixed for the lifetime of the client.
    pub pool_size: usize,
    /// Upper bound for a blocking read; `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Upper bound for a blocking write; `None` waits forever.
    pub write_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(address: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user: user.into(),
            pool_size: default_pool_size(),
            read_timeout: Some(DEFAULT_TIMEOUT),
            write_timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}

/// Twice the available parallelism.
pub fn default_pool_size() -> usize {
    2 * thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
