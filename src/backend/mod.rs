//! Capability seam over the key-value store.
//!
//! The queue layer needs five commands, each atomic on the server side:
//! set-add, set-members, list-append-tail, list-pop-head and list-length.
//! Anything that provides them can back a queue.

mod memory;
mod redis_backend;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::error::AppResult;

pub use memory::{InMemoryBackend, InMemoryBackendFactory};
pub use redis_backend::{RedisBackend, RedisBackendFactory, RedisClusterBackend};

/// Shape of the client behind a [`Backend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    Single { host: String, port: u16 },
    Cluster { endpoints: Vec<String> },
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// SADD
    async fn sadd(&self, key: &str, member: &str) -> AppResult<()>;

    /// SMEMBERS. A missing key yields an empty list.
    async fn smembers(&self, key: &str) -> AppResult<Vec<String>>;

    /// RPUSH
    async fn rpush(&self, key: &str, value: &str) -> AppResult<()>;

    /// LPOP. `None` when the list is empty or missing.
    async fn lpop(&self, key: &str) -> AppResult<Option<String>>;

    /// LLEN
    async fn llen(&self, key: &str) -> AppResult<usize>;

    fn topology(&self) -> Topology;
}

/// Builds backends for the connection manager.
///
/// Implementations must not touch the network; connections open on first command.
pub trait BackendFactory: Send + Sync {
    fn single(&self, host: &str, port: u16, config: &BackendConfig) -> AppResult<Arc<dyn Backend>>;

    fn cluster(&self, endpoints: &[String], config: &BackendConfig) -> AppResult<Arc<dyn Backend>>;
}
