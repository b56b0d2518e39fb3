use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::ConnectionManager;

/// Set holding the name of every queue ever pushed to.
pub const REGISTRY_KEY: &str = "queues";

const QUEUE_KEY_PREFIX: &str = "queue:";

/// Key of the list backing `queue`.
pub fn queue_key(queue: &str) -> String {
    format!("{}{}", QUEUE_KEY_PREFIX, queue)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queue: String,
    pub size: usize,
}

/// FIFO queues plus the registry of their names.
///
/// Queues spring into existence on first push and stay registered after they drain.
#[derive(Clone)]
pub struct QueueStore {
    connections: Arc<ConnectionManager>,
}

impl QueueStore {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// Serialize `item` as JSON and append it to `queue`.
    pub async fn push<T: Serialize>(&self, queue: &str, item: &T) -> AppResult<()> {
        let encoded = serde_json::to_string(item)
            .map_err(|e| AppError::SerializationError(format!("Failed to serialize item: {}", e)))?;
        self.push_encoded(queue, &encoded).await
    }

    /// Append an already-encoded item to the tail of `queue`, registering the queue.
    pub async fn push_encoded(&self, queue: &str, encoded: &str) -> AppResult<()> {
        let conn = self.connections.active_connection().await?;

        conn.sadd(REGISTRY_KEY, queue).await?;
        conn.rpush(&queue_key(queue), encoded).await?;

        tracing::debug!("Pushed item onto queue '{}'", queue);
        Ok(())
    }

    /// Remove the head of `queue` and decode it. `Ok(None)` when the queue is empty.
    ///
    /// A decode failure is returned as an error; the item has already left the queue.
    pub async fn pop<T: DeserializeOwned>(&self, queue: &str) -> AppResult<Option<T>> {
        let Some(raw) = self.pop_encoded(queue).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(item) => Ok(Some(item)),
            Err(e) => {
                tracing::error!("Dropped undecodable item from queue '{}': {}", queue, e);
                Err(AppError::SerializationError(format!(
                    "Failed to deserialize item from queue '{}': {}",
                    queue, e
                )))
            }
        }
    }

    /// Remove and return the raw head of `queue`.
    pub async fn pop_encoded(&self, queue: &str) -> AppResult<Option<String>> {
        let conn = self.connections.active_connection().await?;
        let item = conn.lpop(&queue_key(queue)).await?;

        if item.is_some() {
            tracing::debug!("Popped item from queue '{}'", queue);
        }
        Ok(item)
    }

    /// Number of pending items in `queue`; 0 if it was never created.
    pub async fn size(&self, queue: &str) -> AppResult<usize> {
        let conn = self.connections.active_connection().await?;
        conn.llen(&queue_key(queue)).await
    }

    /// Every registered queue name, sorted.
    pub async fn queues(&self) -> AppResult<Vec<String>> {
        let conn = self.connections.active_connection().await?;
        let mut queues = conn.smembers(REGISTRY_KEY).await?;
        queues.sort();
        Ok(queues)
    }

    /// Size of every registered queue. Not a consistent snapshot.
    pub async fn stats(&self) -> AppResult<Vec<QueueStats>> {
        let mut stats = Vec::new();
        for queue in self.queues().await? {
            let size = self.size(&queue).await?;
            stats.push(QueueStats { queue, size });
        }
        Ok(stats)
    }
}
