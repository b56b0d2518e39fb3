use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Backend, BackendFactory, Topology};
use crate::config::BackendConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
struct Store {
    sets: HashMap<String, BTreeSet<String>>,
    lists: HashMap<String, VecDeque<String>>,
}

/// Process-local stand-in for Redis.
///
/// Every command holds the store lock for its whole duration, which gives the
/// same per-command atomicity the real server does. Clones share one store.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    store: Arc<Mutex<Store>>,
    topology: Topology,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_topology(Topology::Single {
            host: "memory".to_string(),
            port: 0,
        })
    }

    fn with_topology(topology: Topology) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            topology,
        }
    }

    fn sharing(&self, topology: Topology) -> Self {
        Self {
            store: self.store.clone(),
            topology,
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| AppError::RedisError("In-memory store lock poisoned".to_string()))
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn sadd(&self, key: &str, member: &str) -> AppResult<()> {
        let mut store = self.lock()?;
        store.sets.entry(key.to_string()).or_default().insert(member.to_string());
        Ok(())
    }

    async fn smembers(&self, key: &str) -> AppResult<Vec<String>> {
        let store = self.lock()?;
        Ok(store
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn rpush(&self, key: &str, value: &str) -> AppResult<()> {
        let mut store = self.lock()?;
        store.lists.entry(key.to_string()).or_default().push_back(value.to_string());
        Ok(())
    }

    async fn lpop(&self, key: &str) -> AppResult<Option<String>> {
        let mut store = self.lock()?;
        let Some(list) = store.lists.get_mut(key) else {
            return Ok(None);
        };

        let item = list.pop_front();
        // Redis drops a list once its last element is gone
        if list.is_empty() {
            store.lists.remove(key);
        }
        Ok(item)
    }

    async fn llen(&self, key: &str) -> AppResult<usize> {
        let store = self.lock()?;
        Ok(store.lists.get(key).map_or(0, VecDeque::len))
    }

    fn topology(&self) -> Topology {
        self.topology.clone()
    }
}

/// Hands out backends over one shared in-memory store and remembers what was asked for.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackendFactory {
    backend: InMemoryBackend,
    requested: Arc<Mutex<Vec<Topology>>>,
}

impl InMemoryBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backend every built connection shares its data with.
    pub fn backend(&self) -> InMemoryBackend {
        self.backend.clone()
    }

    /// Topologies requested so far, oldest first.
    pub fn requested(&self) -> Vec<Topology> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn build(&self, topology: Topology) -> AppResult<Arc<dyn Backend>> {
        self.requested
            .lock()
            .map_err(|_| AppError::RedisError("In-memory factory lock poisoned".to_string()))?
            .push(topology.clone());
        Ok(Arc::new(self.backend.sharing(topology)))
    }
}

impl BackendFactory for InMemoryBackendFactory {
    fn single(&self, host: &str, port: u16, _config: &BackendConfig) -> AppResult<Arc<dyn Backend>> {
        self.build(Topology::Single {
            host: host.to_string(),
            port,
        })
    }

    fn cluster(&self, endpoints: &[String], _config: &BackendConfig) -> AppResult<Arc<dyn Backend>> {
        self.build(Topology::Cluster {
            endpoints: endpoints.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_is_fifo() {
        let backend = InMemoryBackend::new();
        backend.rpush("l", "a").await.unwrap();
        backend.rpush("l", "b").await.unwrap();

        assert_eq!(backend.llen("l").await.unwrap(), 2);
        assert_eq!(backend.lpop("l").await.unwrap().as_deref(), Some("a"));
        assert_eq!(backend.lpop("l").await.unwrap().as_deref(), Some("b"));
        assert_eq!(backend.lpop("l").await.unwrap(), None);
        assert_eq!(backend.llen("l").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_is_unique() {
        let backend = InMemoryBackend::new();
        assert!(backend.smembers("s").await.unwrap().is_empty());

        backend.sadd("s", "x").await.unwrap();
        backend.sadd("s", "x").await.unwrap();
        backend.sadd("s", "y").await.unwrap();

        assert_eq!(backend.smembers("s").await.unwrap(), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_factory_shares_store_and_records_topology() {
        let factory = InMemoryBackendFactory::new();
        let config = BackendConfig::default();

        let a = factory.single("h", 1, &config).unwrap();
        let b = factory.cluster(&["h1:1".to_string()], &config).unwrap();
        a.rpush("l", "v").await.unwrap();

        assert_eq!(b.llen("l").await.unwrap(), 1);
        assert_eq!(factory.requested().len(), 2);
        assert_eq!(
            b.topology(),
            Topology::Cluster {
                endpoints: vec!["h1:1".to_string()]
            }
        );
    }
}
