use std::sync::Arc;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::aio::MultiplexedConnection;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::FromRedisValue;
use tokio::sync::OnceCell;

use super::{Backend, BackendFactory, Topology};
use crate::config::{BackendConfig, TransportMode};
use crate::error::{AppError, AppResult};
use crate::utils::parse_endpoint;

enum Transport {
    Pooled(Pool),
    Direct {
        client: redis::Client,
        connection: OnceCell<MultiplexedConnection>,
    },
}

/// LPOP has already removed the item, so bad bytes mean it is lost.
fn utf8_item(key: &str, raw: Option<Vec<u8>>) -> AppResult<Option<String>> {
    raw.map(|bytes| {
        String::from_utf8(bytes).map_err(|e| {
            tracing::error!("Dropped non-UTF-8 item popped from '{}': {}", key, e);
            AppError::SerializationError(format!("Item popped from '{}' is not valid UTF-8: {}", key, e))
        })
    })
    .transpose()
}

/// Single-endpoint Redis client
pub struct RedisBackend {
    host: String,
    port: u16,
    transport: Transport,
}

impl RedisBackend {
    /// Build a client for `host:port`. No connection is opened until the first command.
    ///
    /// Failed connects are not retried here; recovery goes through a backend reset.
    pub fn new(host: &str, port: u16, config: &BackendConfig) -> AppResult<Self> {
        config.validate()?;
        let redis_url = format!("redis://{}:{}/{}", host, port, config.database);

        let transport = match config.mode {
            TransportMode::Pooled => {
                let cfg = Config {
                    url: Some(redis_url),
                    connection: None,
                    pool: Some(deadpool_redis::PoolConfig {
                        max_size: config.pool_size,
                        ..Default::default()
                    }),
                    ..Default::default()
                };

                let pool = cfg
                    .create_pool(Some(Runtime::Tokio1))
                    .map_err(|e| AppError::RedisError(format!("Failed to create Redis pool: {}", e)))?;
                Transport::Pooled(pool)
            }
            TransportMode::Direct => {
                let client = redis::Client::open(redis_url)?;
                Transport::Direct {
                    client,
                    connection: OnceCell::new(),
                }
            }
        };

        Ok(Self {
            host: host.to_string(),
            port,
            transport,
        })
    }

    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> AppResult<T> {
        match &self.transport {
            Transport::Pooled(pool) => {
                let mut conn = pool.get().await?;
                let value: T = cmd.query_async(&mut conn).await?;
                Ok(value)
            }
            Transport::Direct { client, connection } => {
                let mut conn = connection
                    .get_or_try_init(|| client.get_multiplexed_async_connection())
                    .await?
                    .clone();
                let value: T = cmd.query_async(&mut conn).await?;
                Ok(value)
            }
        }
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn sadd(&self, key: &str, member: &str) -> AppResult<()> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key).arg(member);
        self.query(&cmd).await
    }

    async fn smembers(&self, key: &str) -> AppResult<Vec<String>> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn rpush(&self, key: &str, value: &str) -> AppResult<()> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key).arg(value);
        self.query(&cmd).await
    }

    async fn lpop(&self, key: &str) -> AppResult<Option<String>> {
        let mut cmd = redis::cmd("LPOP");
        cmd.arg(key);
        utf8_item(key, self.query(&cmd).await?)
    }

    async fn llen(&self, key: &str) -> AppResult<usize> {
        let mut cmd = redis::cmd("LLEN");
        cmd.arg(key);
        self.query(&cmd).await
    }

    fn topology(&self) -> Topology {
        Topology::Single {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Cluster-aware Redis client seeded with every configured endpoint
pub struct RedisClusterBackend {
    endpoints: Vec<String>,
    client: ClusterClient,
    connection: OnceCell<ClusterConnection>,
}

impl RedisClusterBackend {
    pub fn new(endpoints: &[String], config: &BackendConfig) -> AppResult<Self> {
        if endpoints.is_empty() {
            return Err(AppError::ConfigError("Cluster needs at least one endpoint".to_string()));
        }

        let mut nodes = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let (host, port) = parse_endpoint(endpoint)?;
            nodes.push(format!("redis://{}:{}", host, port));
        }

        // Redis Cluster only serves database 0
        if config.database != 0 {
            tracing::warn!(
                "Ignoring database {} for cluster backend; Redis Cluster only supports database 0",
                config.database
            );
        }

        let client = ClusterClient::builder(nodes).retries(0).build()?;

        Ok(Self {
            endpoints: endpoints.to_vec(),
            client,
            connection: OnceCell::new(),
        })
    }

    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> AppResult<T> {
        let mut conn = self
            .connection
            .get_or_try_init(|| self.client.get_async_connection())
            .await?
            .clone();
        let value: T = cmd.query_async(&mut conn).await?;
        Ok(value)
    }
}

#[async_trait]
impl Backend for RedisClusterBackend {
    async fn sadd(&self, key: &str, member: &str) -> AppResult<()> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key).arg(member);
        self.query(&cmd).await
    }

    async fn smembers(&self, key: &str) -> AppResult<Vec<String>> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn rpush(&self, key: &str, value: &str) -> AppResult<()> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key).arg(value);
        self.query(&cmd).await
    }

    async fn lpop(&self, key: &str) -> AppResult<Option<String>> {
        let mut cmd = redis::cmd("LPOP");
        cmd.arg(key);
        utf8_item(key, self.query(&cmd).await?)
    }

    async fn llen(&self, key: &str) -> AppResult<usize> {
        let mut cmd = redis::cmd("LLEN");
        cmd.arg(key);
        self.query(&cmd).await
    }

    fn topology(&self) -> Topology {
        Topology::Cluster {
            endpoints: self.endpoints.clone(),
        }
    }
}

/// Builds real Redis clients
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisBackendFactory;

impl BackendFactory for RedisBackendFactory {
    fn single(&self, host: &str, port: u16, config: &BackendConfig) -> AppResult<Arc<dyn Backend>> {
        Ok(Arc::new(RedisBackend::new(host, port, config)?))
    }

    fn cluster(&self, endpoints: &[String], config: &BackendConfig) -> AppResult<Arc<dyn Backend>> {
        Ok(Arc::new(RedisClusterBackend::new(endpoints, config)?))
    }
}
