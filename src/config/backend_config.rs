use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Endpoint used when the caller brings no configuration of its own.
pub const DEFAULT_SERVER: &str = "localhost:6379";

const DEFAULT_POOL_SIZE: usize = 10;

/// Where the key-value store lives: one endpoint, or a cluster seeded with several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    Single(String),
    Cluster(Vec<String>),
}

impl BackendTarget {
    /// Parse a server setting. A comma-separated list selects cluster mode.
    pub fn parse(raw: &str) -> Self {
        let endpoints: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        match endpoints.len() {
            0 => BackendTarget::Single(raw.trim().to_string()),
            1 => BackendTarget::Single(endpoints.into_iter().next().unwrap_or_default()),
            _ => BackendTarget::Cluster(endpoints),
        }
    }
}

impl From<&str> for BackendTarget {
    fn from(server: &str) -> Self {
        BackendTarget::Single(server.to_string())
    }
}

impl From<Vec<String>> for BackendTarget {
    fn from(endpoints: Vec<String>) -> Self {
        BackendTarget::Cluster(endpoints)
    }
}

impl From<Vec<&str>> for BackendTarget {
    fn from(endpoints: Vec<&str>) -> Self {
        BackendTarget::Cluster(endpoints.into_iter().map(str::to_string).collect())
    }
}

/// How commands reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Connection pool (deadpool-redis). Preferred.
    #[default]
    Pooled,
    /// A single multiplexed connection. It is only replaced by a backend reset.
    Direct,
}

impl FromStr for TransportMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pooled" | "pool" => Ok(TransportMode::Pooled),
            "direct" => Ok(TransportMode::Direct),
            other => Err(AppError::ConfigError(format!("Unknown transport mode: {}", other))),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Pooled => write!(f, "pooled"),
            TransportMode::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub server: BackendTarget,
    pub database: i64,
    pub mode: TransportMode,
    pub pool_size: usize,
}

impl BackendConfig {
    pub fn new(server: impl Into<BackendTarget>, database: i64, mode: TransportMode) -> Self {
        Self {
            server: server.into(),
            database,
            mode,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Reject values no backend can be built from.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database < 0 {
            return Err(AppError::ConfigError(format!("Database must be >= 0, got {}", self.database)));
        }
        if self.pool_size < 1 {
            return Err(AppError::ConfigError("Pool size must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        Self::from_config(&cfg)
    }

    /// Read `REDIS_*` settings out of an already-built config source.
    pub fn from_config(cfg: &config::Config) -> Result<Self, AppError> {
        let server = cfg.get_string("REDIS_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let database = cfg.get_int("REDIS_DB").unwrap_or(0);
        if database < 0 {
            return Err(AppError::ConfigError(format!("REDIS_DB must be >= 0, got {}", database)));
        }

        let pool_size = cfg.get_int("REDIS_POOL_SIZE").unwrap_or(DEFAULT_POOL_SIZE as i64);
        if pool_size < 1 {
            return Err(AppError::ConfigError(format!("REDIS_POOL_SIZE must be >= 1, got {}", pool_size)));
        }

        let mode = match cfg.get_string("REDIS_TRANSPORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => TransportMode::default(),
        };

        Ok(Self {
            server: BackendTarget::parse(&server),
            database,
            mode,
            pool_size: usize::try_from(pool_size)
                .map_err(|_| AppError::ConfigError(format!("REDIS_POOL_SIZE out of range: {}", pool_size)))?,
        })
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER, 0, TransportMode::Pooled)
    }
}
