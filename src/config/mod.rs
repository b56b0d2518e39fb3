pub mod app_config;
pub mod backend_config;

pub use app_config::AppConfig;
pub use backend_config::{BackendConfig, BackendTarget, TransportMode, DEFAULT_SERVER};
