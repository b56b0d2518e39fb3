pub mod endpoint;
pub mod logging;

pub use endpoint::parse_endpoint;
pub use logging::setup_logging;
