use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Setup logging with file and console output
///
/// `level` wins over `LOG_LEVEL` when given; `RUST_LOG` wins over both.
pub fn setup_logging(level: Option<&str>) {
    dotenv::dotenv().ok();

    let log_level = level
        .map(str::to_string)
        .or_else(|| std::env::var("LOG_LEVEL").ok())
        .unwrap_or_else(|| "info".to_string());
    let log_file = std::env::var("LOG_FILE").unwrap_or_else(|_| "logs/resq.log".to_string());
    let log_path = std::path::Path::new(&log_file);

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        log_path.parent().unwrap_or(std::path::Path::new("logs")),
        log_path.file_name().unwrap_or(std::ffi::OsStr::new("resq.log")),
    );

    // Console goes to stderr so stdout stays machine-readable
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!("Logging initialized with level: {}", log_level);
}
