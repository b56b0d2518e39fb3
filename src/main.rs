//! resq CLI entry point.
//!
//! Talks to the backend named by `REDIS_SERVER` / `REDIS_DB` / `REDIS_TRANSPORT`
//! and prints results as JSON on stdout.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use resq::config::{AppConfig, BackendConfig};
use resq::queue::{Dispatcher, JsonJobCodec, QueueStore};
use resq::services::{ConnectionManager, TracingEventSink};
use resq::utils::setup_logging;
use resq::{AppError, AppResult};

/// Enqueue, inspect and reserve jobs in Redis-backed queues.
#[derive(Parser)]
#[command(name = "resq")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a job and append it to a queue.
    Enqueue {
        queue: String,
        class: String,
        /// Job arguments as JSON.
        #[arg(long)]
        args: Option<String>,
        /// Attach a tracking id to the job.
        #[arg(long)]
        track: bool,
    },
    /// Take the next job off a queue.
    Reserve { queue: String },
    /// Append a raw JSON value to a queue.
    Push { queue: String, item: String },
    /// Remove and print the head of a queue.
    Pop { queue: String },
    /// Number of pending items in a queue.
    Size { queue: String },
    /// List every known queue.
    Queues,
    /// Pending items per known queue.
    Stats,
}

fn parse_json(raw: &str) -> AppResult<Value> {
    serde_json::from_str(raw).map_err(|e| AppError::SerializationError(format!("Invalid JSON '{}': {}", raw, e)))
}

/// `{"queue", "item"}` for a popped value, `{"queue", "empty": true}` when there was none.
fn pop_output(queue: &str, item: Option<Value>) -> Value {
    match item {
        Some(item) => json!({ "queue": queue, "item": item }),
        None => json!({ "queue": queue, "empty": true }),
    }
}

async fn run(command: Commands, dispatcher: &Dispatcher) -> AppResult<Value> {
    let store = dispatcher.store();

    let output = match command {
        Commands::Enqueue { queue, class, args, track } => {
            let args = args.as_deref().map(parse_json).transpose()?;
            let job = dispatcher.enqueue(&queue, &class, args, track).await?;
            json!({ "queue": queue, "job": job })
        }
        Commands::Reserve { queue } => match dispatcher.reserve(&queue).await? {
            Some(job) => json!({ "queue": job.queue, "job": job.payload }),
            None => json!({ "queue": queue, "empty": true }),
        },
        Commands::Push { queue, item } => {
            store.push(&queue, &parse_json(&item)?).await?;
            json!({ "queue": queue, "size": store.size(&queue).await? })
        }
        Commands::Pop { queue } => pop_output(&queue, store.pop::<Value>(&queue).await?),
        Commands::Size { queue } => json!(store.size(&queue).await?),
        Commands::Queues => json!(store.queues().await?),
        Commands::Stats => json!(store.stats().await?),
    };

    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    let app_config = AppConfig::from_env()?;
    tracing::debug!("{} starting in {} environment", app_config.app_name, app_config.environment);

    let result: AppResult<Value> = async {
        let backend_config = BackendConfig::from_env()?;
        let connections = Arc::new(ConnectionManager::new(BackendConfig::default()));
        connections.set_backend(backend_config).await?;

        let dispatcher = Dispatcher::new(
            QueueStore::new(connections),
            Arc::new(JsonJobCodec),
            Arc::new(TracingEventSink),
        );
        run(cli.command, &dispatcher).await
    }
    .await;

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("[{}] {}", e.error_code().as_str(), e);
            std::process::exit(1);
        }
    }
}
