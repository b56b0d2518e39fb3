//! Named FIFO work queues over Redis.
//!
//! Producers [`enqueue`](queue::Dispatcher::enqueue) jobs by class name; workers
//! [`reserve`](queue::Dispatcher::reserve) them back in order. Delivery is
//! at-least-once: a reserved job has left the queue whether or not it runs.

pub mod backend;
pub mod config;
pub mod error;
pub mod queue;
pub mod services;
pub mod utils;

pub use backend::{Backend, BackendFactory, InMemoryBackend, InMemoryBackendFactory, Topology};
pub use config::{BackendConfig, BackendTarget, TransportMode};
pub use error::{AppError, AppResult, ErrorCode};
pub use queue::{Dispatcher, Job, JobDescriptor, QueueStore};
pub use services::{ConnectionManager, Event, EventService, EventSink};
