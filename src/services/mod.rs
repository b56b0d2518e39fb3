pub mod connection_manager;
pub mod event_service;

pub use connection_manager::ConnectionManager;
pub use event_service::{Event, EventService, EventSink, TracingEventSink};
