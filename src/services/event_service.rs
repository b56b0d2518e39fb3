use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Events fired by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    AfterEnqueue,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::AfterEnqueue => "afterEnqueue",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can be told a named event happened.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &str, payload: &Value) -> AppResult<()>;
}

type Listener = Arc<dyn Fn(&Value) -> AppResult<()> + Send + Sync>;

/// In-process listener registry.
///
/// Listeners run in registration order; the first error stops the rest.
#[derive(Clone, Default)]
pub struct EventService {
    listeners: Arc<RwLock<HashMap<String, Vec<Listener>>>>,
}

impl EventService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`.
    pub fn listen<F>(&self, event: &str, callback: F)
    where
        F: Fn(&Value) -> AppResult<()> + Send + Sync + 'static,
    {
        match self.listeners.write() {
            Ok(mut listeners) => listeners
                .entry(event.to_string())
                .or_default()
                .push(Arc::new(callback)),
            Err(_) => tracing::error!("Event listener registry poisoned, dropping listener for '{}'", event),
        }
    }

    /// Drop every listener registered for `event`. Returns whether any were registered.
    pub fn stop_listening(&self, event: &str) -> bool {
        self.listeners
            .write()
            .map(|mut listeners| listeners.remove(event).is_some())
            .unwrap_or(false)
    }

    /// Drop all listeners.
    pub fn clear(&self) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.clear();
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .map(|listeners| listeners.get(event).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Run the listeners for `event` with `payload`.
    pub fn trigger(&self, event: &str, payload: &Value) -> AppResult<()> {
        let callbacks = self
            .listeners
            .read()
            .map_err(|_| AppError::EventError("Event listener registry poisoned".to_string()))?
            .get(event)
            .cloned()
            .unwrap_or_default();

        for callback in callbacks {
            callback(payload)?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for EventService {
    async fn publish(&self, event: &str, payload: &Value) -> AppResult<()> {
        self.trigger(event, payload)
    }
}

/// Sink that only writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: &str, payload: &Value) -> AppResult<()> {
        tracing::info!(event = event, payload = %payload, "Event published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::AfterEnqueue.as_str(), "afterEnqueue");
        assert_eq!(Event::AfterEnqueue.to_string(), "afterEnqueue");
    }

    #[tokio::test]
    async fn test_listeners_run_in_order() {
        let events = EventService::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            events.listen("afterEnqueue", move |payload| {
                seen.lock().unwrap().push(format!("{}:{}", tag, payload["class"]));
                Ok(())
            });
        }

        events
            .publish("afterEnqueue", &json!({"class": "Send", "args": null}))
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:\"Send\"".to_string(), "second:\"Send\"".to_string()]
        );
    }

    #[test]
    fn test_listener_error_stops_chain() {
        let events = EventService::new();
        let calls = Arc::new(Mutex::new(0));

        events.listen("afterEnqueue", |_| Err(AppError::EventError("boom".to_string())));
        let counter = calls.clone();
        events.listen("afterEnqueue", move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        let err = events.trigger("afterEnqueue", &json!({})).unwrap_err();
        assert!(matches!(err, AppError::EventError(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_stop_listening_and_clear() {
        let events = EventService::new();
        events.listen("a", |_| Ok(()));
        events.listen("b", |_| Ok(()));
        assert_eq!(events.listener_count("a"), 1);

        assert!(events.stop_listening("a"));
        assert!(!events.stop_listening("a"));
        assert_eq!(events.listener_count("a"), 0);

        events.clear();
        assert_eq!(events.listener_count("b"), 0);
        assert!(events.trigger("b", &json!({})).is_ok());
    }
}
