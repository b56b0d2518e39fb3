//! End-to-end tests of the public API on the in-memory backend.
//!
//! The live Redis test is ignored by default.
//! Run with: REDIS_SERVER=localhost:6379 cargo test --test queue_test -- --ignored

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use resq::backend::{Backend, InMemoryBackendFactory, Topology};
use resq::config::{BackendConfig, BackendTarget, TransportMode};
use resq::queue::{Dispatcher, JsonJobCodec, QueueStore};
use resq::services::{ConnectionManager, EventService};
use resq::AppError;

fn in_memory_store() -> QueueStore {
    let factory = InMemoryBackendFactory::new();
    let connections = ConnectionManager::with_factory(BackendConfig::default(), Arc::new(factory));
    QueueStore::new(Arc::new(connections))
}

#[tokio::test]
async fn test_push_then_pop_email_job() {
    let store = in_memory_store();
    let item = json!({"class": "Send", "args": {"to": "a@b.com"}});

    store.push("emails", &item).await.unwrap();
    let popped: Option<Value> = store.pop("emails").await.unwrap();

    assert_eq!(popped, Some(item));
    assert_eq!(store.size("emails").await.unwrap(), 0);
    assert_eq!(store.queues().await.unwrap(), vec!["emails"]);
}

#[tokio::test]
async fn test_queues_are_independent() {
    let store = in_memory_store();
    store.push("a", &1).await.unwrap();
    store.push("b", &2).await.unwrap();
    store.push("a", &3).await.unwrap();

    assert_eq!(store.pop::<i32>("b").await.unwrap(), Some(2));
    assert_eq!(store.pop::<i32>("a").await.unwrap(), Some(1));
    assert_eq!(store.pop::<i32>("a").await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_concurrent_consumers_never_share_an_item() {
    let store = in_memory_store();
    for n in 0..200 {
        store.push("work", &n).await.unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut taken = Vec::new();
            while let Some(n) = store.pop::<i32>("work").await.unwrap() {
                taken.push(n);
            }
            taken
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    let unique: HashSet<i32> = all.iter().copied().collect();
    assert_eq!(all.len(), 200);
    assert_eq!(unique.len(), 200);
}

#[tokio::test]
async fn test_enqueue_and_reserve_through_dispatcher() {
    let events = EventService::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    events.listen("afterEnqueue", move |payload| {
        sink.lock().unwrap().push(payload.clone());
        Ok(())
    });

    let dispatcher = Dispatcher::new(in_memory_store(), Arc::new(JsonJobCodec), Arc::new(events));

    let created = dispatcher
        .enqueue("reports", "BuildReport", Some(json!({"month": 3})), true)
        .await
        .unwrap();
    assert!(created.id.is_some());

    let job = dispatcher.reserve("reports").await.unwrap().unwrap();
    assert_eq!(job.class(), "BuildReport");
    assert_eq!(job.args(), Some(&json!({"month": 3})));
    assert_eq!(job.id(), created.id.as_deref());

    assert!(dispatcher.reserve("reports").await.unwrap().is_none());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!({"class": "BuildReport", "args": {"month": 3}})]
    );
}

#[tokio::test]
async fn test_backend_selection_and_recovery() {
    let factory = InMemoryBackendFactory::new();
    let connections = Arc::new(ConnectionManager::with_factory(
        BackendConfig::default(),
        Arc::new(factory.clone()),
    ));
    let store = QueueStore::new(connections.clone());

    let cluster = BackendConfig::new(vec!["h1:7000", "h2:7001"], 0, TransportMode::Pooled);
    connections.set_backend(cluster).await.unwrap();
    store.push("q", &"x").await.unwrap();

    // Simulate recovering from a broken connection
    let rebuilt = connections.reset_backend().await.unwrap().unwrap();
    assert_eq!(
        rebuilt.topology(),
        Topology::Cluster {
            endpoints: vec!["h1:7000".to_string(), "h2:7001".to_string()]
        }
    );
    assert_eq!(store.size("q").await.unwrap(), 1);

    let err = connections
        .set_backend(BackendConfig::new("not-valid", 0, TransportMode::Pooled))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AppError::ConfigError(_)));
    // The previous configuration is still in effect
    assert!(matches!(
        connections.config().await.unwrap().server,
        BackendTarget::Cluster(_)
    ));
}

#[tokio::test]
#[ignore] // Needs a running Redis; see module docs
async fn test_live_redis_round_trip() {
    let server = std::env::var("REDIS_SERVER").unwrap_or_else(|_| "localhost:6379".to_string());
    let connections = Arc::new(ConnectionManager::new(BackendConfig::default()));
    connections
        .set_backend(BackendConfig::new(server.as_str(), 0, TransportMode::Pooled))
        .await
        .unwrap();

    let dispatcher = Dispatcher::with_defaults(QueueStore::new(connections));
    let queue = format!("resq-test-{}", uuid::Uuid::new_v4().simple());

    dispatcher.enqueue(&queue, "Ping", Some(json!([1, 2])), false).await.unwrap();
    assert_eq!(dispatcher.store().size(&queue).await.unwrap(), 1);
    assert!(dispatcher.store().queues().await.unwrap().contains(&queue));

    let job = dispatcher.reserve(&queue).await.unwrap().unwrap();
    assert_eq!(job.class(), "Ping");
    assert!(dispatcher.reserve(&queue).await.unwrap().is_none());
}
