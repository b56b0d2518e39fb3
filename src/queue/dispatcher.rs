use std::sync::Arc;

use serde_json::{json, Value};

use super::codec::{JobCodec, JsonJobCodec};
use super::job::{Job, JobDescriptor};
use super::queue_store::QueueStore;
use crate::error::{AppError, AppResult};
use crate::services::{Event, EventService, EventSink};

/// Producer and consumer entry point: enqueue named jobs, reserve them back.
#[derive(Clone)]
pub struct Dispatcher {
    store: QueueStore,
    codec: Arc<dyn JobCodec>,
    events: Arc<dyn EventSink>,
}

impl Dispatcher {
    pub fn new(store: QueueStore, codec: Arc<dyn JobCodec>, events: Arc<dyn EventSink>) -> Self {
        Self { store, codec, events }
    }

    /// JSON codec and an empty [`EventService`].
    pub fn with_defaults(store: QueueStore) -> Self {
        Self::new(store, Arc::new(JsonJobCodec), Arc::new(EventService::new()))
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Build a job for `class` and append it to `queue`.
    ///
    /// `afterEnqueue` fires only once the job is stored. A failing listener is logged
    /// and does not undo or fail the enqueue.
    pub async fn enqueue(
        &self,
        queue: &str,
        class: &str,
        args: Option<Value>,
        track_status: bool,
    ) -> AppResult<JobDescriptor> {
        let mut job = JobDescriptor::new(class, args);
        if track_status {
            job = job.tracked();
        }

        let encoded = self.codec.encode(&job)?;
        self.store.push_encoded(queue, &encoded).await?;

        tracing::debug!(queue = queue, class = class, id = ?job.id, "Job enqueued");

        let payload = json!({
            "class": class,
            "args": job.args,
        });
        if let Err(e) = self.events.publish(Event::AfterEnqueue.as_str(), &payload).await {
            tracing::warn!("{} listener failed for job {} on '{}': {}", Event::AfterEnqueue, class, queue, e);
        }

        Ok(job)
    }

    /// Take the next job off `queue`. `Ok(None)` when there is nothing to do.
    pub async fn reserve(&self, queue: &str) -> AppResult<Option<Job>> {
        let Some(raw) = self.store.pop_encoded(queue).await? else {
            return Ok(None);
        };

        let payload = self.codec.decode(&raw).map_err(|e| {
            tracing::error!("Lost undecodable job from queue '{}': {}", queue, e);
            match e {
                AppError::SerializationError(msg) => {
                    AppError::SerializationError(format!("Job reserved from '{}' is unreadable: {}", queue, msg))
                }
                other => other,
            }
        })?;

        tracing::debug!(queue = queue, class = %payload.class, "Job reserved");
        Ok(Some(Job::new(queue, payload)))
    }
}
