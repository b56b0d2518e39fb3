use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type JobId = String;

/// What travels through a queue: the unit of work to run and its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub class: String,
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JobId>,
}

impl JobDescriptor {
    pub fn new(class: impl Into<String>, args: Option<Value>) -> Self {
        Self {
            class: class.into(),
            args,
            id: None,
        }
    }

    /// Attach a fresh tracking id.
    pub fn tracked(mut self) -> Self {
        self.id = Some(Uuid::new_v4().simple().to_string());
        self
    }
}

/// A job reserved from a queue, ready to be handed to whatever runs it.
///
/// The queue no longer holds it; nothing else tracks it from here on.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub queue: String,
    pub payload: JobDescriptor,
}

impl Job {
    pub fn new(queue: impl Into<String>, payload: JobDescriptor) -> Self {
        Self {
            queue: queue.into(),
            payload,
        }
    }

    pub fn class(&self) -> &str {
        &self.payload.class
    }

    pub fn args(&self) -> Option<&Value> {
        self.payload.args.as_ref()
    }

    pub fn id(&self) -> Option<&str> {
        self.payload.id.as_deref()
    }
}
