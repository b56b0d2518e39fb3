mod codec;
mod dispatcher;
mod job;
mod queue_store;

pub use codec::{JobCodec, JsonJobCodec};
pub use dispatcher::Dispatcher;
pub use job::{Job, JobDescriptor, JobId};
pub use queue_store::{queue_key, QueueStats, QueueStore, REGISTRY_KEY};
