use super::job::JobDescriptor;
use crate::error::AppResult;

/// Turns job descriptors into the text stored in a queue and back.
pub trait JobCodec: Send + Sync {
    fn encode(&self, job: &JobDescriptor) -> AppResult<String>;

    fn decode(&self, raw: &str) -> AppResult<JobDescriptor>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonJobCodec;

impl JobCodec for JsonJobCodec {
    fn encode(&self, job: &JobDescriptor) -> AppResult<String> {
        Ok(serde_json::to_string(job)?)
    }

    fn decode(&self, raw: &str) -> AppResult<JobDescriptor> {
        Ok(serde_json::from_str(raw)?)
    }
}
