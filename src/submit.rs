use serde_json::Value;
use tracing::{debug, info};

use crate::client::Backend;
use crate::error::{FusionError, Result};
use crate::types::{GenerationRequest, JobId};

/// Starts generation jobs on a resolved pipeline.
///
/// Submission failures are never retried here; they go straight back to the caller.
pub struct Submitter<'a, B> {
    backend: &'a B,
    pipeline_id: &'a str,
}

impl<'a, B: Backend> Submitter<'a, B> {
    pub fn new(backend: &'a B, pipeline_id: &'a str) -> Self {
        Self {
            backend,
            pipeline_id,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        self.pipeline_id
    }

    /// Submit one request and return the backend's job id.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<JobId> {
        if self.pipeline_id.is_empty() {
            return Err(FusionError::InvalidRequest(
                "pipeline id must be resolved before submitting".into(),
            ));
        }
        let params = request.to_params()?;
        debug!(pipeline = self.pipeline_id, images = params.num_images, "submitting job");

        let response = self.backend.run(self.pipeline_id, &params).await?;
        let job_id = extract_job_id(&response)?;

        info!(job_id = %job_id, "job submitted");
        Ok(job_id)
    }
}

fn extract_job_id(response: &Value) -> Result<JobId> {
    response
        .get("uuid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            FusionError::InvalidResponse(format!("Run response missing uuid: {}", response))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationParams, Pipeline};
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingBackend {
        reply: Value,
        sent: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingBackend {
        fn replying(reply: Value) -> Self {
            Self {
                reply,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl Backend for RecordingBackend {
        async fn pipelines(&self) -> Result<Vec<Pipeline>> {
            Ok(Vec::new())
        }

        async fn run(&self, pipeline_id: &str, params: &GenerationParams) -> Result<Value> {
            self.sent
                .lock()
                .unwrap()
                .push((pipeline_id.to_string(), serde_json::to_value(params)?));
            Ok(self.reply.clone())
        }

        async fn status(&self, _job_id: &str) -> Result<Value> {
            unreachable!("submitter never polls")
        }
    }

    #[tokio::test]
    async fn test_submit_returns_uuid() {
        let backend = RecordingBackend::replying(json!({"uuid": "job-1", "status": "INITIAL"}));
        let submitter = Submitter::new(&backend, "pipe-1");
        assert_eq!(submitter.pipeline_id(), "pipe-1");

        let job_id = submitter
            .submit(&GenerationRequest::new("a cat").style("ANIME"))
            .await
            .unwrap();
        assert_eq!(job_id, "job-1");

        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "pipe-1");
        assert_eq!(sent[0].1["generateParams"]["query"], "a cat");
        assert_eq!(sent[0].1["style"], "ANIME");
        assert!(sent[0].1.get("negativePromptDecoder").is_none());
    }

    #[tokio::test]
    async fn test_submit_missing_uuid_is_error() {
        let backend = RecordingBackend::replying(json!({"pipeline_status": "DISABLED_BY_QUEUE"}));
        let submitter = Submitter::new(&backend, "pipe-1");

        let err = submitter
            .submit(&GenerationRequest::new("a cat"))
            .await
            .unwrap_err();
        assert!(err.is_submission());
        assert!(err.to_string().contains("DISABLED_BY_QUEUE"));
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_request_without_sending() {
        let backend = RecordingBackend::replying(json!({"uuid": "never"}));
        let submitter = Submitter::new(&backend, "pipe-1");

        let err = submitter
            .submit(&GenerationRequest::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, FusionError::InvalidRequest(_)));
        assert!(backend.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_requires_pipeline() {
        let backend = RecordingBackend::replying(json!({"uuid": "never"}));
        let submitter = Submitter::new(&backend, "");
        assert!(submitter.submit(&GenerationRequest::new("x")).await.is_err());
        assert!(backend.sent.lock().unwrap().is_empty());
    }
}
