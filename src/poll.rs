use tracing::{debug, info, warn};

use crate::client::Backend;
use crate::config::PollPolicy;
use crate::error::{FusionError, Result};
use crate::types::{JobOutcome, JobStatus, StatusResponse};

const UNKNOWN_ERROR: &str = "unknown";

/// Polls a job until it reaches a terminal state or the attempt budget runs out.
///
/// Each attempt is exactly one status query. Between attempts the poller sleeps
/// for the policy's fixed delay; there is no backoff.
pub struct Poller<'a, B> {
    backend: &'a B,
    policy: PollPolicy,
}

impl<'a, B: Backend> Poller<'a, B> {
    pub fn new(backend: &'a B, policy: PollPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll `job_id` and report how it ended.
    ///
    /// `Err` is reserved for transport and response-format problems; the three
    /// terminal job states all come back as `Ok`.
    pub async fn poll(&self, job_id: &str) -> Result<JobOutcome> {
        let attempts = self.policy.attempts();
        let mut remaining = attempts;

        loop {
            let raw = self.backend.status(job_id).await?;
            let response: StatusResponse = serde_json::from_value(raw).map_err(|e| {
                FusionError::InvalidResponse(format!(
                    "Unexpected status response for job {}: {}",
                    job_id, e
                ))
            })?;
            remaining -= 1;

            match response.job_status() {
                JobStatus::Done => {
                    let result = response.result.unwrap_or_default();
                    if result.censored {
                        warn!(job_id, "backend flagged the result as censored");
                    }
                    info!(job_id, files = result.files.len(), "job done");
                    return Ok(JobOutcome::Completed {
                        files: result.files,
                        censored: result.censored,
                    });
                }
                JobStatus::Failed => {
                    let description = response
                        .error_description
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                    warn!(job_id, %description, "job failed");
                    return Ok(JobOutcome::Failed { description });
                }
                JobStatus::Pending => {
                    if remaining == 0 {
                        warn!(job_id, attempts, "gave up waiting for job");
                        return Ok(JobOutcome::TimedOut { attempts });
                    }
                    debug!(job_id, status = %response.status, remaining, "job still pending");
                    if !self.policy.delay.is_zero() {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }
    }

    /// Wait for `job_id` and return its encoded image payloads.
    ///
    /// Failure and timeout become [`FusionError::GenerationFailed`] and
    /// [`FusionError::Timeout`].
    pub async fn await_completion(&self, job_id: &str) -> Result<Vec<String>> {
        self.poll(job_id).await?.into_files(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationParams, Pipeline};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays a fixed list of status bodies, repeating the last one forever.
    struct ScriptedStatus {
        script: Mutex<VecDeque<Value>>,
        calls: AtomicU32,
        http_error_on_call: Option<u32>,
    }

    impl ScriptedStatus {
        fn new(script: Vec<Value>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
                http_error_on_call: None,
            }
        }

        /// Answer the given (1-based) call with HTTP 503 instead of a body.
        fn failing_on_call(mut self, call: u32) -> Self {
            self.http_error_on_call = Some(call);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Backend for ScriptedStatus {
        async fn pipelines(&self) -> Result<Vec<Pipeline>> {
            Ok(Vec::new())
        }

        async fn run(&self, _pipeline_id: &str, _params: &GenerationParams) -> Result<Value> {
            unreachable!("poller never submits")
        }

        async fn status(&self, _job_id: &str) -> Result<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.http_error_on_call == Some(call) {
                return Err(FusionError::Http {
                    status: 503,
                    body: "service unavailable".into(),
                });
            }
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                Ok(script.pop_front().unwrap())
            } else {
                Ok(script.front().cloned().unwrap())
            }
        }
    }

    fn pending() -> Value {
        json!({"uuid": "job", "status": "PROCESSING"})
    }

    fn done(files: &[&str]) -> Value {
        json!({"uuid": "job", "status": "DONE", "result": {"files": files, "censored": false}})
    }

    fn fast(attempts: u32) -> PollPolicy {
        PollPolicy::default()
            .with_max_attempts(attempts)
            .with_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_done_after_pending() {
        let backend = ScriptedStatus::new(vec![pending(), pending(), done(&["aGk="])]);
        let poller = Poller::new(&backend, fast(10));

        let files = poller.await_completion("job").await.unwrap();
        assert_eq!(files, vec!["aGk=".to_string()]);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_done_on_last_allowed_attempt() {
        let backend = ScriptedStatus::new(vec![pending(), pending(), done(&["aGk="])]);
        let poller = Poller::new(&backend, fast(3));

        assert!(poller.await_completion("job").await.is_ok());
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_timeout_after_budget() {
        let backend = ScriptedStatus::new(vec![pending()]);
        let poller = Poller::new(&backend, fast(3));

        let outcome = poller.poll("job").await.unwrap();
        assert_eq!(outcome, JobOutcome::TimedOut { attempts: 3 });
        assert_eq!(backend.calls(), 3);

        let err = poller.await_completion("job").await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_failure_stops_polling() {
        let backend = ScriptedStatus::new(vec![
            pending(),
            json!({"status": "FAIL", "errorDescription": "NSFW content"}),
            done(&["never"]),
        ]);
        let poller = Poller::new(&backend, fast(10));

        let err = poller.await_completion("job").await.unwrap_err();
        assert!(err.is_generation_failure());
        assert!(err.to_string().contains("NSFW content"));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_without_description() {
        let backend = ScriptedStatus::new(vec![json!({"status": "FAILED"})]);
        let poller = Poller::new(&backend, fast(5));

        let outcome = poller.poll("job").await.unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Failed {
                description: "unknown".into()
            }
        );
    }

    #[tokio::test]
    async fn test_done_without_result_is_empty() {
        let backend = ScriptedStatus::new(vec![json!({"status": "DONE"})]);
        let poller = Poller::new(&backend, fast(1));
        assert!(poller.await_completion("job").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_status_body() {
        let backend = ScriptedStatus::new(vec![json!({"uuid": "job"})]);
        let poller = Poller::new(&backend, fast(3));

        let err = poller.poll("job").await.unwrap_err();
        assert!(matches!(err, FusionError::InvalidResponse(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_polls() {
        let backend = ScriptedStatus::new(vec![pending(), pending(), pending(), done(&["aGk="])]);
        let poller = Poller::new(
            &backend,
            PollPolicy::default().with_delay(Duration::from_secs(10)),
        );

        let start = tokio::time::Instant::now();
        poller.await_completion("job").await.unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(30));
        assert!(waited < Duration::from_secs(31));
        assert_eq!(backend.calls(), 4);
    }

    #[tokio::test]
    async fn test_censored_result_still_completes() {
        let backend = ScriptedStatus::new(vec![json!({
            "status": "DONE",
            "result": {"files": ["aGk="], "censored": true}
        })]);
        let poller = Poller::new(&backend, fast(3));

        let outcome = poller.poll("job").await.unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Completed {
                files: vec!["aGk=".to_string()],
                censored: true
            }
        );
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_status_transport_error_is_not_retried() {
        let backend = ScriptedStatus::new(vec![pending()]).failing_on_call(2);
        let poller = Poller::new(&backend, fast(10));

        let err = poller.poll("job").await.unwrap_err();
        assert!(err.is_submission());
        assert!(matches!(err, FusionError::Http { status: 503, .. }));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_waits_worst_case() {
        let backend = ScriptedStatus::new(vec![pending()]);
        let policy = PollPolicy::default()
            .with_max_attempts(4)
            .with_delay(Duration::from_secs(5));
        let poller = Poller::new(&backend, policy);
        assert_eq!(poller.policy(), policy);

        let start = tokio::time::Instant::now();
        let outcome = poller.poll("job").await.unwrap();
        let waited = start.elapsed();

        assert_eq!(outcome, JobOutcome::TimedOut { attempts: 4 });
        assert!(waited >= poller.policy().worst_case_wait());
        assert!(waited < poller.policy().worst_case_wait() + Duration::from_secs(1));
        assert_eq!(backend.calls(), 4);
    }
}
