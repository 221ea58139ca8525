use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{FusionError, Result};
use crate::types::{GenerationParams, Pipeline};

fn normalize(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// The three backend calls the job lifecycle needs.
///
/// [`FusionBrainClient`] talks HTTP; tests and alternative transports can
/// implement this directly. Responses are handed back as parsed JSON so the
/// submitter and poller own the interpretation.
pub trait Backend: Send + Sync {
    /// List available pipelines, in backend order.
    fn pipelines(&self) -> impl Future<Output = Result<Vec<Pipeline>>> + Send;

    /// Start a generation job. Returns the raw response body.
    fn run(
        &self,
        pipeline_id: &str,
        params: &GenerationParams,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// Query a job's status. Returns the raw response body.
    fn status(&self, job_id: &str) -> impl Future<Output = Result<Value>> + Send;
}

/// Async client for the FusionBrain API.
///
/// # Example
/// ```no_run
/// use fusionbrain_rs::{Backend, ClientConfig, FusionBrainClient};
///
/// # async fn example() -> fusionbrain_rs::Result<()> {
/// let config = ClientConfig::new("key", "secret");
/// let client = FusionBrainClient::new(&config);
/// let pipelines = client.pipelines().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FusionBrainClient {
    http: Client,
    endpoint: String,
    key_header: String,
    secret_header: String,
}

impl FusionBrainClient {
    /// Create a new client from connection settings.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: Client::new(),
            endpoint: normalize(config.api_url.clone()),
            key_header: format!("Key {}", config.api_key),
            secret_header: format!("Secret {}", config.secret_key),
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-Key", &self.key_header)
            .header("X-Secret", &self.secret_header)
    }

    fn unreachable(&self, source: reqwest::Error) -> FusionError {
        FusionError::Network {
            context: format!(
                "Cannot connect to FusionBrain at {} \u{2014} check the URL and network",
                self.endpoint
            ),
            source,
        }
    }

    async fn read_json(resp: Response, what: &str) -> Result<Value> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FusionError::Http { status, body });
        }

        resp.json().await.map_err(|e| FusionError::Network {
            context: format!("Failed to parse FusionBrain {} response", what),
            source: e,
        })
    }
}

impl Backend for FusionBrainClient {
    async fn pipelines(&self) -> Result<Vec<Pipeline>> {
        let url = format!("{}/key/api/v1/pipelines", self.endpoint);
        let resp = self
            .authorized(self.http.get(&url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let json = Self::read_json(resp, "pipelines").await?;
        serde_json::from_value(json).map_err(|e| {
            FusionError::InvalidResponse(format!("Unexpected pipelines response: {}", e))
        })
    }

    async fn run(&self, pipeline_id: &str, params: &GenerationParams) -> Result<Value> {
        let url = format!("{}/key/api/v1/pipeline/run", self.endpoint);
        let params_part = Part::text(serde_json::to_string(params)?)
            .mime_str("application/json")
            .map_err(|e| FusionError::Network {
                context: "Failed to build params form part".into(),
                source: e,
            })?;
        let form = Form::new()
            .text("pipeline_id", pipeline_id.to_string())
            .part("params", params_part);

        let resp = self
            .authorized(self.http.post(&url))
            .timeout(Duration::from_secs(30))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        Self::read_json(resp, "pipeline/run").await
    }

    async fn status(&self, job_id: &str) -> Result<Value> {
        let url = format!("{}/key/api/v1/pipeline/status/{}", self.endpoint, job_id);
        let resp = self
            .authorized(self.http.get(&url))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| FusionError::Network {
                context: format!("Failed to fetch status of job {}", job_id),
                source: e,
            })?;

        Self::read_json(resp, "pipeline/status").await
    }
}

/// Pick the pipeline used for a whole run: the first one the backend lists.
pub async fn resolve_pipeline<B: Backend>(backend: &B) -> Result<Pipeline> {
    backend
        .pipelines()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| FusionError::InvalidResponse("No pipelines available".into()))
}
