use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// Opaque job identifier returned by the backend on submission.
pub type JobId = String;

/// Default output width and height.
pub const DEFAULT_SIZE: u32 = 1024;

/// A generation model advertised by `/key/api/v1/pipelines`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// One submission to the backend.
///
/// # Example
/// ```
/// use fusionbrain_rs::GenerationRequest;
///
/// let request = GenerationRequest::new("a lighthouse at dusk")
///     .size(768, 1024)
///     .style("ANIME")
///     .negative_prompt("blurry");
///
/// let params = request.to_params().unwrap();
/// assert_eq!(params.num_images, 1);
/// assert_eq!(params.style.as_deref(), Some("ANIME"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub images: u32,
    pub width: u32,
    pub height: u32,
    pub style: Option<String>,
    pub negative_prompt: Option<String>,
}

impl GenerationRequest {
    /// Create a request for a single 1024x1024 image with no style.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: 1,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            style: None,
            negative_prompt: None,
        }
    }

    /// Set how many images this one job should produce.
    pub fn images(mut self, images: u32) -> Self {
        self.images = images;
        self
    }

    /// Set output dimensions.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the style tag (e.g. "KANDINSKY", "UHD", "ANIME", "DEFAULT").
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Set the negative prompt.
    pub fn negative_prompt(mut self, text: impl Into<String>) -> Self {
        self.negative_prompt = Some(text.into());
        self
    }

    /// Check the request before anything goes over the wire.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(FusionError::InvalidRequest("prompt must not be empty".into()));
        }
        if self.images == 0 {
            return Err(FusionError::InvalidRequest(
                "image count must be at least 1".into(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(FusionError::InvalidRequest(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Build the `params` object sent alongside the pipeline id.
    ///
    /// Empty style or negative prompt strings count as unset.
    pub fn to_params(&self) -> Result<GenerationParams> {
        self.validate()?;
        Ok(GenerationParams {
            kind: GENERATE.to_string(),
            num_images: self.images,
            width: self.width,
            height: self.height,
            style: non_empty(&self.style),
            negative_prompt: non_empty(&self.negative_prompt),
            generate_params: QueryParams {
                query: self.prompt.clone(),
            },
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

const GENERATE: &str = "GENERATE";

/// Wire form of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub num_images: u32,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(
        rename = "negativePromptDecoder",
        skip_serializing_if = "Option::is_none"
    )]
    pub negative_prompt: Option<String>,
    pub generate_params: QueryParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryParams {
    pub query: String,
}

/// Status reported for a job on a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued or processing; anything that is not terminal.
    Pending,
    Done,
    Failed,
}

impl JobStatus {
    /// Map the backend's status string. Unknown values are treated as pending.
    pub fn parse(status: &str) -> Self {
        match status {
            "DONE" => JobStatus::Done,
            "FAIL" | "FAILED" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

/// Body of `/key/api/v1/pipeline/status/{uuid}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub uuid: Option<String>,
    pub status: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub result: Option<JobResult>,
}

impl StatusResponse {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::parse(&self.status)
    }
}

/// Result object attached to a finished job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobResult {
    /// Base64-encoded images, in backend order.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub censored: bool,
}

/// Terminal state of one polling sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job finished with encoded image payloads.
    Completed { files: Vec<String>, censored: bool },
    /// The backend gave up on the job.
    Failed { description: String },
    /// The attempt budget ran out while the job was still pending.
    TimedOut { attempts: u32 },
}

impl JobOutcome {
    /// Convert into the payload list, turning failure and timeout into errors.
    pub fn into_files(self, job_id: &str) -> Result<Vec<String>> {
        match self {
            JobOutcome::Completed { files, .. } => Ok(files),
            JobOutcome::Failed { description } => Err(FusionError::GenerationFailed {
                job_id: job_id.to_string(),
                description,
            }),
            JobOutcome::TimedOut { attempts } => Err(FusionError::Timeout {
                job_id: job_id.to_string(),
                attempts,
            }),
        }
    }
}

/// Position of one unit of work inside a batch run. Indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchItem {
    pub prompt_index: usize,
    pub repetition: usize,
}

impl BatchItem {
    pub fn new(prompt_index: usize, repetition: usize) -> Self {
        Self {
            prompt_index,
            repetition,
        }
    }

    /// Output file name for one payload of this item.
    ///
    /// Prompt and repetition numbers are embedded 1-based. The file number is
    /// only appended when the job returned more than one payload.
    pub fn file_name(&self, timestamp: i64, file_index: usize, file_count: usize) -> String {
        if file_count > 1 {
            format!(
                "image_{}_{}_{}_{}.png",
                timestamp,
                self.prompt_index + 1,
                self.repetition + 1,
                file_index + 1
            )
        } else {
            format!(
                "image_{}_{}_{}.png",
                timestamp,
                self.prompt_index + 1,
                self.repetition + 1
            )
        }
    }
}
