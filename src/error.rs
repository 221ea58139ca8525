use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by FusionBrain operations.
#[derive(Error, Debug)]
pub enum FusionError {
    /// FusionBrain returned a non-success HTTP status.
    #[error("FusionBrain returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The response from FusionBrain was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// The backend reported that the job failed.
    #[error("Generation failed for job {job_id}: {description}")]
    GenerationFailed { job_id: String, description: String },

    /// The attempt budget ran out while the job was still pending.
    #[error("Timed out waiting for job {job_id} after {attempts} status checks")]
    Timeout { job_id: String, attempts: u32 },

    /// An image payload was not valid base64.
    #[error("Could not decode image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Writing or reading a file failed.
    #[error("Could not save {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The caller asked for something the API cannot do.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FusionError {
    /// True for errors raised while creating or querying a job over the wire.
    pub fn is_submission(&self) -> bool {
        matches!(
            self,
            FusionError::Http { .. } | FusionError::Network { .. } | FusionError::InvalidResponse(_)
        )
    }

    pub fn is_generation_failure(&self) -> bool {
        matches!(self, FusionError::GenerationFailed { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FusionError::Timeout { .. })
    }

    /// True for decode and filesystem failures while saving results.
    pub fn is_materialization(&self) -> bool {
        matches!(self, FusionError::Decode(_) | FusionError::Persist { .. })
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FusionError>;
