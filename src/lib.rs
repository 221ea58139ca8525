//! # fusionbrain-rs
//!
//! Async Rust client for the [FusionBrain](https://fusionbrain.ai) image
//! generation API (Kandinsky).
//!
//! Covers the whole job lifecycle: resolving a pipeline, submitting a
//! generation request, polling its status with a fixed attempt budget and
//! delay, decoding the returned base64 images, and a sequential batch runner
//! that fans out over prompts and images-per-prompt.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fusionbrain_rs::{
//!     resolve_pipeline, ClientConfig, FusionBrainClient, GenerationRequest, PollPolicy, Poller,
//!     Submitter,
//! };
//! use std::path::Path;
//!
//! # async fn example() -> fusionbrain_rs::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let client = FusionBrainClient::new(&config);
//!
//! let pipeline = resolve_pipeline(&client).await?;
//! let job_id = Submitter::new(&client, &pipeline.id)
//!     .submit(&GenerationRequest::new("a sunset over mountains").style("UHD"))
//!     .await?;
//!
//! let files = Poller::new(&client, PollPolicy::default())
//!     .await_completion(&job_id)
//!     .await?;
//!
//! for (i, payload) in files.iter().enumerate() {
//!     fusionbrain_rs::materialize::save(payload, Path::new(&format!("sunset_{}.png", i)))?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod materialize;
pub mod poll;
pub mod prompts;
pub mod submit;
pub mod types;

pub use batch::{BatchEvent, BatchOrchestrator, BatchReport, ItemReport};
pub use client::{resolve_pipeline, Backend, FusionBrainClient};
pub use config::{BatchConfig, ClientConfig, FailurePolicy, PollPolicy, MAX_IMAGES_PER_PROMPT};
pub use error::{FusionError, Result};
pub use poll::Poller;
pub use submit::Submitter;
pub use types::{
    BatchItem, GenerationParams, GenerationRequest, JobId, JobOutcome, JobStatus, Pipeline,
    StatusResponse,
};
