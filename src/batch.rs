use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::client::{resolve_pipeline, Backend};
use crate::config::{BatchConfig, FailurePolicy};
use crate::error::{FusionError, Result};
use crate::materialize;
use crate::poll::Poller;
use crate::submit::Submitter;
use crate::types::{BatchItem, GenerationRequest, JobId};

/// Progress notification emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// The pipeline every job in this run will use.
    PipelineResolved { pipeline_id: String },
    PromptStarted {
        prompt_index: usize,
        total_prompts: usize,
    },
    JobSubmitted { item: BatchItem, job_id: JobId },
    ImageSaved { item: BatchItem, path: PathBuf },
    ItemFailed { item: BatchItem, error: String },
}

/// What happened to one (prompt, repetition) unit of work.
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub item: BatchItem,
    pub job_id: Option<JobId>,
    pub saved: Vec<PathBuf>,
    pub error: Option<String>,
}

impl ItemReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a whole batch run, items in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub pipeline_id: String,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    /// Every file written during the run, in order.
    pub fn saved_paths(&self) -> Vec<PathBuf> {
        self.items
            .iter()
            .flat_map(|i| i.saved.iter().cloned())
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

/// Drives submit, poll and save across prompts, strictly one job at a time.
///
/// For every prompt in order, and for each of `images_per_prompt` repetitions,
/// one single-image job is submitted, awaited, and its payloads written to
/// `output_dir`. The pipeline is resolved once per run.
///
/// # Example
/// ```no_run
/// use fusionbrain_rs::{BatchConfig, BatchOrchestrator, ClientConfig, FusionBrainClient};
///
/// # async fn example() -> fusionbrain_rs::Result<()> {
/// let client = FusionBrainClient::new(&ClientConfig::from_env()?);
/// let config = BatchConfig::builder().with_images_per_prompt(2).build();
/// let prompts = vec!["a cat".to_string(), "a dog".to_string()];
///
/// let report = BatchOrchestrator::new(&client, &config).run(&prompts).await?;
/// println!("saved {} images", report.saved_paths().len());
/// # Ok(())
/// # }
/// ```
pub struct BatchOrchestrator<'a, B> {
    backend: &'a B,
    config: &'a BatchConfig,
}

impl<'a, B: Backend> BatchOrchestrator<'a, B> {
    pub fn new(backend: &'a B, config: &'a BatchConfig) -> Self {
        Self { backend, config }
    }

    pub async fn run(&self, prompts: &[String]) -> Result<BatchReport> {
        self.run_with_progress(prompts, |_| {}).await
    }

    /// Run the batch, calling `on_event` as work progresses.
    ///
    /// With [`FailurePolicy::Abort`] the first failing item ends the run with
    /// its error. With [`FailurePolicy::Continue`] failures are recorded in the
    /// report and the next item starts.
    pub async fn run_with_progress<F>(
        &self,
        prompts: &[String],
        mut on_event: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(BatchEvent),
    {
        self.config.validate()?;
        if prompts.is_empty() {
            return Err(FusionError::InvalidRequest("no prompts to generate".into()));
        }
        materialize::ensure_output_dir(&self.config.output_dir)?;

        let pipeline = resolve_pipeline(self.backend).await?;
        info!(pipeline = %pipeline.id, name = %pipeline.name, "using pipeline");
        on_event(BatchEvent::PipelineResolved {
            pipeline_id: pipeline.id.clone(),
        });

        let submitter = Submitter::new(self.backend, &pipeline.id);
        let poller = Poller::new(self.backend, self.config.poll);
        let per_prompt = self.config.images_per_prompt as usize;
        let mut report = BatchReport {
            pipeline_id: pipeline.id.clone(),
            items: Vec::with_capacity(prompts.len() * per_prompt),
        };

        for (prompt_index, prompt) in prompts.iter().enumerate() {
            info!(
                prompt = prompt_index + 1,
                total = prompts.len(),
                "processing prompt"
            );
            on_event(BatchEvent::PromptStarted {
                prompt_index,
                total_prompts: prompts.len(),
            });

            for repetition in 0..per_prompt {
                let item = BatchItem::new(prompt_index, repetition);
                info!(image = repetition + 1, total = per_prompt, "generating image");

                let mut entry = ItemReport {
                    item,
                    job_id: None,
                    saved: Vec::new(),
                    error: None,
                };
                let result = self
                    .process_item(&submitter, &poller, item, prompt, &mut entry, &mut on_event)
                    .await;

                if let Err(e) = result {
                    on_event(BatchEvent::ItemFailed {
                        item,
                        error: e.to_string(),
                    });
                    match self.config.failure_policy {
                        FailurePolicy::Abort => {
                            error!(
                                prompt = prompt_index + 1,
                                image = repetition + 1,
                                error = %e,
                                "stopping batch"
                            );
                            return Err(e);
                        }
                        FailurePolicy::Continue => {
                            warn!(
                                prompt = prompt_index + 1,
                                image = repetition + 1,
                                error = %e,
                                "item failed, continuing"
                            );
                            entry.error = Some(e.to_string());
                        }
                    }
                }
                report.items.push(entry);
            }
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            files = report.saved_paths().len(),
            "batch finished"
        );
        Ok(report)
    }

    async fn process_item<F>(
        &self,
        submitter: &Submitter<'_, B>,
        poller: &Poller<'_, B>,
        item: BatchItem,
        prompt: &str,
        entry: &mut ItemReport,
        on_event: &mut F,
    ) -> Result<()>
    where
        F: FnMut(BatchEvent),
    {
        let job_id = submitter.submit(&self.request_for(prompt)).await?;
        entry.job_id = Some(job_id.clone());
        on_event(BatchEvent::JobSubmitted {
            item,
            job_id: job_id.clone(),
        });

        let files = poller.await_completion(&job_id).await?;
        if files.is_empty() {
            warn!(job_id = %job_id, "job finished without images");
        }

        let timestamp = chrono::Utc::now().timestamp();
        for (file_index, payload) in files.iter().enumerate() {
            let path = self
                .config
                .output_dir
                .join(item.file_name(timestamp, file_index, files.len()));
            materialize::save(payload, &path)?;
            info!(path = %path.display(), "image saved");
            entry.saved.push(path.clone());
            on_event(BatchEvent::ImageSaved { item, path });
        }
        Ok(())
    }

    fn request_for(&self, prompt: &str) -> GenerationRequest {
        let mut request = GenerationRequest::new(prompt)
            .images(1)
            .size(self.config.width, self.config.height);
        if let Some(style) = &self.config.style {
            request = request.style(style.clone());
        }
        if let Some(negative) = &self.config.negative_prompt {
            request = request.negative_prompt(negative.clone());
        }
        request
    }
}
