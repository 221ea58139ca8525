//! Run a batch over `input.txt`, two images per prompt, continuing past failures.
//!
//! ```sh
//! cargo run --example batch_from_file
//! ```

use fusionbrain_rs::{
    prompts, BatchConfig, BatchEvent, BatchOrchestrator, ClientConfig, FailurePolicy,
    FusionBrainClient,
};
use std::path::Path;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let client = FusionBrainClient::new(&ClientConfig::from_env()?);
    let prompt_list = prompts::read_prompts(Path::new("input.txt"))?;

    let config = BatchConfig::builder()
        .with_output_dir("photos")
        .with_images_per_prompt(2)
        .with_failure_policy(FailurePolicy::Continue)
        .build();

    let report = BatchOrchestrator::new(&client, &config)
        .run_with_progress(&prompt_list, |event| match event {
            BatchEvent::PromptStarted {
                prompt_index,
                total_prompts,
            } => println!("Prompt {}/{}", prompt_index + 1, total_prompts),
            BatchEvent::JobSubmitted { job_id, .. } => println!("  job {}", job_id),
            BatchEvent::ImageSaved { path, .. } => println!("  saved {}", path.display()),
            BatchEvent::ItemFailed { error, .. } => println!("  failed: {}", error),
            BatchEvent::PipelineResolved { .. } => {}
        })
        .await?;

    println!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(())
}
