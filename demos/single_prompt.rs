//! Generate one image from a text prompt and save it next to the binary.
//!
//! Requires `API_KEY` and `SECRET_KEY` in the environment or a `.env` file.
//!
//! ```sh
//! cargo run --example single_prompt -- "a red fox in the snow"
//! ```

use fusionbrain_rs::{
    materialize, resolve_pipeline, ClientConfig, FusionBrainClient, GenerationRequest,
    JobOutcome, PollPolicy, Poller, Submitter,
};
use std::path::Path;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a beautiful sunset over mountains".to_string());

    let config = ClientConfig::from_env()?;
    let client = FusionBrainClient::new(&config);

    let pipeline = resolve_pipeline(&client).await?;
    println!("Using pipeline: {} ({})", pipeline.name, pipeline.id);

    let request = GenerationRequest::new(prompt)
        .style("DEFAULT")
        .negative_prompt("lowres, blurry");
    let job_id = Submitter::new(&client, &pipeline.id).submit(&request).await?;
    println!("Submitted job: {}", job_id);

    match Poller::new(&client, PollPolicy::default()).poll(&job_id).await? {
        JobOutcome::Completed { files, censored } => {
            if censored {
                eprintln!("Result was censored by the backend");
            }
            for (i, payload) in files.iter().enumerate() {
                let name = format!("{}_{}.png", job_id, i + 1);
                let bytes = materialize::save(payload, Path::new(&name))?;
                println!("Saved: {} ({} bytes)", name, bytes);
            }
        }
        JobOutcome::Failed { description } => eprintln!("Generation failed: {}", description),
        JobOutcome::TimedOut { attempts } => {
            eprintln!("Still not done after {} status checks", attempts)
        }
    }

    Ok(())
}
