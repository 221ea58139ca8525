//! FusionBrain batch generator.
//!
//! Reads prompts from a file (one per line) or a single `--prompt`, generates
//! `--count` images for each, and writes them into the output directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fusionbrain_rs::{
    prompts, BatchConfig, BatchEvent, BatchOrchestrator, ClientConfig, FailurePolicy,
    FusionBrainClient, PollPolicy, MAX_IMAGES_PER_PROMPT,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fusionbrain")]
#[command(about = "Generate images for a list of prompts with the FusionBrain API", long_about = None)]
struct Cli {
    /// Prompt file, one prompt per line
    #[arg(long, default_value = "input.txt")]
    input: PathBuf,

    /// Use a single prompt instead of reading the input file
    #[arg(long, conflicts_with = "input")]
    prompt: Option<String>,

    /// Images to generate for each prompt
    #[arg(short = 'n', long, default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..=MAX_IMAGES_PER_PROMPT as i64))]
    count: u32,

    /// Output directory
    #[arg(long, default_value = "photos")]
    out: PathBuf,

    #[arg(long, default_value_t = 1024)]
    width: u32,

    #[arg(long, default_value_t = 1024)]
    height: u32,

    /// Style tag (e.g. KANDINSKY, UHD, ANIME, DEFAULT)
    #[arg(long)]
    style: Option<String>,

    /// Negative prompt
    #[arg(long)]
    negative: Option<String>,

    /// Status checks per job before giving up
    #[arg(long, default_value_t = 10)]
    attempts: u32,

    /// Seconds between status checks
    #[arg(long, default_value_t = 10)]
    delay: u64,

    /// Record failed images and carry on instead of stopping the run
    #[arg(long)]
    keep_going: bool,

    /// API root; overrides API_URL
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut client_config = ClientConfig::from_env().context("loading API credentials")?;
    if let Some(url) = &cli.api_url {
        client_config = client_config.with_api_url(url.clone());
    }

    let prompt_list = match &cli.prompt {
        Some(text) => prompts::single_prompt(text)?,
        None => prompts::read_prompts(&cli.input)
            .with_context(|| format!("reading prompts from {}", cli.input.display()))?,
    };
    tracing::info!(prompts = prompt_list.len(), "prompts loaded");

    let mut builder = BatchConfig::builder()
        .with_output_dir(cli.out.clone())
        .with_images_per_prompt(cli.count)
        .with_size(cli.width, cli.height)
        .with_poll_policy(
            PollPolicy::default()
                .with_max_attempts(cli.attempts)
                .with_delay(Duration::from_secs(cli.delay)),
        )
        .with_failure_policy(if cli.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        });
    if let Some(style) = &cli.style {
        builder = builder.with_style(style.clone());
    }
    if let Some(negative) = &cli.negative {
        builder = builder.with_negative_prompt(negative.clone());
    }
    let batch_config = builder.build();

    let client = FusionBrainClient::new(&client_config);
    let report = BatchOrchestrator::new(&client, &batch_config)
        .run_with_progress(&prompt_list, |event| match event {
            BatchEvent::PipelineResolved { pipeline_id } => {
                println!("Using pipeline: {}", pipeline_id)
            }
            BatchEvent::ImageSaved { path, .. } => println!("Saved: {}", path.display()),
            BatchEvent::ItemFailed { item, error } => eprintln!(
                "Prompt {} image {} failed: {}",
                item.prompt_index + 1,
                item.repetition + 1,
                error
            ),
            _ => {}
        })
        .await?;

    println!(
        "Done: {} succeeded, {} failed, {} file(s) in {}",
        report.succeeded(),
        report.failed(),
        report.saved_paths().len(),
        batch_config.output_dir.display()
    );
    if report.failed() > 0 {
        anyhow::bail!("{} image(s) failed", report.failed());
    }
    Ok(())
}
