use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{FusionError, Result};
use crate::types::DEFAULT_SIZE;

/// Production API root.
pub const DEFAULT_API_URL: &str = "https://api-key.fusionbrain.ai/";

/// Upper bound on images requested per prompt in one batch run.
pub const MAX_IMAGES_PER_PROMPT: u32 = 1000;

/// Connection settings shared by every request.
///
/// Build once at startup and hand a reference to the client.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_key: String,
    pub secret_key: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Point the client at a different API root.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Read `API_KEY`, `SECRET_KEY` and the optional `API_URL` from the
    /// environment, loading a `.env` file first when one can be found.
    pub fn from_env() -> Result<Self> {
        check_dotenv(dotenvy::dotenv())?;

        let api_key = required_var("API_KEY")?;
        let secret_key = required_var("SECRET_KEY")?;
        let config = Self::new(api_key, secret_key);

        Ok(match env::var("API_URL") {
            Ok(url) if !url.trim().is_empty() => config.with_api_url(url),
            _ => config,
        })
    }
}

// Keys stay out of Debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .finish()
    }
}

// A missing .env is fine as long as the variables are set some other way;
// one that exists but cannot be parsed is not.
fn check_dotenv<T>(loaded: std::result::Result<T, dotenvy::Error>) -> Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(FusionError::Config(format!("could not load .env: {}", e))),
    }
}

fn required_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(FusionError::Config(format!(
            "{} is not set (add it to the environment or a .env file)",
            name
        ))),
    }
}

/// Fixed-budget, fixed-interval polling policy.
///
/// No backoff and no jitter: the worst-case wait is `(max_attempts - 1) * delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of status queries actually made; zero is bumped to one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Total sleep before a timeout. There is no sleep after the last query.
    pub fn worst_case_wait(&self) -> Duration {
        self.delay * (self.attempts() - 1)
    }
}

/// What the batch orchestrator does when one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run and return the first error.
    #[default]
    Abort,
    /// Record the error for that item and move on to the next one.
    Continue,
}

/// Configuration for a batch run.
///
/// Use [`BatchConfig::builder()`] for ergonomic construction, or
/// [`BatchConfig::default()`] for one 1024x1024 image per prompt into `photos/`.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory every image is written into. Created if missing.
    pub output_dir: PathBuf,

    /// Images generated per prompt, one job each.
    pub images_per_prompt: u32,

    pub width: u32,
    pub height: u32,
    pub style: Option<String>,
    pub negative_prompt: Option<String>,

    pub poll: PollPolicy,
    pub failure_policy: FailurePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("photos"),
            images_per_prompt: 1,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            style: None,
            negative_prompt: None,
            poll: PollPolicy::default(),
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl BatchConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.images_per_prompt == 0 || self.images_per_prompt > MAX_IMAGES_PER_PROMPT {
            return Err(FusionError::InvalidRequest(format!(
                "images per prompt must be between 1 and {}, got {}",
                MAX_IMAGES_PER_PROMPT, self.images_per_prompt
            )));
        }
        Ok(())
    }
}

/// Builder for [`BatchConfig`].
#[derive(Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn with_images_per_prompt(mut self, count: u32) -> Self {
        self.config.images_per_prompt = count;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.config.style = Some(style.into());
        self
    }

    pub fn with_negative_prompt(mut self, text: impl Into<String>) -> Self {
        self.config.negative_prompt = Some(text.into());
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.config.poll = poll;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Build the final [`BatchConfig`].
    pub fn build(self) -> BatchConfig {
        self.config
    }
}
