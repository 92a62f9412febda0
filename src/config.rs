//! Configuration loaded from the environment.

use crate::adapters::http::HttpProviderConfig;
use crate::application::merge::{FallbackMode, MergeOptions};
use crate::application::orchestrator::{GenerationOptions, OrchestratorConfig, DEFAULT_PROMPT};
use crate::application::reel::ReelOptions;
use crate::application::worker::PollConfig;
use crate::domain::av::codec::OutputFormat;
use crate::domain::av::letterbox::Rgb;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Everything the `framereel` binary needs.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the video-generation service
    pub provider_url: String,
    /// Bearer token for the video-generation service
    pub provider_api_key: Option<String>,
    /// Directory backing the object store
    pub storage_dir: String,
    /// URL prefix under which `storage_dir` is served
    pub public_base_url: String,
    /// Directory holding `<owner_id>/<frame images>`
    pub frames_dir: String,
    /// Whose frames to animate
    pub owner_id: String,

    pub batch_size: usize,
    pub max_retries: u32,
    pub batch_cooldown_secs: f64,
    pub poll_interval_secs: f64,
    pub poll_timeout_secs: f64,
    /// Transport timeout for provider requests, submit included
    pub submit_timeout_secs: f64,
    pub max_wait_secs: f64,
    pub retry_base_delay_ms: u64,
    pub clip_duration_secs: u32,
    pub prompt: String,

    pub output_format: OutputFormat,
    pub quality: f64,
    pub frame_rate: u32,
    pub letterbox_color: Rgb,
    pub fallback: FallbackMode,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Unparseable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl AppConfig {
    /// Load configuration from environment variables, after `.env` if present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let fallback = match var_or("FALLBACK_MODE", "strict").to_ascii_lowercase().as_str() {
            "first_clip" | "first-clip" => FallbackMode::FirstClip,
            _ => FallbackMode::Strict,
        };

        Self {
            provider_url: var_or("PROVIDER_URL", "http://localhost:3001"),
            provider_api_key: env::var("PROVIDER_API_KEY").ok().filter(|k| !k.is_empty()),
            storage_dir: var_or("STORAGE_DIR", "./storage"),
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:8080/media"),
            frames_dir: var_or("FRAMES_DIR", "./frames"),
            owner_id: var_or("OWNER_ID", "default"),

            batch_size: parse_or("BATCH_SIZE", 3),
            max_retries: parse_or("MAX_RETRIES", 2),
            batch_cooldown_secs: parse_or("BATCH_COOLDOWN_SECS", 12.0),
            poll_interval_secs: parse_or("POLL_INTERVAL_SECS", 3.0),
            poll_timeout_secs: parse_or("POLL_TIMEOUT_SECS", 10.0),
            submit_timeout_secs: parse_or("SUBMIT_TIMEOUT_SECS", 600.0),
            max_wait_secs: parse_or("MAX_WAIT_SECS", 600.0),
            retry_base_delay_ms: parse_or("RETRY_BASE_DELAY_MS", 2000),
            clip_duration_secs: parse_or("CLIP_DURATION_SECS", 5),
            prompt: var_or("PROMPT", DEFAULT_PROMPT),

            output_format: parse_or("OUTPUT_FORMAT", OutputFormat::Mp4),
            quality: parse_or("QUALITY", 0.8),
            frame_rate: parse_or("FRAME_RATE", 30),
            letterbox_color: parse_or("LETTERBOX_COLOR", Rgb::BLACK),
            fallback,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            batch_cooldown: secs(self.batch_cooldown_secs),
            poll: PollConfig {
                interval: secs(self.poll_interval_secs),
                call_timeout: secs(self.poll_timeout_secs),
                max_wait: secs(self.max_wait_secs),
            },
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..Default::default()
        }
    }

    pub fn provider_config(&self) -> HttpProviderConfig {
        HttpProviderConfig {
            base_url: self.provider_url.clone(),
            api_key: self.provider_api_key.clone(),
            timeout: secs(self.submit_timeout_secs),
        }
    }

    pub fn reel_options(&self) -> ReelOptions {
        ReelOptions {
            generation: GenerationOptions {
                batch_size: self.batch_size,
                prompt: self.prompt.clone(),
                max_retries: self.max_retries,
                clip_duration_seconds: self.clip_duration_secs,
            },
            merge: MergeOptions {
                output_format: self.output_format,
                quality: self.quality,
                frame_rate: self.frame_rate,
                background: self.letterbox_color,
                fallback: self.fallback,
            },
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}
