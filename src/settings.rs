use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

pub const DEFAULT_INFERENCE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.2-11B-Vision-Instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_DB_PATH: &str = "data/detections.sqlite";

/// Runtime settings, read from `DETECT_*` environment variables over built-in defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub imgur_client_id: Option<String>,
    pub hf_api_key: Option<String>,
    pub inference_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub db_path: PathBuf,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix("DETECT"))
    }

    fn from_env(env: Environment) -> Result<Self> {
        Config::builder()
            .set_default("inference_url", DEFAULT_INFERENCE_URL)?
            .set_default("model", DEFAULT_MODEL)?
            .set_default("max_tokens", i64::from(DEFAULT_MAX_TOKENS))?
            .set_default("db_path", DEFAULT_DB_PATH)?
            .add_source(env)
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn imgur_client_id(&self) -> Result<&str> {
        self.imgur_client_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("DETECT_IMGUR_CLIENT_ID environment variable must be set to upload images")
    }

    pub fn hf_api_key(&self) -> Result<&str> {
        self.hf_api_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("DETECT_HF_API_KEY environment variable must be set to describe images")
    }
}
