//! Environment-only configuration, loaded under the `MIRRORFACE_` prefix.

use anyhow::{Context, Result};
use serde::Deserialize;

fn default_upstream_url() -> String {
    "https://huggingface.co".to_string()
}

fn default_chunk_size() -> usize {
    8 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub local_directory: String,
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Config {
    /// Load from `MIRRORFACE_*` environment variables only — no config file,
    /// no CLI flags.
    pub fn load() -> Result<Self> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("MIRRORFACE"))
            .build()
            .context("failed to read MIRRORFACE_* environment variables")?
            .try_deserialize()
            .context("MIRRORFACE_LOCAL_DIRECTORY must be set")
    }
}
