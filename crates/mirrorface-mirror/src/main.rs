//! CLI entry point for the mirroring tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mirrorface_mirror::{run_mirror, MirrorSettings};

/// Mirror a model repository from a hub into a local content-addressed store.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository to mirror, e.g. "org/model-name".
    #[arg(long)]
    repository: String,

    /// Branch name, tag, or 40-character commit hash to mirror.
    #[arg(long, default_value = "main")]
    revision: String,

    /// Root of the local content-addressed store. Defaults to a fresh
    /// temporary directory.
    #[arg(long)]
    local_directory: Option<PathBuf>,

    /// Base URL of the upstream hub.
    #[arg(long, default_value = "https://huggingface.co")]
    upstream_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();

    let local_directory = match args.local_directory {
        Some(dir) => dir,
        None => {
            let dir = tempfile::tempdir()?.into_path();
            tracing::info!(dir = %dir.display(), "no --local-directory given, using a fresh tempdir");
            dir
        }
    };

    let settings = MirrorSettings {
        repository: args.repository,
        revision: args.revision,
        local_directory,
        upstream_url: args.upstream_url,
        skip_prefixes: vec![".cache/huggingface/".to_string()],
    };

    run_mirror(&settings).await?;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
