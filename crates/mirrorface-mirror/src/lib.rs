//! The mirroring tool: pull a repository at a revision from the upstream hub
//! and materialize it into the local content-addressed store.

pub mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::info;

use mirrorface_core::hub::RepositoryRevision;
use mirrorface_core::manifest::FullManifest;
use mirrorface_core::store::{write_full_manifest, write_redirect_manifest};
use mirrorface_proxy::HubClient;
use mirrorface_storage::{adopt_blob, hash_file};

pub use error::MirrorError;

/// A prefix a downloader's own cache bookkeeping would live under, and which
/// should never be treated as part of the repository's file set.
fn default_skip_prefixes() -> Vec<String> {
    vec![".cache/huggingface/".to_string()]
}

/// Maximum number of files downloaded concurrently.
const DOWNLOAD_CONCURRENCY: usize = 8;

pub struct MirrorSettings {
    pub repository: String,
    pub revision: String,
    pub local_directory: PathBuf,
    pub upstream_url: String,
    pub skip_prefixes: Vec<String>,
}

impl MirrorSettings {
    pub fn new(repository: impl Into<String>, local_directory: PathBuf) -> Self {
        Self {
            repository: repository.into(),
            revision: "main".to_string(),
            local_directory,
            upstream_url: "https://huggingface.co".to_string(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

/// Mirror `settings.repository`@`settings.revision` into the local store.
///
/// Writes happen in the order blobs, then the full manifest, then (if the
/// requested revision was symbolic) the redirect manifest — so a reader can
/// never observe a manifest that references a blob or target manifest that
/// hasn't been written yet.
pub async fn run_mirror(settings: &MirrorSettings) -> Result<(), MirrorError> {
    let client = HubClient::new(settings.upstream_url.clone());

    let commit = client
        .normalize_revision(&settings.repository, &settings.revision)
        .await?;
    info!(
        repository = %settings.repository,
        revision = %settings.revision,
        commit = %commit,
        "resolved revision to a commit hash"
    );

    let all_files = client
        .list_files_recursive(&settings.repository, &commit)
        .await?;
    let files: Vec<String> = all_files
        .into_iter()
        .filter(|path| {
            !settings
                .skip_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
        })
        .collect();
    info!(count = files.len(), "files to mirror");

    let results: Vec<Result<(String, String), MirrorError>> = stream::iter(files)
        .map(|path| {
            let client = &client;
            let root = settings.local_directory.as_path();
            let repository = settings.repository.as_str();
            let commit = commit.as_str();
            async move {
                let hash = download_and_store(root, client, repository, commit, &path).await?;
                Ok((path, hash))
            }
        })
        .buffer_unordered(DOWNLOAD_CONCURRENCY)
        .collect()
        .await;

    let mut manifest_files = HashMap::new();
    for result in results {
        let (path, hash) = result?;
        manifest_files.insert(path, hash);
    }

    let commit_rr = RepositoryRevision::new(settings.repository.clone(), commit.clone());
    write_full_manifest(
        &settings.local_directory,
        &commit_rr,
        FullManifest {
            revision_hash: commit.clone(),
            files: manifest_files,
        },
    )
    .await?;

    if settings.revision != commit {
        let symbolic_rr = RepositoryRevision::new(settings.repository.clone(), settings.revision.clone());
        write_redirect_manifest(&settings.local_directory, &symbolic_rr, &commit).await?;
    }

    info!(repository = %settings.repository, commit = %commit, "mirror complete");
    Ok(())
}

async fn download_and_store(
    root: &Path,
    client: &HubClient,
    repository: &str,
    commit: &str,
    path: &str,
) -> Result<String, MirrorError> {
    let staging_dir = root.join(".staging");
    tokio::fs::create_dir_all(&staging_dir).await?;

    let named = tempfile::NamedTempFile::new_in(&staging_dir)?;
    let (std_file, staging_path) = named.into_parts();
    let mut file = tokio::fs::File::from_std(std_file);

    let mut stream = client.download_file(repository, commit, path).await?;
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    drop(file);

    let hash = hash_file(&staging_path).await?;
    adopt_blob(root, &hash, &staging_path).await?;
    Ok(hash)
}
