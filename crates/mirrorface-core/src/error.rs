//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("storage error: {0}")]
    Storage(#[from] mirrorface_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed manifest json: {0}")]
    CorruptManifest(#[from] serde_json::Error),

    #[error("repository or revision contains '--', cannot derive a store key")]
    InvalidKey,

    #[error(
        "full manifest for {repository}@{revision} claims revision_hash {claimed}, expected {expected}"
    )]
    InconsistentManifest {
        repository: String,
        revision: String,
        claimed: String,
        expected: String,
    },

    #[error("redirect {repository}@{revision} -> {target} did not resolve to a full manifest")]
    InconsistentRedirect {
        repository: String,
        revision: String,
        target: String,
    },
}
