//! Mirroring tool error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("proxy error: {0}")]
    Proxy(#[from] mirrorface_proxy::ProxyError),

    #[error("storage error: {0}")]
    Storage(#[from] mirrorface_storage::StorageError),

    #[error("core error: {0}")]
    Core(#[from] mirrorface_core::CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
