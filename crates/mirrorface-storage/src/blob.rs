//! Content-addressed blob I/O
//!
//! Blobs live at `<root>/blob/<hash>`, keyed by the hex SHA-512 of their
//! contents. Nothing here knows about repositories or manifests — that
//! lives one layer up, in `mirrorface-core`.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use sha2::{Digest, Sha512};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::error::StorageError;

/// Length of a hex-encoded SHA-512 digest.
pub const HASH_LEN: usize = 128;

/// Streaming chunk size used when hashing files, matching the original
/// mirroring tool's `f.read(1024 * 1024)` loop.
const HASH_CHUNK_SIZE: usize = 1024 * 1024;

pub type ByteStream = std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Check that `hash` looks like a well-formed blob hash (128 lowercase hex chars).
pub fn validate_hash(hash: &str) -> Result<(), StorageError> {
    if hash.len() == HASH_LEN
        && hash.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
    {
        Ok(())
    } else {
        Err(StorageError::InvalidHash(hash.to_string()))
    }
}

/// Path of the blob directory under `root`.
pub fn blob_dir(root: &Path) -> PathBuf {
    root.join("blob")
}

/// Path of a single blob under `root`.
pub fn blob_path(root: &Path, hash: &str) -> PathBuf {
    blob_dir(root).join(hash)
}

/// Hash a file's contents with SHA-512, streaming it through in 1 MiB
/// buffers so large model files never need to be fully resident in memory.
pub async fn hash_file(path: &Path) -> Result<String, StorageError> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha512::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Move `staging_path` into the blob store under its content hash,
/// discarding it if a blob with that hash already exists.
///
/// This is the writer side used by the mirroring tool: the caller has
/// already computed `hash` (typically via [`hash_file`]) for the file at
/// `staging_path`.
pub async fn adopt_blob(root: &Path, hash: &str, staging_path: &Path) -> Result<(), StorageError> {
    validate_hash(hash)?;
    let dest = blob_path(root, hash);

    if fs::try_exists(&dest).await? {
        debug!("blob {} already present, discarding staged file", hash);
        fs::remove_file(staging_path).await?;
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::rename(staging_path, &dest).await?;
    Ok(())
}

/// Check whether a blob exists.
pub async fn exists(root: &Path, hash: &str) -> Result<bool, StorageError> {
    validate_hash(hash)?;
    Ok(fs::try_exists(blob_path(root, hash)).await?)
}

/// Get the size in bytes of a blob.
pub async fn size(root: &Path, hash: &str) -> Result<u64, StorageError> {
    validate_hash(hash)?;
    let path = blob_path(root, hash);
    let meta = fs::metadata(&path)
        .await
        .map_err(|e| not_found_or_io(e, hash))?;
    Ok(meta.len())
}

/// Open a blob as a bounded-memory byte stream.
pub async fn open_stream(root: &Path, hash: &str) -> Result<ByteStream, StorageError> {
    validate_hash(hash)?;
    let path = blob_path(root, hash);
    debug!("streaming blob from {:?}", path);

    let file = File::open(&path).await.map_err(|e| not_found_or_io(e, hash))?;
    let reader = BufReader::new(file);
    let stream = tokio_util::io::ReaderStream::new(reader);

    Ok(Box::pin(stream.map(|r| r.map_err(StorageError::Io))))
}

/// Write a blob directly from an in-memory buffer (used by tests and small
/// fixtures; the mirroring tool uses [`adopt_blob`] instead to avoid
/// double-buffering downloaded files).
pub async fn write(root: &Path, data: &[u8]) -> Result<String, StorageError> {
    let mut hasher = Sha512::new();
    hasher.update(data);
    let hash = hex::encode(hasher.finalize());

    let dest = blob_path(root, &hash);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    if !fs::try_exists(&dest).await? {
        let tmp = dest.with_extension("tmp");
        let mut f = File::create(&tmp).await?;
        f.write_all(data).await?;
        f.flush().await?;
        drop(f);
        fs::rename(&tmp, &dest).await?;
    }

    Ok(hash)
}

fn not_found_or_io(e: std::io::Error, hash: &str) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(hash.to_string())
    } else {
        StorageError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_and_read_round_trip() {
        let root = tempdir().unwrap();
        let hash = write(root.path(), b"file1").await.unwrap();
        assert_eq!(hash.len(), HASH_LEN);
        assert!(exists(root.path(), &hash).await.unwrap());
        assert_eq!(size(root.path(), &hash).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn same_content_same_hash_regardless_of_source() {
        let root = tempdir().unwrap();
        let h1 = write(root.path(), b"identical bytes").await.unwrap();
        let h2 = write(root.path(), b"identical bytes").await.unwrap();
        assert_eq!(h1, h2);
    }

    #[tokio::test]
    async fn adopt_blob_discards_when_already_present() {
        let root = tempdir().unwrap();
        let hash = write(root.path(), b"dup").await.unwrap();

        let staging = root.path().join("staged");
        tokio::fs::write(&staging, b"dup").await.unwrap();
        adopt_blob(root.path(), &hash, &staging).await.unwrap();
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn hash_file_matches_in_memory_hash() {
        let root = tempdir().unwrap();
        let path = root.path().join("f.bin");
        tokio::fs::write(&path, b"some content to hash").await.unwrap();
        let streamed = hash_file(&path).await.unwrap();

        let mut hasher = Sha512::new();
        hasher.update(b"some content to hash");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(streamed, expected);
    }

    #[tokio::test]
    async fn invalid_hash_rejected() {
        let root = tempdir().unwrap();
        assert!(exists(root.path(), "not-a-hash").await.is_err());
    }
}
