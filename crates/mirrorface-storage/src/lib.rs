//! Content-addressed blob storage for mirrorface-cache.
//!
//! A single concrete implementation over a local directory root — there is
//! no pluggable backend trait here, since the store is always a local
//! directory.

pub mod blob;
pub mod error;

pub use blob::{
    adopt_blob, blob_dir, blob_path, exists, hash_file, open_stream, size, validate_hash, write,
    ByteStream, HASH_LEN,
};
pub use error::StorageError;
