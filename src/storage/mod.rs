//! Object storage capability.
//!
//! The pipeline only needs five blocking operations on `(bucket, key)`
//! pairs. Nothing here retries; a failed call aborts the current file.

mod local;
#[cfg(feature = "aws")]
mod s3;

pub use local::LocalObjectStore;
#[cfg(feature = "aws")]
pub use s3::S3ObjectStore;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object key {0:?}")]
    InvalidKey(String),

    #[error("Object store error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

/// Blocking object store used by the pipeline.
pub trait ObjectStore {
    /// Keys under `prefix`, in lexicographic order.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or overwrite an object.
    fn write(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), StorageError>;

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}
