//! Error types for the transform job.
//!
//! Library modules return typed errors built with `thiserror`; the binaries
//! wrap them in `anyhow` for context and reporting.
//!
//! - [`TransformError`]: the payload could not be turned into records.
//! - [`FileError`]: anything that aborts the processing of one input file.
//!
//! Storage and crawler errors live next to their traits
//! ([`crate::storage::StorageError`], [`crate::crawler::JobServiceError`]).

use crate::storage::StorageError;

/// Failure to extract or normalize one payload. Always aborts the whole file;
/// no partial tables are produced.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Missing or mistyped key somewhere in the payload shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// `added_at` held a non-null value that is not a timestamp.
    #[error("Invalid song_added timestamp {value:?} for song {song_id}")]
    InvalidTimestamp { song_id: String, value: String },

    /// CSV encoding of one of the output tables failed.
    #[error("Failed to encode {table} rows: {source}")]
    Encode {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
}

impl TransformError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }
}

/// Why a single input file was left unprocessed.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The archive move would have deleted its own source.
    #[error(transparent)]
    Safety(anyhow::Error),
}
