//! Run orchestration: list pending payloads, transform each one, write the
//! three tables, archive the input, then refresh the catalog once per run.
//!
//! Files are handled one at a time in listing order. A failure aborts only
//! the file it happened in; that input stays pending and is picked up again
//! by the next run.

use chrono::{DateTime, Local};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::LayoutConfig;
use crate::crawler::{CrawlerTrigger, JobServiceError, TriggerOutcome};
use crate::error::{FileError, TransformError};
use crate::extract::{dedup_first_by, extract_albums, extract_artists, extract_songs};
use crate::models::{HistoryPayload, TransformedBatch};
use crate::normalize::{normalize_albums, normalize_songs};
use crate::output::{archive_key, encode_batch, file_timestamp, output_key};
use crate::progress::{format_elapsed, ProgressMode};
use crate::safety::validate_archive_key;
use crate::storage::{ObjectStore, StorageError};

/// Only keys with this suffix are treated as payloads.
pub const PAYLOAD_SUFFIX: &str = ".json";

/// Transform one raw payload into its three normalized tables.
///
/// Albums and artists are deduplicated by id (first occurrence wins) before
/// date normalization. Any error discards the whole file.
pub fn process_file(bytes: &[u8]) -> Result<TransformedBatch, TransformError> {
    let payload = HistoryPayload::from_slice(bytes)?;

    let mut songs = extract_songs(&payload)?;
    let mut albums = dedup_first_by(extract_albums(&payload), |a| a.album_id.clone());
    let artists = dedup_first_by(extract_artists(&payload), |a| a.artist_id.clone());

    normalize_albums(&mut albums);
    normalize_songs(&mut songs)?;

    Ok(TransformedBatch {
        songs,
        albums,
        artists,
    })
}

/// Outcome of one successfully processed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub input_key: String,
    pub archive_key: String,
    /// Written in order: songs, album, artist.
    pub output_keys: Vec<String>,
    pub songs: usize,
    pub albums: usize,
    pub artists: usize,
}

#[derive(Debug)]
pub struct FailedFile {
    pub key: String,
    pub error: FileError,
}

/// Errors that abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to list pending payloads: {0}")]
    List(#[source] StorageError),

    /// The catalog refresh failed after every file was handled. Carries the
    /// per-file results so they can still be reported.
    #[error("Catalog refresh failed: {source}")]
    Trigger {
        #[source]
        source: JobServiceError,
        summary: Box<RunSummary>,
    },
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: Vec<ProcessedFile>,
    pub failed: Vec<FailedFile>,
    /// `None` when the refresh is disabled.
    pub trigger: Option<TriggerOutcome>,
}

/// Catalog refresh run after all files.
struct CatalogRefresh<'a> {
    trigger: CrawlerTrigger<'a>,
    job_name: String,
}

pub struct Pipeline<'a> {
    store: &'a dyn ObjectStore,
    bucket: String,
    layout: LayoutConfig,
    refresh: Option<CatalogRefresh<'a>>,
    clock: Box<dyn Fn() -> DateTime<Local> + 'a>,
    progress: ProgressMode,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: impl Into<String>, layout: LayoutConfig) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            layout,
            refresh: None,
            clock: Box::new(Local::now),
            progress: ProgressMode::default(),
        }
    }

    /// Start `job_name` through `trigger` once all files are handled.
    pub fn with_catalog_refresh(mut self, trigger: CrawlerTrigger<'a>, job_name: impl Into<String>) -> Self {
        self.refresh = Some(CatalogRefresh {
            trigger,
            job_name: job_name.into(),
        });
        self
    }

    /// Replace the clock used for output file timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Local> + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_progress(mut self, progress: ProgressMode) -> Self {
        self.progress = progress;
        self
    }

    /// Pending payload keys under the input prefix, in listing order.
    pub fn pending_keys(&self) -> Result<Vec<String>, StorageError> {
        let keys = self.store.list(&self.bucket, &self.layout.input_prefix)?;
        Ok(keys
            .into_iter()
            .filter(|k| k.ends_with(PAYLOAD_SUFFIX))
            .collect())
    }

    /// Read, transform, write and archive a single input.
    pub fn process_object(&self, key: &str) -> Result<ProcessedFile, FileError> {
        let archive = archive_key(&self.layout.processed_prefix, key);
        validate_archive_key(key, &archive).map_err(FileError::Safety)?;

        let bytes = self.store.read(&self.bucket, key)?;
        let batch = process_file(&bytes)?;
        let tables = encode_batch(&batch)?;

        let timestamp = file_timestamp(&(self.clock)());
        let mut output_keys = Vec::with_capacity(tables.len());
        for (table, body) in tables {
            let out_key = output_key(&self.layout.output_prefix, table, &timestamp);
            self.store.write(&self.bucket, &out_key, &body)?;
            debug!("Wrote {} ({} bytes)", out_key, body.len());
            output_keys.push(out_key);
        }

        self.store.copy(&self.bucket, key, &self.bucket, &archive)?;
        self.store.delete(&self.bucket, key)?;

        Ok(ProcessedFile {
            input_key: key.to_string(),
            archive_key: archive,
            output_keys,
            songs: batch.songs.len(),
            albums: batch.albums.len(),
            artists: batch.artists.len(),
        })
    }

    /// Process every pending file, then trigger the catalog refresh once,
    /// whether or not any file was pending.
    pub fn run(&self) -> Result<RunSummary, RunError> {
        let start = Instant::now();
        let keys = self.pending_keys().map_err(RunError::List)?;
        info!(
            "Found {} pending payloads under {}/{}",
            keys.len(),
            self.bucket,
            self.layout.input_prefix
        );

        let mut summary = RunSummary::default();
        let pb = self.progress.payload_bar(keys.len());

        for (i, key) in keys.iter().enumerate() {
            match self.process_object(key) {
                Ok(file) => {
                    info!(
                        "Processed {}: {} songs, {} albums, {} artists -> {}",
                        key, file.songs, file.albums, file.artists, file.archive_key
                    );
                    summary.processed.push(file);
                }
                Err(e) => {
                    error!("Failed to process {}: {}", key, e);
                    summary.failed.push(FailedFile {
                        key: key.clone(),
                        error: e,
                    });
                }
            }
            pb.inc(1);
            self.progress.log_payload(i + 1, keys.len(), key);
        }

        pb.finish_with_message(format!(
            "Transformed {}/{} payloads in {}",
            summary.processed.len(),
            keys.len(),
            format_elapsed(start.elapsed())
        ));

        match self.trigger_catalog_refresh() {
            Ok(outcome) => summary.trigger = outcome,
            Err(source) => {
                return Err(RunError::Trigger {
                    source,
                    summary: Box::new(summary),
                })
            }
        }

        Ok(summary)
    }

    /// Start the configured catalog job. `None` when no refresh is configured.
    pub fn trigger_catalog_refresh(&self) -> Result<Option<TriggerOutcome>, JobServiceError> {
        let Some(refresh) = &self.refresh else {
            debug!("Catalog refresh disabled");
            return Ok(None);
        };
        let outcome = refresh.trigger.start_with_retry(&refresh.job_name)?;
        if !outcome.is_started() {
            warn!("Catalog job {} was not started", refresh.job_name);
        }
        Ok(Some(outcome))
    }
}
