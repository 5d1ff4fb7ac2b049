//! Shared test fixtures: payload builders and in-memory collaborators.

use chrono::{DateTime, Local, NaiveDate};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use crate::crawler::{CatalogJobService, JobServiceError, JobState, StartConfirmation};
use crate::models::HistoryPayload;
use crate::storage::{ObjectStore, StorageError};

// ============================================================================
// Payload builders
// ============================================================================

fn artist(id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Artist {id}"),
        "href": format!("https://api.spotify.com/v1/artists/{id}"),
        "type": "artist",
    })
}

/// A playback item shaped like the recently-played API response.
pub fn item(track_id: &str, album_id: &str, track_artists: &[&str], album_artist: &str) -> Value {
    json!({
        "added_at": "2024-05-01T12:34:56Z",
        "track": {
            "id": track_id,
            "name": format!("Track {track_id}"),
            "duration_ms": 215_000,
            "popularity": 61,
            "external_urls": { "spotify": format!("https://open.spotify.com/track/{track_id}") },
            "artists": track_artists.iter().map(|a| artist(a)).collect::<Vec<_>>(),
            "album": {
                "id": album_id,
                "name": format!("Album {album_id}"),
                "release_date": "2020-01-15",
                "release_date_precision": "day",
                "total_tracks": 12,
                "external_urls": { "spotify": format!("https://open.spotify.com/album/{album_id}") },
                "artists": [artist(album_artist)],
            },
        },
    })
}

pub fn payload_bytes(items: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({ "items": items, "limit": 50 })).unwrap()
}

pub fn payload(items: Vec<Value>) -> HistoryPayload {
    HistoryPayload::from_slice(&payload_bytes(items)).unwrap()
}

pub fn fixed_clock(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> impl Fn() -> DateTime<Local> {
    let at = NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
        .and_local_timezone(Local)
        .earliest()
        .unwrap();
    move || at
}

// ============================================================================
// In-memory object store
// ============================================================================

/// Object store over a sorted map, with switchable failures.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RefCell<BTreeMap<(String, String), Vec<u8>>>,
    fail_copy: Cell<bool>,
    fail_list: Cell<bool>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .borrow_mut()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .borrow()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn fail_copies(&self) {
        self.fail_copy.set(true);
    }

    pub fn fail_lists(&self) {
        self.fail_list.set(true);
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        if self.fail_list.get() {
            return Err(StorageError::Backend("list failed".into()));
        }
        Ok(self
            .objects
            .borrow()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }

    fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get(bucket, key)
            .ok_or_else(|| StorageError::not_found(bucket, key))
    }

    fn write(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.insert(bucket, key, data.to_vec());
        Ok(())
    }

    fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), StorageError> {
        if self.fail_copy.get() {
            return Err(StorageError::Backend("copy failed".into()));
        }
        let data = self.read(src_bucket, src_key)?;
        self.insert(dst_bucket, dst_key, data);
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.objects
            .borrow_mut()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

// ============================================================================
// Scripted catalog job service
// ============================================================================

/// Returns scripted status results in order, repeating the last one forever.
pub struct ScriptedJobService {
    script: RefCell<VecDeque<Result<JobState, JobServiceError>>>,
    fail_start: bool,
    status_calls: Cell<usize>,
    start_calls: Cell<usize>,
}

impl ScriptedJobService {
    pub fn scripted(script: Vec<Result<JobState, JobServiceError>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one status");
        Self {
            script: RefCell::new(script.into()),
            fail_start: false,
            status_calls: Cell::new(0),
            start_calls: Cell::new(0),
        }
    }

    pub fn always(status: Result<JobState, JobServiceError>) -> Self {
        Self::scripted(vec![status])
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.get()
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.get()
    }
}

impl CatalogJobService for ScriptedJobService {
    fn get_status(&self, _job_name: &str) -> Result<JobState, JobServiceError> {
        self.status_calls.set(self.status_calls.get() + 1);
        let mut script = self.script.borrow_mut();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script[0].clone()
        }
    }

    fn start(&self, job_name: &str) -> Result<StartConfirmation, JobServiceError> {
        self.start_calls.set(self.start_calls.get() + 1);
        if self.fail_start {
            return Err(JobServiceError::Start(format!("{job_name} is already running")));
        }
        Ok(StartConfirmation {
            job_name: job_name.to_string(),
            request_id: None,
        })
    }
}
