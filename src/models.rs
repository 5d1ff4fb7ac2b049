//! Core data models for the history transform.
//!
//! Two families of types live here: the typed view of a raw "recently
//! played" payload (deserialize-only) and the flat records written out as
//! CSV rows (serialize-only).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::TransformError;

/// Reads a leaf as cell text. The key must be present; `null` becomes `None`.
/// Any other JSON value is accepted: strings as-is, everything else as its
/// compact JSON text (`215000.0`, `true`).
fn cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.map(|value| match value {
        Value::String(s) => s,
        other => other.to_string(),
    }))
}

// ============================================================================
// Payload Models
// ============================================================================

/// One parsed input file: a batch of playback events.
#[derive(Clone, Debug, Deserialize)]
pub struct HistoryPayload {
    pub items: Vec<PlaybackItem>,
}

impl HistoryPayload {
    /// Validating parse. Fails fast with the name and position of the first
    /// missing key instead of letting the gap surface during extraction.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TransformError> {
        serde_json::from_slice(bytes).map_err(|e| TransformError::MalformedPayload(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One playback event wrapping a single track.
#[derive(Clone, Debug, Deserialize)]
pub struct PlaybackItem {
    pub track: TrackPayload,
    #[serde(deserialize_with = "cell")]
    pub added_at: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrackPayload {
    #[serde(deserialize_with = "cell")]
    pub id: Option<String>,
    #[serde(deserialize_with = "cell")]
    pub name: Option<String>,
    #[serde(deserialize_with = "cell")]
    pub duration_ms: Option<String>,
    pub external_urls: ExternalUrls,
    #[serde(deserialize_with = "cell")]
    pub popularity: Option<String>,
    pub album: AlbumPayload,
    pub artists: Vec<ArtistPayload>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AlbumPayload {
    #[serde(deserialize_with = "cell")]
    pub id: Option<String>,
    #[serde(deserialize_with = "cell")]
    pub name: Option<String>,
    #[serde(deserialize_with = "cell")]
    pub release_date: Option<String>,
    #[serde(deserialize_with = "cell")]
    pub total_tracks: Option<String>,
    pub external_urls: ExternalUrls,
    /// Album-level credits. Only the first entry's id is read (as the song's
    /// `artist_id`), so nothing else is required here.
    pub artists: Vec<AlbumArtist>,
}

/// Artist credited on a track.
#[derive(Clone, Debug, Deserialize)]
pub struct ArtistPayload {
    #[serde(deserialize_with = "cell")]
    pub id: Option<String>,
    #[serde(deserialize_with = "cell")]
    pub name: Option<String>,
    #[serde(deserialize_with = "cell")]
    pub href: Option<String>,
}

/// Artist credited on an album.
#[derive(Clone, Debug, Deserialize)]
pub struct AlbumArtist {
    #[serde(deserialize_with = "cell")]
    pub id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExternalUrls {
    #[serde(deserialize_with = "cell")]
    pub spotify: Option<String>,
}

// ============================================================================
// Output Records
// ============================================================================

/// Album row, deduplicated by `album_id` before output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlbumRecord {
    pub album_id: Option<String>,
    pub name: Option<String>,
    /// Raw value after extraction; `YYYY-MM-DD` (or empty) after normalization.
    pub release_date: Option<String>,
    pub total_tracks: Option<String>,
    pub url: Option<String>,
}

/// Artist row, deduplicated by `artist_id` before output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArtistRecord {
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub external_url: Option<String>,
}

/// Song row, one per playback item. Never deduplicated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SongRecord {
    pub song_id: Option<String>,
    pub song_name: Option<String>,
    pub duration_ms: Option<String>,
    pub url: Option<String>,
    pub popularity: Option<String>,
    pub song_added: Option<String>,
    pub album_id: Option<String>,
    /// First artist of the *album's* credits, not the track's.
    pub artist_id: Option<String>,
}

/// The three normalized, deduplicated tables produced from one input file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformedBatch {
    pub songs: Vec<SongRecord>,
    pub albums: Vec<AlbumRecord>,
    pub artists: Vec<ArtistRecord>,
}
