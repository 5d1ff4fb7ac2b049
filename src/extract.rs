//! Record extraction: flattens a parsed payload into album, artist and song
//! rows.
//!
//! Extraction keeps insertion order and never deduplicates; callers collapse
//! albums and artists with [`dedup_first_by`].

use rustc_hash::FxHashSet;
use std::hash::Hash;

use crate::error::TransformError;
use crate::models::{AlbumRecord, ArtistRecord, HistoryPayload, SongRecord};

/// One album row per item, taken from `item.track.album`.
pub fn extract_albums(payload: &HistoryPayload) -> Vec<AlbumRecord> {
    payload
        .items
        .iter()
        .map(|item| {
            let album = &item.track.album;
            AlbumRecord {
                album_id: album.id.clone(),
                name: album.name.clone(),
                release_date: album.release_date.clone(),
                total_tracks: album.total_tracks.clone(),
                url: album.external_urls.spotify.clone(),
            }
        })
        .collect()
}

/// One artist row per entry of `item.track.artists`, in listed order.
pub fn extract_artists(payload: &HistoryPayload) -> Vec<ArtistRecord> {
    payload
        .items
        .iter()
        .flat_map(|item| item.track.artists.iter())
        .map(|artist| ArtistRecord {
            artist_id: artist.id.clone(),
            artist_name: artist.name.clone(),
            external_url: artist.href.clone(),
        })
        .collect()
}

/// One song row per item.
///
/// `artist_id` comes from the album's first credited artist, not from the
/// track's own artist list. Fails if an album has no credited artists.
pub fn extract_songs(payload: &HistoryPayload) -> Result<Vec<SongRecord>, TransformError> {
    payload
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let track = &item.track;
            let album_artist = track.album.artists.first().ok_or_else(|| {
                TransformError::malformed(format!(
                    "items[{}].track.album.artists is empty (track {})",
                    index,
                    track.id.as_deref().unwrap_or("<null>")
                ))
            })?;

            Ok(SongRecord {
                song_id: track.id.clone(),
                song_name: track.name.clone(),
                duration_ms: track.duration_ms.clone(),
                url: track.external_urls.spotify.clone(),
                popularity: track.popularity.clone(),
                song_added: item.added_at.clone(),
                album_id: track.album.id.clone(),
                artist_id: album_artist.id.clone(),
            })
        })
        .collect()
}

/// First-occurrence deduplication: keeps the earliest record for each key,
/// in original order.
pub fn dedup_first_by<T, K, F>(records: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen: FxHashSet<K> = FxHashSet::default();
    records.into_iter().filter(|r| seen.insert(key(r))).collect()
}
