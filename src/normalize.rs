//! Date normalization applied after extraction.
//!
//! The two date columns are deliberately treated differently: a bad album
//! `release_date` degrades to an empty cell, a bad `song_added` fails the
//! whole file.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::TransformError;
use crate::models::{AlbumRecord, SongRecord};

/// Output format for normalized release dates.
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Naive timestamp layouts accepted for `added_at` (read as UTC).
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a release date at any of the three precisions Spotify reports
/// (`day`, `month`, `year`). Partial dates land on the first day of the
/// period. Year zero (Spotify's "unknown") is rejected.
pub fn normalize_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01-01"), "%Y-%m-%d"))
        .ok()
        .filter(|d| d.year() > 0)
}

/// Parse a playback timestamp. RFC 3339 first, then naive layouts as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS[.ffffff]+00:00`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false).replacen('T', " ", 1)
}

/// Rewrite `release_date` in place. Unparseable values become `None`.
pub fn normalize_albums(albums: &mut [AlbumRecord]) {
    for album in albums {
        album.release_date = album
            .release_date
            .as_deref()
            .and_then(normalize_release_date)
            .map(|d| d.format(RELEASE_DATE_FORMAT).to_string());
    }
}

/// Strict timestamp normalization for one song. `None` stays `None`; a value
/// that is present but unparseable is an error.
pub fn normalize_song_added(song: &SongRecord) -> Result<Option<DateTime<Utc>>, TransformError> {
    let Some(raw) = song.song_added.as_deref() else {
        return Ok(None);
    };
    parse_timestamp(raw)
        .map(Some)
        .ok_or_else(|| TransformError::InvalidTimestamp {
            song_id: song.song_id.clone().unwrap_or_default(),
            value: raw.to_string(),
        })
}

/// Rewrite `song_added` in place. A non-null value that doesn't parse fails
/// the batch.
pub fn normalize_songs(songs: &mut [SongRecord]) -> Result<(), TransformError> {
    for song in songs {
        song.song_added = normalize_song_added(song)?.map(|ts| format_timestamp(&ts));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(release_date: Option<&str>) -> AlbumRecord {
        AlbumRecord {
            album_id: Some("al1".to_string()),
            name: Some("Album".to_string()),
            release_date: release_date.map(str::to_string),
            total_tracks: Some("10".to_string()),
            url: None,
        }
    }

    fn song(added: Option<&str>) -> SongRecord {
        SongRecord {
            song_id: Some("t1".to_string()),
            song_name: None,
            duration_ms: None,
            url: None,
            popularity: None,
            song_added: added.map(str::to_string),
            album_id: None,
            artist_id: None,
        }
    }

    #[test]
    fn test_release_date_precisions() {
        assert_eq!(normalize_release_date("1981-12-04"), NaiveDate::from_ymd_opt(1981, 12, 4));
        assert_eq!(normalize_release_date("1981-12"), NaiveDate::from_ymd_opt(1981, 12, 1));
        assert_eq!(normalize_release_date("1981"), NaiveDate::from_ymd_opt(1981, 1, 1));
        assert_eq!(normalize_release_date("0000"), None);
        assert_eq!(normalize_release_date("not-a-date"), None);
    }

    #[test]
    fn test_bad_release_date_is_tolerated() {
        let mut albums = vec![album(Some("not-a-date")), album(Some("2020-02")), album(None)];
        normalize_albums(&mut albums);
        assert_eq!(albums[0].release_date, None);
        assert_eq!(albums[1].release_date.as_deref(), Some("2020-02-01"));
        assert_eq!(albums[2].release_date, None);
    }

    #[test]
    fn test_song_added_formats() {
        let mut songs = vec![
            song(Some("2024-05-01T12:34:56Z")),
            song(Some("2024-05-01T12:34:56.789Z")),
            song(Some("2024-05-01T14:34:56+02:00")),
            song(Some("2024-05-01 12:34:56")),
            song(None),
        ];
        normalize_songs(&mut songs).unwrap();
        assert_eq!(songs[0].song_added.as_deref(), Some("2024-05-01 12:34:56+00:00"));
        assert_eq!(songs[1].song_added.as_deref(), Some("2024-05-01 12:34:56.789+00:00"));
        assert_eq!(songs[2].song_added.as_deref(), Some("2024-05-01 12:34:56+00:00"));
        assert_eq!(songs[3].song_added.as_deref(), Some("2024-05-01 12:34:56+00:00"));
        assert_eq!(songs[4].song_added, None);
    }

    #[test]
    fn test_normalize_song_added_null_and_valid() {
        assert_eq!(normalize_song_added(&song(None)).unwrap(), None);
        let ts = normalize_song_added(&song(Some("2024-05-01T12:34:56Z"))).unwrap().unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-01 12:34:56+00:00");
    }

    #[test]
    fn test_bad_song_added_fails() {
        let mut songs = vec![song(Some("2024-05-01T12:34:56Z")), song(Some("not-a-date"))];
        let err = normalize_songs(&mut songs).unwrap_err();
        match err {
            TransformError::InvalidTimestamp { song_id, value } => {
                assert_eq!(song_id, "t1");
                assert_eq!(value, "not-a-date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
