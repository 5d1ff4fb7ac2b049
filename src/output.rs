//! CSV encoding of the output tables and the object key layout.
//!
//! Key layout (kept stable for the downstream crawler):
//!
//! ```text
//! {output_prefix}{table}_data/{table}_transformed_{YYYY-MM-DD_HH-MM-SS}.csv
//! {processed_prefix}{original_filename}
//! ```

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::error::TransformError;
use crate::models::{AlbumRecord, ArtistRecord, SongRecord, TransformedBatch};

/// Timestamp format embedded in output file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Output table kinds, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Songs,
    Album,
    Artist,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Songs, Table::Album, Table::Artist];

    /// Name used in both the directory and the file name.
    pub fn name(self) -> &'static str {
        match self {
            Table::Songs => "songs",
            Table::Album => "album",
            Table::Artist => "artist",
        }
    }
}

/// A row type with a fixed column order. The header row is written from
/// `COLUMNS` so empty tables still carry one.
pub trait CsvRecord: Serialize {
    const TABLE: Table;
    const COLUMNS: &'static [&'static str];
}

impl CsvRecord for SongRecord {
    const TABLE: Table = Table::Songs;
    const COLUMNS: &'static [&'static str] = &[
        "song_id",
        "song_name",
        "duration_ms",
        "url",
        "popularity",
        "song_added",
        "album_id",
        "artist_id",
    ];
}

impl CsvRecord for AlbumRecord {
    const TABLE: Table = Table::Album;
    const COLUMNS: &'static [&'static str] =
        &["album_id", "name", "release_date", "total_tracks", "url"];
}

impl CsvRecord for ArtistRecord {
    const TABLE: Table = Table::Artist;
    const COLUMNS: &'static [&'static str] = &["artist_id", "artist_name", "external_url"];
}

/// Encode rows as comma-delimited text with a header row.
pub fn encode_csv<R: CsvRecord>(rows: &[R]) -> Result<Vec<u8>, TransformError> {
    let encode_err = |source: csv::Error| TransformError::Encode {
        table: R::TABLE.name(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(R::COLUMNS).map_err(encode_err)?;
    for row in rows {
        writer.serialize(row).map_err(encode_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| encode_err(csv::Error::from(e.into_error())))
}

/// Encode all three tables, in write order.
pub fn encode_batch(batch: &TransformedBatch) -> Result<Vec<(Table, Vec<u8>)>, TransformError> {
    Ok(vec![
        (Table::Songs, encode_csv(&batch.songs)?),
        (Table::Album, encode_csv(&batch.albums)?),
        (Table::Artist, encode_csv(&batch.artists)?),
    ])
}

/// Format a write-time timestamp for output file names.
pub fn file_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `{output_prefix}{table}_data/{table}_transformed_{timestamp}.csv`
pub fn output_key(output_prefix: &str, table: Table, timestamp: &str) -> String {
    let name = table.name();
    format!("{output_prefix}{name}_data/{name}_transformed_{timestamp}.csv")
}

/// `{processed_prefix}{original_filename}`, where the file name is the last
/// `/` segment of the input key.
pub fn archive_key(processed_prefix: &str, input_key: &str) -> String {
    let file_name = input_key.rsplit('/').next().unwrap_or(input_key);
    format!("{processed_prefix}{file_name}")
}
