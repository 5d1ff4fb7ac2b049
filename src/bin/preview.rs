//! Run the transform on a local payload without touching storage or the
//! crawler.
//!
//! Usage: preview-transform <payload.json> [--out DIR]
//!
//! With `--out`, the three CSVs are written under DIR using the same
//! `{table}_data/{table}_transformed_{timestamp}.csv` layout as a real run.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;
use std::time::Instant;

use spotify_transform::output::{encode_batch, file_timestamp, output_key};
use spotify_transform::pipeline::process_file;
use spotify_transform::progress::format_elapsed;
use spotify_transform::storage::{LocalObjectStore, ObjectStore};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: preview-transform <payload.json> [--out DIR]");
        std::process::exit(1);
    }

    let input = PathBuf::from(&args[1]);
    let out_dir: Option<PathBuf> = args
        .iter()
        .position(|a| a == "--out")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let start = Instant::now();

    let bytes = std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let batch = process_file(&bytes).with_context(|| format!("Failed to transform {}", input.display()))?;

    println!("Payload: {}", input.display());
    println!("  Songs:   {}", batch.songs.len());
    println!("  Albums:  {}", batch.albums.len());
    println!("  Artists: {}", batch.artists.len());

    let undated = batch.albums.iter().filter(|a| a.release_date.is_none()).count();
    if undated > 0 {
        println!("  Albums without a usable release date: {}", undated);
    }

    if let Some(dir) = out_dir {
        // The output directory plays the role of a single bucket.
        let parent = dir.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        let bucket = dir
            .file_name()
            .and_then(|n| n.to_str())
            .context("--out must name a directory")?
            .to_string();
        let store = LocalObjectStore::new(parent);

        let timestamp = file_timestamp(&Local::now());
        for (table, body) in encode_batch(&batch)? {
            let key = output_key("", table, &timestamp);
            store.write(&bucket, &key, &body)?;
            println!("  Wrote {}", dir.join(&key).display());
        }
    }

    println!("Elapsed: {}", format_elapsed(start.elapsed()));
    Ok(())
}
