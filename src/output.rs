//! Output formatting and persistence for cleaned tables and run summaries.
//!
//! Tables are written as CSV, gzip-compressed when asked or when the path
//! ends in `.gz`.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::stats::BatchStats;

/// Logs a run summary using Rust's debug pretty-print format.
pub fn print_pretty(stats: &BatchStats) {
    debug!("{:#?}", stats);
}

/// Logs a run summary as pretty-printed JSON.
pub fn print_json(stats: &BatchStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<W> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV: {}", e.error()))
}

/// Writes `rows` as a CSV table with a header row, replacing any existing file.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T], gzip: bool) -> Result<()> {
    let gzip = gzip || path.extension().and_then(|e| e.to_str()) == Some("gz");
    debug!(path = %path.display(), rows = rows.len(), gzip, "Writing table");

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;

    if gzip {
        let encoder = write_csv(GzEncoder::new(file, Compression::default()), rows)?;
        encoder.finish()?;
    } else {
        write_csv(file, rows)?;
    }

    info!(path = %path.display(), rows = rows.len(), "Table written");
    Ok(())
}

/// Appends a [`BatchStats`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, stats: &BatchStats) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(stats)?;
    writer.flush()?;

    Ok(())
}
