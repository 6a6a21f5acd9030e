//! Readers for weekly turnstile files and previously cleaned tables.
//!
//! Weekly files are named `turnstile_YYMMDD.txt` after the Saturday that ends
//! the week. Headers and every field are trimmed on read so that identical
//! stations never fragment into separate ids over stray whitespace.

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::wrangle::resolver::{resolve, sort_chronologically};
use crate::wrangle::types::{CleanedReading, RawReading, ReadingTable};

const SOURCE_DATETIME: &str = "%m/%d/%Y %H:%M:%S";

/// A row of a weekly file, named after the source headers.
#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(rename = "C/A")]
    control_area: String,
    #[serde(rename = "UNIT")]
    unit: String,
    #[serde(rename = "SCP")]
    scp: String,
    #[serde(rename = "STATION")]
    station: String,
    #[serde(rename = "LINENAME")]
    linename: String,
    #[serde(rename = "DIVISION")]
    division: String,
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "TIME")]
    time: String,
    #[serde(rename = "DESC")]
    desc: String,
    #[serde(rename = "ENTRIES")]
    entries: i64,
    #[serde(rename = "EXITS")]
    exits: i64,
}

impl TryFrom<SourceRecord> for RawReading {
    type Error = anyhow::Error;

    fn try_from(r: SourceRecord) -> Result<Self> {
        let stamp = format!("{} {}", r.date, r.time);
        let timestamp = NaiveDateTime::parse_from_str(&stamp, SOURCE_DATETIME)
            .with_context(|| format!("invalid DATE/TIME '{stamp}'"))?;

        Ok(RawReading {
            control_area: r.control_area,
            unit: r.unit,
            scp: r.scp,
            station: r.station,
            linename: r.linename,
            division: r.division,
            desc: r.desc,
            timestamp,
            entries: r.entries,
            exits: r.exits,
        })
    }
}

/// Parses a `YYYY-MM-DD` or `YYMMDD` (20YY) date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    match s.len() {
        10 => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD")),
        6 => NaiveDate::parse_from_str(&format!("20{s}"), "%Y%m%d")
            .with_context(|| format!("invalid date '{s}', expected YYMMDD")),
        _ => Err(anyhow!(
            "date '{s}' must be in YYYY-MM-DD or YYMMDD format"
        )),
    }
}

/// File name of the week ending on `saturday`.
pub fn week_file_name(saturday: NaiveDate) -> String {
    format!("turnstile_{}.txt", saturday.format("%y%m%d"))
}

pub fn week_path(data_dir: &Path, saturday: NaiveDate) -> PathBuf {
    data_dir.join(week_file_name(saturday))
}

/// Parses weekly-file CSV content into readings.
pub fn parse_readings<R: Read>(reader: R) -> Result<Vec<RawReading>> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let mut readings = Vec::new();
    for (line, result) in rdr.deserialize::<SourceRecord>().enumerate() {
        let record = result.with_context(|| format!("malformed record {}", line + 1))?;
        let reading = RawReading::try_from(record)
            .with_context(|| format!("malformed record {}", line + 1))?;
        readings.push(reading);
    }

    Ok(readings)
}

/// Reads the week ending on `saturday`. A missing file contributes no rows.
#[tracing::instrument(skip(data_dir), fields(week = %saturday))]
pub fn read_week(data_dir: &Path, saturday: NaiveDate) -> Result<Vec<RawReading>> {
    let path = week_path(data_dir, saturday);
    if !path.exists() {
        debug!(path = %path.display(), "Week file missing, skipping");
        return Ok(Vec::new());
    }

    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let readings = parse_readings(file).with_context(|| format!("reading {}", path.display()))?;

    debug!(rows = readings.len(), "Week file read");
    Ok(readings)
}

/// Reads and concatenates several weeks.
pub fn read_weeks(data_dir: &Path, saturdays: &[NaiveDate]) -> Result<Vec<RawReading>> {
    let mut readings = Vec::new();
    for saturday in saturdays {
        readings.extend(read_week(data_dir, *saturday)?);
    }
    info!(weeks = saturdays.len(), rows = readings.len(), "Raw readings loaded");
    Ok(readings)
}

/// Reads a table written by this tool or a raw weekly file.
///
/// A header containing `net_entries` marks an already reconciled table.
/// Raw files are resolved and sorted so they can go straight to the
/// reconciler.
pub fn read_table(path: &Path) -> Result<ReadingTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    let reconciled = rdr
        .headers()
        .with_context(|| format!("reading headers of {}", path.display()))?
        .iter()
        .any(|h| h == "net_entries");

    if reconciled {
        let rows = rdr
            .deserialize::<CleanedReading>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("reading {}", path.display()))?;
        debug!(rows = rows.len(), "Cleaned table read");
        return Ok(ReadingTable::Cleaned(rows));
    }

    drop(rdr);
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let raw = parse_readings(file).with_context(|| format!("reading {}", path.display()))?;
    let mut rows = resolve(raw);
    sort_chronologically(&mut rows);
    Ok(ReadingTable::Resolved(rows))
}
