//! Station complex ids joined onto cleaned readings.
//!
//! The lookup table maps each (remote unit, booth) pair to the complex it
//! belongs to. Several stations under one roof share a complex, so grouping
//! by complex merges counts the station names keep apart.

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::wrangle::types::{CleanedReading, ComplexId};

/// A row of the remote/booth to complex lookup file.
#[derive(Debug, Deserialize)]
struct LookupRecord {
    remote: String,
    booth: String,
    complex_id: String,
}

/// Complex id per (remote unit, booth) pair.
#[derive(Debug, Default, Clone)]
pub struct ComplexLookup {
    by_unit_booth: HashMap<(String, String), ComplexId>,
}

impl ComplexLookup {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let mut by_unit_booth = HashMap::new();
        for (i, record) in rdr.deserialize::<LookupRecord>().enumerate() {
            let record = record?;
            if record.complex_id.is_empty() {
                continue;
            }
            let id = parse_complex_id(&record.complex_id).ok_or_else(|| {
                anyhow!("record {}: bad complex_id '{}'", i + 1, record.complex_id)
            })?;
            by_unit_booth.insert((record.remote, record.booth), id);
        }

        Ok(ComplexLookup { by_unit_booth })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let lookup =
            Self::from_reader(file).with_context(|| format!("reading {}", path.display()))?;
        debug!(path = %path.display(), pairs = lookup.len(), "Complex lookup loaded");
        Ok(lookup)
    }

    pub fn get(&self, unit: &str, booth: &str) -> Option<ComplexId> {
        self.by_unit_booth
            .get(&(unit.to_string(), booth.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.by_unit_booth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_unit_booth.is_empty()
    }
}

// Lookup files written by spreadsheet tools carry ids like "611.0".
fn parse_complex_id(s: &str) -> Option<ComplexId> {
    if let Ok(id) = s.parse::<u32>() {
        return Some(ComplexId(id));
    }
    let f = s.parse::<f64>().ok()?;
    (f.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&f)).then_some(ComplexId(f as u32))
}

/// Attaches a complex id to every row whose (unit, control area) pair is in
/// the lookup. Rows with no match are dropped.
pub fn merge_complex(rows: Vec<CleanedReading>, lookup: &ComplexLookup) -> Vec<CleanedReading> {
    rows.into_iter()
        .filter_map(|mut row| {
            row.complex_id = Some(lookup.get(&row.unit, &row.c_a)?);
            Some(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrangle::types::{BoothId, StationId, TurnstileId};
    use chrono::NaiveDate;

    const LOOKUP: &str = "remote,booth,complex_id,station,line_name,division
R051,A002,613,59 ST,NQR456,BMT
R001,R101 ,635.0,SOUTH FERRY,R1,IRT
R999,X001,,UNKNOWN,A,IND
";

    #[test]
    fn test_lookup_reads_ids_and_skips_blanks() {
        let lookup = ComplexLookup::from_reader(LOOKUP.as_bytes()).unwrap();

        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get("R051", "A002"), Some(ComplexId(613)));
        assert_eq!(lookup.get("R001", "R101"), Some(ComplexId(635)));
        assert_eq!(lookup.get("R999", "X001"), None);
        // the key is (unit, booth), not (booth, unit)
        assert_eq!(lookup.get("A002", "R051"), None);
    }

    #[test]
    fn test_lookup_rejects_non_integer_id() {
        let bad = "remote,booth,complex_id\nR051,A002,6.5\n";
        assert!(ComplexLookup::from_reader(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_merge_complex_is_an_inner_join() {
        let lookup = ComplexLookup::from_reader(LOOKUP.as_bytes()).unwrap();
        let rows = vec![
            row("A002", "R051", 0),
            row("R101", "R001", 1),
            row("N999", "R777", 2),
        ];

        let merged = merge_complex(rows, &lookup);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].complex_id, Some(ComplexId(613)));
        assert_eq!(merged[1].complex_id, Some(ComplexId(635)));
        assert_eq!(merged[1].tuid, TurnstileId(1));
    }

    // Helper functions for tests
    fn row(c_a: &str, unit: &str, tuid: u32) -> CleanedReading {
        CleanedReading {
            c_a: c_a.to_string(),
            unit: unit.to_string(),
            scp: "00-00-00".to_string(),
            station: "S".to_string(),
            linename: "1".to_string(),
            division: "IRT".to_string(),
            desc: "REGULAR".to_string(),
            datetime: NaiveDate::from_ymd_opt(2020, 6, 20)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            entries: 0,
            exits: 0,
            tuid: TurnstileId(tuid),
            buid: BoothId(tuid),
            suid: StationId(tuid),
            station_turnstiles: 1,
            net_entries: 5,
            net_exits: 5,
            traffic: 10,
            complex_id: None,
        }
    }
}
