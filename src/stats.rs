use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::wrangle::types::CleanedReading;

/// Summary of one cleaning run, logged and optionally appended to a CSV log.
#[derive(Debug, Default, Serialize)]
pub struct BatchStats {
    pub timestamp: DateTime<Utc>,
    pub first_week: Option<String>,
    pub last_week: Option<String>,
    pub weeks: usize,
    pub threshold: u64,

    // row counts
    pub raw_rows: usize,
    pub cleaned_rows: usize,
    pub dropped_rows: usize,

    // entities
    pub turnstiles: usize,
    pub booths: usize,
    pub stations: usize,
    pub dates: usize,

    pub net_entries: u64,
    pub net_exits: u64,
}

impl BatchStats {
    pub fn from_rows(raw_rows: usize, cleaned: &[CleanedReading]) -> Self {
        let mut s = BatchStats {
            timestamp: Utc::now(),
            raw_rows,
            cleaned_rows: cleaned.len(),
            dropped_rows: raw_rows.saturating_sub(cleaned.len()),
            ..Default::default()
        };

        let mut turnstiles = HashSet::new();
        let mut booths = HashSet::new();
        let mut stations = HashSet::new();
        let mut dates = HashSet::new();

        for row in cleaned {
            turnstiles.insert(row.tuid);
            booths.insert(row.buid);
            stations.insert(row.suid);
            dates.insert(row.date());
            s.net_entries += row.net_entries;
            s.net_exits += row.net_exits;
        }

        s.turnstiles = turnstiles.len();
        s.booths = booths.len();
        s.stations = stations.len();
        s.dates = dates.len();
        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Percentage of raw rows that survived reconciliation.
    pub fn retained_pct(&self) -> f64 {
        Self::pct(self.cleaned_rows, self.raw_rows)
    }

    /// Set the week range and threshold the run covered.
    pub fn with_run_info(mut self, first: &str, last: &str, weeks: usize, threshold: u64) -> Self {
        self.first_week = Some(first.to_string());
        self.last_week = Some(last.to_string());
        self.weeks = weeks;
        self.threshold = threshold;
        self
    }
}
