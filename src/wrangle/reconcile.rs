//! Cumulative counter to net per-interval movement.
//!
//! For each turnstile the difference between a reading and its chronological
//! successor is attached to the earlier reading. The last reading of each
//! series has no successor and is dropped. Pairs where either difference is
//! negative or above the threshold are dropped as counter resets, rollovers
//! or faulty hardware.

use std::collections::HashMap;

use crate::wrangle::types::{CleanedReading, ReadingTable, ResolvedReading, TurnstileId};

/// Most people a turnstile can plausibly count in one 4-hour interval
/// (one every 2 seconds).
pub const DEFAULT_THRESHOLD: u64 = 7200;

/// Upper bound on net entries and exits per interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold(pub u64);

impl Default for Threshold {
    fn default() -> Self {
        Threshold(DEFAULT_THRESHOLD)
    }
}

impl Threshold {
    /// Net count between two counter values, rejecting differences outside
    /// `0..=threshold` or too large to represent.
    fn accept(self, current: i64, next: i64) -> Option<u64> {
        let delta = next.checked_sub(current)?;
        u64::try_from(delta).ok().filter(|net| *net <= self.0)
    }
}

/// Reconciles a table into net counts.
///
/// A table that is already reconciled is returned unchanged. Readings must
/// already be chronological within each turnstile (see
/// [`sort_chronologically`](crate::wrangle::resolver::sort_chronologically));
/// rows keep their relative input order.
pub fn reconcile(table: ReadingTable, threshold: Threshold) -> Vec<CleanedReading> {
    match table {
        ReadingTable::Cleaned(rows) => rows,
        ReadingTable::Resolved(rows) => net_counts(rows, threshold),
    }
}

fn net_counts(rows: Vec<ResolvedReading>, threshold: Threshold) -> Vec<CleanedReading> {
    let mut partitions: HashMap<TurnstileId, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        partitions.entry(row.ids.turnstile).or_default().push(i);
    }

    // index of the kept reading -> (net entries, net exits)
    let mut nets: HashMap<usize, (u64, u64)> = HashMap::new();
    for indices in partitions.values() {
        for pair in indices.windows(2) {
            let (current, next) = (&rows[pair[0]].reading, &rows[pair[1]].reading);
            let entries = threshold.accept(current.entries, next.entries);
            let exits = threshold.accept(current.exits, next.exits);
            if let (Some(entries), Some(exits)) = (entries, exits) {
                nets.insert(pair[0], (entries, exits));
            }
        }
    }

    rows.into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            nets.get(&i)
                .map(|&(entries, exits)| CleanedReading::new(row, entries, exits))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrangle::resolver::{resolve, sort_chronologically};
    use crate::wrangle::types::RawReading;
    use chrono::NaiveDate;

    #[test]
    fn test_two_turnstile_series() {
        let mut rows = resolve(vec![
            reading("A", 0, 100, 0),
            reading("A", 4, 150, 0),
            reading("A", 8, 400, 0),
            reading("B", 0, 10, 0),
            reading("B", 4, 25, 0),
        ]);
        sort_chronologically(&mut rows);

        let cleaned = reconcile(rows.into(), Threshold(100));

        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].scp, "A");
        assert_eq!(cleaned[0].net_entries, 50);
        assert_eq!(cleaned[0].datetime.format("%H").to_string(), "00");
        assert_eq!(cleaned[1].scp, "B");
        assert_eq!(cleaned[1].net_entries, 15);
    }

    #[test]
    fn test_backwards_counter_is_dropped() {
        let rows = resolve(vec![
            reading("A", 0, 500, 20),
            reading("A", 4, 450, 30),
            reading("A", 8, 470, 35),
            reading("A", 12, 480, 30),
        ]);

        let cleaned = reconcile(rows.into(), Threshold::default());

        // 500 -> 450 runs backward, 470 -> 480 has exits running backward
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].net_entries, 20);
        assert_eq!(cleaned[0].net_exits, 5);
        assert_eq!(cleaned[0].traffic, 25);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let rows = resolve(vec![
            reading("A", 0, 0, 0),
            reading("A", 4, 7200, 0),
            reading("A", 8, 14401, 0),
        ]);

        let cleaned = reconcile(rows.into(), Threshold::default());

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].net_entries, 7200);
    }

    #[test]
    fn test_extreme_counters_are_dropped_not_overflowed() {
        let rows = resolve(vec![
            reading("A", 0, -9_000_000_000_000_000_000, 0),
            reading("A", 4, 9_000_000_000_000_000_000, 0),
            reading("A", 8, 9_000_000_000_000_000_010, 3),
            reading("A", 12, 9_000_000_000_000_000_020, 4),
        ]);

        let cleaned = reconcile(rows.into(), Threshold::default());

        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].datetime.format("%H").to_string(), "04");
        assert_eq!((cleaned[0].net_entries, cleaned[0].net_exits), (10, 3));
        assert_eq!((cleaned[1].net_entries, cleaned[1].net_exits), (10, 1));
    }

    #[test]
    fn test_single_reading_contributes_nothing() {
        let rows = resolve(vec![reading("A", 0, 10, 10)]);
        assert!(reconcile(rows.into(), Threshold::default()).is_empty());
    }

    #[test]
    fn test_reconciled_table_passes_through() {
        let rows = resolve(vec![
            reading("A", 0, 0, 0),
            reading("A", 4, 10, 10),
            reading("A", 8, 20, 30),
        ]);
        let cleaned = reconcile(rows.into(), Threshold::default());

        let again = reconcile(cleaned.clone().into(), Threshold(0));

        assert_eq!(again, cleaned);
    }

    #[test]
    fn test_interleaved_input_keeps_per_turnstile_pairs() {
        let rows = resolve(vec![
            reading("A", 0, 0, 0),
            reading("B", 0, 1000, 0),
            reading("A", 4, 10, 0),
            reading("B", 4, 1003, 0),
        ]);

        let cleaned = reconcile(rows.into(), Threshold::default());

        assert_eq!(cleaned.len(), 2);
        assert_eq!((cleaned[0].scp.as_str(), cleaned[0].net_entries), ("A", 10));
        assert_eq!((cleaned[1].scp.as_str(), cleaned[1].net_entries), ("B", 3));
    }

    // Helper functions for tests
    fn reading(scp: &str, hour: u32, entries: i64, exits: i64) -> RawReading {
        RawReading {
            control_area: "A002".to_string(),
            unit: "R051".to_string(),
            scp: scp.to_string(),
            station: "59 ST".to_string(),
            linename: "NQR456W".to_string(),
            division: "BMT".to_string(),
            desc: "REGULAR".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2020, 6, 20)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            entries,
            exits,
        }
    }
}
