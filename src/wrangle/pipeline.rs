//! Drives raw weekly files through resolution and reconciliation.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

use crate::fetch::weeks::saturdays_between;
use crate::parser::read_weeks;
use crate::stats::BatchStats;
use crate::wrangle::reconcile::{Threshold, reconcile};
use crate::wrangle::resolver::{resolve, sort_chronologically};
use crate::wrangle::types::{CleanedReading, RawReading};

/// Resolves ids, orders each turnstile's series and reconciles net counts.
pub fn clean(raw: Vec<RawReading>, threshold: Threshold) -> Vec<CleanedReading> {
    let mut resolved = resolve(raw);
    sort_chronologically(&mut resolved);
    reconcile(resolved.into(), threshold)
}

/// Weeks to read: just `start`, or every Saturday between `start` and `end`.
pub fn weeks_for(start: NaiveDate, end: Option<NaiveDate>) -> Vec<NaiveDate> {
    match end {
        Some(end) => saturdays_between(start, end),
        None => vec![start],
    }
}

/// Result of cleaning a range of weeks.
pub struct CleanRun {
    pub rows: Vec<CleanedReading>,
    pub stats: BatchStats,
}

/// Reads the given weeks from `data_dir` and cleans them.
///
/// Missing weeks contribute nothing. The number of rows dropped by the
/// reconciler is logged here, not by the reconciler itself.
#[tracing::instrument(skip(data_dir, weeks), fields(weeks = weeks.len(), threshold = threshold.0))]
pub fn run(data_dir: &Path, weeks: &[NaiveDate], threshold: Threshold) -> Result<CleanRun> {
    let (first, last) = match (weeks.first(), weeks.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(anyhow!("no weeks to read")),
    };

    let raw = read_weeks(data_dir, weeks)?;
    let raw_rows = raw.len();

    let rows = clean(raw, threshold);

    let stats = BatchStats::from_rows(raw_rows, &rows).with_run_info(
        &first.format("%Y-%m-%d").to_string(),
        &last.format("%Y-%m-%d").to_string(),
        weeks.len(),
        threshold.0,
    );
    info!(
        raw_rows,
        cleaned_rows = stats.cleaned_rows,
        dropped_rows = stats.dropped_rows,
        retained_pct = stats.retained_pct(),
        "Readings reconciled"
    );

    Ok(CleanRun { rows, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weeks_for_single_week() {
        let sat = NaiveDate::from_ymd_opt(2020, 6, 27).unwrap();
        assert_eq!(weeks_for(sat, None), vec![sat]);
    }

    #[test]
    fn test_run_rejects_empty_range() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(dir.path(), &[], Threshold::default()).is_err());
    }

    #[test]
    fn test_run_over_missing_weeks_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let weeks = weeks_for(
            NaiveDate::from_ymd_opt(2020, 6, 13).unwrap(),
            NaiveDate::from_ymd_opt(2020, 6, 27).unwrap().into(),
        );

        let cleaned = run(dir.path(), &weeks, Threshold::default()).unwrap();

        assert!(cleaned.rows.is_empty());
        assert_eq!(cleaned.stats.weeks, 3);
        assert_eq!(cleaned.stats.raw_rows, 0);
    }
}
