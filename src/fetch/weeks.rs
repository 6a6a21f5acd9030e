//! Calendar arithmetic for weekly files, which end on Saturdays.

use chrono::{Datelike, Days, NaiveDate};

const WEEK: Days = Days::new(7);

/// Most recent Saturday on or before `today`.
pub fn most_recent_saturday(today: NaiveDate) -> NaiveDate {
    let offset = (today.weekday().num_days_from_monday() + 2) % 7;
    today - Days::new(offset as u64)
}

/// Saturdays from `last` back to, but excluding, `cutoff`. Newest first.
pub fn saturdays_after(cutoff: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut curr = last;
    while curr > cutoff {
        dates.push(curr);
        curr = curr - WEEK;
    }
    dates
}

/// Saturdays in `[start, end]`, oldest first.
///
/// `start` moves forward to the next Saturday and `end` back to the previous
/// one; either stays put if it already is a Saturday.
pub fn saturdays_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let forward = (12 - start.weekday().num_days_from_monday()) % 7;
    let back = (end.weekday().num_days_from_monday() + 2) % 7;

    let first = start + Days::new(forward as u64);
    let last = end - Days::new(back as u64);

    let mut dates = Vec::new();
    let mut curr = first;
    while curr <= last {
        dates.push(curr);
        curr = curr + WEEK;
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_most_recent_saturday() {
        // Wednesday
        assert_eq!(most_recent_saturday(date(2020, 7, 1)), date(2020, 6, 27));
        // Saturday itself
        assert_eq!(most_recent_saturday(date(2020, 6, 27)), date(2020, 6, 27));
        // Sunday
        assert_eq!(most_recent_saturday(date(2020, 6, 28)), date(2020, 6, 27));
    }

    #[test]
    fn test_saturdays_after_excludes_cutoff() {
        let dates = saturdays_after(date(2020, 6, 13), date(2020, 6, 27));
        assert_eq!(dates, vec![date(2020, 6, 27), date(2020, 6, 20)]);
    }

    #[test]
    fn test_saturdays_between_snaps_inward() {
        // Monday 2020-06-08 .. Thursday 2020-07-02
        let dates = saturdays_between(date(2020, 6, 8), date(2020, 7, 2));
        assert_eq!(
            dates,
            vec![date(2020, 6, 13), date(2020, 6, 20), date(2020, 6, 27)]
        );
    }

    #[test]
    fn test_saturdays_between_inclusive_on_saturdays() {
        let dates = saturdays_between(date(2020, 6, 13), date(2020, 6, 20));
        assert_eq!(dates, vec![date(2020, 6, 13), date(2020, 6, 20)]);
    }

    #[test]
    fn test_saturdays_between_empty_when_reversed() {
        assert!(saturdays_between(date(2020, 6, 20), date(2020, 6, 13)).is_empty());
    }
}
