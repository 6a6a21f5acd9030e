use chrono::NaiveDate;
use std::collections::BTreeMap;
use turnstile_density::output::write_table;
use turnstile_density::parser::{read_table, week_path};
use turnstile_density::wrangle::aggregate::{SpatialGrain, TemporalGrain, aggregate};
use turnstile_density::wrangle::complex::{ComplexLookup, merge_complex};
use turnstile_density::wrangle::metrics::{add_metrics, station_shares};
use turnstile_density::wrangle::pipeline::{run, weeks_for};
use turnstile_density::wrangle::reconcile::{Threshold, reconcile};

const WEEK: &str = "C/A,UNIT,SCP,STATION,LINENAME,DIVISION,DATE,TIME,DESC,ENTRIES,EXITS
A002,R051,02-00-00,59 ST,NQR456W,BMT,06/20/2020,00:00:00,REGULAR,1000,500
A002,R051,02-00-00,59 ST,NQR456W,BMT,06/20/2020,04:00:00,REGULAR,1010,505
A002,R051,02-00-00,59 ST,NQR456W,BMT,06/21/2020,00:00:00,REGULAR,1030,515
A002,R051,02-00-00,59 ST,NQR456W,BMT,06/21/2020,04:00:00,REGULAR,1040,520
A002,R051,02-00-01,59 ST ,NQR456W,BMT,06/20/2020,00:00:00,REGULAR,200,100
A002,R051,02-00-01,59 ST ,NQR456W,BMT,06/20/2020,04:00:00,REGULAR,230,110
A002,R051,02-00-01,59 ST ,NQR456W,BMT,06/21/2020,00:00:00,REGULAR,5,3
A002,R051,02-00-01,59 ST ,NQR456W,BMT,06/21/2020,04:00:00,REGULAR,25,13
R101,R001,02-00-00,SOUTH FERRY,1RW,IRT,06/20/2020,00:00:00,REGULAR,70,40
R101,R001,02-00-00,SOUTH FERRY,1RW,IRT,06/20/2020,04:00:00,REGULAR,90,50
R101,R001,02-00-00,SOUTH FERRY,1RW,IRT,06/21/2020,00:00:00,REGULAR,130,60
R101,R001,02-00-00,SOUTH FERRY,1RW,IRT,06/21/2020,04:00:00,REGULAR,9999999,70
";

fn saturday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 6, 20).unwrap()
}

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(week_path(dir.path(), saturday()), WEEK).unwrap();

    // the week before is missing and contributes nothing
    let weeks = weeks_for(
        NaiveDate::from_ymd_opt(2020, 6, 13).unwrap(),
        Some(saturday()),
    );
    let cleaned = run(dir.path(), &weeks, Threshold::default()).unwrap();

    // 12 readings, 3 turnstiles lose their last reading, one counter reset
    // (230 -> 5) and one implausible jump (130 -> 9999999) are dropped
    assert_eq!(cleaned.stats.raw_rows, 12);
    assert_eq!(cleaned.rows.len(), 7);
    assert_eq!(cleaned.stats.stations, 2);
    assert_eq!(cleaned.stats.turnstiles, 3);
    assert!(cleaned.rows.iter().all(|r| r.net_entries <= 7200));

    let by_date = aggregate(&cleaned.rows, TemporalGrain::Date, SpatialGrain::Turnstile).unwrap();
    let by_station =
        aggregate(&cleaned.rows, TemporalGrain::Date, SpatialGrain::Station).unwrap();
    let totals = |rows: &[turnstile_density::wrangle::types::AggregateRow]| {
        let mut m = BTreeMap::new();
        for r in rows {
            *m.entry(r.period.to_string()).or_insert(0u64) += r.net_entries;
        }
        m
    };
    assert_eq!(totals(&by_date), totals(&by_station));
    assert_eq!(totals(&by_station).get("2020-06-20"), Some(&(10 + 20 + 30 + 20 + 40)));

    let shares = station_shares(&cleaned.rows);
    let mut per_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for s in &shares {
        *per_date.entry(s.date).or_insert(0.0) += s.pct_de.unwrap();
    }
    for total in per_date.values() {
        assert!((total - 1.0).abs() < 1e-9);
    }

    let metrics = add_metrics(&cleaned.rows);
    assert_eq!(metrics.len(), cleaned.rows.len());
    assert!(metrics.iter().all(|m| m.density.is_some()));
}

#[test]
fn test_cleaned_table_round_trips_without_reconciling_again() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(week_path(dir.path(), saturday()), WEEK).unwrap();
    let cleaned = run(dir.path(), &[saturday()], Threshold::default()).unwrap();

    let first = dir.path().join("cleaned.csv");
    write_table(&first, &cleaned.rows, false).unwrap();

    let table = read_table(&first).unwrap();
    assert!(table.is_reconciled());
    let again = reconcile(table, Threshold::default());
    assert_eq!(again, cleaned.rows);

    let second = dir.path().join("cleaned_again.csv");
    write_table(&second, &again, false).unwrap();
    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn test_complex_ids_survive_a_written_table() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(week_path(dir.path(), saturday()), WEEK).unwrap();
    let cleaned = run(dir.path(), &[saturday()], Threshold::default()).unwrap();

    // only the 59 ST booth is in the lookup
    let lookup = ComplexLookup::from_reader("remote,booth,complex_id\nR051,A002,613\n".as_bytes())
        .unwrap();
    let merged = merge_complex(cleaned.rows.clone(), &lookup);
    assert_eq!(merged.len(), 5);

    let path = dir.path().join("complex.csv");
    write_table(&path, &merged, false).unwrap();
    let again = reconcile(read_table(&path).unwrap(), Threshold::default());
    assert_eq!(again, merged);

    let by_complex = aggregate(&again, TemporalGrain::Date, SpatialGrain::Complex).unwrap();
    let by_station = aggregate(&cleaned.rows, TemporalGrain::Date, SpatialGrain::Station).unwrap();
    let complex_total: u64 = by_complex.iter().map(|r| r.net_entries).sum();
    let station_total: u64 = by_station
        .iter()
        .filter(|r| r.location == merged[0].suid.0)
        .map(|r| r.net_entries)
        .sum();
    assert_eq!(complex_total, station_total);
    assert!(by_complex.iter().all(|r| r.location == 613));
}
