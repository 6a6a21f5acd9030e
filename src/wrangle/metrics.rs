//! Derived metrics layered on top of the aggregator.
//!
//! Every derivation reads the cleaned table and is independent of the others:
//!
//! - `TDE`: total daily entries across all stations
//! - `TS_COUNT`: distinct turnstiles per station, as counted by the resolver
//! - `PCT_DE`: a row's share of its date's total entries
//! - `DENSITY`: traffic per turnstile of the row's station
//! - `WKDY`: day name of the row's date
//!
//! Zero or missing denominators yield `None`, never a panic.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::wrangle::aggregate::{Grouping, SpatialGrain, TemporalGrain, aggregate_by};
use crate::wrangle::types::{
    AggregateRow, CleanedReading, CumulativeShare, DailyTotal, DensityRow, MetricRow,
    StationId, StationRank, StationShare, day_name,
};
use crate::wrangle::utility::{mean, ratio};

const STATION_DAY: Grouping = Grouping {
    temporal: TemporalGrain::Date,
    spatial: SpatialGrain::Station,
};

fn station_days(rows: &[CleanedReading]) -> Vec<AggregateRow> {
    aggregate_by(rows, STATION_DAY)
}

/// Total entries at all stations per date, summed from the (date, station)
/// aggregate.
pub fn total_daily_entries(rows: &[CleanedReading]) -> BTreeMap<NaiveDate, u64> {
    let mut totals = BTreeMap::new();
    for agg in station_days(rows) {
        if let Some(date) = agg.period.date() {
            *totals.entry(date).or_insert(0) += agg.net_entries;
        }
    }
    totals
}

pub fn daily_totals(rows: &[CleanedReading]) -> Vec<DailyTotal> {
    total_daily_entries(rows)
        .into_iter()
        .map(|(date, tde)| DailyTotal { date, tde })
        .collect()
}

/// Number of distinct turnstile ids at each station.
///
/// Read from the `station_turnstiles` column the resolver fills in, so a
/// turnstile whose readings were all dropped still counts. Where rows of one
/// station disagree (tables from separate runs) the largest count wins.
pub fn turnstile_counts(rows: &[CleanedReading]) -> HashMap<StationId, u64> {
    let mut counts: HashMap<StationId, u64> = HashMap::new();
    for row in rows {
        let count = counts.entry(row.suid).or_default();
        *count = (*count).max(u64::from(row.station_turnstiles));
    }
    counts
}

/// Each station's share of total entries, one row per (station, date).
pub fn station_shares(rows: &[CleanedReading]) -> Vec<StationShare> {
    let tde = total_daily_entries(rows);

    station_days(rows)
        .into_iter()
        .filter_map(|agg| {
            let date = agg.period.date()?;
            let total = tde.get(&date).copied();
            Some(StationShare {
                suid: StationId(agg.location),
                date,
                tde: total.unwrap_or(0),
                net_entries: agg.net_entries,
                pct_de: ratio(agg.net_entries, total),
            })
        })
        .collect()
}

/// Traffic per turnstile for every row, using the supplied station counts.
pub fn density_rows(
    rows: &[CleanedReading],
    counts: &HashMap<StationId, u64>,
) -> Vec<DensityRow> {
    rows.iter()
        .map(|row| {
            let ts_count = counts.get(&row.suid).copied();
            DensityRow {
                datetime: row.datetime,
                suid: row.suid,
                traffic: row.traffic,
                ts_count,
                density: ratio(row.traffic, ts_count),
            }
        })
        .collect()
}

/// Attaches every derived metric to the rows of a cleaned table.
pub fn add_metrics(rows: &[CleanedReading]) -> Vec<MetricRow> {
    let tde = total_daily_entries(rows);
    let counts = turnstile_counts(rows);

    rows.iter()
        .map(|row| {
            let total = tde.get(&row.date()).copied();
            let ts_count = counts.get(&row.suid).copied();
            MetricRow {
                datetime: row.datetime,
                c_a: row.c_a.clone(),
                unit: row.unit.clone(),
                scp: row.scp.clone(),
                station: row.station.clone(),
                linename: row.linename.clone(),
                tuid: row.tuid,
                buid: row.buid,
                suid: row.suid,
                net_entries: row.net_entries,
                net_exits: row.net_exits,
                traffic: row.traffic,
                tde: total,
                ts_count,
                pct_de: ratio(row.net_entries, total),
                density: ratio(row.traffic, ts_count),
                wkdy: day_name(row.datetime.weekday()),
            }
        })
        .collect()
}

#[derive(Default)]
struct DailyStation {
    traffic: u64,
    density: f64,
    density_defined: bool,
    entries: u64,
}

/// Ranks stations by their mean daily share of entries, busiest first.
///
/// Per station and date, traffic and density are summed over the day's
/// readings; the ranking reports the mean of those daily values across the
/// dates the station appears on.
pub fn station_ranking(rows: &[CleanedReading]) -> Vec<StationRank> {
    let tde = total_daily_entries(rows);
    let counts = turnstile_counts(rows);

    let mut names: HashMap<StationId, (&str, &str)> = HashMap::new();
    let mut daily: BTreeMap<(StationId, NaiveDate), DailyStation> = BTreeMap::new();

    for row in rows {
        names
            .entry(row.suid)
            .or_insert((row.station.as_str(), row.linename.as_str()));

        let day = daily.entry((row.suid, row.date())).or_default();
        day.traffic += row.traffic;
        day.entries += row.net_entries;
        if let Some(d) = ratio(row.traffic, counts.get(&row.suid).copied()) {
            day.density += d;
            day.density_defined = true;
        }
    }

    let mut per_station: BTreeMap<StationId, (Vec<f64>, Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for ((suid, date), day) in &daily {
        let (traffic, density, share) = per_station.entry(*suid).or_default();
        traffic.push(day.traffic as f64);
        if day.density_defined {
            density.push(day.density);
        }
        if let Some(pct) = ratio(day.entries, tde.get(date).copied()) {
            share.push(pct);
        }
    }

    let mut ranking: Vec<StationRank> = per_station
        .into_iter()
        .map(|(suid, (traffic, density, share))| {
            let (station, linename) = names.get(&suid).copied().unwrap_or_default();
            StationRank {
                suid,
                station: station.to_string(),
                linename: linename.to_string(),
                days: traffic.len(),
                mean_traffic: mean(&traffic).unwrap_or(0.0),
                mean_density: mean(&density),
                mean_pct_de: mean(&share),
            }
        })
        .collect();

    ranking.sort_by(|a, b| {
        let a = a.mean_pct_de.unwrap_or(0.0);
        let b = b.mean_pct_de.unwrap_or(0.0);
        b.total_cmp(&a)
    });
    ranking
}

/// Percentage of mean daily entries covered by the top `n` stations of a
/// ranking, for every `n` from 1 to the number of stations.
pub fn cumulative_share(ranking: &[StationRank]) -> Vec<CumulativeShare> {
    let mut running = 0.0;
    ranking
        .iter()
        .enumerate()
        .map(|(i, rank)| {
            running += rank.mean_pct_de.unwrap_or(0.0) * 100.0;
            CumulativeShare {
                stations: i + 1,
                pct: running,
            }
        })
        .collect()
}
