//! Data types flowing through the wrangling pipeline.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Dense id of a physical turnstile.
    TurnstileId
);
surrogate_id!(
    /// Dense id of an operator booth.
    BoothId
);
surrogate_id!(
    /// Dense id of a station (name + line designators).
    StationId
);
surrogate_id!(
    /// Station complex id from the remote/booth lookup table; not dense.
    ComplexId
);

/// One cumulative counter reading, as ingested from a weekly file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReading {
    pub control_area: String,
    pub unit: String,
    pub scp: String,
    pub station: String,
    pub linename: String,
    pub division: String,
    pub desc: String,
    pub timestamp: NaiveDateTime,
    pub entries: i64,
    pub exits: i64,
}

/// Surrogate keys assigned to a reading by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingIds {
    pub turnstile: TurnstileId,
    pub booth: BoothId,
    pub station: StationId,
    /// Distinct turnstiles at this reading's station in the resolved batch.
    pub station_turnstiles: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReading {
    pub reading: RawReading,
    pub ids: ReadingIds,
}

/// A resolved reading carrying the movement observed between it and the
/// next reading of the same turnstile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedReading {
    pub c_a: String,
    pub unit: String,
    pub scp: String,
    pub station: String,
    pub linename: String,
    pub division: String,
    pub desc: String,
    pub datetime: NaiveDateTime,
    pub entries: i64,
    pub exits: i64,
    pub tuid: TurnstileId,
    pub buid: BoothId,
    pub suid: StationId,
    pub station_turnstiles: u32,
    pub net_entries: u64,
    pub net_exits: u64,
    pub traffic: u64,
    /// Set by [`merge_complex`](crate::wrangle::complex::merge_complex).
    #[serde(default)]
    pub complex_id: Option<ComplexId>,
}

impl CleanedReading {
    pub fn new(resolved: ResolvedReading, net_entries: u64, net_exits: u64) -> Self {
        let ResolvedReading { reading, ids } = resolved;
        CleanedReading {
            c_a: reading.control_area,
            unit: reading.unit,
            scp: reading.scp,
            station: reading.station,
            linename: reading.linename,
            division: reading.division,
            desc: reading.desc,
            datetime: reading.timestamp,
            entries: reading.entries,
            exits: reading.exits,
            tuid: ids.turnstile,
            buid: ids.booth,
            suid: ids.station,
            station_turnstiles: ids.station_turnstiles,
            net_entries,
            net_exits,
            traffic: net_entries + net_exits,
            complex_id: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }
}

/// Either side of the reconciliation boundary.
///
/// Tables read back from disk may already carry net counts; the reconciler
/// passes those through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingTable {
    Resolved(Vec<ResolvedReading>),
    Cleaned(Vec<CleanedReading>),
}

impl ReadingTable {
    pub fn len(&self) -> usize {
        match self {
            ReadingTable::Resolved(rows) => rows.len(),
            ReadingTable::Cleaned(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_reconciled(&self) -> bool {
        matches!(self, ReadingTable::Cleaned(_))
    }
}

impl From<Vec<ResolvedReading>> for ReadingTable {
    fn from(rows: Vec<ResolvedReading>) -> Self {
        ReadingTable::Resolved(rows)
    }
}

impl From<Vec<CleanedReading>> for ReadingTable {
    fn from(rows: Vec<CleanedReading>) -> Self {
        ReadingTable::Cleaned(rows)
    }
}

/// Weekday-vs-weekend label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub fn of(day: Weekday) -> Self {
        match day {
            Weekday::Sat | Weekday::Sun => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayType::Weekday => f.write_str("weekday"),
            DayType::Weekend => f.write_str("weekend"),
        }
    }
}

/// Full English name of a weekday, e.g. `"Saturday"`.
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Value of the temporal grouping key of an aggregate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    TimeOfDay(NaiveTime),
    DayOfWeek(Weekday),
    DayType(DayType),
}

impl Period {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Period::Timestamp(ts) => Some(ts.date()),
            Period::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Period::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Period::TimeOfDay(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Period::DayOfWeek(day) => f.write_str(day_name(*day)),
            Period::DayType(kind) => write!(f, "{kind}"),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Net entries and exits summed over one (period, location) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRow {
    pub period: Period,
    pub location: u32,
    pub net_entries: u64,
    pub net_exits: u64,
}

/// A cleaned reading with the derived metric columns attached.
///
/// Metrics that cannot be computed (zero or missing denominator) are `None`
/// and serialize as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub datetime: NaiveDateTime,
    pub c_a: String,
    pub unit: String,
    pub scp: String,
    pub station: String,
    pub linename: String,
    pub tuid: TurnstileId,
    pub buid: BoothId,
    pub suid: StationId,
    pub net_entries: u64,
    pub net_exits: u64,
    pub traffic: u64,
    pub tde: Option<u64>,
    pub ts_count: Option<u64>,
    pub pct_de: Option<f64>,
    pub density: Option<f64>,
    pub wkdy: &'static str,
}

/// Total entries across all stations for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub tde: u64,
}

/// A station's share of one day's total entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationShare {
    pub suid: StationId,
    pub date: NaiveDate,
    pub tde: u64,
    pub net_entries: u64,
    pub pct_de: Option<f64>,
}

/// Traffic per turnstile for one reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityRow {
    pub datetime: NaiveDateTime,
    pub suid: StationId,
    pub traffic: u64,
    pub ts_count: Option<u64>,
    pub density: Option<f64>,
}

/// Per-station means over the days covered by a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRank {
    pub suid: StationId,
    pub station: String,
    pub linename: String,
    pub days: usize,
    pub mean_traffic: f64,
    pub mean_density: Option<f64>,
    pub mean_pct_de: Option<f64>,
}

/// Share of mean daily entries covered by the busiest `stations` stations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeShare {
    pub stations: usize,
    pub pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_day_type_of_weekend_days() {
        assert_eq!(DayType::of(Weekday::Sat), DayType::Weekend);
        assert_eq!(DayType::of(Weekday::Sun), DayType::Weekend);
        assert_eq!(DayType::of(Weekday::Wed), DayType::Weekday);
    }

    #[test]
    fn test_period_display() {
        let date = NaiveDate::from_ymd_opt(2020, 6, 20).unwrap();
        let ts = date.and_hms_opt(4, 0, 0).unwrap();

        assert_eq!(Period::Timestamp(ts).to_string(), "2020-06-20 04:00:00");
        assert_eq!(Period::Date(date).to_string(), "2020-06-20");
        assert_eq!(Period::TimeOfDay(ts.time()).to_string(), "04:00:00");
        assert_eq!(Period::DayOfWeek(date.weekday()).to_string(), "Saturday");
        assert_eq!(Period::DayType(DayType::Weekend).to_string(), "weekend");
    }

    #[test]
    fn test_reading_table_reports_stage() {
        let table = ReadingTable::from(Vec::<CleanedReading>::new());
        assert!(table.is_reconciled());
        assert!(table.is_empty());
    }
}
