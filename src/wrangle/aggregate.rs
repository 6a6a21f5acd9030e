//! Roll-up of net counts over temporal and spatial grains.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Datelike;

use crate::error::GrainError;
use crate::wrangle::types::{AggregateRow, CleanedReading, DayType, Period};

/// Temporal resolution of a grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemporalGrain {
    /// The reading's own timestamp; finest grain.
    #[default]
    Timestamp,
    Date,
    TimeOfDay,
    DayOfWeek,
    DayType,
}

/// Spatial resolution of a grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialGrain {
    #[default]
    Turnstile,
    Booth,
    Station,
    /// Station complex; only rows that carry a `complex_id` take part.
    Complex,
}

impl TemporalGrain {
    pub fn period(self, row: &CleanedReading) -> Period {
        match self {
            TemporalGrain::Timestamp => Period::Timestamp(row.datetime),
            TemporalGrain::Date => Period::Date(row.datetime.date()),
            TemporalGrain::TimeOfDay => Period::TimeOfDay(row.datetime.time()),
            TemporalGrain::DayOfWeek => Period::DayOfWeek(row.datetime.weekday()),
            TemporalGrain::DayType => Period::DayType(DayType::of(row.datetime.weekday())),
        }
    }
}

impl SpatialGrain {
    pub fn location(self, row: &CleanedReading) -> Option<u32> {
        match self {
            SpatialGrain::Turnstile => Some(row.tuid.0),
            SpatialGrain::Booth => Some(row.buid.0),
            SpatialGrain::Station => Some(row.suid.0),
            SpatialGrain::Complex => row.complex_id.map(|id| id.0),
        }
    }
}

impl FromStr for TemporalGrain {
    type Err = GrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "datetime" | "timestamp" => Ok(TemporalGrain::Timestamp),
            "date" => Ok(TemporalGrain::Date),
            "time" => Ok(TemporalGrain::TimeOfDay),
            "weekday" | "day" => Ok(TemporalGrain::DayOfWeek),
            "daytype" | "weekend" => Ok(TemporalGrain::DayType),
            other => Err(GrainError::Unrecognized(other.to_string())),
        }
    }
}

impl FromStr for SpatialGrain {
    type Err = GrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turnstile" => Ok(SpatialGrain::Turnstile),
            "booth" => Ok(SpatialGrain::Booth),
            "station" => Ok(SpatialGrain::Station),
            "complex" => Ok(SpatialGrain::Complex),
            other => Err(GrainError::Unrecognized(other.to_string())),
        }
    }
}

/// A validated (temporal, spatial) grain pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grouping {
    pub temporal: TemporalGrain,
    pub spatial: SpatialGrain,
}

impl Grouping {
    /// Rejects the pair of defaults, which would reproduce the input rows.
    pub fn new(temporal: TemporalGrain, spatial: SpatialGrain) -> Result<Self, GrainError> {
        if temporal == TemporalGrain::Timestamp && spatial == SpatialGrain::Turnstile {
            return Err(GrainError::NoRefinement);
        }
        Ok(Grouping { temporal, spatial })
    }

    /// Builds a grouping from grain names such as `["date", "station"]`.
    ///
    /// Each name is tried as a temporal grain, then a spatial grain. Naming
    /// two different grains of the same kind is an error; repeating one is not.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, GrainError> {
        let mut temporal: Option<(TemporalGrain, &str)> = None;
        let mut spatial: Option<(SpatialGrain, &str)> = None;

        for name in names {
            let name = name.as_ref();
            if let Ok(t) = name.parse::<TemporalGrain>() {
                pick(&mut temporal, t, name)?;
            } else {
                pick(&mut spatial, name.parse()?, name)?;
            }
        }

        Grouping::new(
            temporal.map(|(t, _)| t).unwrap_or_default(),
            spatial.map(|(s, _)| s).unwrap_or_default(),
        )
    }
}

fn pick<'a, G: PartialEq>(
    slot: &mut Option<(G, &'a str)>,
    grain: G,
    name: &'a str,
) -> Result<(), GrainError> {
    match slot {
        Some((seen, first)) if *seen != grain => Err(GrainError::Conflicting(
            first.trim().to_string(),
            name.trim().to_string(),
        )),
        Some(_) => Ok(()),
        None => {
            *slot = Some((grain, name));
            Ok(())
        }
    }
}

/// Sums net entries and exits per (period, location) group.
///
/// Rows come out in order of each group's first appearance; callers that
/// need a particular order must sort. Rows without a location at the
/// requested spatial grain (no complex id) are left out.
pub fn aggregate(
    rows: &[CleanedReading],
    temporal: TemporalGrain,
    spatial: SpatialGrain,
) -> Result<Vec<AggregateRow>, GrainError> {
    let grouping = Grouping::new(temporal, spatial)?;
    Ok(aggregate_by(rows, grouping))
}

pub fn aggregate_by(rows: &[CleanedReading], grouping: Grouping) -> Vec<AggregateRow> {
    let mut groups: HashMap<(Period, u32), usize> = HashMap::new();
    let mut out: Vec<AggregateRow> = Vec::new();

    for row in rows {
        let Some(location) = grouping.spatial.location(row) else {
            continue;
        };
        let period = grouping.temporal.period(row);

        let slot = *groups.entry((period, location)).or_insert_with(|| {
            out.push(AggregateRow {
                period,
                location,
                net_entries: 0,
                net_exits: 0,
            });
            out.len() - 1
        });

        out[slot].net_entries += row.net_entries;
        out[slot].net_exits += row.net_exits;
    }

    out
}
