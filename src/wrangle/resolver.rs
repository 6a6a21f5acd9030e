//! Surrogate key assignment for turnstiles, booths and stations.
//!
//! Each entity family maps its natural key, held as a tuple of fields, to a
//! dense integer in order of first occurrence. Keys are never concatenated,
//! so `("AB", "C")` and `("A", "BC")` stay distinct.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::wrangle::types::{
    BoothId, RawReading, ReadingIds, ResolvedReading, StationId, TurnstileId,
};

/// Natural key of a turnstile: (control area, unit, scp, station).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TurnstileKey {
    pub control_area: String,
    pub unit: String,
    pub scp: String,
    pub station: String,
}

/// Natural key of a booth: (control area, station, line names).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoothKey {
    pub control_area: String,
    pub station: String,
    pub linename: String,
}

/// Natural key of a station: (station, line names).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StationKey {
    pub station: String,
    pub linename: String,
}

impl TurnstileKey {
    pub fn of(r: &RawReading) -> Self {
        TurnstileKey {
            control_area: r.control_area.clone(),
            unit: r.unit.clone(),
            scp: r.scp.clone(),
            station: r.station.clone(),
        }
    }
}

impl BoothKey {
    pub fn of(r: &RawReading) -> Self {
        BoothKey {
            control_area: r.control_area.clone(),
            station: r.station.clone(),
            linename: r.linename.clone(),
        }
    }
}

impl StationKey {
    pub fn of(r: &RawReading) -> Self {
        StationKey {
            station: r.station.clone(),
            linename: r.linename.clone(),
        }
    }
}

/// First-seen, insertion-ordered dictionary from keys to dense ids.
#[derive(Debug, Clone)]
pub struct KeyIndex<K> {
    ids: HashMap<K, u32>,
}

impl<K: Eq + Hash> KeyIndex<K> {
    pub fn new() -> Self {
        KeyIndex {
            ids: HashMap::new(),
        }
    }

    /// Returns the id of `key`, assigning the next free id on first sight.
    pub fn intern(&mut self, key: K) -> u32 {
        let next = self.ids.len() as u32;
        *self.ids.entry(key).or_insert(next)
    }

    pub fn get(&self, key: &K) -> Option<u32> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<K: Eq + Hash> Default for KeyIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// The three key families built while resolving one batch.
#[derive(Debug, Default)]
pub struct Resolver {
    pub turnstiles: KeyIndex<TurnstileKey>,
    pub booths: KeyIndex<BoothKey>,
    pub stations: KeyIndex<StationKey>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn ids_for(&mut self, r: &RawReading) -> (TurnstileId, BoothId, StationId) {
        (
            TurnstileId(self.turnstiles.intern(TurnstileKey::of(r))),
            BoothId(self.booths.intern(BoothKey::of(r))),
            StationId(self.stations.intern(StationKey::of(r))),
        )
    }

    /// Attaches turnstile, booth and station ids to every reading.
    ///
    /// Output order matches input order.
    pub fn resolve(&mut self, readings: Vec<RawReading>) -> Vec<ResolvedReading> {
        let keyed: Vec<_> = readings
            .into_iter()
            .map(|r| {
                let ids = self.ids_for(&r);
                (r, ids)
            })
            .collect();

        let mut per_station: HashMap<StationId, HashSet<TurnstileId>> = HashMap::new();
        for (_, (tuid, _, suid)) in &keyed {
            per_station.entry(*suid).or_default().insert(*tuid);
        }

        keyed
            .into_iter()
            .map(|(reading, (turnstile, booth, station))| {
                let station_turnstiles = per_station.get(&station).map_or(0, |s| s.len() as u32);
                ResolvedReading {
                    reading,
                    ids: ReadingIds {
                        turnstile,
                        booth,
                        station,
                        station_turnstiles,
                    },
                }
            })
            .collect()
    }
}

/// Resolves a batch with a fresh [`Resolver`].
pub fn resolve(readings: Vec<RawReading>) -> Vec<ResolvedReading> {
    Resolver::new().resolve(readings)
}

/// Sorts readings by (station, turnstile, timestamp) so each turnstile's
/// series is contiguous and chronological.
pub fn sort_chronologically(rows: &mut [ResolvedReading]) {
    rows.sort_by(|a, b| {
        (a.ids.station, a.ids.turnstile, a.reading.timestamp).cmp(&(
            b.ids.station,
            b.ids.turnstile,
            b.reading.timestamp,
        ))
    });
}
