use std::collections::HashMap;
use std::time::{Duration, Instant};

use ax25_proto::Address;

use crate::entry::SourceType;
use crate::freshness::freshness;
use crate::neighbor::decay_quality;
use crate::quality::{combine_quality, weight_to_sample};

/// Default half-life for inferred-route quality decay (spec §4.8) — a
/// fifth of the neighbor default, since a multi-hop path is stale-prone
/// compared to a direct-hearing neighbor.
pub const DEFAULT_HALF_LIFE: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

pub const DEFAULT_OBSOLESCENCE: u8 = 10;

/// A route key is `(destination, via)`: "destination is reachable
/// through via". Strictly directional — the reverse key is a distinct
/// entry the table never infers from this one (spec §4.8).
pub type RouteKey = (Address, Address);

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub origin: Address,
    pub path: Vec<Address>,
    pub quality: u8,
    pub last_seen: Instant,
    pub obsolescence: u8,
    pub source_type: SourceType,
}

/// Destinations heard only via a digipeater path — spec §3 `Route`.
pub struct RouteTable {
    half_life: Duration,
    ttl: Duration,
    initial_obsolescence: u8,
    entries: HashMap<RouteKey, RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_HALF_LIFE, DEFAULT_TTL, DEFAULT_OBSOLESCENCE)
    }

    pub fn with_params(half_life: Duration, ttl: Duration, initial_obsolescence: u8) -> Self {
        Self { half_life, ttl, initial_obsolescence, entries: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Observe `destination` reachable via `via`, originating from
    /// `origin` along digipeater `path` (spec §4.8). Never touches the
    /// reverse key `(via, destination)` — directionality is structural,
    /// not a convention callers must remember.
    pub fn observe(
        &mut self,
        destination: &Address,
        via: &Address,
        origin: &Address,
        path: &[Address],
        weight: f64,
        source_type: SourceType,
        now: Instant,
    ) {
        let key = (destination.clone(), via.clone());
        let sample = weight_to_sample(weight);
        let quality = match self.entries.get(&key) {
            Some(existing) => combine_quality(self.decayed_quality(existing, now), sample),
            None => sample,
        };
        self.entries.insert(
            key,
            RouteEntry {
                origin: origin.clone(),
                path: path.to_vec(),
                quality,
                last_seen: now,
                obsolescence: self.initial_obsolescence,
                source_type,
            },
        );
    }

    fn decayed_quality(&self, entry: &RouteEntry, now: Instant) -> u8 {
        decay_quality(entry.quality, entry.last_seen, now, self.half_life)
    }

    pub fn quality_at(&self, destination: &Address, via: &Address, now: Instant) -> Option<u8> {
        self.entries.get(&(destination.clone(), via.clone())).map(|e| self.decayed_quality(e, now))
    }

    pub fn freshness_at(&self, destination: &Address, via: &Address, now: Instant) -> Option<u8> {
        self.entries
            .get(&(destination.clone(), via.clone()))
            .map(|e| freshness(now.saturating_duration_since(e.last_seen), self.ttl))
    }

    pub fn get(&self, destination: &Address, via: &Address) -> Option<&RouteEntry> {
        self.entries.get(&(destination.clone(), via.clone()))
    }

    pub fn tick(&mut self) {
        self.entries.retain(|(destination, via), entry| {
            entry.obsolescence = entry.obsolescence.saturating_sub(1);
            let keep = entry.obsolescence > 0;
            if !keep {
                log::debug!("netrom: route to {destination} via {via} obsolete, evicting");
            }
            keep
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouteKey, &RouteEntry)> {
        self.entries.iter()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}
