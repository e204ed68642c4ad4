use std::collections::HashMap;
use std::time::{Duration, Instant};

use ax25_proto::Address;

use crate::entry::SourceType;
use crate::freshness::freshness;
use crate::quality::{combine_quality, weight_to_sample};

/// Default half-life for neighbor quality decay (spec §4.8).
pub const DEFAULT_HALF_LIFE: Duration = Duration::from_secs(30 * 60);

/// How long an unrefreshed neighbor takes to reach zero freshness.
/// spec.md fixes the quality half-life but leaves the freshness TTL an
/// implementer choice (§9); resolved here as twice the half-life, so an
/// entry is "stale" well before it's evicted by obsolescence.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Obsolescence starts here and is decremented once per broadcast
/// interval by [`NeighborTable::tick`]; the entry is dropped at zero.
pub const DEFAULT_OBSOLESCENCE: u8 = 20;

#[derive(Debug, Clone)]
pub struct NeighborEntry {
    pub quality: u8,
    pub last_seen: Instant,
    pub obsolescence: u8,
    pub source_type: SourceType,
}

/// Stations heard directly (no digipeater path) — spec §3 `Neighbor`.
pub struct NeighborTable {
    half_life: Duration,
    ttl: Duration,
    initial_obsolescence: u8,
    entries: HashMap<Address, NeighborEntry>,
}

impl NeighborTable {
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

    /// Fold a fresh observation of `who` into the table (spec §4.8):
    /// refreshes `lastSeen`, resets obsolescence, and combines the new
    /// sample into the stored quality via the canonical NET/ROM formula.
    /// Non-refreshing classes are filtered out by the caller
    /// ([`crate::NetRomTables::observe`]) before this is ever reached.
    pub fn observe(&mut self, who: &Address, weight: f64, source_type: SourceType, now: Instant) {
        let sample = weight_to_sample(weight);
        let quality = match self.entries.get(who) {
            Some(existing) => combine_quality(self.decayed_quality(existing, now), sample),
            None => sample,
        };
        self.entries.insert(
            who.clone(),
            NeighborEntry {
                quality,
                last_seen: now,
                obsolescence: self.initial_obsolescence,
                source_type,
            },
        );
    }

    fn decayed_quality(&self, entry: &NeighborEntry, now: Instant) -> u8 {
        decay_quality(entry.quality, entry.last_seen, now, self.half_life)
    }

    /// Current quality, decayed by elapsed time since `lastSeen`.
    pub fn quality_at(&self, who: &Address, now: Instant) -> Option<u8> {
        self.entries.get(who).map(|e| self.decayed_quality(e, now))
    }

    /// Freshness in `[0,255]`, linearly decaying to zero at the TTL.
    pub fn freshness_at(&self, who: &Address, now: Instant) -> Option<u8> {
        self.entries
            .get(who)
            .map(|e| freshness(now.saturating_duration_since(e.last_seen), self.ttl))
    }

    pub fn get(&self, who: &Address) -> Option<&NeighborEntry> {
        self.entries.get(who)
    }

    /// One broadcast interval has elapsed: decrement every entry's
    /// obsolescence counter and drop the ones that hit zero (spec §4.8).
    /// Deterministic regardless of call order relative to `observe`.
    pub fn tick(&mut self) {
        self.entries.retain(|who, entry| {
            entry.obsolescence = entry.obsolescence.saturating_sub(1);
            let keep = entry.obsolescence > 0;
            if !keep {
                log::debug!("netrom: neighbor {who} obsolete, evicting");
            }
            keep
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &NeighborEntry)> {
        self.entries.iter()
    }
}

impl Default for NeighborTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared decay primitive: exponential half-life decay of a `[0,255]`
/// quality sample toward zero as elapsed time grows (spec §4.8).
pub(crate) fn decay_quality(quality: u8, last_seen: Instant, now: Instant, half_life: Duration) -> u8 {
    if half_life.is_zero() {
        return quality;
    }
    let elapsed = now.saturating_duration_since(last_seen).as_secs_f64();
    let half_lives = elapsed / half_life.as_secs_f64();
    let factor = 0.5f64.powf(half_lives);
    (quality as f64 * factor).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(call: &str) -> Address {
        Address::new(call, 0)
    }

    #[test]
    fn first_observation_seeds_quality_from_sample() {
        let mut table = NeighborTable::new();
        let t0 = Instant::now();
        table.observe(&addr("N0CALL"), 1.0, SourceType::Classic, t0);
        assert_eq!(table.quality_at(&addr("N0CALL"), t0), Some(255));
    }

    #[test]
    fn repeated_strong_observations_stay_near_maximal() {
        let mut table = NeighborTable::new();
        let t0 = Instant::now();
        for _ in 0..5 {
            table.observe(&addr("N0CALL"), 1.0, SourceType::Classic, t0);
        }
        assert!(table.quality_at(&addr("N0CALL"), t0).unwrap() >= 250);
    }

    #[test]
    fn quality_decays_toward_zero_over_the_half_life() {
        let mut table = NeighborTable::with_params(
            Duration::from_secs(60),
            Duration::from_secs(120),
            DEFAULT_OBSOLESCENCE,
        );
        let t0 = Instant::now();
        table.observe(&addr("N0CALL"), 1.0, SourceType::Classic, t0);
        let later = table.quality_at(&addr("N0CALL"), t0 + Duration::from_secs(60)).unwrap();
        assert!((120..=135).contains(&later));
    }

    #[test]
    fn tick_decrements_and_evicts_at_zero() {
        let mut table = NeighborTable::with_params(DEFAULT_HALF_LIFE, DEFAULT_TTL, 2);
        let t0 = Instant::now();
        table.observe(&addr("N0CALL"), 1.0, SourceType::Classic, t0);
        assert_eq!(table.len(), 1);
        table.tick();
        assert_eq!(table.len(), 1);
        table.tick();
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn a_fresh_observation_resets_obsolescence() {
        let mut table = NeighborTable::with_params(DEFAULT_HALF_LIFE, DEFAULT_TTL, 2);
        let t0 = Instant::now();
        table.observe(&addr("N0CALL"), 1.0, SourceType::Classic, t0);
        table.tick();
        table.observe(&addr("N0CALL"), 1.0, SourceType::Classic, t0);
        table.tick();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn freshness_decays_independently_of_quality() {
        let mut table =
            NeighborTable::with_params(DEFAULT_HALF_LIFE, Duration::from_secs(100), DEFAULT_OBSOLESCENCE);
        let t0 = Instant::now();
        table.observe(&addr("N0CALL"), 1.0, SourceType::Classic, t0);
        assert_eq!(table.freshness_at(&addr("N0CALL"), t0 + Duration::from_secs(200)), Some(0));
    }
}
