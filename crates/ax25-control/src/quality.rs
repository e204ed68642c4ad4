use std::collections::HashMap;
use std::time::{Duration, Instant};

const DEFAULT_HALF_LIFE: Duration = Duration::from_secs(2);
const QUALITY_SMOOTHING: f64 = 0.2;

/// Half-life-decayed forward/reverse evidence for one directional link,
/// plus the EWMA quality score derived from it (spec §4.6, §3
/// `LinkTracker`).
#[derive(Debug, Clone, Copy)]
struct LinkEvidence {
    forward: f64,
    reverse: f64,
    quality: u8,
    last_update: Instant,
}

impl LinkEvidence {
    fn fresh(now: Instant) -> Self {
        Self { forward: 0.0, reverse: 0.0, quality: 128, last_update: now }
    }

    fn decay(&mut self, now: Instant, half_life: Duration) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        if elapsed <= 0.0 || half_life.is_zero() {
            return;
        }
        let factor = 0.5f64.powf(elapsed / half_life.as_secs_f64());
        self.forward *= factor;
        self.reverse *= factor;
        self.last_update = now;
    }

    fn nudge_quality(&mut self, weight: f64, toward: f64) {
        let delta = QUALITY_SMOOTHING * weight * (toward - self.quality as f64);
        self.quality = (self.quality as f64 + delta).round().clamp(0.0, 255.0) as u8;
    }
}

/// Tracks per-link forward/reverse delivery evidence and converts it
/// into an EWMA quality score in `[0, 255]`, `df`/`dr`, and ETX (spec
/// §4.6). Evidence decays by half-life so a link that's gone quiet
/// drifts back toward neutral rather than staying pinned at its last
/// observed quality forever.
///
/// `observe_forward`/`observe_reverse` are keyed by `(from, to)` as a
/// directional pair; `observe_reverse(from, to, ...)` records evidence
/// on the *opposite* link `(to, from)`, matching spec §4.6's "peer
/// ack-reverse increments the reverse counter on the opposite link".
pub struct LinkQualityEstimator {
    half_life: Duration,
    links: HashMap<(String, String), LinkEvidence>,
}

impl LinkQualityEstimator {
    pub fn new() -> Self {
        Self::with_half_life(DEFAULT_HALF_LIFE)
    }

    pub fn with_half_life(half_life: Duration) -> Self {
        Self { half_life, links: HashMap::new() }
    }

    fn entry(&mut self, from: &str, to: &str, now: Instant) -> &mut LinkEvidence {
        let evidence =
            self.links.entry((from.to_string(), to.to_string())).or_insert_with(|| LinkEvidence::fresh(now));
        evidence.decay(now, self.half_life);
        evidence
    }

    /// Positive delivery evidence on `from -> to`, weighted (spec §9:
    /// `dataProgress` uses weight 1.0, `uiBeacon` uses the documented
    /// weaker weight of 0.25).
    pub fn observe_forward(&mut self, from: &str, to: &str, weight: f64, now: Instant) {
        let evidence = self.entry(from, to, now);
        evidence.forward += weight;
        evidence.nudge_quality(weight, 255.0);
    }

    /// Evidence that `to` acknowledged `from`'s traffic: increments the
    /// reverse counter on the opposite link `(to, from)`.
    pub fn observe_reverse(&mut self, from: &str, to: &str, weight: f64, now: Instant) {
        let evidence = self.entry(to, from, now);
        evidence.reverse += weight;
    }

    /// Retry/duplicate evidence: only ever lowers quality, never raises
    /// it (spec §4.6).
    pub fn observe_negative(&mut self, from: &str, to: &str, weight: f64, now: Instant) {
        let evidence = self.entry(from, to, now);
        evidence.nudge_quality(weight, 0.0);
    }

    pub fn quality(&self, from: &str, to: &str) -> u8 {
        self.links.get(&(from.to_string(), to.to_string())).map(|e| e.quality).unwrap_or(128)
    }

    /// Forward delivery ratio estimate for `from -> to`.
    pub fn df(&self, from: &str, to: &str) -> Option<f64> {
        self.links.get(&(from.to_string(), to.to_string())).map(|e| normalize(e.forward))
    }

    /// Reverse delivery ratio for the same link, if any reverse evidence
    /// has ever been observed.
    pub fn dr(&self, from: &str, to: &str) -> Option<f64> {
        self.links.get(&(from.to_string(), to.to_string())).and_then(|e| {
            if e.reverse > 0.0 {
                Some(normalize(e.reverse))
            } else {
                None
            }
        })
    }

    /// Expected Transmission Count `1/(df*dr)`, falling back to `1/df`
    /// when no reverse evidence exists for this link (spec §3, §4.6).
    pub fn etx(&self, from: &str, to: &str) -> Option<f64> {
        let df = self.df(from, to)?;
        if df <= 0.0 {
            return None;
        }
        match self.dr(from, to) {
            Some(dr) if dr > 0.0 => Some(1.0 / (df * dr)),
            _ => Some(1.0 / df),
        }
    }
}

/// Maps a decayed evidence counter onto `(0, 1]` with a simple saturating
/// curve — counters never naturally reach a hard ceiling since every
/// observation keeps adding weight, so this keeps `df`/`dr` a proper
/// ratio instead of an unbounded count.
fn normalize(counter: f64) -> f64 {
    1.0 - 0.5f64.powf(counter)
}

impl Default for LinkQualityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_only_evidence_falls_back_for_etx() {
        let mut est = LinkQualityEstimator::new();
        let now = Instant::now();
        for _ in 0..5 {
            est.observe_forward("N0CALL", "N1CALL", 1.0, now);
        }
        assert!(est.dr("N0CALL", "N1CALL").is_none());
        let etx = est.etx("N0CALL", "N1CALL").unwrap();
        let df = est.df("N0CALL", "N1CALL").unwrap();
        assert!((etx - 1.0 / df).abs() < 1e-9);
    }

    #[test]
    fn repeated_forward_evidence_raises_quality_toward_ceiling() {
        let mut est = LinkQualityEstimator::new();
        let now = Instant::now();
        for _ in 0..50 {
            est.observe_forward("N0CALL", "N1CALL", 1.0, now);
        }
        assert!(est.quality("N0CALL", "N1CALL") > 200);
    }

    #[test]
    fn negative_evidence_only_lowers_never_raises() {
        let mut est = LinkQualityEstimator::new();
        let now = Instant::now();
        for _ in 0..20 {
            est.observe_forward("N0CALL", "N1CALL", 1.0, now);
        }
        let before = est.quality("N0CALL", "N1CALL");
        est.observe_negative("N0CALL", "N1CALL", 1.0, now);
        assert!(est.quality("N0CALL", "N1CALL") < before);
    }

    #[test]
    fn reverse_evidence_lands_on_the_opposite_link() {
        let mut est = LinkQualityEstimator::new();
        let now = Instant::now();
        est.observe_reverse("N0CALL", "N1CALL", 1.0, now);
        assert!(est.dr("N1CALL", "N0CALL").is_some());
        assert!(est.dr("N0CALL", "N1CALL").is_none());
    }

    #[test]
    fn evidence_decays_toward_neutral_over_many_half_lives() {
        let mut est = LinkQualityEstimator::with_half_life(Duration::from_millis(1));
        let now = Instant::now();
        for _ in 0..50 {
            est.observe_forward("N0CALL", "N1CALL", 1.0, now);
        }
        let later = now + Duration::from_secs(1);
        est.entry("N0CALL", "N1CALL", later);
        assert!(est.df("N0CALL", "N1CALL").unwrap() < 0.05);
    }
}
