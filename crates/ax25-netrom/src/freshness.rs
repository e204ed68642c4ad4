use std::time::Duration;

/// Fraction of `ttl` during which freshness stays pegged at its maximum
/// before the linear decay to zero begins (spec §3: "a plateau window
/// during which freshness remains ≥95%" — a flat plateau trivially
/// satisfies that bound, and is simpler than the original NET/ROM
/// timer's own curve).
const PLATEAU_FRACTION: f64 = 0.1;

/// Freshness decays linearly from 255 at `elapsed=0` to 0 at
/// `elapsed=ttl`, holding at 255 for the first `PLATEAU_FRACTION` of
/// `ttl` (spec §3). An entry older than `ttl` reads as 0, never negative.
pub fn freshness(elapsed: Duration, ttl: Duration) -> u8 {
    if ttl.is_zero() {
        return 0;
    }
    let elapsed = elapsed.as_secs_f64();
    let ttl = ttl.as_secs_f64();
    let plateau = ttl * PLATEAU_FRACTION;
    if elapsed <= plateau {
        return 255;
    }
    if elapsed >= ttl {
        return 0;
    }
    let decaying_span = ttl - plateau;
    let decayed = 255.0 * (1.0 - (elapsed - plateau) / decaying_span);
    decayed.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_maximal() {
        assert_eq!(freshness(Duration::ZERO, Duration::from_secs(100)), 255);
    }

    #[test]
    fn plateau_window_stays_at_least_95_percent() {
        let ttl = Duration::from_secs(100);
        let f = freshness(Duration::from_secs(9), ttl);
        assert!(f as f64 >= 255.0 * 0.95);
    }

    #[test]
    fn midpoint_past_plateau_is_roughly_half() {
        let ttl = Duration::from_secs(100);
        let f = freshness(Duration::from_secs(55), ttl);
        assert!((100..=140).contains(&f));
    }

    #[test]
    fn entry_at_or_past_ttl_is_zero() {
        let ttl = Duration::from_secs(100);
        assert_eq!(freshness(Duration::from_secs(100), ttl), 0);
        assert_eq!(freshness(Duration::from_secs(500), ttl), 0);
    }
}
