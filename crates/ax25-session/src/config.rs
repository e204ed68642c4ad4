use std::time::Duration;

/// Sequence-numbering modulus for a session. Mirrors `ax25_proto::Modulo`
/// without depending on that crate — the session layer only needs the
/// numeric modulus, not the wire control-field shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulo {
    Eight,
    OneTwentyEight,
}

impl Modulo {
    pub fn value(self) -> u8 {
        match self {
            Modulo::Eight => 8,
            Modulo::OneTwentyEight => 128,
        }
    }
}

/// Per-session tunables (spec §6: window K, N2, T3; §5: T1 default/backoff).
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub modulo: Modulo,
    /// Window size K: default 4, clamped to [1, 7] mod-8 or [1, 63] mod-128.
    pub window: u8,
    /// Retry ceiling before a session gives up and transitions to `error`.
    pub n2: u8,
    /// T3 (idle keepalive) interval.
    pub t3: Duration,
    /// Initial T1 (retransmission timer); subsequent retries double this
    /// up to a 30s ceiling, matching `ax25_control::RttEstimator`'s clamp.
    pub initial_rto: Duration,
}

impl SessionConfig {
    pub fn new(modulo: Modulo) -> Self {
        let max_window = match modulo {
            Modulo::Eight => 7,
            Modulo::OneTwentyEight => 63,
        };
        Self {
            modulo,
            window: 4.min(max_window),
            n2: 10,
            t3: Duration::from_secs(60),
            initial_rto: Duration::from_secs(3),
        }
    }

    pub fn max_window(&self) -> u8 {
        match self.modulo {
            Modulo::Eight => 7,
            Modulo::OneTwentyEight => 63,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(Modulo::Eight)
    }
}
