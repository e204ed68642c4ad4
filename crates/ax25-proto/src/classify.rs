use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::address::Address;
use crate::control::{Control, SSubtype, USubtype};
use crate::frame::Frame;

/// PID value reserved for NET/ROM routing traffic carried in a UI frame.
pub const NETROM_PID: u8 = 0xCF;

/// FNV-1a, 64-bit. Used over the information field for the dedup signature
/// — fast, no external crate needed, matches what a TNC-adjacent hot path
/// would reach for.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// The classes a decoded frame falls into for routing-table refresh and
/// link-quality purposes (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    DataProgress,
    UiBeacon,
    RoutingBroadcast,
    AckOnly,
    RetryOrDuplicate,
    SessionControl,
    Unknown,
}

impl FrameClass {
    /// Whether an observation of this class should refresh a neighbor
    /// table entry (spec §4.3 table, "refreshes neighbor" column).
    pub fn refreshes_neighbor(&self) -> bool {
        matches!(self, FrameClass::DataProgress | FrameClass::UiBeacon)
    }

    /// Whether an observation of this class should refresh a route table
    /// entry (spec §4.3 table, "refreshes route" column).
    pub fn refreshes_route(&self) -> bool {
        matches!(
            self,
            FrameClass::DataProgress | FrameClass::UiBeacon | FrameClass::RoutingBroadcast
        )
    }

    /// Relative weight applied when this class refreshes link quality;
    /// `uiBeacon` is deliberately weaker than `dataProgress` (spec §9 open
    /// question, resolved here — see DESIGN.md).
    pub fn quality_weight(&self) -> f64 {
        match self {
            FrameClass::DataProgress => 1.0,
            FrameClass::UiBeacon => 0.25,
            FrameClass::RoutingBroadcast => 0.25,
            _ => 0.0,
        }
    }
}

/// Structural classification of a decoded frame.
///
/// `SABM`/`DISC`/`UA`/`DM`/`FRMR` always classify as `SessionControl`; this
/// resolves the apparent overlap in spec.md's table (which also mentions
/// "SABM/UA on its own" under `ackOnly`) in favor of the more specific,
/// exhaustive `sessionControl` row. `REJ`/`SREJ` classify as
/// `RetryOrDuplicate` structurally, independent of the dedup tracker's own
/// `RetryOrDuplicate` status for repeated signatures.
pub fn classify(frame: &Frame) -> FrameClass {
    match &frame.control {
        Control::I { .. } => match &frame.info {
            Some(info) if !info.is_empty() => FrameClass::DataProgress,
            _ => FrameClass::AckOnly,
        },
        Control::S { subtype, .. } => match subtype {
            SSubtype::Rr | SSubtype::Rnr => FrameClass::AckOnly,
            SSubtype::Rej | SSubtype::Srej => FrameClass::RetryOrDuplicate,
        },
        Control::U { subtype, .. } => match subtype {
            USubtype::Sabm
            | USubtype::Sabme
            | USubtype::Disc
            | USubtype::Ua
            | USubtype::Dm
            | USubtype::Frmr => FrameClass::SessionControl,
            USubtype::Ui => classify_ui(frame),
            USubtype::Xid | USubtype::Test | USubtype::Unknown(_) => FrameClass::Unknown,
        },
    }
}

fn classify_ui(frame: &Frame) -> FrameClass {
    if frame.pid == Some(NETROM_PID) {
        return FrameClass::RoutingBroadcast;
    }
    match &frame.info {
        Some(info) if !info.is_empty() && info.iter().all(|&b| is_printable(b)) => {
            FrameClass::UiBeacon
        }
        _ => FrameClass::Unknown,
    }
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte) || byte == b'\r' || byte == b'\n'
}

/// Identity used to recognise retransmissions and duplicates of the same
/// logical frame (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub from: Address,
    pub to: Address,
    pub class_tag: (u8, u8),
    pub ns: Option<u8>,
    pub info_hash: u64,
}

impl Signature {
    pub fn of(frame: &Frame) -> Signature {
        let class_tag = match &frame.control {
            Control::I { .. } => (0, 0),
            Control::S { subtype, .. } => (1, *subtype as u8),
            Control::U { subtype, .. } => (2, u_subtype_tag(*subtype)),
        };
        let ns = match &frame.control {
            Control::I { ns, .. } => Some(*ns),
            _ => None,
        };
        let info_hash = fnv1a(frame.info.as_deref().unwrap_or(&[]));
        Signature { from: frame.source.clone(), to: frame.destination.clone(), class_tag, ns, info_hash }
    }
}

fn u_subtype_tag(subtype: USubtype) -> u8 {
    match subtype {
        USubtype::Sabm => 0,
        USubtype::Sabme => 1,
        USubtype::Disc => 2,
        USubtype::Dm => 3,
        USubtype::Ua => 4,
        USubtype::Frmr => 5,
        USubtype::Ui => 6,
        USubtype::Xid => 7,
        USubtype::Test => 8,
        USubtype::Unknown(byte) => byte,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStatus {
    IngestionDedup,
    RetryDuplicate,
    Unique,
}

#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    pub ingestion_window: Duration,
    pub retry_window: Duration,
}

impl DedupConfig {
    /// Defaults for a KISS-framed source (spec §4.3). AGWPE sources use
    /// an `ingestion_window` of zero instead — AGWPE already suppresses
    /// TNC-side retransmission echoes before frames reach this layer.
    pub fn kiss() -> Self {
        Self { ingestion_window: Duration::from_millis(250), retry_window: Duration::from_secs(2) }
    }

    pub fn agwpe() -> Self {
        Self { ingestion_window: Duration::ZERO, retry_window: Duration::from_secs(2) }
    }
}

/// Signature-based duplicate detector with two sliding windows.
///
/// Entries are swept on every [`observe`](Self::observe) call so the table
/// never grows past the set of signatures seen within `retry_window`.
pub struct DedupTracker {
    config: DedupConfig,
    seen: HashMap<Signature, Instant>,
}

impl DedupTracker {
    pub fn new(config: DedupConfig) -> Self {
        Self { config, seen: HashMap::new() }
    }

    pub fn observe(&mut self, signature: Signature, now: Instant) -> DedupStatus {
        self.sweep(now);
        let status = match self.seen.get(&signature) {
            Some(&last) if now.saturating_duration_since(last) < self.config.ingestion_window => {
                DedupStatus::IngestionDedup
            }
            Some(&last) if now.saturating_duration_since(last) < self.config.retry_window => {
                log::trace!("dedup: {} -> {} is a retry duplicate, forwarding flagged", signature.from, signature.to);
                DedupStatus::RetryDuplicate
            }
            _ => DedupStatus::Unique,
        };
        self.seen.insert(signature, now);
        status
    }

    fn sweep(&mut self, now: Instant) {
        let retry_window = self.config.retry_window;
        let before = self.seen.len();
        self.seen.retain(|_, &mut last| now.saturating_duration_since(last) < retry_window);
        let evicted = before - self.seen.len();
        if evicted > 0 {
            log::trace!("dedup: sweep evicted {evicted} stale signature(s)");
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Modulo;
    use crate::frame::encode_ui;

    fn ui_frame(info: &[u8]) -> Frame {
        encode_ui(Address::new("N0CALL", 1), Address::new("APRS", 0), vec![], 0xF0, info.to_vec(), false)
    }

    #[test]
    fn printable_ui_is_a_beacon() {
        assert_eq!(classify(&ui_frame(b"CQ CQ de N0CALL")), FrameClass::UiBeacon);
    }

    #[test]
    fn netrom_pid_is_routing_broadcast() {
        let mut frame = ui_frame(&[0, 1, 2, 3]);
        frame.pid = Some(NETROM_PID);
        assert_eq!(classify(&frame), FrameClass::RoutingBroadcast);
    }

    #[test]
    fn i_frame_with_payload_is_data_progress() {
        let frame = crate::frame::encode_i(
            Address::new("N0CALL", 0),
            Address::new("N1CALL", 0),
            vec![],
            0xF0,
            b"hi".to_vec(),
            0,
            0,
            false,
            Modulo::Eight,
        );
        assert_eq!(classify(&frame), FrameClass::DataProgress);
    }

    #[test]
    fn rr_is_ack_only() {
        let frame = Frame {
            destination: Address::new("N0CALL", 0),
            source: Address::new("N1CALL", 0),
            digis: vec![],
            control: Control::S { subtype: SSubtype::Rr, nr: 1, pf: false },
            modulo: Modulo::Eight,
            pid: None,
            info: None,
        };
        assert_eq!(classify(&frame), FrameClass::AckOnly);
    }

    #[test]
    fn sabm_is_session_control() {
        let frame = Frame {
            destination: Address::new("N0CALL", 0),
            source: Address::new("N1CALL", 0),
            digis: vec![],
            control: Control::U { subtype: USubtype::Sabm, pf: true },
            modulo: Modulo::Eight,
            pid: None,
            info: None,
        };
        assert_eq!(classify(&frame), FrameClass::SessionControl);
    }

    #[test]
    fn repeat_within_ingestion_window_is_ingestion_dedup() {
        let mut tracker = DedupTracker::new(DedupConfig::kiss());
        let frame = ui_frame(b"hello");
        let sig = Signature::of(&frame);
        let t0 = Instant::now();
        assert_eq!(tracker.observe(sig.clone(), t0), DedupStatus::Unique);
        assert_eq!(
            tracker.observe(sig, t0 + Duration::from_millis(100)),
            DedupStatus::IngestionDedup
        );
    }

    #[test]
    fn repeat_between_windows_is_retry_duplicate() {
        let mut tracker = DedupTracker::new(DedupConfig::kiss());
        let frame = ui_frame(b"hello");
        let sig = Signature::of(&frame);
        let t0 = Instant::now();
        tracker.observe(sig.clone(), t0);
        assert_eq!(
            tracker.observe(sig, t0 + Duration::from_millis(800)),
            DedupStatus::RetryDuplicate
        );
    }

    #[test]
    fn repeat_after_retry_window_is_unique_again() {
        let mut tracker = DedupTracker::new(DedupConfig::kiss());
        let frame = ui_frame(b"hello");
        let sig = Signature::of(&frame);
        let t0 = Instant::now();
        tracker.observe(sig.clone(), t0);
        assert_eq!(tracker.observe(sig, t0 + Duration::from_secs(3)), DedupStatus::Unique);
    }

    #[test]
    fn sweep_evicts_stale_signatures() {
        let mut tracker = DedupTracker::new(DedupConfig::kiss());
        let t0 = Instant::now();
        for i in 0..5u8 {
            let frame = ui_frame(&[i]);
            tracker.observe(Signature::of(&frame), t0);
        }
        assert_eq!(tracker.len(), 5);
        let fresh = ui_frame(b"new");
        tracker.observe(Signature::of(&fresh), t0 + Duration::from_secs(10));
        assert_eq!(tracker.len(), 1);
    }
}
