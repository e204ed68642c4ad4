use ax25_proto::{Address, DedupStatus, FrameClass};
use ax25_transfer::BulkTransfer;
use axdp::Capabilities;

use crate::link::LinkKey;

/// Everything decoded out of one inbound frame, surfaced upward for
/// history/analytics regardless of whether it also drove a session
/// transition (spec §6 `on_packet`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketInfo {
    pub source: Address,
    pub destination: Address,
    pub digis: Vec<Address>,
    pub class: PacketClass,
    /// Duplicate-tracker verdict for this frame (spec §4.3). A
    /// `RetryDuplicate` is still forwarded to the session layer — "forward
    /// but flag" — so this is the flag; an `IngestionDedup` frame is
    /// dropped right after this event fires, so `on_packet` is the only
    /// place that verdict is ever visible.
    pub dedup: PacketDedupStatus,
}

/// A serialisable mirror of [`ax25_proto::DedupStatus`] so callers of
/// this crate don't need to depend on `ax25-proto` themselves just to
/// match on `on_packet`'s payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDedupStatus {
    Unique,
    RetryDuplicate,
    IngestionDedup,
}

impl From<DedupStatus> for PacketDedupStatus {
    fn from(status: DedupStatus) -> Self {
        match status {
            DedupStatus::Unique => PacketDedupStatus::Unique,
            DedupStatus::RetryDuplicate => PacketDedupStatus::RetryDuplicate,
            DedupStatus::IngestionDedup => PacketDedupStatus::IngestionDedup,
        }
    }
}

/// A serialisable mirror of [`ax25_proto::FrameClass`] so callers of
/// this crate don't need to depend on `ax25-proto` themselves just to
/// match on `on_packet`'s payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketClass {
    DataProgress,
    UiBeacon,
    RoutingBroadcast,
    AckOnly,
    RetryOrDuplicate,
    SessionControl,
    Unknown,
}

impl From<FrameClass> for PacketClass {
    fn from(class: FrameClass) -> Self {
        match class {
            FrameClass::DataProgress => PacketClass::DataProgress,
            FrameClass::UiBeacon => PacketClass::UiBeacon,
            FrameClass::RoutingBroadcast => PacketClass::RoutingBroadcast,
            FrameClass::AckOnly => PacketClass::AckOnly,
            FrameClass::RetryOrDuplicate => PacketClass::RetryOrDuplicate,
            FrameClass::SessionControl => PacketClass::SessionControl,
            FrameClass::Unknown => PacketClass::Unknown,
        }
    }
}

/// An inbound `fileMeta` awaiting an accept/reject decision (spec §6
/// `on_transfer_request`).
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingTransferRequest {
    pub session_id: u32,
    pub from: String,
    pub filename: String,
    pub size: u64,
}

/// Outcome of a PING/PONG capability round trip (spec §4.7, §6
/// `on_capability`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Negotiated(Capabilities),
    Incompatible,
}

/// Everything the application layer (`apps/ax25term`) needs to react to,
/// mirroring the six upward callbacks of spec §6 as one enum so the
/// coordinator can hand back a flat `Vec<EngineAction>` per call instead
/// of invoking callbacks directly (keeping this crate's core sans-IO and
/// testable without trait objects).
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Packet(PacketInfo),
    Chat { from: String, text: String },
    TransferRequest(IncomingTransferRequest),
    TransferUpdate(BulkTransfer),
    Capability { peer: String, capability: Capability },
    SessionState { peer: String, previous: String, next: String },
}

/// What the coordinator asks its caller to do after feeding it bytes,
/// firing a timer, or handling a user command (spec §4.9, §5).
#[derive(Debug, Clone)]
pub enum EngineAction {
    /// Bytes ready to write to the TCP socket, already KISS-framed.
    WriteBytes(Vec<u8>),
    /// Register (or re-register) an absolute-time wakeup.
    ScheduleTimer { at: std::time::Instant },
    /// Something the application layer should observe.
    Event(EngineEvent),
}
