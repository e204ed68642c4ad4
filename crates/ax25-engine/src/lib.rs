//! Session coordinator (spec §4.9, C9): drives the LAPB state machine
//! (`ax25-session`), the AXDP application layer (`axdp`), the bulk
//! transfer engine (`ax25-transfer`), and NET/ROM inference
//! (`ax25-netrom`) from a single KISS byte stream (`ax25-kiss`).
//!
//! [`coordinator::Coordinator`] is sans-IO, like every other crate in
//! this workspace: it takes bytes/commands plus an `Instant` and
//! returns a flat `Vec<EngineAction>` for a caller to execute.
//! [`runtime::run`] is the thin `tokio` shell that owns the actual
//! `TcpStream` and drives it.

#![warn(rust_2018_idioms)]

mod action;
mod config;
mod coordinator;
mod link;
mod peer;
mod timer;

pub mod runtime;

pub use action::{Capability, EngineAction, EngineEvent, IncomingTransferRequest, PacketClass, PacketDedupStatus, PacketInfo};
pub use config::{CompressionChoice, EngineConfig, ABSOLUTE_MAX_DECOMPRESSED_LEN, DEFAULT_MAX_DECOMPRESSED_LEN};
pub use coordinator::Coordinator;
pub use link::LinkKey;
pub use peer::PeerControl;
pub use runtime::Command;
pub use timer::{TimerHeap, TimerKind};
