//! Chunked AXDP bulk file transfer engine (spec §4.7, C7): chunk
//! scheduling, compression selection, and the completion handshake with
//! SACK-bitmap repair.
//!
//! Grounded on `styrene_rns_transport::resource::{sender,receiver,
//! manager}` — chunked transfer plus selective retry is the same
//! problem that crate solves for RNS resources — adapted to AXDP's
//! message set and to a pull-based pump (`TransferEngine::pump`) instead
//! of a push-driven request/response loop, since AX.25's I-frame window
//! (not a resource-layer ack) is what gates how many chunks can be
//! in flight at once.

#![warn(rust_2018_idioms)]

mod compression;
mod engine;
mod transfer;

pub use compression::{select_algorithm, CompressionAlgorithm, CompressionMetrics};
pub use engine::{TransferEngine, TransferError, TransferEvent, AXDP_CHUNK_OVERHEAD};
pub use transfer::{BulkTransfer, ChunkState, Direction, TransferStatus};
