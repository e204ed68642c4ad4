//! AX.25 address and frame codec, plus the duplicate-detection and
//! frame-classification layer that sits directly on top of it.
//!
//! This crate is sans-IO: every function here is a pure transform over
//! byte slices and small value types. Nothing touches a clock except
//! [`classify::DedupTracker`], which takes `Instant` as an explicit
//! argument rather than reading one itself, so it stays unit-testable.

#![warn(rust_2018_idioms)]

mod address;
mod classify;
mod control;
mod error;
mod frame;

pub use address::{Address, AddressParseError};
pub use classify::{classify, fnv1a, DedupConfig, DedupStatus, DedupTracker, FrameClass, Signature, NETROM_PID};
pub use control::{Control, Modulo, SSubtype, USubtype};
pub use error::DecodeError;
pub use frame::{encode_i, encode_ui, Frame};
