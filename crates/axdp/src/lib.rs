//! AXDP: the application-layer message format carried inside AX.25
//! information fields. Every message begins with the four magic bytes
//! `"AXT1"` followed by a flat sequence of TLVs (spec §4.4).
//!
//! Like `ax25-proto`, this crate is sans-IO: encode/decode are pure byte
//! transforms, and decoding arbitrary/adversarial input never panics —
//! it returns `None`.

#![warn(rust_2018_idioms)]

mod capabilities;
mod filemeta;
mod message;
mod sack;
mod tags;
mod tlv;

pub use capabilities::Capabilities;
pub use filemeta::FileMeta;
pub use message::{crc32, Message, MessageType, MAGIC, MESSAGE_ID_COMPLETION_ACK_NACK, MESSAGE_ID_COMPLETION_REQUEST};
pub use sack::SackBitmap;
