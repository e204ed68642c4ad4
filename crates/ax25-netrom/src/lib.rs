//! Passive NET/ROM neighbor and inferred-route inference (spec §4.8,
//! C8): decaying quality tables fed by C3's classified frames, with no
//! participation in real NET/ROM routing broadcasts (spec.md's
//! Non-goals exclude that; this crate only *observes*).
//!
//! Grounded on `styrene_rns_transport::transport::{path_table,
//! announce_table, link_table}` — the same shape of a decaying,
//! obsolescence-bounded table keyed by a heard address, refreshed on
//! observation and swept on a tick.

#![warn(rust_2018_idioms)]

mod entry;
mod freshness;
mod neighbor;
mod quality;
mod route;
mod tables;

pub use entry::SourceType;
pub use freshness::freshness;
pub use neighbor::{NeighborEntry, NeighborTable};
pub use quality::{combine_quality, weight_to_sample};
pub use route::{RouteEntry, RouteKey, RouteTable};
pub use tables::NetRomTables;
