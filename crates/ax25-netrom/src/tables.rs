use std::time::Instant;

use ax25_proto::{FrameClass, Frame};

use crate::entry::SourceType;
use crate::neighbor::NeighborTable;
use crate::route::RouteTable;

/// Combined neighbor/route tables fed by C3's classified frames (spec
/// §4.8, C8). This is the one entry point the coordinator (C9) calls
/// per inbound frame; everything else in this crate is reachable
/// through [`NetRomTables::neighbors`]/[`NetRomTables::routes`] for
/// inspection (UI heatmaps, freshness-based route selection, etc).
pub struct NetRomTables {
    pub neighbors: NeighborTable,
    pub routes: RouteTable,
}

impl NetRomTables {
    pub fn new() -> Self {
        Self { neighbors: NeighborTable::new(), routes: RouteTable::new() }
    }

    /// Feed one classified frame into the tables. Non-refreshing classes
    /// (ack-only, retry/duplicate, session-control, unknown) are
    /// filtered by `quality_weight() == 0.0` and never create or touch
    /// an entry, matching spec §4.8's "never refresh or create".
    ///
    /// A frame heard directly (no digipeater path) only ever refreshes
    /// the neighbor table. A frame heard via one or more digipeaters
    /// refreshes the neighbor entry for the last repeater (the station
    /// we actually heard) and an inferred route entry for the frame's
    /// original source, reachable via that same repeater — strictly
    /// directional, never the reverse.
    pub fn observe(&mut self, frame: &Frame, class: FrameClass, now: Instant) {
        let weight = class.quality_weight();
        if weight <= 0.0 {
            return;
        }

        if frame.digis.is_empty() {
            if class.refreshes_neighbor() {
                self.neighbors.observe(&frame.source, weight, SourceType::Classic, now);
            }
            return;
        }

        let via = frame.digis.last().expect("non-empty digis");

        if class.refreshes_neighbor() {
            self.neighbors.observe(via, weight, SourceType::Classic, now);
        }

        if class.refreshes_route() {
            self.routes.observe(
                &frame.source,
                via,
                &frame.source,
                &frame.digis,
                weight,
                SourceType::Inferred,
                now,
            );
        }
    }

    /// One broadcast interval elapsed: age both tables (spec §4.8).
    pub fn tick(&mut self) {
        self.neighbors.tick();
        self.routes.tick();
    }
}

impl Default for NetRomTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ax25_proto::{encode_i, encode_ui, Address, Modulo};

    #[test]
    fn direct_data_frame_refreshes_neighbor_only() {
        let mut tables = NetRomTables::new();
        let frame = encode_i(
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
        let class = ax25_proto::classify(&frame);
        let now = Instant::now();
        tables.observe(&frame, class, now);
        assert_eq!(tables.neighbors.len(), 1);
        assert!(tables.routes.is_empty());
        assert!(tables.neighbors.get(&Address::new("N0CALL", 0)).is_some());
    }

    #[test]
    fn digipeated_frame_refreshes_neighbor_for_last_digi_and_infers_route_to_source() {
        let mut tables = NetRomTables::new();
        let digi = Address::new("WIDE1", 1);
        let frame = encode_i(
            Address::new("N0CALL", 0),
            Address::new("N1CALL", 0),
            vec![digi.clone()],
            0xF0,
            b"hi".to_vec(),
            0,
            0,
            false,
            Modulo::Eight,
        );
        let class = ax25_proto::classify(&frame);
        let now = Instant::now();
        tables.observe(&frame, class, now);

        assert!(tables.neighbors.get(&digi).is_some());
        assert!(tables.neighbors.get(&Address::new("N0CALL", 0)).is_none());
        assert!(tables.routes.get(&Address::new("N0CALL", 0), &digi).is_some());
    }

    #[test]
    fn ack_only_frame_never_creates_entries() {
        let mut tables = NetRomTables::new();
        let frame = encode_i(
            Address::new("N0CALL", 0),
            Address::new("N1CALL", 0),
            vec![],
            0xF0,
            Vec::new(),
            0,
            0,
            false,
            Modulo::Eight,
        );
        let class = ax25_proto::classify(&frame);
        tables.observe(&frame, class, Instant::now());
        assert!(tables.neighbors.is_empty());
        assert!(tables.routes.is_empty());
    }

    #[test]
    fn ui_beacon_refreshes_neighbor_with_lower_weight_than_data() {
        let mut tables = NetRomTables::new();
        let frame = encode_ui(
            Address::new("N0CALL", 0),
            Address::new("APRS", 0),
            vec![],
            0xF0,
            b"CQ CQ de N0CALL".to_vec(),
            false,
        );
        let class = ax25_proto::classify(&frame);
        let now = Instant::now();
        tables.observe(&frame, class, now);
        let quality = tables.neighbors.quality_at(&Address::new("N0CALL", 0), now).unwrap();
        assert_eq!(quality, 64);
    }
}
