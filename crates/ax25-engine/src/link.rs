use ax25_proto::Address;

/// Identifies one connected-mode session: local and remote station,
/// the digipeater path between them, and the KISS port ("channel") the
/// traffic rides on (spec §4.9: "look up the session by (localAddr,
/// fromAddr, path, channel)").
///
/// Holds full `Address` values (not just callsign strings) so the
/// coordinator can re-encode an AX.25 frame for this link without a
/// round trip through `Display`/parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub local: Address,
    pub remote: Address,
    pub path: Vec<Address>,
    pub channel: u8,
}

impl LinkKey {
    pub fn new(local: Address, remote: Address, path: Vec<Address>, channel: u8) -> Self {
        Self { local, remote, path, channel }
    }

    /// A `LinkKey` for a direct (no-digipeater) session on the default
    /// channel, the common case for a chat/file-transfer session set up
    /// by the application layer rather than inferred from a heard frame.
    pub fn direct(local: Address, remote: Address) -> Self {
        Self::new(local, remote, Vec::new(), 0)
    }

    /// Display-form callsign-SSID for the remote station, used as the
    /// key into per-peer control state and upward callback payloads.
    pub fn remote_label(&self) -> String {
        self.remote.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(call: &str) -> Address {
        Address::new(call, 0)
    }

    #[test]
    fn direct_links_with_same_endpoints_are_equal() {
        assert_eq!(LinkKey::direct(addr("N0CALL"), addr("N1CALL")), LinkKey::direct(addr("N0CALL"), addr("N1CALL")));
    }

    #[test]
    fn different_paths_are_distinct_keys() {
        let a = LinkKey::new(addr("N0CALL"), addr("N1CALL"), vec![Address::new("WIDE1", 1)], 0);
        let b = LinkKey::direct(addr("N0CALL"), addr("N1CALL"));
        assert_ne!(a, b);
    }

    #[test]
    fn remote_label_matches_display() {
        let link = LinkKey::direct(addr("N0CALL"), Address::new("N1CALL", 5));
        assert_eq!(link.remote_label(), "N1CALL-5");
    }
}
