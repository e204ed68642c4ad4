use crate::tags::capabilities as tag;
use crate::tlv::{for_each_tlv, write_tlv};

/// A peer's advertised feature set, exchanged via `ping`/`pong` (spec
/// §4.7, §9 capability-negotiation open question).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub proto_max: u8,
    pub algorithms: Vec<u8>,
    pub max_decompressed_len: u32,
}

impl Capabilities {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_tlv(&mut out, tag::PROTO_MAX, &[self.proto_max]);
        write_tlv(&mut out, tag::ALGORITHMS, &self.algorithms);
        write_tlv(&mut out, tag::MAX_DECOMPRESSED_LEN, &self.max_decompressed_len.to_be_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Option<Capabilities> {
        let mut proto_max = None;
        let mut algorithms = Vec::new();
        let mut max_decompressed_len = 0u32;

        for_each_tlv(buf, |t, value| match t {
            t if t == tag::PROTO_MAX => proto_max = value.first().copied(),
            t if t == tag::ALGORITHMS => algorithms = value.to_vec(),
            t if t == tag::MAX_DECOMPRESSED_LEN => {
                if let Ok(bytes) = value.try_into() {
                    max_decompressed_len = u32::from_be_bytes(bytes);
                }
            }
            _ => {}
        })
        .ok()?;

        Some(Capabilities { proto_max: proto_max?, algorithms, max_decompressed_len })
    }

    /// Whether `self` (the locally advertised capability set) can
    /// interoperate with `peer`'s advertised `proto_max` (spec §7 error
    /// taxonomy item 5: degrade to plain connected-mode otherwise).
    pub fn compatible_with(&self, peer: &Capabilities) -> bool {
        self.proto_max.min(peer.proto_max) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let caps = Capabilities { proto_max: 1, algorithms: vec![1, 2], max_decompressed_len: 65536 };
        assert_eq!(Capabilities::decode(&caps.encode()).unwrap(), caps);
    }

    #[test]
    fn incompatible_when_either_side_advertises_zero() {
        let us = Capabilities { proto_max: 1, algorithms: vec![], max_decompressed_len: 0 };
        let peer = Capabilities { proto_max: 0, algorithms: vec![], max_decompressed_len: 0 };
        assert!(!us.compatible_with(&peer));
    }
}
