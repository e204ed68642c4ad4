use crate::address::Address;
use crate::control::{Control, Modulo, SSubtype, USubtype};
use crate::error::DecodeError;

/// Standard AX.25 limit on the digipeater (via) path.
const MAX_DIGIS: usize = 8;

/// A fully decoded AX.25 frame.
///
/// `modulo` records which control-field width this frame was decoded
/// with/will be encoded with, so `decode(encode(frame)) == frame` holds
/// without the caller having to remember it out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub destination: Address,
    pub source: Address,
    pub digis: Vec<Address>,
    pub control: Control,
    pub modulo: Modulo,
    pub pid: Option<u8>,
    pub info: Option<Vec<u8>>,
}

impl Frame {
    /// Decode a raw AX.25 frame (no FCS, no KISS envelope — that's C1's job).
    pub fn decode(bytes: &[u8], modulo: Modulo) -> Result<Frame, DecodeError> {
        let mut offset = 0;
        let (destination, _) = Address::decode(bytes, offset)?;
        offset += 7;
        let (source, mut last) = Address::decode(bytes, offset)?;
        offset += 7;

        let mut digis = Vec::new();
        while !last {
            if digis.len() >= MAX_DIGIS {
                return Err(DecodeError::NoLastAddress);
            }
            let (digi, is_last) = Address::decode(bytes, offset)?;
            offset += 7;
            last = is_last;
            digis.push(digi);
        }

        let (control, clen) = Control::decode(&bytes[offset..], modulo)?;
        offset += clen;

        let carries_info = matches!(control, Control::I { .. })
            || matches!(control, Control::U { subtype: USubtype::Ui, .. });

        let (pid, info) = if carries_info {
            match bytes.get(offset) {
                Some(&pid) => (Some(pid), Some(bytes[offset + 1..].to_vec())),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        Ok(Frame { destination, source, digis, control, modulo, pid, info })
    }

    /// Re-encode this frame to its on-wire octet string.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.destination.encode(false));
        let source_is_last = self.digis.is_empty();
        out.extend_from_slice(&self.source.encode(source_is_last));
        for (i, digi) in self.digis.iter().enumerate() {
            let is_last = i + 1 == self.digis.len();
            out.extend_from_slice(&digi.encode(is_last));
        }
        out.extend(self.control.encode(self.modulo));
        if let Some(pid) = self.pid {
            out.push(pid);
            if let Some(info) = &self.info {
                out.extend_from_slice(info);
            }
        }
        out
    }

    pub fn is_i_frame(&self) -> bool {
        matches!(self.control, Control::I { .. })
    }

    pub fn is_ui(&self) -> bool {
        matches!(self.control, Control::U { subtype: USubtype::Ui, .. })
    }

    pub fn s_subtype(&self) -> Option<SSubtype> {
        match self.control {
            Control::S { subtype, .. } => Some(subtype),
            _ => None,
        }
    }

    pub fn u_subtype(&self) -> Option<USubtype> {
        match self.control {
            Control::U { subtype, .. } => Some(subtype),
            _ => None,
        }
    }
}

/// Build a UI frame (used for beacons and AXDP-over-UI).
#[allow(clippy::too_many_arguments)]
pub fn encode_ui(
    source: Address,
    destination: Address,
    digis: Vec<Address>,
    pid: u8,
    info: Vec<u8>,
    pf: bool,
) -> Frame {
    Frame {
        destination,
        source,
        digis,
        control: Control::U { subtype: USubtype::Ui, pf },
        modulo: Modulo::Eight,
        pid: Some(pid),
        info: Some(info),
    }
}

/// Build an I frame at the given sequence numbers and modulus.
#[allow(clippy::too_many_arguments)]
pub fn encode_i(
    source: Address,
    destination: Address,
    digis: Vec<Address>,
    pid: u8,
    info: Vec<u8>,
    ns: u8,
    nr: u8,
    pf: bool,
    modulo: Modulo,
) -> Frame {
    Frame {
        destination,
        source,
        digis,
        control: Control::I { ns, nr, pf },
        modulo,
        pid: Some(pid),
        info: Some(info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_one_bytes() -> Vec<u8> {
        vec![
            0x82, 0xA0, 0xA4, 0xA6, 0x40, 0x40, 0x60, 0x9C, 0x60, 0x86, 0x82, 0x98, 0x98, 0x62,
            0xAE, 0x92, 0x88, 0x8A, 0x62, 0x40, 0xE3, 0x03, 0xF0, 0x54, 0x65, 0x73, 0x74,
        ]
    }

    #[test]
    fn decodes_scenario_one_ui_frame() {
        let frame = Frame::decode(&scenario_one_bytes(), Modulo::Eight).unwrap();
        assert_eq!(frame.destination.to_string(), "APRS");
        assert_eq!(frame.source.to_string(), "N0CALL-1");
        assert_eq!(frame.digis.len(), 1);
        assert_eq!(frame.digis[0].to_string(), "WIDE1-1*");
        assert!(frame.is_ui());
        assert_eq!(frame.pid, Some(0xF0));
        assert_eq!(frame.info.as_deref(), Some(b"Test".as_slice()));
    }

    #[test]
    fn decode_then_encode_round_trips_scenario_one() {
        let bytes = scenario_one_bytes();
        let frame = Frame::decode(&bytes, Modulo::Eight).unwrap();
        assert_eq!(frame.encode(), bytes);
    }

    #[test]
    fn i_frame_round_trips_with_no_digis() {
        let frame = encode_i(
            Address::new("N0CALL", 1),
            Address::new("N1CALL", 2),
            vec![],
            0xF0,
            b"hello".to_vec(),
            3,
            5,
            true,
            Modulo::Eight,
        );
        let bytes = frame.encode();
        let decoded = Frame::decode(&bytes, Modulo::Eight).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn s_frame_has_no_pid_or_info() {
        let frame = Frame {
            destination: Address::new("N0CALL", 0),
            source: Address::new("N1CALL", 0),
            digis: vec![],
            control: Control::S { subtype: SSubtype::Rr, nr: 2, pf: false },
            modulo: Modulo::Eight,
            pid: None,
            info: None,
        };
        let bytes = frame.encode();
        let decoded = Frame::decode(&bytes, Modulo::Eight).unwrap();
        assert_eq!(decoded.pid, None);
        assert_eq!(decoded.info, None);
    }

    #[test]
    fn too_many_digis_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Address::new("N0CALL", 0).encode(false));
        bytes.extend_from_slice(&Address::new("N1CALL", 0).encode(false));
        for i in 0..9 {
            bytes.extend_from_slice(&Address::new(format!("DIGI{i}"), 0).encode(false));
        }
        assert_eq!(Frame::decode(&bytes, Modulo::Eight), Err(DecodeError::NoLastAddress));
    }

    #[test]
    fn mod128_i_frame_round_trips() {
        let frame = encode_i(
            Address::new("N0CALL", 0),
            Address::new("N1CALL", 0),
            vec![],
            0xF0,
            vec![1, 2, 3],
            100,
            50,
            false,
            Modulo::OneTwentyEight,
        );
        let bytes = frame.encode();
        let decoded = Frame::decode(&bytes, Modulo::OneTwentyEight).unwrap();
        assert_eq!(decoded, frame);
    }
}
