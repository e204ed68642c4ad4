use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::DecodeError;

/// Failure parsing the human-readable `CALL` / `CALL-SSID` form (the
/// inverse of [`Address`]'s `Display` impl), used by the CLI surface
/// (spec §6) to turn a `--connect` argument into an [`Address`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("callsign must not be empty")]
    EmptyCallsign,
    #[error("callsign {0:?} is longer than 6 characters")]
    CallsignTooLong(String),
    #[error("ssid {0:?} is not a number in 0..=15")]
    InvalidSsid(String),
}

/// Semantic form of a seven-octet AX.25 address field.
///
/// `repeated` is only meaningful on a digipeater address (it is the H bit
/// reusing the same wire position as the destination/source C bit); callers
/// decoding destination or source addresses simply ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub callsign: String,
    pub ssid: u8,
    pub repeated: bool,
}

impl Address {
    pub fn new(callsign: impl Into<String>, ssid: u8) -> Self {
        Self { callsign: callsign.into(), ssid: ssid & 0x0F, repeated: false }
    }

    /// Decode the address at `buf[offset..offset+7]`.
    ///
    /// Returns the address plus whether the wire's last-address bit was
    /// set, so [`super::frame::decode_frame`] knows when to stop.
    pub fn decode(buf: &[u8], offset: usize) -> Result<(Address, bool), DecodeError> {
        let field = buf
            .get(offset..offset + 7)
            .ok_or(DecodeError::AddressTruncated(buf.len().saturating_sub(offset)))?;
        let callsign: String = field[..6].iter().map(|&b| (b >> 1) as char).collect();
        let callsign = callsign.trim_end().to_string();
        let ssid_octet = field[6];
        let ssid = (ssid_octet >> 1) & 0x0F;
        let last = ssid_octet & 0x01 != 0;
        let repeated = ssid_octet & 0x80 != 0;
        Ok((Address { callsign, ssid, repeated }, last))
    }

    /// Encode as the seven on-wire octets. `last` sets bit 0 (only true for
    /// the final address before the control field).
    pub fn encode(&self, last: bool) -> [u8; 7] {
        let mut out = [0u8; 7];
        let padded = format!("{:<6}", self.callsign.to_ascii_uppercase());
        for (i, ch) in padded.bytes().take(6).enumerate() {
            out[i] = ch << 1;
        }
        let mut ssid_octet = 0x60 | ((self.ssid & 0x0F) << 1);
        if last {
            ssid_octet |= 0x01;
        }
        if self.repeated {
            ssid_octet |= 0x80;
        }
        out[6] = ssid_octet;
        out
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Parse the `CALL` or `CALL-SSID` form this type's `Display` impl
    /// produces (trailing `*` from a repeated digipeater is not
    /// accepted back in — that bit only ever arises from decoding a
    /// wire frame, never from a human-typed address).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (callsign, ssid) = match s.split_once('-') {
            Some((call, ssid)) => {
                let ssid: u8 = ssid.parse().map_err(|_| AddressParseError::InvalidSsid(ssid.to_string()))?;
                if ssid > 15 {
                    return Err(AddressParseError::InvalidSsid(ssid.to_string()));
                }
                (call, ssid)
            }
            None => (s, 0),
        };
        if callsign.is_empty() {
            return Err(AddressParseError::EmptyCallsign);
        }
        if callsign.len() > 6 {
            return Err(AddressParseError::CallsignTooLong(callsign.to_string()));
        }
        Ok(Address::new(callsign.to_ascii_uppercase(), ssid))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid == 0 {
            write!(f, "{}", self.callsign)?;
        } else {
            write!(f, "{}-{}", self.callsign, self.ssid)?;
        }
        if self.repeated {
            write!(f, "*")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_destination_from_scenario_one() {
        let bytes = [0x82, 0xA0, 0xA4, 0xA6, 0x40, 0x40, 0x60];
        let (addr, last) = Address::decode(&bytes, 0).unwrap();
        assert_eq!(addr.callsign, "APRS");
        assert_eq!(addr.ssid, 0);
        assert!(!last);
        assert!(!addr.repeated);
    }

    #[test]
    fn decodes_repeated_digi_from_scenario_one() {
        let bytes = [0xAE, 0x92, 0x88, 0x8A, 0x62, 0x40, 0xE3];
        let (addr, last) = Address::decode(&bytes, 0).unwrap();
        assert_eq!(addr.to_string(), "WIDE1-1*");
        assert!(last);
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let addr = Address { callsign: "N0CALL".into(), ssid: 7, repeated: true };
        let wire = addr.encode(true);
        let (decoded, last) = Address::decode(&wire, 0).unwrap();
        assert_eq!(decoded, addr);
        assert!(last);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let bytes = [0x82, 0xA0];
        assert_eq!(Address::decode(&bytes, 0), Err(DecodeError::AddressTruncated(2)));
    }

    #[test]
    fn display_omits_dash_for_ssid_zero() {
        let addr = Address::new("APRS", 0);
        assert_eq!(addr.to_string(), "APRS");
    }

    #[test]
    fn parses_bare_callsign() {
        let addr: Address = "n0call".parse().unwrap();
        assert_eq!(addr, Address::new("N0CALL", 0));
    }

    #[test]
    fn parses_callsign_with_ssid() {
        let addr: Address = "N0CALL-7".parse().unwrap();
        assert_eq!(addr, Address::new("N0CALL", 7));
    }

    #[test]
    fn rejects_ssid_out_of_range() {
        assert_eq!("N0CALL-16".parse::<Address>(), Err(AddressParseError::InvalidSsid("16".to_string())));
    }

    #[test]
    fn rejects_overlong_callsign() {
        assert_eq!(
            "TOOLONGCALL".parse::<Address>(),
            Err(AddressParseError::CallsignTooLong("TOOLONGCALL".to_string()))
        );
    }

    #[test]
    fn display_then_parse_round_trips_for_unrepeated_addresses() {
        let addr = Address::new("WIDE1", 1);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }
}
