use crate::error::DecodeError;

/// Sequence numbering modulus for a connected-mode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulo {
    Eight,
    OneTwentyEight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SSubtype {
    Rr,
    Rnr,
    Rej,
    Srej,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum USubtype {
    Sabm,
    Sabme,
    Disc,
    Dm,
    Ua,
    Frmr,
    Ui,
    Xid,
    Test,
    Unknown(u8),
}

/// U-frame modifier values with the P/F bit (0x10) cleared, per the
/// published AX.25 2.0/2.2 control-field table.
mod u_values {
    pub const SABM: u8 = 0x2F;
    pub const SABME: u8 = 0x6F;
    pub const DISC: u8 = 0x43;
    pub const DM: u8 = 0x0F;
    pub const UA: u8 = 0x63;
    pub const FRMR: u8 = 0x87;
    pub const UI: u8 = 0x03;
    pub const XID: u8 = 0xAF;
    pub const TEST: u8 = 0xE3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    I { ns: u8, nr: u8, pf: bool },
    S { subtype: SSubtype, nr: u8, pf: bool },
    U { subtype: USubtype, pf: bool },
}

impl Control {
    pub fn pf(&self) -> bool {
        match self {
            Control::I { pf, .. } | Control::S { pf, .. } | Control::U { pf, .. } => *pf,
        }
    }

    /// Decode the control field starting at `bytes[0]`; returns the
    /// control value and the number of octets consumed (1 for mod-8, 2
    /// for mod-128).
    pub fn decode(bytes: &[u8], modulo: Modulo) -> Result<(Control, usize), DecodeError> {
        let first = *bytes.first().ok_or(DecodeError::MissingControl)?;
        if first & 0x01 == 0 {
            return Self::decode_i(bytes, modulo);
        }
        if first & 0x03 == 0x01 {
            return Self::decode_s(bytes, modulo);
        }
        Ok((Self::decode_u(first), 1))
    }

    fn decode_i(bytes: &[u8], modulo: Modulo) -> Result<(Control, usize), DecodeError> {
        let first = bytes[0];
        match modulo {
            Modulo::Eight => {
                let ns = (first >> 1) & 0x07;
                let pf = (first >> 4) & 0x01 != 0;
                let nr = (first >> 5) & 0x07;
                Ok((Control::I { ns, nr, pf }, 1))
            }
            Modulo::OneTwentyEight => {
                let second = *bytes.get(1).ok_or(DecodeError::MissingExtendedControl)?;
                let ns = (first >> 1) & 0x7F;
                let pf = second & 0x01 != 0;
                let nr = (second >> 1) & 0x7F;
                Ok((Control::I { ns, nr, pf }, 2))
            }
        }
    }

    fn decode_s(bytes: &[u8], modulo: Modulo) -> Result<(Control, usize), DecodeError> {
        let first = bytes[0];
        let subtype = match (first >> 2) & 0x03 {
            0 => SSubtype::Rr,
            1 => SSubtype::Rnr,
            2 => SSubtype::Rej,
            _ => SSubtype::Srej,
        };
        match modulo {
            Modulo::Eight => {
                let pf = (first >> 4) & 0x01 != 0;
                let nr = (first >> 5) & 0x07;
                Ok((Control::S { subtype, nr, pf }, 1))
            }
            Modulo::OneTwentyEight => {
                let second = *bytes.get(1).ok_or(DecodeError::MissingExtendedControl)?;
                let pf = second & 0x01 != 0;
                let nr = (second >> 1) & 0x7F;
                Ok((Control::S { subtype, nr, pf }, 2))
            }
        }
    }

    fn decode_u(first: u8) -> Control {
        use u_values::*;
        let pf = (first >> 4) & 0x01 != 0;
        let masked = first & !0x10;
        let subtype = match masked {
            SABM => USubtype::Sabm,
            SABME => USubtype::Sabme,
            DISC => USubtype::Disc,
            DM => USubtype::Dm,
            UA => USubtype::Ua,
            FRMR => USubtype::Frmr,
            UI => USubtype::Ui,
            XID => USubtype::Xid,
            TEST => USubtype::Test,
            other => USubtype::Unknown(other),
        };
        Control::U { subtype, pf }
    }

    pub fn encode(&self, modulo: Modulo) -> Vec<u8> {
        match *self {
            Control::I { ns, nr, pf } => match modulo {
                Modulo::Eight => {
                    vec![((nr & 0x07) << 5) | ((pf as u8) << 4) | ((ns & 0x07) << 1)]
                }
                Modulo::OneTwentyEight => {
                    vec![(ns & 0x7F) << 1, ((nr & 0x7F) << 1) | pf as u8]
                }
            },
            Control::S { subtype, nr, pf } => {
                let bits = match subtype {
                    SSubtype::Rr => 0u8,
                    SSubtype::Rnr => 1,
                    SSubtype::Rej => 2,
                    SSubtype::Srej => 3,
                };
                match modulo {
                    Modulo::Eight => {
                        vec![0x01 | (bits << 2) | ((pf as u8) << 4) | ((nr & 0x07) << 5)]
                    }
                    Modulo::OneTwentyEight => {
                        vec![0x01 | (bits << 2), ((nr & 0x7F) << 1) | pf as u8]
                    }
                }
            }
            Control::U { subtype, pf } => {
                use u_values::*;
                let base = match subtype {
                    USubtype::Sabm => SABM,
                    USubtype::Sabme => SABME,
                    USubtype::Disc => DISC,
                    USubtype::Dm => DM,
                    USubtype::Ua => UA,
                    USubtype::Frmr => FRMR,
                    USubtype::Ui => UI,
                    USubtype::Xid => XID,
                    USubtype::Test => TEST,
                    USubtype::Unknown(byte) => byte & !0x10,
                };
                vec![base | ((pf as u8) << 4)]
            }
        }
    }
}
