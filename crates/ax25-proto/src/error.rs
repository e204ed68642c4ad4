use thiserror::Error;

/// Failures from decoding a wire AX.25 address or frame.
///
/// Every variant here is a *format* error (spec §7 item 1): the caller's
/// only sane response is to drop the frame and resynchronise on the next
/// one, never to tear down a session over it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short for an address: need 7 bytes, have {0}")]
    AddressTruncated(usize),
    #[error("frame truncated before a last-address bit was seen")]
    NoLastAddress,
    #[error("frame has no control octet")]
    MissingControl,
    #[error("mod-128 frame truncated before second control octet")]
    MissingExtendedControl,
}
