//! KISS octet-stream framing between the host and a TNC (e.g. Direwolf).
//!
//! KISS has no CRC and no length prefix: frames are delimited by `FEND`
//! bytes and any `FEND`/`FESC` occurring in the payload is byte-stuffed.
//! This module provides the one-shot encoder plus an incremental decoder
//! ([`KissParser`]) that can be fed arbitrary-sized chunks off a TCP
//! socket and emits zero or more decoded payloads per call.

#![warn(rust_2018_idioms)]

/// Frame delimiter.
pub const FEND: u8 = 0xC0;
/// Escape marker.
pub const FESC: u8 = 0xDB;
/// Escaped `FEND`.
pub const TFEND: u8 = 0xDC;
/// Escaped `FESC`.
pub const TFESC: u8 = 0xDD;

/// Encode `payload` as a single KISS data frame on the given TNC port.
///
/// `port` occupies the high nibble of the command byte; the low nibble is
/// always `0x0` (the "data frame" command).
pub fn encode_frame(payload: &[u8], port: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.push(FEND);
    out.push((port & 0x0F) << 4);
    for &byte in payload {
        match byte {
            FEND => out.extend_from_slice(&[FESC, TFEND]),
            FESC => out.extend_from_slice(&[FESC, TFESC]),
            other => out.push(other),
        }
    }
    out.push(FEND);
    out
}

/// Reverse the KISS byte-stuffing substitution over a complete buffer
/// (the bytes between two `FEND`s, command byte included).
///
/// This is the non-streaming primitive used by tests and by callers that
/// already have a delimited frame in hand. A trailing lone `FESC` (no
/// byte follows it) is preserved literally rather than dropped, and an
/// `FESC` followed by anything other than `TFEND`/`TFESC` is likewise
/// passed through literally — [`KissParser`] is what enforces the
/// drop-and-resynchronise failure semantics for a live stream.
pub fn unescape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == FESC {
            match bytes.get(i + 1) {
                Some(&TFEND) => {
                    out.push(FEND);
                    i += 2;
                }
                Some(&TFESC) => {
                    out.push(FESC);
                    i += 2;
                }
                _ => {
                    out.push(FESC);
                    i += 1;
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No opening `FEND` observed yet (or we're resynchronising after a
    /// malformed escape); bytes are discarded until the next `FEND`.
    Idle,
    /// Between an opening and closing `FEND`, accumulating unescaped bytes.
    InFrame,
    /// Just saw `FESC` inside a frame; waiting for `TFEND`/`TFESC`.
    InFrameEscape,
}

/// Incremental KISS decoder.
///
/// Feed it arbitrary chunks of the TCP stream via [`feed`](Self::feed);
/// it returns the data payloads of any complete, valid KISS data frames
/// (port 0, command low nibble `0x0`) found in the chunk. Frames on other
/// ports, non-data commands, and empty payloads are dropped silently, as
/// is any frame containing a malformed escape — the parser resynchronises
/// on the next `FEND` in all of these cases.
#[derive(Debug, Clone)]
pub struct KissParser {
    state: State,
    buf: Vec<u8>,
}

impl Default for KissParser {
    fn default() -> Self {
        Self::new()
    }
}

impl KissParser {
    pub fn new() -> Self {
        Self { state: State::Idle, buf: Vec::new() }
    }

    /// Discard any partially-decoded frame and return to the idle state.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buf.clear();
    }

    /// Feed a chunk of bytes, returning the decoded payloads of any
    /// complete valid data frames found within it.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &byte in bytes {
            match self.state {
                State::Idle => {
                    if byte == FEND {
                        self.buf.clear();
                        self.state = State::InFrame;
                    }
                }
                State::InFrame => match byte {
                    FEND => {
                        if !self.buf.is_empty() {
                            if let Some(payload) = self.take_frame() {
                                frames.push(payload);
                            }
                        }
                        // Stay in InFrame: a back-to-back FEND FEND is the
                        // boundary between two frames, not a new sync point.
                    }
                    FESC => self.state = State::InFrameEscape,
                    other => self.buf.push(other),
                },
                State::InFrameEscape => match byte {
                    TFEND => {
                        self.buf.push(FEND);
                        self.state = State::InFrame;
                    }
                    TFESC => {
                        self.buf.push(FESC);
                        self.state = State::InFrame;
                    }
                    _ => {
                        log::debug!("kiss: malformed escape, dropping frame and resyncing");
                        self.buf.clear();
                        self.state = State::Idle;
                    }
                },
            }
        }
        frames
    }

    /// Consume `self.buf` as a complete, unescaped frame: command byte
    /// plus payload. Returns `None` (and still clears the buffer) when
    /// the frame should be dropped per §4.1/§6.
    fn take_frame(&mut self) -> Option<Vec<u8>> {
        let frame = std::mem::take(&mut self.buf);
        let (&cmd, payload) = frame.split_first()?;
        let port = (cmd >> 4) & 0x0F;
        let command = cmd & 0x0F;
        if command != 0x00 {
            log::trace!("kiss: dropping non-data command 0x{:x}", command);
            return None;
        }
        if port != 0 {
            log::trace!("kiss: dropping frame on port {port}");
            return None;
        }
        if payload.is_empty() {
            return None;
        }
        Some(payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips() {
        let payload = vec![0x01, FEND, 0x02, FESC, 0x03];
        let encoded = encode_frame(&payload, 0);
        let mut parser = KissParser::new();
        let frames = parser.feed(&encoded);
        assert_eq!(frames, vec![payload]);
    }

    #[test]
    fn split_across_chunks() {
        let mut parser = KissParser::new();
        assert!(parser.feed(&[FEND, 0x00, 0x01, 0x02]).is_empty());
        let frames = parser.feed(&[0x03, 0x04, FEND]);
        assert_eq!(frames, vec![vec![0x01, 0x02, 0x03, 0x04]]);
    }

    #[test]
    fn back_to_back_frames_share_a_fend() {
        let mut parser = KissParser::new();
        let mut stream = encode_frame(&[0xAA], 0);
        stream.extend(encode_frame(&[0xBB], 0));
        let frames = parser.feed(&stream);
        assert_eq!(frames, vec![vec![0xAA], vec![0xBB]]);
    }

    #[test]
    fn drops_non_port_zero() {
        let mut parser = KissParser::new();
        let frame = encode_frame(&[0x01], 3);
        assert!(parser.feed(&frame).is_empty());
    }

    #[test]
    fn drops_non_data_command() {
        let mut parser = KissParser::new();
        // command 0x1 ("TXDELAY") on port 0
        let frame = [FEND, 0x01, 0x32, FEND];
        assert!(parser.feed(&frame).is_empty());
    }

    #[test]
    fn drops_empty_payload() {
        let mut parser = KissParser::new();
        let frame = [FEND, 0x00, FEND];
        assert!(parser.feed(&frame).is_empty());
    }

    #[test]
    fn malformed_escape_drops_frame_and_resyncs() {
        let mut parser = KissParser::new();
        // FESC followed by a byte that is neither TFEND nor TFESC.
        let mut stream = vec![FEND, 0x00, 0x01, FESC, 0x99, 0x02, FEND];
        stream.extend(encode_frame(&[0x42], 0));
        let frames = parser.feed(&stream);
        assert_eq!(frames, vec![vec![0x42]]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut parser = KissParser::new();
        assert!(parser.feed(&[FEND, 0x00, 0x01, 0x02]).is_empty());
        parser.reset();
        let frames = parser.feed(&[0x03, FEND]);
        // The `0x03` from before reset is gone; this starts a fresh,
        // un-opened frame so nothing completes until a new FEND pair.
        assert!(frames.is_empty());
    }

    #[test]
    fn unescape_preserves_trailing_lone_fesc() {
        let bytes = [0x01, 0x02, FESC];
        assert_eq!(unescape(&bytes), vec![0x01, 0x02, FESC]);
    }

    #[test]
    fn unescape_inverts_encode_payload() {
        let payload = vec![FEND, FESC, 0x55];
        let mut encoded_body = vec![0x00]; // command byte
        for &b in &payload {
            match b {
                FEND => encoded_body.extend_from_slice(&[FESC, TFEND]),
                FESC => encoded_body.extend_from_slice(&[FESC, TFESC]),
                other => encoded_body.push(other),
            }
        }
        let decoded = unescape(&encoded_body);
        assert_eq!(&decoded[1..], payload.as_slice());
    }
}
