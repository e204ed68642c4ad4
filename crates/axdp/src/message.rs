use crate::capabilities::Capabilities;
use crate::filemeta::FileMeta;
use crate::sack::SackBitmap;
use crate::tags;
use crate::tlv::{for_each_tlv, write_tlv};

pub const MAGIC: &[u8; 4] = b"AXT1";

/// Reserved `messageId` values (spec §4.4).
pub const MESSAGE_ID_COMPLETION_REQUEST: u32 = 0xFFFF_FFFE;
pub const MESSAGE_ID_COMPLETION_ACK_NACK: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Chat,
    FileMeta,
    FileChunk,
    Ack,
    Nack,
    Ping,
    Pong,
    Close,
}

impl MessageType {
    fn to_byte(self) -> u8 {
        match self {
            MessageType::Chat => 0,
            MessageType::FileMeta => 1,
            MessageType::FileChunk => 2,
            MessageType::Ack => 3,
            MessageType::Nack => 4,
            MessageType::Ping => 5,
            MessageType::Pong => 6,
            MessageType::Close => 7,
        }
    }

    fn from_byte(byte: u8) -> Option<MessageType> {
        match byte {
            0 => Some(MessageType::Chat),
            1 => Some(MessageType::FileMeta),
            2 => Some(MessageType::FileChunk),
            3 => Some(MessageType::Ack),
            4 => Some(MessageType::Nack),
            5 => Some(MessageType::Ping),
            6 => Some(MessageType::Pong),
            7 => Some(MessageType::Close),
            _ => None,
        }
    }
}

/// A decoded AXDP message. Every field but `msg_type`/`session_id`/
/// `message_id` is optional — callers populate only what their message
/// type needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub msg_type: Option<MessageType>,
    pub session_id: u32,
    pub message_id: u32,
    pub chunk_index: Option<u32>,
    pub total_chunks: Option<u32>,
    pub payload: Option<Vec<u8>>,
    pub payload_crc32: Option<u32>,
    pub sack_bitmap: Option<SackBitmap>,
    pub file_meta: Option<FileMeta>,
    pub capabilities: Option<Capabilities>,
    /// Tags this codec doesn't recognise, preserved byte-for-byte so a
    /// future revision can add tags without breaking round-tripping
    /// through an older decoder (spec §4.4).
    pub unknown_tags: Vec<(u8, Vec<u8>)>,
}

impl Message {
    pub fn new(msg_type: MessageType, session_id: u32, message_id: u32) -> Self {
        Self { msg_type: Some(msg_type), session_id, message_id, ..Default::default() }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload_crc32 = Some(crc32(&payload));
        self.payload = Some(payload);
        self
    }

    /// `true` only when `bytes` begins with the literal four-byte magic;
    /// shorter inputs are `false`, never a panic.
    pub fn has_magic(bytes: &[u8]) -> bool {
        bytes.len() >= MAGIC.len() && &bytes[..MAGIC.len()] == MAGIC
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        if let Some(msg_type) = self.msg_type {
            write_tlv(&mut out, tags::TYPE, &[msg_type.to_byte()]);
        }
        write_tlv(&mut out, tags::SESSION_ID, &self.session_id.to_be_bytes());
        write_tlv(&mut out, tags::MESSAGE_ID, &self.message_id.to_be_bytes());
        if let Some(v) = self.chunk_index {
            write_tlv(&mut out, tags::CHUNK_INDEX, &v.to_be_bytes());
        }
        if let Some(v) = self.total_chunks {
            write_tlv(&mut out, tags::TOTAL_CHUNKS, &v.to_be_bytes());
        }
        if let Some(payload) = &self.payload {
            write_tlv(&mut out, tags::PAYLOAD, payload);
        }
        if let Some(crc) = self.payload_crc32 {
            write_tlv(&mut out, tags::PAYLOAD_CRC32, &crc.to_be_bytes());
        }
        if let Some(sack) = &self.sack_bitmap {
            write_tlv(&mut out, tags::SACK_BITMAP, &sack.encode());
        }
        if let Some(meta) = &self.file_meta {
            write_tlv(&mut out, tags::FILE_META, &meta.encode());
        }
        if let Some(caps) = &self.capabilities {
            write_tlv(&mut out, tags::CAPABILITIES, &caps.encode());
        }
        for (tag, value) in &self.unknown_tags {
            write_tlv(&mut out, *tag, value);
        }
        out
    }

    /// Decode a complete AXDP message. Returns `None` when the magic is
    /// missing or any TLV length overruns the buffer — never panics on
    /// arbitrary byte input.
    pub fn decode(bytes: &[u8]) -> Option<Message> {
        if !Self::has_magic(bytes) {
            return None;
        }
        let mut msg = Message::default();
        for_each_tlv(&bytes[MAGIC.len()..], |tag, value| match tag {
            t if t == tags::TYPE => msg.msg_type = value.first().copied().and_then(MessageType::from_byte),
            t if t == tags::SESSION_ID => {
                if let Ok(b) = value.try_into() {
                    msg.session_id = u32::from_be_bytes(b);
                }
            }
            t if t == tags::MESSAGE_ID => {
                if let Ok(b) = value.try_into() {
                    msg.message_id = u32::from_be_bytes(b);
                }
            }
            t if t == tags::CHUNK_INDEX => {
                if let Ok(b) = value.try_into() {
                    msg.chunk_index = Some(u32::from_be_bytes(b));
                }
            }
            t if t == tags::TOTAL_CHUNKS => {
                if let Ok(b) = value.try_into() {
                    msg.total_chunks = Some(u32::from_be_bytes(b));
                }
            }
            t if t == tags::PAYLOAD => msg.payload = Some(value.to_vec()),
            t if t == tags::PAYLOAD_CRC32 => {
                if let Ok(b) = value.try_into() {
                    msg.payload_crc32 = Some(u32::from_be_bytes(b));
                }
            }
            t if t == tags::SACK_BITMAP => msg.sack_bitmap = SackBitmap::decode(value),
            t if t == tags::FILE_META => msg.file_meta = FileMeta::decode(value),
            t if t == tags::CAPABILITIES => msg.capabilities = Capabilities::decode(value),
            other => msg.unknown_tags.push((other, value.to_vec())),
        })
        .ok()?;
        Some(msg)
    }

    /// `true` when `payload` (if present) matches `payload_crc32` (if
    /// present). Absence of either is not a mismatch — the caller didn't
    /// ask for a checksummed payload.
    pub fn payload_crc_ok(&self) -> bool {
        match (&self.payload, self.payload_crc32) {
            (Some(payload), Some(expected)) => crc32(payload) == expected,
            _ => true,
        }
    }
}

/// IEEE 802.3 CRC-32 over `bytes`, used for AXDP's `payloadCRC32` field
/// and for each chunk in the bulk transfer engine.
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_magic_requires_exact_prefix() {
        assert!(Message::has_magic(b"AXT1rest"));
        assert!(!Message::has_magic(b"AXT"));
        assert!(!Message::has_magic(b"AXT2rest"));
        assert!(!Message::has_magic(b""));
    }

    #[test]
    fn chat_message_round_trips() {
        let msg = Message::new(MessageType::Chat, 0x1234, 7).with_payload(b"hello world".to_vec());
        let bytes = msg.encode();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
        assert!(decoded.payload_crc_ok());
    }

    #[test]
    fn decode_rejects_missing_magic() {
        assert!(Message::decode(b"XXT1\x01\x00\x01\x00").is_none());
    }

    #[test]
    fn decode_rejects_length_overrun() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[tags::SESSION_ID, 0x00, 0xFF, 1, 2]);
        assert!(Message::decode(&bytes).is_none());
    }

    #[test]
    fn unknown_tags_are_preserved_through_a_round_trip() {
        let mut msg = Message::new(MessageType::Ping, 1, 1);
        msg.unknown_tags.push((0x7F, vec![9, 9, 9]));
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(decoded.unknown_tags, vec![(0x7F, vec![9, 9, 9])]);
    }

    #[test]
    fn tampered_payload_fails_crc_check() {
        let mut msg = Message::new(MessageType::FileChunk, 1, 1).with_payload(vec![1, 2, 3]);
        msg.payload = Some(vec![1, 2, 4]);
        assert!(!msg.payload_crc_ok());
    }

    #[test]
    fn completion_message_ids_are_the_documented_constants() {
        assert_eq!(MESSAGE_ID_COMPLETION_REQUEST, 0xFFFF_FFFE);
        assert_eq!(MESSAGE_ID_COMPLETION_ACK_NACK, 0xFFFF_FFFF);
    }
}
