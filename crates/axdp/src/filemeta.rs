use crate::tags::file_meta as tag;
use crate::tlv::{for_each_tlv, write_tlv};

/// Metadata advertised before a bulk transfer begins (spec §4.7 step 1).
/// `compression` is `0` (none) when absent on decode, so a peer running
/// an older decoder that never wrote the tag is read as uncompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub filename: String,
    pub size: u64,
    pub sha256: [u8; 32],
    pub chunk_size: u32,
    pub compression: u8,
}

impl FileMeta {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_tlv(&mut out, tag::FILENAME, self.filename.as_bytes());
        write_tlv(&mut out, tag::SIZE, &self.size.to_be_bytes());
        write_tlv(&mut out, tag::SHA256, &self.sha256);
        write_tlv(&mut out, tag::CHUNK_SIZE, &self.chunk_size.to_be_bytes());
        write_tlv(&mut out, tag::COMPRESSION, &[self.compression]);
        out
    }

    /// Decode from the value bytes of a `FILE_META` TLV. Returns `None`
    /// on any malformed nested TLV or a missing required sub-field —
    /// this never panics on adversarial input.
    pub fn decode(buf: &[u8]) -> Option<FileMeta> {
        let mut filename = None;
        let mut size = None;
        let mut sha256 = None;
        let mut chunk_size = None;
        let mut compression = 0u8;

        for_each_tlv(buf, |t, value| match t {
            t if t == tag::FILENAME => filename = String::from_utf8(value.to_vec()).ok(),
            t if t == tag::SIZE => {
                if let Ok(bytes) = value.try_into() {
                    size = Some(u64::from_be_bytes(bytes));
                }
            }
            t if t == tag::SHA256 => {
                if let Ok(bytes) = value.try_into() {
                    sha256 = Some(bytes);
                }
            }
            t if t == tag::CHUNK_SIZE => {
                if let Ok(bytes) = value.try_into() {
                    chunk_size = Some(u32::from_be_bytes(bytes));
                }
            }
            t if t == tag::COMPRESSION => compression = value.first().copied().unwrap_or(0),
            _ => {}
        })
        .ok()?;

        Some(FileMeta {
            filename: filename?,
            size: size?,
            sha256: sha256?,
            chunk_size: chunk_size?,
            compression,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let meta = FileMeta {
            filename: "photo.jpg".into(),
            size: 40_000,
            sha256: [7u8; 32],
            chunk_size: 256,
            compression: 1,
        };
        let decoded = FileMeta::decode(&meta.encode()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn missing_required_field_is_none() {
        let mut out = Vec::new();
        write_tlv(&mut out, tag::FILENAME, b"x");
        assert!(FileMeta::decode(&out).is_none());
    }
}
