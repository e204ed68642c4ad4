/// Selective-ack bitmap used to repair a bulk transfer: `base_chunk` plus
/// a window of chunks, one bit per chunk, set when received (spec §4.7
/// scenario 6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SackBitmap {
    pub base_chunk: u32,
    pub window: u16,
    bits: Vec<u8>,
}

impl SackBitmap {
    pub fn new(base_chunk: u32, window: u16) -> Self {
        Self { base_chunk, window, bits: vec![0u8; Self::byte_len(window)] }
    }

    pub fn from_received(base_chunk: u32, window: u16, received: impl IntoIterator<Item = u16>) -> Self {
        let mut bitmap = Self::new(base_chunk, window);
        for idx in received {
            bitmap.set(idx, true);
        }
        bitmap
    }

    fn byte_len(window: u16) -> usize {
        (window as usize).div_ceil(8)
    }

    pub fn set(&mut self, index: u16, received: bool) {
        if index >= self.window {
            return;
        }
        let byte = (index / 8) as usize;
        let bit = 7 - (index % 8);
        if received {
            self.bits[byte] |= 1 << bit;
        } else {
            self.bits[byte] &= !(1 << bit);
        }
    }

    pub fn is_received(&self, index: u16) -> bool {
        if index >= self.window {
            return false;
        }
        let byte = (index / 8) as usize;
        let bit = 7 - (index % 8);
        self.bits[byte] & (1 << bit) != 0
    }

    /// Absolute chunk indexes in `[base_chunk, base_chunk + window)` that
    /// are still missing.
    pub fn missing(&self) -> Vec<u32> {
        (0..self.window)
            .filter(|&i| !self.is_received(i))
            .map(|i| self.base_chunk + i as u32)
            .collect()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6 + self.bits.len());
        out.extend_from_slice(&self.base_chunk.to_be_bytes());
        out.extend_from_slice(&self.window.to_be_bytes());
        out.extend_from_slice(&self.bits);
        out
    }

    pub fn decode(buf: &[u8]) -> Option<SackBitmap> {
        if buf.len() < 6 {
            return None;
        }
        let base_chunk = u32::from_be_bytes(buf[0..4].try_into().ok()?);
        let window = u16::from_be_bytes(buf[4..6].try_into().ok()?);
        let expected = Self::byte_len(window);
        let bits = buf.get(6..6 + expected)?.to_vec();
        Some(SackBitmap { base_chunk, window, bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_missing_set() {
        let bitmap = SackBitmap::from_received(0, 4, [0, 1, 3]);
        assert_eq!(bitmap.missing(), vec![2]);
        let decoded = SackBitmap::decode(&bitmap.encode()).unwrap();
        assert_eq!(decoded, bitmap);
    }

    #[test]
    fn decode_rejects_truncated_bitstring() {
        let buf = [0, 0, 0, 0, 0, 20]; // window=20, needs 3 bytes of bitstring
        assert!(SackBitmap::decode(&buf).is_none());
    }
}
