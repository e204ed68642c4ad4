/// Files at or under this size never compress (spec §4.7): the AXDP
/// framing overhead alone would erase any savings.
const MIN_COMPRESSIBLE_SIZE: usize = 64;

/// Below this ratio, compression is considered to have paid for itself
/// (spec §4.7: `effective when ratio<0.95`).
const EFFECTIVE_RATIO_CEILING: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    None,
    Lz4,
}

/// Examines magic bytes and the file extension to decide whether a
/// transfer is worth compressing at all (spec §4.7). Already-compressed
/// container formats and small files are passed through uncompressed;
/// everything else defaults to LZ4.
pub fn select_algorithm(filename: &str, data: &[u8]) -> CompressionAlgorithm {
    if data.len() <= MIN_COMPRESSIBLE_SIZE {
        return CompressionAlgorithm::None;
    }
    if is_precompressed_container(filename, data) {
        return CompressionAlgorithm::None;
    }
    CompressionAlgorithm::Lz4
}

fn is_precompressed_container(filename: &str, data: &[u8]) -> bool {
    const PRECOMPRESSED_EXTENSIONS: &[&str] =
        &["jpg", "jpeg", "png", "zip", "gz", "7z", "mp3", "mp4"];
    let ext = filename.rsplit('.').next().map(|e| e.to_ascii_lowercase());
    if let Some(ext) = &ext {
        if PRECOMPRESSED_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
    }
    matches_known_magic(data)
}

fn matches_known_magic(data: &[u8]) -> bool {
    const MAGICS: &[&[u8]] = &[
        &[0xFF, 0xD8, 0xFF],             // jpg
        &[0x89, b'P', b'N', b'G'],       // png
        &[b'P', b'K', 0x03, 0x04],       // zip
        &[0x1F, 0x8B],                   // gzip
        &[b'7', b'z', 0xBC, 0xAF, 0x27], // 7z
        &[b'I', b'D', b'3'],             // mp3 (ID3 tag)
    ];
    MAGICS.iter().any(|magic| data.starts_with(magic))
}

pub fn compress(algorithm: CompressionAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        CompressionAlgorithm::None => data.to_vec(),
        CompressionAlgorithm::Lz4 => lz4_flex::compress_prepend_size(data),
    }
}

pub fn decompress(algorithm: CompressionAlgorithm, data: &[u8]) -> Result<Vec<u8>, DecompressError> {
    match algorithm {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Lz4 => {
            lz4_flex::decompress_size_prepended(data).map_err(|_| DecompressError::Corrupt)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecompressError {
    #[error("compressed payload is corrupt or truncated")]
    Corrupt,
}

/// Measured savings from compressing a chunk or whole file (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionMetrics {
    pub original_size: u64,
    pub compressed_size: u64,
    pub ratio: f64,
    pub savings_percent: f64,
    pub bytes_saved: u64,
    pub effective: bool,
}

impl CompressionMetrics {
    pub fn new(original_size: u64, compressed_size: u64) -> Self {
        let ratio = if original_size == 0 { 1.0 } else { compressed_size as f64 / original_size as f64 };
        let bytes_saved = original_size.saturating_sub(compressed_size);
        Self {
            original_size,
            compressed_size,
            ratio,
            savings_percent: (1.0 - ratio) * 100.0,
            bytes_saved,
            effective: ratio < EFFECTIVE_RATIO_CEILING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_files_are_never_compressed() {
        assert_eq!(select_algorithm("note.txt", &[b'x'; 10]), CompressionAlgorithm::None);
    }

    #[test]
    fn precompressed_extensions_are_skipped() {
        let data = vec![0u8; 1000];
        assert_eq!(select_algorithm("photo.jpg", &data), CompressionAlgorithm::None);
        assert_eq!(select_algorithm("archive.zip", &data), CompressionAlgorithm::None);
    }

    #[test]
    fn precompressed_magic_bytes_are_skipped_regardless_of_extension() {
        let mut data = vec![0xFFu8, 0xD8, 0xFF];
        data.extend(vec![0u8; 1000]);
        assert_eq!(select_algorithm("renamed.dat", &data), CompressionAlgorithm::None);
    }

    #[test]
    fn plain_text_defaults_to_lz4() {
        let data = b"hello world ".repeat(20);
        assert_eq!(select_algorithm("log.txt", &data), CompressionAlgorithm::Lz4);
    }

    #[test]
    fn lz4_round_trips() {
        let data = b"repeat repeat repeat repeat repeat".to_vec();
        let compressed = compress(CompressionAlgorithm::Lz4, &data);
        let decompressed = decompress(CompressionAlgorithm::Lz4, &compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn metrics_saturate_bytes_saved_at_zero() {
        let metrics = CompressionMetrics::new(10, 20);
        assert_eq!(metrics.bytes_saved, 0);
        assert!(!metrics.effective);
    }

    #[test]
    fn metrics_report_effective_below_ceiling() {
        let metrics = CompressionMetrics::new(1000, 400);
        assert!(metrics.effective);
        assert_eq!(metrics.bytes_saved, 600);
        assert!((metrics.savings_percent - 60.0).abs() < 1e-9);
    }
}
