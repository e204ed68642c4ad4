use std::time::Duration;

use ax25_proto::Modulo;
use ax25_session::Modulo as SessionModulo;
use ax25_transfer::CompressionAlgorithm;

/// Config-surface compression selector (spec §6). The core transfer
/// engine (`ax25-transfer`) only implements `None`/`Lz4` — `Deflate` is
/// accepted here for forward compatibility with the CLI surface spec.md
/// names but falls back to `None` with a logged warning (see
/// `Config::resolve_compression_algorithm`; recorded as an Open Question
/// resolution in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionChoice {
    #[default]
    Lz4,
    Deflate,
    None,
}

/// Hard ceiling on the max-decompressed-payload capability a peer may
/// advertise or we may honour (spec §4.7, §6), independent of whatever
/// `maxDecompressedPayload` the local config requests.
pub const ABSOLUTE_MAX_DECOMPRESSED_LEN: u32 = 16 * 1024 * 1024;

/// Default max-decompressed-length capability advertised over PING/PONG
/// when the config doesn't override it (spec §4.7 step "capability").
pub const DEFAULT_MAX_DECOMPRESSED_LEN: u32 = 4096;

/// Everything the coordinator needs at startup (spec §6's CLI/config
/// surface). The CLI binary (`apps/ax25term`) is responsible for
/// parsing this out of a TOML file plus flag overrides; this crate only
/// consumes the resolved struct.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub own_callsign: String,
    pub own_ssid: u8,
    pub modulo: Modulo,
    /// Window size K: default 4, clamped to [1,7] mod-8 or [1,63] mod-128.
    pub window: u8,
    pub n2: u8,
    pub t3: Duration,
    pub paclen_min: u32,
    pub paclen_max: u32,
    pub paclen_default: u32,
    pub auto_negotiate_capabilities: bool,
    pub axdp_extensions_enabled: bool,
    pub compression_enabled: bool,
    pub compression_algorithm: CompressionChoice,
    pub max_decompressed_payload: u32,
    /// KISS port the TNC carries AX.25 traffic on (spec §4.1/§6: frames
    /// on other ports are parsed but dropped).
    pub kiss_port: u8,
}

impl EngineConfig {
    pub fn new(own_callsign: impl Into<String>, own_ssid: u8) -> Self {
        Self {
            own_callsign: own_callsign.into(),
            own_ssid,
            modulo: Modulo::Eight,
            window: 4,
            n2: 10,
            t3: Duration::from_secs(60),
            paclen_min: 32,
            paclen_max: 256,
            paclen_default: 128,
            auto_negotiate_capabilities: true,
            axdp_extensions_enabled: true,
            compression_enabled: true,
            compression_algorithm: CompressionChoice::Lz4,
            max_decompressed_payload: DEFAULT_MAX_DECOMPRESSED_LEN,
            kiss_port: 0,
        }
    }

    pub fn session_modulo(&self) -> SessionModulo {
        match self.modulo {
            Modulo::Eight => SessionModulo::Eight,
            Modulo::OneTwentyEight => SessionModulo::OneTwentyEight,
        }
    }

    pub fn max_window(&self) -> u8 {
        match self.modulo {
            Modulo::Eight => 7,
            Modulo::OneTwentyEight => 63,
        }
    }

    /// Clamp `max_decompressed_payload` to the absolute ceiling (spec §6).
    pub fn clamped_max_decompressed_payload(&self) -> u32 {
        self.max_decompressed_payload.min(ABSOLUTE_MAX_DECOMPRESSED_LEN)
    }

    pub fn resolve_compression_algorithm(&self) -> Option<CompressionAlgorithm> {
        if !self.compression_enabled {
            return Some(CompressionAlgorithm::None);
        }
        match self.compression_algorithm {
            CompressionChoice::Lz4 => Some(CompressionAlgorithm::Lz4),
            CompressionChoice::None => Some(CompressionAlgorithm::None),
            CompressionChoice::Deflate => {
                log::warn!("deflate requested but only lz4/none are implemented; falling back to none");
                Some(CompressionAlgorithm::None)
            }
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("NOCALL", 0)
    }
}
