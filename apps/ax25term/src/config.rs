//! TOML config file plus CLI-flag overrides (spec §6's "CLI /
//! configuration surface"), mirroring the split `reticulumd::config::
//! DaemonConfig` uses: a `serde::Deserialize` struct read straight off
//! disk, every field optional so a partial file only overrides what it
//! names, with CLI flags taking precedence over the file and built-in
//! defaults filling in the rest.

use std::fs;
use std::path::Path;
use std::time::Duration;

use ax25_engine::{CompressionChoice, EngineConfig};
use serde::Deserialize;

use crate::Cli;

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub callsign: Option<String>,
    pub ssid: Option<u8>,
    pub modulo128: Option<bool>,
    pub window: Option<u8>,
    pub n2: Option<u8>,
    pub t3_secs: Option<u64>,
    pub paclen_min: Option<u32>,
    pub paclen_max: Option<u32>,
    pub paclen_default: Option<u32>,
    pub auto_negotiate_capabilities: Option<bool>,
    pub axdp_extensions_enabled: Option<bool>,
    pub compression_enabled: Option<bool>,
    pub compression_algorithm: Option<String>,
    pub max_decompressed_payload: Option<u32>,
    pub kiss_port: Option<u8>,
}

impl FileConfig {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

/// The two things the file/CLI surface configures that aren't part of
/// `EngineConfig` itself (spec §6 treats the TCP transport as external
/// to the core): where to dial the TNC.
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

fn parse_compression_algorithm(name: &str) -> CompressionChoice {
    match name.to_ascii_lowercase().as_str() {
        "deflate" => CompressionChoice::Deflate,
        "none" => CompressionChoice::None,
        other => {
            if other != "lz4" {
                log::warn!("unknown compression algorithm {other:?} in config, defaulting to lz4");
            }
            CompressionChoice::Lz4
        }
    }
}

/// Resolve CLI flags over an optional config file over built-in
/// defaults, in that precedence order (spec §6).
pub fn resolve(cli: &Cli, file: &FileConfig) -> (Endpoint, EngineConfig) {
    let mut config = EngineConfig::new(
        cli.callsign.clone().or_else(|| file.callsign.clone()).unwrap_or_else(|| "NOCALL".to_string()),
        cli.ssid.or(file.ssid).unwrap_or(0),
    );

    let modulo128 = cli.modulo128 || file.modulo128.unwrap_or(false);
    config.modulo = if modulo128 { ax25_proto::Modulo::OneTwentyEight } else { ax25_proto::Modulo::Eight };

    if let Some(window) = cli.window.or(file.window) {
        config.window = window;
    }
    if let Some(n2) = cli.n2.or(file.n2) {
        config.n2 = n2;
    }
    if let Some(secs) = cli.t3_secs.or(file.t3_secs) {
        config.t3 = Duration::from_secs(secs);
    }
    if let Some(min) = cli.paclen_min.or(file.paclen_min) {
        config.paclen_min = min;
    }
    if let Some(max) = cli.paclen_max.or(file.paclen_max) {
        config.paclen_max = max;
    }
    if let Some(default) = cli.paclen_default.or(file.paclen_default) {
        config.paclen_default = default;
    }
    if cli.no_auto_negotiate {
        config.auto_negotiate_capabilities = false;
    } else if let Some(flag) = file.auto_negotiate_capabilities {
        config.auto_negotiate_capabilities = flag;
    }
    if cli.no_axdp {
        config.axdp_extensions_enabled = false;
    } else if let Some(flag) = file.axdp_extensions_enabled {
        config.axdp_extensions_enabled = flag;
    }
    if cli.no_compression {
        config.compression_enabled = false;
    } else if let Some(flag) = file.compression_enabled {
        config.compression_enabled = flag;
    }
    if let Some(name) = cli.compression_algorithm.as_deref().or(file.compression_algorithm.as_deref()) {
        config.compression_algorithm = parse_compression_algorithm(name);
    }
    if let Some(len) = cli.max_decompressed_payload.or(file.max_decompressed_payload) {
        config.max_decompressed_payload = len;
    }
    if let Some(port) = cli.kiss_port.or(file.kiss_port) {
        config.kiss_port = port;
    }

    let endpoint = Endpoint {
        host: cli.host.clone().or_else(|| file.host.clone()).unwrap_or_else(|| "127.0.0.1".to_string()),
        port: cli.port.or(file.port).unwrap_or(8001),
    };

    (endpoint, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["ax25term"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let (endpoint, config) = resolve(&cli(&[]), &FileConfig::default());
        assert_eq!(endpoint.host, "127.0.0.1");
        assert_eq!(endpoint.port, 8001);
        assert_eq!(config.own_callsign, "NOCALL");
        assert_eq!(config.window, 4);
    }

    #[test]
    fn cli_flags_win_over_the_file() {
        let file = FileConfig { window: Some(2), ..FileConfig::default() };
        let (_endpoint, config) = resolve(&cli(&["--window", "6"]), &file);
        assert_eq!(config.window, 6);
    }

    #[test]
    fn file_fills_in_what_cli_omits() {
        let file = FileConfig { callsign: Some("N1CALL".to_string()), ssid: Some(3), ..FileConfig::default() };
        let (_endpoint, config) = resolve(&cli(&[]), &file);
        assert_eq!(config.own_callsign, "N1CALL");
        assert_eq!(config.own_ssid, 3);
    }

    #[test]
    fn no_compression_flag_disables_regardless_of_file() {
        let file = FileConfig { compression_enabled: Some(true), ..FileConfig::default() };
        let (_endpoint, config) = resolve(&cli(&["--no-compression"]), &file);
        assert!(!config.compression_enabled);
    }

    #[test]
    fn unknown_compression_algorithm_falls_back_to_lz4() {
        let file = FileConfig { compression_algorithm: Some("bzip2".to_string()), ..FileConfig::default() };
        let (_endpoint, config) = resolve(&cli(&[]), &file);
        assert_eq!(config.compression_algorithm, CompressionChoice::Lz4);
    }

    #[test]
    fn parses_a_full_toml_document() {
        let toml = r#"
            host = "tnc.local"
            port = 8011
            callsign = "N0CALL"
            ssid = 9
            window = 6
            compression_algorithm = "none"
        "#;
        let file = FileConfig::from_toml(toml).unwrap();
        assert_eq!(file.host.as_deref(), Some("tnc.local"));
        assert_eq!(file.ssid, Some(9));
    }
}
