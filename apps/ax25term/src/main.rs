//! AX.25 packet-radio terminal CLI (spec §6).
//!
//! Dials a KISS TNC over TCP (Direwolf, typically), hands the socket to
//! [`ax25_engine::runtime::run`], and drives it from a line-oriented
//! stdin REPL. Mirrors `reticulumd::bin::reticulumd`'s shape: a clap
//! `Args`/`Cli` struct, `#[tokio::main(flavor = "current_thread")]`,
//! `anyhow` at the `main` boundary (every lower crate in this workspace
//! uses `thiserror` instead).

mod config;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use ax25_engine::{Command, EngineEvent, LinkKey};
use ax25_proto::Address;

#[derive(Parser, Debug)]
#[command(name = "ax25term", about = "AX.25 packet-radio terminal over a KISS TNC", version)]
pub struct Cli {
    /// Path to a TOML config file (spec §6); CLI flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,

    /// Our own callsign (spec §6 `own callsign`).
    #[arg(long)]
    callsign: Option<String>,
    #[arg(long)]
    ssid: Option<u8>,

    /// Use modulo-128 (extended) sequence numbering instead of modulo-8.
    #[arg(long)]
    modulo128: bool,

    /// Connected-mode window size K (default 4; clamped to [1,7] mod-8
    /// or [1,63] mod-128).
    #[arg(long)]
    window: Option<u8>,
    /// N2 retry limit before a session gives up (default 10).
    #[arg(long)]
    n2: Option<u8>,
    /// T3 idle-keepalive interval in seconds (default 60).
    #[arg(long = "t3")]
    t3_secs: Option<u64>,

    #[arg(long)]
    paclen_min: Option<u32>,
    #[arg(long)]
    paclen_max: Option<u32>,
    #[arg(long)]
    paclen_default: Option<u32>,

    #[arg(long)]
    no_auto_negotiate: bool,
    #[arg(long)]
    no_axdp: bool,
    #[arg(long)]
    no_compression: bool,
    #[arg(long)]
    compression_algorithm: Option<String>,
    #[arg(long)]
    max_decompressed_payload: Option<u32>,

    /// KISS port carrying AX.25 traffic; frames on other ports are
    /// parsed but dropped (spec §4.1/§6).
    #[arg(long)]
    kiss_port: Option<u8>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let file_config = match &cli.config {
        Some(path) => config::FileConfig::from_path(path)
            .with_context(|| format!("reading config file {}", path.display()))?,
        None => config::FileConfig::default(),
    };
    let (endpoint, engine_config) = config::resolve(&cli, &file_config);

    log::info!("connecting to TNC at {}:{}", endpoint.host, endpoint.port);
    let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .with_context(|| format!("connecting to {}:{}", endpoint.host, endpoint.port))?;

    let local = Address::new(engine_config.own_callsign.clone(), engine_config.own_ssid);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let engine_task = tokio::spawn(ax25_engine::runtime::run(stream, engine_config, command_rx, event_tx));

    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(event);
        }
    });

    println!("ax25term ready as {local}. Type 'help' for commands.");
    if let Err(err) = run_repl(command_tx, local).await {
        log::warn!("repl exited: {err}");
    }

    engine_task.abort();
    event_task.abort();
    Ok(())
}

async fn run_repl(commands: mpsc::UnboundedSender<Command>, local: Address) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match dispatch_line(line, &local) {
            Ok(Some(command)) => {
                if commands.send(command).is_err() {
                    log::warn!("engine task is gone, can't send command");
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

fn dispatch_line(line: &str, local: &Address) -> Result<Option<Command>> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match verb {
        "help" => {
            print_help();
            Ok(None)
        }
        "quit" | "exit" => Ok(None),
        "connect" => {
            let remote = Address::from_str(rest).context("parsing callsign")?;
            Ok(Some(Command::Connect { remote, path: Vec::new() }))
        }
        "disc" => {
            let remote = Address::from_str(rest).context("parsing callsign")?;
            Ok(Some(Command::Disconnect(LinkKey::direct(local.clone(), remote))))
        }
        "chat" => {
            let (call, text) = rest.split_once(char::is_whitespace).context("usage: chat <call> <text>")?;
            let remote = Address::from_str(call).context("parsing callsign")?;
            let link = LinkKey::direct(local.clone(), remote);
            Ok(Some(Command::SendChat { link, text: text.to_string() }))
        }
        "sendfile" => {
            let (call, path) = rest.split_once(char::is_whitespace).context("usage: sendfile <call> <path>")?;
            let remote = Address::from_str(call).context("parsing callsign")?;
            let link = LinkKey::direct(local.clone(), remote);
            let data = std::fs::read(path).with_context(|| format!("reading {path}"))?;
            let filename = PathBuf::from(path).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string());
            Ok(Some(Command::SendFile { link, data, filename }))
        }
        "accept" => Ok(Some(Command::AcceptTransfer(parse_transfer_id(rest)?))),
        "reject" => Ok(Some(Command::RejectTransfer(parse_transfer_id(rest)?))),
        "pause" => Ok(Some(Command::PauseTransfer(parse_transfer_id(rest)?))),
        "resume" => Ok(Some(Command::ResumeTransfer(parse_transfer_id(rest)?))),
        "cancel" => Ok(Some(Command::CancelTransfer(parse_transfer_id(rest)?))),
        other => {
            eprintln!("unknown command {other:?}; type 'help'");
            Ok(None)
        }
    }
}

fn parse_transfer_id(rest: &str) -> Result<u32> {
    rest.trim().parse().with_context(|| format!("expected a numeric transfer id, got {rest:?}"))
}

fn print_help() {
    println!(
        "commands:\n  connect <call[-ssid]>\n  disc <call[-ssid]>\n  chat <call[-ssid]> <text>\n  sendfile <call[-ssid]> <path>\n  accept|reject|pause|resume|cancel <transfer id>\n  quit"
    );
}

fn print_event(event: EngineEvent) {
    match event {
        EngineEvent::Packet(info) => {
            log::trace!("packet {} -> {} [{:?}, dedup={:?}]", info.source, info.destination, info.class, info.dedup)
        }
        EngineEvent::Chat { from, text } => println!("<{from}> {text}"),
        EngineEvent::TransferRequest(request) => println!(
            "incoming transfer #{} from {}: {:?} ({} bytes) — 'accept {0}' or 'reject {0}'",
            request.session_id, request.from, request.filename, request.size
        ),
        EngineEvent::TransferUpdate(transfer) => println!(
            "transfer #{} {:?}: {:.0}% ({}/{} bytes)",
            transfer.session_id,
            transfer.status,
            transfer.progress() * 100.0,
            transfer.bytes_sent,
            transfer.file_size
        ),
        EngineEvent::Capability { peer, capability } => println!("capability with {peer}: {capability:?}"),
        EngineEvent::SessionState { peer, previous, next } => println!("{peer}: {previous} -> {next}"),
    }
}
