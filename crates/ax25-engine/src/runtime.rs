//! The thin async shell that owns the actual socket.
//!
//! [`Coordinator`] itself never touches `tokio`: every public method
//! takes bytes/commands plus an `Instant` and returns a list of
//! [`EngineAction`]s for a caller to execute. This module is that
//! caller — the only place in the workspace that holds a live
//! `tokio::net::TcpStream` — mirroring the split read/write-task loop
//! `reticulum_legacy::iface::tcp_client::TcpClient::spawn` uses for its
//! own KISS-adjacent (HDLC) framed TCP interface, simplified down to one
//! task since this engine is single-threaded and cooperative rather than
//! running one task per interface.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use ax25_proto::Address;

use crate::action::{EngineAction, EngineEvent};
use crate::config::EngineConfig;
use crate::coordinator::Coordinator;
use crate::link::LinkKey;

/// A request from the application layer (CLI, GUI, whatever embeds this
/// crate) into the running [`Coordinator`].
#[derive(Debug)]
pub enum Command {
    Connect { remote: Address, path: Vec<Address> },
    Disconnect(LinkKey),
    SendChat { link: LinkKey, text: String },
    SendFile { link: LinkKey, data: Vec<u8>, filename: String },
    AcceptTransfer(u32),
    RejectTransfer(u32),
    PauseTransfer(u32),
    ResumeTransfer(u32),
    CancelTransfer(u32),
}

/// Socket read chunk size. KISS frames are small (paclen-bounded); this
/// just needs to be comfortably larger than one TCP segment.
const READ_BUFFER_SIZE: usize = 4096;

/// Interval at which NET/ROM route/neighbor table aging runs (spec
/// §4.8), independent of whatever traffic happens to arrive.
const NETROM_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Drive a [`Coordinator`] from a live TCP connection to a KISS TNC
/// until the socket closes or `commands` is dropped.
///
/// Every [`EngineEvent`] the coordinator produces — packets, chat,
/// transfer progress, capability/session-state changes — is forwarded
/// to `events` for the application layer to render. `EngineAction::WriteBytes`
/// is written straight to the socket; `ScheduleTimer` only updates the
/// `tokio::time::sleep` deadline the select loop already tracks.
pub async fn run(
    stream: TcpStream,
    config: EngineConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    let mut coordinator = Coordinator::new(config);
    let (mut read_half, mut write_half) = stream.into_split();
    let mut read_buf = [0u8; READ_BUFFER_SIZE];

    let mut netrom_tick = tokio::time::interval(NETROM_TICK_INTERVAL);
    netrom_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let sleep_until = coordinator.next_timer().unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            _ = tokio::time::sleep_until(sleep_until.into()) => {
                let actions = coordinator.fire_due_timers(Instant::now());
                if !dispatch(actions, &mut write_half, &events).await {
                    break;
                }
            }
            _ = netrom_tick.tick() => {
                coordinator.tick_netrom();
            }
            read_result = read_half.read(&mut read_buf) => {
                match read_result {
                    Ok(0) => {
                        log::info!("ax25-engine: TNC connection closed");
                        let actions = coordinator.on_transport_closed(Instant::now());
                        let _ = dispatch(actions, &mut write_half, &events).await;
                        break;
                    }
                    Ok(n) => {
                        let actions = coordinator.on_bytes(&read_buf[..n], Instant::now());
                        if !dispatch(actions, &mut write_half, &events).await {
                            break;
                        }
                    }
                    Err(err) => {
                        log::warn!("ax25-engine: read error: {err}");
                        break;
                    }
                }
            }
            maybe_command = commands.recv() => {
                match maybe_command {
                    Some(command) => {
                        let actions = apply_command(&mut coordinator, command);
                        if !dispatch(actions, &mut write_half, &events).await {
                            break;
                        }
                    }
                    None => {
                        log::info!("ax25-engine: command channel closed, shutting down");
                        break;
                    }
                }
            }
        }

        let pumped = coordinator.pump(Instant::now());
        if !dispatch(pumped, &mut write_half, &events).await {
            break;
        }
    }
}

fn apply_command(coordinator: &mut Coordinator, command: Command) -> Vec<EngineAction> {
    let now = Instant::now();
    match command {
        Command::Connect { remote, path } => coordinator.connect(remote, path, now),
        Command::Disconnect(link) => coordinator.disconnect(&link, now),
        Command::SendChat { link, text } => coordinator.send_chat(&link, &text),
        Command::SendFile { link, data, filename } => coordinator.send_file(&link, data, filename).1,
        Command::AcceptTransfer(id) => coordinator.accept_transfer(id),
        Command::RejectTransfer(id) => coordinator.reject_transfer(id),
        Command::PauseTransfer(id) => {
            coordinator.pause_transfer(id);
            Vec::new()
        }
        Command::ResumeTransfer(id) => {
            coordinator.resume_transfer(id);
            Vec::new()
        }
        Command::CancelTransfer(id) => coordinator.cancel_transfer(id),
    }
}

/// Execute a batch of actions: write bytes to the socket, forward events
/// upward. Returns `false` when the socket write fails and the caller
/// should give up on this connection.
async fn dispatch(
    actions: Vec<EngineAction>,
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    events: &mpsc::UnboundedSender<EngineEvent>,
) -> bool {
    for action in actions {
        match action {
            EngineAction::WriteBytes(bytes) => {
                if let Err(err) = write_half.write_all(&bytes).await {
                    log::warn!("ax25-engine: write error: {err}");
                    return false;
                }
            }
            EngineAction::ScheduleTimer { .. } => {}
            EngineAction::Event(event) => {
                let _ = events.send(event);
            }
        }
    }
    true
}
