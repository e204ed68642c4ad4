use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use ax25_control::{LinkQualityEstimator, LruLinkTable, DEFAULT_LINK_TABLE_CAPACITY};
use ax25_kiss::{encode_frame, KissParser};
use ax25_netrom::NetRomTables;
use ax25_proto::{
    classify, encode_i, Address, Control, DedupConfig, DedupStatus, DedupTracker, Frame, SSubtype,
    Signature, USubtype,
};
use ax25_session::{Action, ErrorKind, Event, Session, SessionConfig, SessionState};
use ax25_transfer::{TransferEngine, TransferEvent};
use axdp::{Capabilities, Message, MessageType};

use crate::action::{Capability, EngineAction, EngineEvent, IncomingTransferRequest, PacketInfo};
use crate::config::EngineConfig;
use crate::link::LinkKey;
use crate::peer::PeerControl;
use crate::timer::{TimerHeap, TimerKind};

/// PID for "no layer 3 protocol" — the value AXDP and plain chat traffic
/// travel under (spec §4.2 is silent on a reserved PID for AXDP, so this
/// mirrors the conventional AX.25 PID used for user-level I-frame data;
/// `ax25_proto::NETROM_PID` remains reserved for NET/ROM routing UI
/// frames, which this engine only observes, never originates).
const AXDP_PID: u8 = 0xF0;

/// Drives every AX.25 session, the AXDP application layer, the bulk
/// transfer engine and NET/ROM inference from a single KISS byte stream
/// (spec §4.9, C9).
///
/// Sans-IO by construction, like every other crate in this workspace:
/// [`Coordinator::on_bytes`]/[`pump`](Self::pump)/[`fire_timer`] take the
/// caller's bytes/clock and return a flat list of [`EngineAction`]s —
/// socket writes, timer registrations, upward events — for the caller to
/// execute. [`crate::runtime`] is the thin async shell that actually
/// owns a `tokio::net::TcpStream` and drives this struct from it.
pub struct Coordinator {
    config: EngineConfig,
    local: Address,
    kiss: KissParser,
    dedup: DedupTracker,
    sessions: HashMap<LinkKey, Session>,
    timers: TimerHeap,
    netrom: NetRomTables,
    transfers: TransferEngine,
    transfer_owner: HashMap<u32, LinkKey>,
    quality: LinkQualityEstimator,
    peers: LruLinkTable<String, PeerControl>,
    outbound_chat: HashMap<LinkKey, VecDeque<Vec<u8>>>,
}

impl Coordinator {
    pub fn new(config: EngineConfig) -> Self {
        let local = Address::new(config.own_callsign.clone(), config.own_ssid);
        Self {
            kiss: KissParser::new(),
            dedup: DedupTracker::new(DedupConfig::kiss()),
            sessions: HashMap::new(),
            timers: TimerHeap::new(),
            netrom: NetRomTables::new(),
            transfers: TransferEngine::new(),
            transfer_owner: HashMap::new(),
            quality: LinkQualityEstimator::new(),
            peers: LruLinkTable::new(DEFAULT_LINK_TABLE_CAPACITY),
            outbound_chat: HashMap::new(),
            local,
            config,
        }
    }

    fn session_config(&self) -> SessionConfig {
        let mut cfg = SessionConfig::new(self.config.session_modulo());
        cfg.window = self.config.window.clamp(1, self.config.max_window());
        cfg.n2 = self.config.n2;
        cfg.t3 = self.config.t3;
        cfg
    }

    fn our_capabilities(&self) -> Capabilities {
        let algorithms = if self.config.compression_enabled { vec![1] } else { vec![0] };
        Capabilities { proto_max: 1, algorithms, max_decompressed_len: self.config.clamped_max_decompressed_payload() }
    }

    /// Begin a connected-mode session to `remote` (spec §4.5
    /// `connectRequest`). `path` is the digipeater list to route via.
    pub fn connect(&mut self, remote: Address, path: Vec<Address>, now: Instant) -> Vec<EngineAction> {
        let link = LinkKey::new(self.local.clone(), remote, path, 0);
        self.dispatch(&link, Event::ConnectRequest, now)
    }

    pub fn disconnect(&mut self, link: &LinkKey, now: Instant) -> Vec<EngineAction> {
        self.dispatch(link, Event::DisconnectRequest, now)
    }

    /// Queue a chat message for `link`; actual transmission happens on
    /// the next [`pump`](Self::pump) once the session's window allows it.
    pub fn send_chat(&mut self, link: &LinkKey, text: &str) -> Vec<EngineAction> {
        let msg = Message::new(MessageType::Chat, 0, 0).with_payload(text.as_bytes().to_vec());
        self.outbound_chat.entry(link.clone()).or_default().push_back(msg.encode());
        Vec::new()
    }

    /// Begin an outbound bulk transfer to `link` (spec §4.7 steps 1-2).
    pub fn send_file(&mut self, link: &LinkKey, data: Vec<u8>, filename: String) -> (u32, Vec<EngineAction>) {
        let peer_label = link.remote_label();
        let paclen = self.peers.get(&peer_label).map(|p| p.paclen.current()).unwrap_or(self.config.paclen_default);
        let override_algorithm = self.config.resolve_compression_algorithm();
        let (session_id, events) = self.transfers.start_outbound(data, filename, peer_label, paclen, override_algorithm);
        self.transfer_owner.insert(session_id, link.clone());
        let actions = self.queue_transfer_events(link, events);
        (session_id, actions)
    }

    pub fn accept_transfer(&mut self, session_id: u32) -> Vec<EngineAction> {
        let Some(link) = self.transfer_owner.get(&session_id).cloned() else { return Vec::new() };
        match self.transfers.accept_incoming(session_id) {
            Ok(events) => self.queue_transfer_events(&link, events),
            Err(err) => {
                log::warn!("accept_transfer {session_id}: {err}");
                Vec::new()
            }
        }
    }

    pub fn reject_transfer(&mut self, session_id: u32) -> Vec<EngineAction> {
        let Some(link) = self.transfer_owner.get(&session_id).cloned() else { return Vec::new() };
        match self.transfers.reject_incoming(session_id) {
            Ok(events) => self.queue_transfer_events(&link, events),
            Err(err) => {
                log::warn!("reject_transfer {session_id}: {err}");
                Vec::new()
            }
        }
    }

    pub fn pause_transfer(&mut self, session_id: u32) {
        if let Err(err) = self.transfers.pause(session_id) {
            log::warn!("pause_transfer {session_id}: {err}");
        }
    }

    pub fn resume_transfer(&mut self, session_id: u32) {
        if let Err(err) = self.transfers.resume(session_id) {
            log::warn!("resume_transfer {session_id}: {err}");
        }
    }

    pub fn cancel_transfer(&mut self, session_id: u32) -> Vec<EngineAction> {
        let Some(link) = self.transfer_owner.get(&session_id).cloned() else { return Vec::new() };
        let events = self.transfers.cancel(session_id);
        self.queue_transfer_events(&link, events)
    }

    /// Feed a chunk of bytes straight off the TCP socket (spec §4.1, §4.9).
    pub fn on_bytes(&mut self, bytes: &[u8], now: Instant) -> Vec<EngineAction> {
        let frames = self.kiss.feed(bytes);
        let mut actions = Vec::new();
        for payload in frames {
            actions.extend(self.on_kiss_payload(&payload, now));
        }
        actions
    }

    fn on_kiss_payload(&mut self, payload: &[u8], now: Instant) -> Vec<EngineAction> {
        let frame = match Frame::decode(payload, self.config.modulo) {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("dropping malformed AX.25 frame: {err}");
                return Vec::new();
            }
        };

        let class = classify(&frame);
        let signature = Signature::of(&frame);
        let status = self.dedup.observe(signature, now);

        self.netrom.observe(&frame, class, now);
        self.update_quality(&frame, class, now);

        let mut actions = vec![EngineAction::Event(EngineEvent::Packet(PacketInfo {
            source: frame.source.clone(),
            destination: frame.destination.clone(),
            digis: frame.digis.clone(),
            class: class.into(),
            dedup: status.into(),
        }))];

        if status == DedupStatus::IngestionDedup {
            return actions;
        }

        let link = LinkKey::new(frame.destination.clone(), frame.source.clone(), frame.digis.clone(), 0);
        if let Some(event) = frame_to_event(&frame) {
            actions.extend(self.dispatch(&link, event, now));
        }
        actions
    }

    fn update_quality(&mut self, frame: &Frame, class: ax25_proto::FrameClass, now: Instant) {
        let weight = class.quality_weight();
        let from = frame.source.to_string();
        let to = frame.destination.to_string();
        if weight > 0.0 {
            self.quality.observe_forward(&from, &to, weight, now);
        } else if class == ax25_proto::FrameClass::RetryOrDuplicate {
            self.quality.observe_negative(&from, &to, 1.0, now);
        }
        // "Peer ack-reverse" (spec §4.6) fires on any frame carrying an
        // N(R) that acknowledges frames we sent — I-frames piggyback
        // N(R) just as much as a bare RR does, and real bidirectional
        // chat/file traffic acks predominantly that way.
        if control_nr(&frame.control).is_some() {
            self.quality.observe_reverse(&from, &to, 1.0, now);
        }
    }

    /// Drive a session event through to completion and execute every
    /// resulting [`Action`], mirroring spec §4.9: "deliver the event to
    /// C5, execute the returned actions".
    fn dispatch(&mut self, link: &LinkKey, event: Event, now: Instant) -> Vec<EngineAction> {
        let previous = self
            .sessions
            .get(link)
            .map(session_state_label)
            .unwrap_or_else(|| session_state_label_default());
        let session = self.sessions.entry(link.clone()).or_insert_with(|| Session::new(self.session_config()));
        let session_actions = session.handle_event(event);
        let next = session_state_label(session);

        let mut actions = Vec::new();
        for action in session_actions {
            actions.extend(self.execute_session_action(link, action, now));
        }

        if previous != next {
            actions.push(EngineAction::Event(EngineEvent::SessionState {
                peer: link.remote_label(),
                previous,
                next: next.clone(),
            }));
            if next == "connected" {
                actions.extend(self.on_session_connected(link));
            }
            if next == "disconnected" || next == "error" {
                let events = self.transfers.fail_all_for_peer(&link.remote_label());
                actions.extend(self.queue_transfer_events(link, events));
                self.timers.clear_link(link);
            }
        }
        actions
    }

    fn on_session_connected(&mut self, link: &LinkKey) -> Vec<EngineAction> {
        self.peers.get_or_insert_with(link.remote_label(), || PeerControl::new(&self.config));
        if !self.config.auto_negotiate_capabilities {
            return Vec::new();
        }
        let mut msg = Message::new(MessageType::Ping, 0, 0);
        msg.capabilities = Some(self.our_capabilities());
        self.outbound_chat.entry(link.clone()).or_default().push_back(msg.encode());
        Vec::new()
    }

    fn execute_session_action(&mut self, link: &LinkKey, action: Action, now: Instant) -> Vec<EngineAction> {
        match action {
            Action::SendSabm => vec![self.write_control(link, Control::U { subtype: USubtype::Sabm, pf: true })],
            Action::SendDisc => vec![self.write_control(link, Control::U { subtype: USubtype::Disc, pf: true })],
            Action::SendUa => vec![self.write_control(link, Control::U { subtype: USubtype::Ua, pf: false })],
            Action::SendDm => vec![self.write_control(link, Control::U { subtype: USubtype::Dm, pf: false })],
            Action::SendRr { nr, pf } => {
                vec![self.write_control(link, Control::S { subtype: SSubtype::Rr, nr, pf })]
            }
            Action::SendRej { nr, pf } => {
                vec![self.write_control(link, Control::S { subtype: SSubtype::Rej, nr, pf })]
            }
            Action::SendIFrame { ns, payload } => {
                let vr = self.sessions.get(link).map(|s| s.vr()).unwrap_or(0);
                let frame = encode_i(
                    link.local.clone(),
                    link.remote.clone(),
                    link.path.clone(),
                    AXDP_PID,
                    payload,
                    ns,
                    vr,
                    false,
                    self.config.modulo,
                );
                vec![EngineAction::WriteBytes(encode_frame(&frame.encode(), self.config.kiss_port))]
            }
            Action::DeliverData(payload) => self.on_delivered_payload(link, payload),
            Action::StartT1(duration) => {
                let at = now + duration;
                self.timers.schedule(link.clone(), TimerKind::T1, at);
                vec![EngineAction::ScheduleTimer { at }]
            }
            Action::StopT1 => {
                self.timers.cancel(link, TimerKind::T1);
                Vec::new()
            }
            Action::StartT3(duration) => {
                let at = now + duration;
                self.timers.schedule(link.clone(), TimerKind::T3, at);
                vec![EngineAction::ScheduleTimer { at }]
            }
            Action::StopT3 => {
                self.timers.cancel(link, TimerKind::T3);
                Vec::new()
            }
            Action::NotifyConnected | Action::NotifyDisconnected => Vec::new(),
            Action::NotifyError(kind) => {
                log::warn!("session {} error: {}", link.remote_label(), kind.as_str());
                if kind == ErrorKind::Timeout || kind == ErrorKind::LinkDown {
                    if let Some(peer) = self.peers.get_mut(&link.remote_label()) {
                        peer.on_delivery_loss();
                    }
                }
                Vec::new()
            }
        }
    }

    fn write_control(&self, link: &LinkKey, control: Control) -> EngineAction {
        let frame = Frame {
            destination: link.remote.clone(),
            source: link.local.clone(),
            digis: link.path.clone(),
            control,
            modulo: self.config.modulo,
            pid: None,
            info: None,
        };
        EngineAction::WriteBytes(encode_frame(&frame.encode(), self.config.kiss_port))
    }

    /// Route a successfully delivered I-frame payload onward: AXDP
    /// decode, then chat/transfer/ping-pong dispatch, falling back to
    /// opaque text for anything that isn't valid AXDP (spec §6: "magic
    /// match is necessary; payloads not matching are surfaced as opaque
    /// info text").
    fn on_delivered_payload(&mut self, link: &LinkKey, payload: Vec<u8>) -> Vec<EngineAction> {
        self.peers.get_or_insert_with(link.remote_label(), || PeerControl::new(&self.config));
        if let Some(peer) = self.peers.get_mut(&link.remote_label()) {
            peer.on_delivery_success();
        }
        match Message::decode(&payload) {
            Some(msg) => self.handle_axdp_message(link, msg),
            None => vec![EngineAction::Event(EngineEvent::Chat {
                from: link.remote_label(),
                text: String::from_utf8_lossy(&payload).into_owned(),
            })],
        }
    }

    fn handle_axdp_message(&mut self, link: &LinkKey, msg: Message) -> Vec<EngineAction> {
        match msg.msg_type {
            Some(MessageType::Chat) => {
                let text = msg.payload.as_deref().map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default();
                vec![EngineAction::Event(EngineEvent::Chat { from: link.remote_label(), text })]
            }
            Some(MessageType::Ping) => {
                let mut pong = Message::new(MessageType::Pong, msg.session_id, msg.message_id);
                pong.capabilities = Some(self.our_capabilities());
                self.outbound_chat.entry(link.clone()).or_default().push_back(pong.encode());
                self.record_capability(link, msg.capabilities)
            }
            Some(MessageType::Pong) => self.record_capability(link, msg.capabilities),
            Some(MessageType::FileMeta)
            | Some(MessageType::FileChunk)
            | Some(MessageType::Ack)
            | Some(MessageType::Nack) => {
                let events = self.transfers.handle_message(&link.remote_label(), msg);
                for event in &events {
                    if let TransferEvent::IncomingRequest(id) = event {
                        self.transfer_owner.insert(*id, link.clone());
                    }
                }
                self.queue_transfer_events(link, events)
            }
            Some(MessageType::Close) => {
                let events = self.transfers.cancel(msg.session_id);
                events
                    .into_iter()
                    .filter(|e| matches!(e, TransferEvent::Updated(_)))
                    .flat_map(|e| self.transfer_event_to_actions(e))
                    .collect()
            }
            None => Vec::new(),
        }
    }

    fn record_capability(&mut self, link: &LinkKey, capabilities: Option<Capabilities>) -> Vec<EngineAction> {
        let Some(caps) = capabilities else { return Vec::new() };
        let ours = self.our_capabilities();
        let compatible = ours.compatible_with(&caps);
        let peer = self.peers.get_or_insert_with(link.remote_label(), || PeerControl::new(&self.config));
        let capability = if compatible {
            peer.capabilities = Some(caps.clone());
            Capability::Negotiated(caps)
        } else {
            peer.capabilities = None;
            Capability::Incompatible
        };
        vec![EngineAction::Event(EngineEvent::Capability { peer: link.remote_label(), capability })]
    }

    fn queue_transfer_events(&mut self, link: &LinkKey, events: Vec<TransferEvent>) -> Vec<EngineAction> {
        events.into_iter().flat_map(|event| self.transfer_event_to_actions_for(link, event)).collect()
    }

    fn transfer_event_to_actions_for(&mut self, link: &LinkKey, event: TransferEvent) -> Vec<EngineAction> {
        match event {
            TransferEvent::SendMessage(msg) => {
                self.outbound_chat.entry(link.clone()).or_default().push_back(msg.encode());
                Vec::new()
            }
            other => self.transfer_event_to_actions(other),
        }
    }

    fn transfer_event_to_actions(&mut self, event: TransferEvent) -> Vec<EngineAction> {
        match event {
            TransferEvent::SendMessage(_) => Vec::new(),
            TransferEvent::Updated(id) => match self.transfers.get(id) {
                Some(transfer) => vec![EngineAction::Event(EngineEvent::TransferUpdate(transfer.clone()))],
                None => Vec::new(),
            },
            TransferEvent::IncomingRequest(id) => match self.transfers.get(id) {
                Some(transfer) => vec![EngineAction::Event(EngineEvent::TransferRequest(IncomingTransferRequest {
                    session_id: id,
                    from: transfer.destination.clone(),
                    filename: transfer.filename.clone(),
                    size: transfer.file_size,
                }))],
                None => Vec::new(),
            },
        }
    }

    /// One outbound pump cycle (spec §4.9, §5): for every session whose
    /// window allows another I-frame, drain queued chat/AXDP bytes first
    /// and then the bulk transfer engine, in a fixed order across links
    /// so no session can starve another indefinitely.
    pub fn pump(&mut self, now: Instant) -> Vec<EngineAction> {
        let mut links: Vec<LinkKey> = self.sessions.keys().cloned().collect();
        links.sort_by(|a, b| a.remote_label().cmp(&b.remote_label()));

        let mut actions = Vec::new();
        for link in links {
            actions.extend(self.pump_link(&link, now));
        }
        actions
    }

    fn pump_link(&mut self, link: &LinkKey, now: Instant) -> Vec<EngineAction> {
        let mut actions = Vec::new();
        loop {
            let window_open = self.sessions.get(link).map(|s| s.window_available()).unwrap_or(false);
            if !window_open {
                break;
            }
            if let Some(bytes) = self.outbound_chat.get_mut(link).and_then(|q| q.pop_front()) {
                actions.extend(self.poll_send(link, bytes, now));
                continue;
            }
            if let Some(transfer_id) = self.next_pending_transfer(link) {
                let events = self.transfers.pump(transfer_id);
                let mut sent_payload = false;
                for event in events {
                    if let TransferEvent::SendMessage(msg) = event {
                        sent_payload = true;
                        actions.extend(self.poll_send(link, msg.encode(), now));
                    } else {
                        actions.extend(self.transfer_event_to_actions(event));
                    }
                }
                if sent_payload {
                    continue;
                }
            }
            break;
        }
        actions
    }

    fn next_pending_transfer(&self, link: &LinkKey) -> Option<u32> {
        let peer_label = link.remote_label();
        self.transfers
            .iter()
            .find(|t| t.destination == peer_label && matches!(t.status, ax25_transfer::TransferStatus::Sending | ax25_transfer::TransferStatus::AwaitingCompletion))
            .map(|t| t.session_id)
    }

    fn poll_send(&mut self, link: &LinkKey, payload: Vec<u8>, now: Instant) -> Vec<EngineAction> {
        let Some(session) = self.sessions.get_mut(link) else { return Vec::new() };
        match session.poll_send(payload) {
            Some(action) => self.execute_session_action(link, action, now),
            None => Vec::new(),
        }
    }

    /// Fire a previously scheduled timer (spec §4.9: "each firing
    /// enqueues the corresponding event for the owning session").
    pub fn fire_timer(&mut self, link: LinkKey, kind: TimerKind, now: Instant) -> Vec<EngineAction> {
        let event = match kind {
            TimerKind::T1 => Event::T1Timeout,
            TimerKind::T3 => Event::T3Timeout,
        };
        self.dispatch(&link, event, now)
    }

    /// Drain every timer due by `now`, firing each in turn. The caller
    /// (the async runtime shell) is responsible for sleeping until
    /// [`Coordinator::next_timer`] and calling this on wake.
    pub fn fire_due_timers(&mut self, now: Instant) -> Vec<EngineAction> {
        let due = self.timers.pop_ready(now);
        let mut actions = Vec::new();
        for (link, kind) in due {
            actions.extend(self.fire_timer(link, kind, now));
        }
        actions
    }

    pub fn next_timer(&self) -> Option<Instant> {
        self.timers.next_fire()
    }

    /// Tear down every session (spec §6: "the core treats a closed
    /// socket as teardown of every session").
    pub fn on_transport_closed(&mut self, now: Instant) -> Vec<EngineAction> {
        let links: Vec<LinkKey> = self.sessions.keys().cloned().collect();
        let mut actions = Vec::new();
        for link in links {
            actions.extend(self.dispatch(&link, Event::DisconnectRequest, now));
            let events = self.transfers.fail_all_for_peer(&link.remote_label());
            actions.extend(self.queue_transfer_events(&link, events));
        }
        actions
    }

    /// One broadcast interval elapsed for NET/ROM aging (spec §4.8).
    pub fn tick_netrom(&mut self) {
        self.netrom.tick();
    }

    pub fn netrom(&self) -> &NetRomTables {
        &self.netrom
    }

    pub fn session_state(&self, link: &LinkKey) -> Option<SessionState> {
        self.sessions.get(link).map(|s| s.state())
    }
}

/// N(R) carried by a control field, if any — I-frames and every S-frame
/// subtype (RR/RNR/REJ/SREJ) ack up through N(R); U-frames never do.
fn control_nr(control: &Control) -> Option<u8> {
    match control {
        Control::I { nr, .. } => Some(*nr),
        Control::S { nr, .. } => Some(*nr),
        Control::U { .. } => None,
    }
}

fn frame_to_event(frame: &Frame) -> Option<Event> {
    match &frame.control {
        Control::I { ns, nr, pf } => {
            Some(Event::ReceivedIFrame { ns: *ns, nr: *nr, pf: *pf, payload: frame.info.clone().unwrap_or_default() })
        }
        Control::S { subtype, nr, .. } => match subtype {
            SSubtype::Rr => Some(Event::ReceivedRr { nr: *nr }),
            SSubtype::Rnr => Some(Event::ReceivedRnr { nr: *nr }),
            SSubtype::Rej | SSubtype::Srej => Some(Event::ReceivedRej { nr: *nr }),
        },
        Control::U { subtype, .. } => match subtype {
            USubtype::Sabm | USubtype::Sabme => Some(Event::ReceivedSabm),
            USubtype::Disc => Some(Event::ReceivedDisc),
            USubtype::Ua => Some(Event::ReceivedUa),
            USubtype::Dm => Some(Event::ReceivedDm),
            USubtype::Frmr => Some(Event::ReceivedFrmr),
            USubtype::Ui | USubtype::Xid | USubtype::Test | USubtype::Unknown(_) => None,
        },
    }
}

fn session_state_label(session: &Session) -> String {
    match session.state() {
        SessionState::Disconnected => "disconnected",
        SessionState::Connecting => "connecting",
        SessionState::Connected => "connected",
        SessionState::Disconnecting => "disconnecting",
        SessionState::Error => "error",
    }
    .to_string()
}

fn session_state_label_default() -> String {
    "disconnected".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ax25_kiss::encode_frame as kiss_encode;

    fn config() -> EngineConfig {
        let mut cfg = EngineConfig::new("N0CALL", 0);
        cfg.t3 = std::time::Duration::from_secs(60);
        cfg
    }

    fn remote_sabm_bytes(local: &Address, remote: &Address) -> Vec<u8> {
        let frame = Frame {
            destination: local.clone(),
            source: remote.clone(),
            digis: vec![],
            control: Control::U { subtype: USubtype::Sabm, pf: true },
            modulo: ax25_proto::Modulo::Eight,
            pid: None,
            info: None,
        };
        kiss_encode(&frame.encode(), 0)
    }

    #[test]
    fn connect_request_emits_a_kiss_framed_sabm() {
        let mut engine = Coordinator::new(config());
        let remote = Address::new("N1CALL", 0);
        let actions = engine.connect(remote, vec![], Instant::now());
        assert!(actions.iter().any(|a| matches!(a, EngineAction::WriteBytes(bytes) if bytes.first() == Some(&ax25_kiss::FEND))));
        assert!(actions.iter().any(|a| matches!(a, EngineAction::ScheduleTimer { .. })));
    }

    #[test]
    fn inbound_sabm_completes_a_handshake_and_emits_session_state() {
        let mut engine = Coordinator::new(config());
        let local = Address::new("N0CALL", 0);
        let remote = Address::new("N1CALL", 0);
        let bytes = remote_sabm_bytes(&local, &remote);
        let actions = engine.on_bytes(&bytes, Instant::now());
        assert!(actions.iter().any(|a| matches!(
            a,
            EngineAction::Event(EngineEvent::SessionState { next, .. }) if next == "connected"
        )));
    }

    #[test]
    fn chat_is_queued_and_drained_on_pump_once_connected() {
        let mut engine = Coordinator::new(config());
        let local = Address::new("N0CALL", 0);
        let remote = Address::new("N1CALL", 0);
        let now = Instant::now();
        engine.on_bytes(&remote_sabm_bytes(&local, &remote), now);
        let link = LinkKey::direct(local, remote);
        engine.send_chat(&link, "hello");
        let actions = engine.pump(now);
        assert!(actions.iter().any(|a| matches!(a, EngineAction::WriteBytes(_))));
    }

    #[test]
    fn unrecognised_payload_surfaces_as_opaque_chat_text() {
        let mut engine = Coordinator::new(config());
        let local = Address::new("N0CALL", 0);
        let remote = Address::new("N1CALL", 0);
        let now = Instant::now();
        engine.on_bytes(&remote_sabm_bytes(&local, &remote), now);

        let frame = encode_i(remote.clone(), local.clone(), vec![], AXDP_PID, b"plain text".to_vec(), 0, 0, false, ax25_proto::Modulo::Eight);
        let bytes = kiss_encode(&frame.encode(), 0);
        let actions = engine.on_bytes(&bytes, now);
        assert!(actions.iter().any(|a| matches!(
            a,
            EngineAction::Event(EngineEvent::Chat { text, .. }) if text == "plain text"
        )));
    }

    #[test]
    fn transport_closed_disconnects_every_session() {
        let mut engine = Coordinator::new(config());
        let local = Address::new("N0CALL", 0);
        let remote = Address::new("N1CALL", 0);
        let now = Instant::now();
        engine.on_bytes(&remote_sabm_bytes(&local, &remote), now);
        let link = LinkKey::direct(local, remote);
        assert_eq!(engine.session_state(&link), Some(SessionState::Connected));
        engine.on_transport_closed(now);
        assert_eq!(engine.session_state(&link), Some(SessionState::Disconnected));
    }
}
