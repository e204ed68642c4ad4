use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use crate::action::{Action, ErrorKind};
use crate::config::SessionConfig;
use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

/// A single connected-mode LAPB session.
///
/// Pure sans-IO state machine: [`handle_event`](Self::handle_event) is the
/// only mutator, and every side effect it needs performed comes back as an
/// [`Action`] rather than being executed in place. The caller (the
/// coordinator, C9) owns the clock, the socket, and the timer heap.
pub struct Session {
    state: SessionState,
    vs: u8,
    vr: u8,
    va: u8,
    config: SessionConfig,
    reorder: BTreeMap<u8, Vec<u8>>,
    rej_flag: bool,
    peer_busy: bool,
    retry_count: u8,
    current_rto: Duration,
    unacked: VecDeque<(u8, Vec<u8>)>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let current_rto = config.initial_rto;
        Self {
            state: SessionState::Disconnected,
            vs: 0,
            vr: 0,
            va: 0,
            config,
            reorder: BTreeMap::new(),
            rej_flag: false,
            peer_busy: false,
            retry_count: 0,
            current_rto,
            unacked: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn vs(&self) -> u8 {
        self.vs
    }

    pub fn vr(&self) -> u8 {
        self.vr
    }

    pub fn va(&self) -> u8 {
        self.va
    }

    pub fn is_peer_busy(&self) -> bool {
        self.peer_busy
    }

    /// Outstanding (unacknowledged) I-frame count: `(V(S) - V(A)) mod M`.
    pub fn outstanding(&self) -> u8 {
        self.seq_distance(self.va, self.vs)
    }

    /// Whether the window allows handing the session one more I-frame.
    pub fn window_available(&self) -> bool {
        self.state == SessionState::Connected
            && !self.peer_busy
            && self.outstanding() < self.config.window
    }

    /// Hand a new outbound payload to the session, assigning it the next
    /// V(S). Returns `None` when the session isn't connected or the
    /// window is full — the caller (C9's pump) retries next cycle.
    pub fn poll_send(&mut self, payload: Vec<u8>) -> Option<Action> {
        if !self.window_available() {
            return None;
        }
        let ns = self.vs;
        self.unacked.push_back((ns, payload.clone()));
        self.vs = self.next_seq(self.vs);
        Some(Action::SendIFrame { ns, payload })
    }

    fn modulo(&self) -> u16 {
        self.config.modulo.value() as u16
    }

    fn next_seq(&self, v: u8) -> u8 {
        self.seq_add(v, 1)
    }

    fn seq_add(&self, base: u8, delta: u8) -> u8 {
        (((base as u16) + delta as u16) % self.modulo()) as u8
    }

    fn seq_distance(&self, from: u8, to: u8) -> u8 {
        let m = self.modulo();
        (((to as u16) + m - (from as u16)) % m) as u8
    }

    fn in_reorder_window(&self, ns: u8) -> bool {
        let k = self.config.window;
        (1..=k).any(|i| ns == self.seq_add(self.vr, i))
    }

    fn reset_sequence_state(&mut self) {
        self.vs = 0;
        self.vr = 0;
        self.va = 0;
        self.reorder.clear();
        self.unacked.clear();
        self.rej_flag = false;
        self.peer_busy = false;
        self.retry_count = 0;
        self.current_rto = self.config.initial_rto;
    }

    fn backoff(&mut self) -> Duration {
        let doubled = self.current_rto.saturating_mul(2);
        self.current_rto = doubled.min(Duration::from_secs(30));
        self.current_rto
    }

    /// Apply a received N(R): advance V(A), drop acknowledged unacked
    /// frames, stop T1/start T3 once nothing is outstanding.
    fn apply_nr(&mut self, nr: u8, actions: &mut Vec<Action>) {
        let acked = self.seq_distance(self.va, nr).min(self.unacked.len() as u8);
        for _ in 0..acked {
            self.unacked.pop_front();
        }
        self.va = nr;
        if self.va == self.vs {
            actions.push(Action::StopT1);
            actions.push(Action::StartT3(self.config.t3));
        }
    }

    /// Advance the state machine by one event, returning the actions the
    /// coordinator must execute.
    pub fn handle_event(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::ConnectRequest => self.on_connect_request(),
            Event::DisconnectRequest => self.on_disconnect_request(),
            Event::ReceivedSabm => self.on_received_sabm(),
            Event::ReceivedDisc => self.on_received_disc(),
            Event::ReceivedUa => self.on_received_ua(),
            Event::ReceivedDm => self.on_received_dm(),
            Event::ReceivedFrmr => self.on_received_frmr(),
            Event::ReceivedRr { nr } => self.on_received_rr(nr),
            Event::ReceivedRnr { nr } => self.on_received_rnr(nr),
            Event::ReceivedRej { nr } => self.on_received_rej(nr),
            Event::ReceivedIFrame { ns, nr, pf, payload } => {
                self.on_received_i_frame(ns, nr, pf, payload)
            }
            Event::T1Timeout => self.on_t1_timeout(),
            Event::T3Timeout => self.on_t3_timeout(),
        }
    }

    fn on_connect_request(&mut self) -> Vec<Action> {
        if self.state != SessionState::Disconnected {
            return vec![];
        }
        self.reset_sequence_state();
        self.state = SessionState::Connecting;
        vec![Action::SendSabm, Action::StartT1(self.current_rto)]
    }

    fn on_disconnect_request(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Connecting => {
                self.state = SessionState::Disconnecting;
                vec![Action::StopT1, Action::SendDisc, Action::StartT1(self.current_rto)]
            }
            SessionState::Connected => {
                self.state = SessionState::Disconnecting;
                vec![Action::StopT3, Action::SendDisc, Action::StartT1(self.current_rto)]
            }
            _ => vec![],
        }
    }

    fn on_received_sabm(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Connected => {
                self.reset_sequence_state();
                self.state = SessionState::Connected;
                vec![Action::SendUa, Action::StartT3(self.config.t3), Action::NotifyConnected]
            }
            SessionState::Disconnected | SessionState::Connecting => {
                self.reset_sequence_state();
                self.state = SessionState::Connected;
                vec![Action::SendUa, Action::StartT3(self.config.t3), Action::NotifyConnected]
            }
            _ => vec![Action::SendDm],
        }
    }

    fn on_received_disc(&mut self) -> Vec<Action> {
        if self.state == SessionState::Disconnected {
            return vec![Action::SendDm];
        }
        let was_connected = self.state == SessionState::Connected;
        let was_connecting = self.state == SessionState::Connecting;
        self.state = SessionState::Disconnected;
        self.reset_sequence_state();
        let mut actions = vec![Action::SendUa];
        if was_connected {
            actions.push(Action::StopT3);
        }
        if was_connecting {
            actions.push(Action::StopT1);
        }
        actions.push(Action::NotifyDisconnected);
        actions
    }

    fn on_received_ua(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Connecting => {
                self.state = SessionState::Connected;
                self.retry_count = 0;
                vec![Action::StopT1, Action::StartT3(self.config.t3), Action::NotifyConnected]
            }
            SessionState::Disconnecting => {
                self.state = SessionState::Disconnected;
                self.reset_sequence_state();
                vec![Action::StopT1, Action::NotifyDisconnected]
            }
            _ => vec![],
        }
    }

    fn on_received_dm(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Connecting => {
                self.state = SessionState::Disconnected;
                vec![Action::StopT1, Action::NotifyError(ErrorKind::Refused)]
            }
            SessionState::Disconnecting => {
                self.state = SessionState::Disconnected;
                self.reset_sequence_state();
                vec![Action::StopT1, Action::NotifyDisconnected]
            }
            _ => vec![],
        }
    }

    fn on_received_frmr(&mut self) -> Vec<Action> {
        log::warn!("session: peer sent FRMR, moving to error state");
        self.state = SessionState::Error;
        vec![Action::StopT3, Action::NotifyError(ErrorKind::Protocol)]
    }

    fn on_received_rr(&mut self, nr: u8) -> Vec<Action> {
        if self.state != SessionState::Connected {
            return vec![];
        }
        self.peer_busy = false;
        let mut actions = Vec::new();
        self.apply_nr(nr, &mut actions);
        actions
    }

    fn on_received_rnr(&mut self, nr: u8) -> Vec<Action> {
        if self.state != SessionState::Connected {
            return vec![];
        }
        self.peer_busy = true;
        let mut actions = Vec::new();
        self.apply_nr(nr, &mut actions);
        actions
    }

    fn on_received_rej(&mut self, nr: u8) -> Vec<Action> {
        if self.state != SessionState::Connected {
            return vec![];
        }
        let acked = self.seq_distance(self.va, nr).min(self.unacked.len() as u8);
        for _ in 0..acked {
            self.unacked.pop_front();
        }
        self.va = nr;
        let mut actions: Vec<Action> = self
            .unacked
            .iter()
            .map(|(ns, payload)| Action::SendIFrame { ns: *ns, payload: payload.clone() })
            .collect();
        let rto = self.backoff();
        actions.push(Action::StopT1);
        actions.push(Action::StartT1(rto));
        actions
    }

    fn on_received_i_frame(&mut self, ns: u8, nr: u8, _pf: bool, payload: Vec<u8>) -> Vec<Action> {
        if self.state != SessionState::Connected {
            return vec![];
        }
        let mut actions = Vec::new();
        if ns == self.vr {
            actions.push(Action::DeliverData(payload));
            self.vr = self.next_seq(self.vr);
            while let Some(buffered) = self.reorder.remove(&self.vr) {
                actions.push(Action::DeliverData(buffered));
                self.vr = self.next_seq(self.vr);
            }
            self.rej_flag = false;
            actions.push(Action::SendRr { nr: self.vr, pf: false });
        } else if self.in_reorder_window(ns) && !self.reorder.contains_key(&ns) {
            self.reorder.insert(ns, payload);
            if !self.rej_flag {
                actions.push(Action::SendRej { nr: self.vr, pf: false });
                self.rej_flag = true;
            }
        }
        // else: already delivered or outside window — drop silently, no ack.
        self.apply_nr(nr, &mut actions);
        actions
    }

    fn on_t1_timeout(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Connecting => {
                self.retry_count += 1;
                if self.retry_count <= self.config.n2 {
                    let rto = self.backoff();
                    vec![Action::SendSabm, Action::StartT1(rto)]
                } else {
                    log::warn!("session: N2 ({}) exceeded awaiting UA, giving up", self.config.n2);
                    self.state = SessionState::Error;
                    vec![Action::StopT1, Action::NotifyError(ErrorKind::Timeout)]
                }
            }
            SessionState::Connected => {
                self.retry_count += 1;
                if self.retry_count <= self.config.n2 {
                    let rto = self.backoff();
                    let mut actions: Vec<Action> = self
                        .unacked
                        .iter()
                        .map(|(ns, payload)| Action::SendIFrame { ns: *ns, payload: payload.clone() })
                        .collect();
                    actions.push(Action::StartT1(rto));
                    actions
                } else {
                    log::warn!("session: N2 ({}) exceeded retransmitting {} unacked i-frame(s), giving up", self.config.n2, self.unacked.len());
                    self.state = SessionState::Error;
                    vec![Action::StopT3, Action::NotifyError(ErrorKind::Timeout)]
                }
            }
            SessionState::Disconnecting => {
                self.retry_count += 1;
                if self.retry_count <= self.config.n2 {
                    let rto = self.backoff();
                    vec![Action::SendDisc, Action::StartT1(rto)]
                } else {
                    self.state = SessionState::Disconnected;
                    self.reset_sequence_state();
                    vec![Action::NotifyDisconnected]
                }
            }
            _ => vec![],
        }
    }

    fn on_t3_timeout(&mut self) -> Vec<Action> {
        if self.state != SessionState::Connected {
            return vec![];
        }
        vec![Action::SendRr { nr: self.vr, pf: true }, Action::StartT1(self.current_rto)]
    }
}
