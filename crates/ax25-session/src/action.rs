use std::time::Duration;

/// Reasons surfaced to the collaborator via `notifyError` (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Refused,
    Timeout,
    Protocol,
    LinkDown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Refused => "refused",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Protocol => "protocol",
            ErrorKind::LinkDown => "linkDown",
        }
    }
}

/// Side effects returned by [`crate::Session::handle_event`] for the
/// coordinator to execute. The session never performs I/O itself.
///
/// `SendIFrame` carries `ns` explicitly (unlike the bare `sendIFrame(payload)`
/// spec.md names) so a retransmission can resend a frame at its original
/// sequence number rather than the session's current V(S) — needed for the
/// REJ and T1-retry retransmit paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendSabm,
    SendDisc,
    SendUa,
    SendDm,
    SendRr { nr: u8, pf: bool },
    SendRej { nr: u8, pf: bool },
    SendIFrame { ns: u8, payload: Vec<u8> },
    DeliverData(Vec<u8>),
    StartT1(Duration),
    StopT1,
    StartT3(Duration),
    StopT3,
    NotifyConnected,
    NotifyDisconnected,
    NotifyError(ErrorKind),
}
