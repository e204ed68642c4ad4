/// Inputs to the session state machine (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ConnectRequest,
    DisconnectRequest,
    ReceivedSabm,
    ReceivedDisc,
    ReceivedUa,
    ReceivedDm,
    ReceivedFrmr,
    ReceivedRr { nr: u8 },
    ReceivedRnr { nr: u8 },
    ReceivedRej { nr: u8 },
    ReceivedIFrame { ns: u8, nr: u8, pf: bool, payload: Vec<u8> },
    T1Timeout,
    T3Timeout,
}
