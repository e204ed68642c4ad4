//! The per-link connected-mode LAPB session state machine (spec §4.5).
//!
//! Sans-IO, mirroring `styrene_rns_transport::resource::{manager,sender,
//! receiver}`: [`Session::handle_event`] is a pure `(state, event) ->
//! (state', Vec<Action>)` transform. The coordinator (`ax25-engine`) is
//! the only thing that turns an [`Action`] into a socket write, a timer
//! registration, or an upward callback.

#![warn(rust_2018_idioms)]

mod action;
mod config;
mod event;
mod session;

pub use action::{Action, ErrorKind};
pub use config::{Modulo, SessionConfig};
pub use event::Event;
pub use session::{Session, SessionState};
