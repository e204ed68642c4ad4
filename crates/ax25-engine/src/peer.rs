use ax25_control::{AimdWindow, LinkRttTracker, PaclenAdapter, RttEstimator};
use axdp::Capabilities;

use crate::config::EngineConfig;

/// Everything C6 tracks per peer (spec §4.6), bundled behind one
/// process-lifetime, LRU-bounded entry per callsign (spec §3: "Link
/// trackers are process-lifetime with LRU pressure").
pub struct PeerControl {
    pub rtt: RttEstimator,
    pub window: AimdWindow,
    pub paclen: PaclenAdapter,
    pub health: LinkRttTracker,
    /// Set once a PING/PONG round trip with this peer has completed
    /// (spec §4.7 capability negotiation); `None` until then, at which
    /// point AXDP extensions default to plain connected-mode behaviour.
    pub capabilities: Option<Capabilities>,
    /// `Instant` an I-frame was last handed to the session, for RTT
    /// sampling when V(A) subsequently advances past it.
    pub last_send_at: Option<std::time::Instant>,
}

impl PeerControl {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            rtt: RttEstimator::new(),
            window: AimdWindow::new(config.max_window() as u32),
            paclen: PaclenAdapter::new(config.paclen_min, config.paclen_max, config.paclen_default),
            health: LinkRttTracker::new(),
            capabilities: None,
            last_send_at: None,
        }
    }

    /// Current effective paclen/window, taking the coarser
    /// `LinkRttTracker` classification as a ceiling hint on top of the
    /// continuous AIMD/paclen adapters (spec §4.6's `adaptiveParameters`
    /// feeding "into C5").
    pub fn effective_parameters(&self, base_window: u32) -> (u32, u32) {
        let (health_paclen, health_window, _) =
            self.health.adaptive_parameters(self.paclen.current(), base_window);
        let paclen = self.paclen.current().min(health_paclen);
        let window = self.window.effective_window().min(health_window);
        (paclen, window.max(1))
    }

    pub fn on_delivery_success(&mut self) {
        self.window.on_ack();
        self.paclen.on_success();
        self.health.on_success();
    }

    pub fn on_delivery_loss(&mut self) {
        self.window.on_loss();
        self.paclen.on_failure();
        self.health.on_failure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_peer_control_starts_at_configured_defaults() {
        let config = EngineConfig::new("N0CALL", 0);
        let peer = PeerControl::new(&config);
        assert_eq!(peer.paclen.current(), config.paclen_default);
        assert!(peer.capabilities.is_none());
    }

    #[test]
    fn loss_then_success_moves_effective_parameters() {
        let config = EngineConfig::new("N0CALL", 0);
        let mut peer = PeerControl::new(&config);
        peer.on_delivery_loss();
        let (paclen, _window) = peer.effective_parameters(config.window as u32);
        assert!(paclen <= config.paclen_default);
    }
}
