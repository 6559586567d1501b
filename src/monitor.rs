//! Pack presence tracking and the clear-then-verify unlock sequence.
//!
//! [`PresenceMonitor`] is driven by the caller's clock: hand it the current
//! [`Instant`] as often as convenient and it polls the pack once per
//! interval. Connect and disconnect edges come back as [`PresenceEvent`]s,
//! each reported once.

use crate::constants::{CLEAR_SETTLE_MS, POLL_INTERVAL_MS};
use crate::error::Result;
use crate::protocol::Obi;
use crate::transport::Link;
use crate::types::BatterySnapshot;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceState {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    /// A pack appeared and was read in full
    Connected(Box<BatterySnapshot>),
    /// A pack appeared but the full read failed; it still counts as connected
    ReadFailed { model: String, reason: String },
    Disconnected,
}

/// Result of a confirmed or declined fault clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockOutcome {
    Unlocked,
    /// The latch survived the reset; the fault may be physical
    StillLocked { status_code: u8 },
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}

impl MonitorConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Default)]
pub struct PresenceMonitor {
    config: MonitorConfig,
    state: PresenceState,
    last_poll: Option<Instant>,
    clear_offer: bool,
}

impl PresenceMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// A locked pack was read and the caller has not yet decided whether to clear it
    pub fn clear_offer_pending(&self) -> bool {
        self.clear_offer
    }

    /// Poll if at least one interval has passed since the last poll.
    pub fn tick<L: Link>(&mut self, obi: &mut Obi<L>, now: Instant) -> Option<PresenceEvent> {
        if let Some(last) = self.last_poll {
            if now.saturating_duration_since(last) < self.config.poll_interval() {
                return None;
            }
        }
        self.last_poll = Some(now);
        self.poll(obi)
    }

    /// Probe the pack once and report an edge, if any.
    pub fn poll<L: Link>(&mut self, obi: &mut Obi<L>) -> Option<PresenceEvent> {
        match (self.state, obi.read_model()) {
            (PresenceState::Disconnected, Ok(model)) => {
                log::info!("Battery connected: {}", model);
                self.state = PresenceState::Connected;
                Some(self.full_read(obi, model))
            }
            (PresenceState::Connected, Err(e)) => {
                log::info!("Battery disconnected ({})", e);
                self.state = PresenceState::Disconnected;
                self.clear_offer = false;
                Some(PresenceEvent::Disconnected)
            }
            _ => None,
        }
    }

    fn full_read<L: Link>(&mut self, obi: &mut Obi<L>, model: String) -> PresenceEvent {
        let mut snapshot = BatterySnapshot {
            model: Some(model.clone()),
            ..Default::default()
        };

        let read = obi
            .read_identity(&mut snapshot)
            .and_then(|()| obi.read_telemetry(&mut snapshot));

        match read {
            Ok(()) => {
                if snapshot.is_locked() {
                    log::warn!("Battery {} is locked", model);
                    self.clear_offer = true;
                }
                PresenceEvent::Connected(Box::new(snapshot))
            }
            Err(e) => PresenceEvent::ReadFailed {
                model,
                reason: e.to_string(),
            },
        }
    }

    /// Act on the caller's answer to a pending clear offer.
    ///
    /// `Ok(None)` if nothing was pending. An exchange failure keeps the
    /// offer open so the caller can try again.
    pub fn resolve_clear_offer<L: Link>(
        &mut self,
        obi: &mut Obi<L>,
        confirm: bool,
    ) -> Result<Option<UnlockOutcome>> {
        if !self.clear_offer {
            return Ok(None);
        }
        if !confirm {
            self.clear_offer = false;
            return Ok(Some(UnlockOutcome::Declined));
        }
        let outcome = unlock(obi)?;
        self.clear_offer = false;
        Ok(Some(outcome))
    }
}

/// Clear the fault latch, let the pack settle, and check whether it stayed clear.
///
/// Never retries: a latch that survives is reported as [`UnlockOutcome::StillLocked`].
pub fn unlock<L: Link>(obi: &mut Obi<L>) -> Result<UnlockOutcome> {
    obi.clear_faults()?;
    obi.pause_ms(CLEAR_SETTLE_MS);

    let mut snapshot = BatterySnapshot::default();
    obi.read_identity(&mut snapshot)?;

    match snapshot.identity {
        Some(id) if id.is_locked => {
            log::warn!("Still locked after clear, status 0x{:02X}", id.status_code);
            Ok(UnlockOutcome::StillLocked {
                status_code: id.status_code,
            })
        }
        _ => {
            log::info!("Fault latch cleared");
            Ok(UnlockOutcome::Unlocked)
        }
    }
}
