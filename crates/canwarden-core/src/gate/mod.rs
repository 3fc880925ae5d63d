//! The controls-allowed state machine and its two decision surfaces.
//!
//! A [`SafetyGate`] owns the complete gating state for one vehicle:
//! the controls-allowed bit, the last reported cruise engagement, the
//! button-press window, and the relay-malfunction latch. Hosts feed every
//! received frame through [`SafetyGate::ingest`] in arrival order and ask
//! [`SafetyGate::authorize_tx`] before placing any frame on the bus; the
//! gate itself never transmits.
//!
//! ```text
//!                 cruise_status: engagement rising edge backed by a
//!                                recent button interaction
//!                 button_edge:   resume/set press released
//!   DISALLOWED ----------------------------------------------> ALLOWED
//!       ^                                                         |
//!       |      cancel press / cruise reported disengaged          |
//!       +---------------------------------------------------------+
//! ```
//!
//! # Invariants
//!
//! - **Fail-closed transmit**: a frame matching no configured transmit
//!   stream is denied, and a tripped relay latch denies every transmit
//!   until reinitialization.
//! - **Single authority**: the controls-allowed bit changes only on the
//!   ingest path and through the explicit [`SafetyGate::set_controls_allowed`]
//!   override. Transmit evaluation never mutates state.
//! - **Allocation-free message path**: `ingest` and `evaluate_tx` run in
//!   bounded time without allocating. Parsing and validation are finished
//!   at construction.
//! - **Run-to-completion**: each call processes one frame atomically; a
//!   multi-threaded host must serialize calls at its boundary.

mod rx;
mod tx;

pub use tx::{TxDecision, TxDenial};

use crate::buttons::ButtonWindow;
use crate::knockout::RelayLatch;
use crate::profile::{ProfileError, VehicleProfile};

/// Mutable gating state, reset wholesale by reinitialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GateState {
    controls_allowed: bool,
    cruise_engaged: bool,
    buttons: ButtonWindow,
    relay: RelayLatch,
}

impl GateState {
    const fn new() -> Self {
        Self {
            controls_allowed: false,
            cruise_engaged: false,
            buttons: ButtonWindow::new(),
            relay: RelayLatch::new(),
        }
    }
}

/// Message gate for one vehicle, built from a validated [`VehicleProfile`].
///
/// Plain owned value: variants under test build several side by side, and
/// nothing here is process-global.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    profile: VehicleProfile,
    state: GateState,
}

impl SafetyGate {
    /// Builds a gate in the disallowed state.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProfileError`] if the profile fails validation.
    /// A gate is never constructed from an invalid profile.
    pub fn new(profile: VehicleProfile) -> Result<Self, ProfileError> {
        profile.validate()?;
        Ok(Self {
            profile,
            state: GateState::new(),
        })
    }

    /// Whether automated control commands are currently permitted.
    #[must_use]
    pub const fn controls_allowed(&self) -> bool {
        self.state.controls_allowed
    }

    /// Whether the silenced ECU has been heard on its actuation stream.
    #[must_use]
    pub const fn relay_malfunction(&self) -> bool {
        self.state.relay.is_tripped()
    }

    /// The profile this gate was built from.
    #[must_use]
    pub const fn profile(&self) -> &VehicleProfile {
        &self.profile
    }

    /// Overrides the controls-allowed bit.
    ///
    /// Reset and test hook. Production hosts should let `ingest` drive the
    /// bit; this override does not touch the window, the cruise state, or
    /// the relay latch.
    pub fn set_controls_allowed(&mut self, allowed: bool) {
        self.transition_controls(allowed, "host override");
    }

    /// Resets all gating state, including the relay-malfunction latch.
    ///
    /// The only way to clear a tripped latch: equivalent to a process
    /// restart from the core's point of view.
    pub fn reinitialize(&mut self) {
        tracing::info!(
            relay_was_tripped = self.state.relay.is_tripped(),
            "gate reinitialized"
        );
        self.state = GateState::new();
    }

    fn transition_controls(&mut self, allowed: bool, reason: &'static str) {
        if self.state.controls_allowed != allowed {
            tracing::debug!(allowed, reason, "controls-allowed transition");
            self.state.controls_allowed = allowed;
        }
    }

    #[cfg(test)]
    pub(crate) fn cruise_engaged(&self) -> bool {
        self.state.cruise_engaged
    }
}
