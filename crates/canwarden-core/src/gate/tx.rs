//! Transmit authorization.
//!
//! The transmit table is an allowlist with three entries: cruise button
//! frames, acceleration commands, and the keep-alive to a silenced ECU.
//! Anything else is denied by default, and a tripped relay latch denies
//! the allowlisted streams too.
//!
//! A denial is data, not an error: [`SafetyGate::evaluate_tx`] returns the
//! typed reason and disturbs nothing, so rejection stays silent at the bus
//! level. [`SafetyGate::authorize_tx`] is the boolean form hosts wire into
//! their send path.

use serde::Serialize;

use crate::buttons::ButtonCode;
use crate::classify::{MessageKind, classify_tx};
use crate::frame::CanFrame;
use crate::knockout::is_tester_present;

use super::SafetyGate;

/// Why a transmit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TxDenial {
    /// The relay-malfunction latch is tripped; nothing may transmit.
    RelayLockout,
    /// The frame matches no transmit stream, or its payload does not reach
    /// the signal its stream carries.
    NotAllowlisted,
    /// Only resume and cancel button codes may ever be forwarded.
    ButtonNotForwardable {
        /// The refused code.
        code: ButtonCode,
    },
    /// Resume spam is only legal while controls are allowed.
    ResumeWithoutControls,
    /// Cancel is only legal while the vehicle reports cruise engaged.
    CancelWithoutCruise,
    /// The commanded acceleration is outside the permitted envelope.
    AccelOutOfBounds {
        /// The refused command, m/s^2.
        value: f64,
    },
    /// A non-neutral acceleration command while controls are not allowed.
    AccelWithoutControls {
        /// The refused command, m/s^2.
        value: f64,
    },
    /// A diagnostic request to the silenced ECU other than the keep-alive.
    DiagnosticNotKeepAlive,
}

/// Outcome of one transmit evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxDecision {
    /// The frame may be placed on the bus.
    Granted,
    /// The frame must not be transmitted, with the reason.
    Denied(TxDenial),
}

impl TxDecision {
    /// Whether the frame may be transmitted.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// The denial reason, if any.
    #[must_use]
    pub const fn denial(&self) -> Option<TxDenial> {
        match self {
            Self::Granted => None,
            Self::Denied(denial) => Some(*denial),
        }
    }
}

impl SafetyGate {
    /// Evaluates an outbound frame against the current state.
    ///
    /// Read-only: evaluation never advances the state machine, so hosts may
    /// probe freely. The relay lockout is checked before classification;
    /// once the latch trips, the answer is uniform.
    #[must_use]
    pub fn evaluate_tx(&self, frame: &CanFrame) -> TxDecision {
        if self.state.relay.is_tripped() {
            return TxDecision::Denied(TxDenial::RelayLockout);
        }
        match classify_tx(&self.profile, frame) {
            MessageKind::Buttons => self.evaluate_button_tx(frame),
            MessageKind::AccelCommand => self.evaluate_accel_tx(frame),
            MessageKind::DiagnosticSession => evaluate_diag_tx(frame),
            MessageKind::CruiseStatus | MessageKind::DisabledEcuActuation | MessageKind::Other => {
                TxDecision::Denied(TxDenial::NotAllowlisted)
            }
        }
    }

    /// Boolean transmit check for the host's send path.
    ///
    /// Must be consulted before any frame is placed on the bus; the gate
    /// itself never transmits. Denials are logged and otherwise silent.
    #[must_use]
    pub fn authorize_tx(&self, frame: &CanFrame) -> bool {
        match self.evaluate_tx(frame) {
            TxDecision::Granted => true,
            TxDecision::Denied(denial) => {
                tracing::debug!(frame = %frame, ?denial, "transmit denied");
                false
            }
        }
    }

    fn evaluate_button_tx(&self, frame: &CanFrame) -> TxDecision {
        let Some(raw) = self.profile.buttons.code.read(frame.data()) else {
            return TxDecision::Denied(TxDenial::NotAllowlisted);
        };
        match ButtonCode::from_raw(raw) {
            ButtonCode::Resume if self.state.controls_allowed => TxDecision::Granted,
            ButtonCode::Resume => TxDecision::Denied(TxDenial::ResumeWithoutControls),
            ButtonCode::Cancel if self.state.cruise_engaged => TxDecision::Granted,
            ButtonCode::Cancel => TxDecision::Denied(TxDenial::CancelWithoutCruise),
            code => TxDecision::Denied(TxDenial::ButtonNotForwardable { code }),
        }
    }

    fn evaluate_accel_tx(&self, frame: &CanFrame) -> TxDecision {
        let Some(value) = self.profile.accel.value.read(frame.data()) else {
            return TxDecision::Denied(TxDenial::NotAllowlisted);
        };
        if self
            .profile
            .accel
            .limits
            .permits(self.state.controls_allowed, value)
        {
            TxDecision::Granted
        } else if self.state.controls_allowed {
            TxDecision::Denied(TxDenial::AccelOutOfBounds { value })
        } else {
            TxDecision::Denied(TxDenial::AccelWithoutControls { value })
        }
    }
}

fn evaluate_diag_tx(frame: &CanFrame) -> TxDecision {
    if is_tester_present(frame.data()) {
        TxDecision::Granted
    } else {
        TxDecision::Denied(TxDenial::DiagnosticNotKeepAlive)
    }
}
