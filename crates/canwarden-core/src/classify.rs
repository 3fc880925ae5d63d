//! Address-table message classification.
//!
//! Classification is pure and total: every frame maps to exactly one
//! [`MessageKind`], unknown traffic maps to [`MessageKind::Other`], and a
//! frame whose payload is too short for the signal its address carries
//! degrades to `Other` instead of failing. Profile validation guarantees
//! same-direction streams are pairwise distinct, so the match order below
//! cannot change the result.
//!
//! The two directions use separate entry points because a receive stream
//! may legitimately share an address with a transmit stream: the silenced
//! ECU's actuation stream, heard on receive, can carry the same identifier
//! the host uses to transmit its replacement commands.

use serde::{Deserialize, Serialize};

use crate::frame::CanFrame;
use crate::profile::VehicleProfile;

/// What a frame means to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Cruise stalk button state.
    Buttons,
    /// Cruise controller engagement status.
    CruiseStatus,
    /// Outbound acceleration command.
    AccelCommand,
    /// Outbound diagnostic request to the silenced ECU.
    DiagnosticSession,
    /// The silenced ECU heard speaking on its actuation stream.
    DisabledEcuActuation,
    /// Everything else; inert to every downstream component.
    Other,
}

/// Classifies a received frame.
#[must_use]
pub fn classify_rx(profile: &VehicleProfile, frame: &CanFrame) -> MessageKind {
    if profile.buttons.rx.matches(frame) {
        let readable = profile.buttons.code.read(frame.data()).is_some()
            && profile.buttons.main.read(frame.data()).is_some();
        return if readable {
            MessageKind::Buttons
        } else {
            MessageKind::Other
        };
    }
    if profile.cruise.rx.matches(frame) {
        return if profile.cruise.engaged.read(frame.data()).is_some() {
            MessageKind::CruiseStatus
        } else {
            MessageKind::Other
        };
    }
    if let Some(ecu) = &profile.disabled_ecu {
        // Payload is irrelevant: the stream being alive is the fault.
        if ecu.matches_actuation(frame) {
            return MessageKind::DisabledEcuActuation;
        }
    }
    MessageKind::Other
}

/// Classifies a frame the host wants to transmit.
#[must_use]
pub fn classify_tx(profile: &VehicleProfile, frame: &CanFrame) -> MessageKind {
    if profile.buttons.tx_stream().matches(frame) {
        return if profile.buttons.code.read(frame.data()).is_some() {
            MessageKind::Buttons
        } else {
            MessageKind::Other
        };
    }
    if profile.accel.tx.matches(frame) {
        return if profile.accel.value.read(frame.data()).is_some() {
            MessageKind::AccelCommand
        } else {
            MessageKind::Other
        };
    }
    if let Some(ecu) = &profile.disabled_ecu {
        // Payload inspection belongs to the keep-alive rule, not here.
        if ecu.matches_diag(frame) {
            return MessageKind::DiagnosticSession;
        }
    }
    MessageKind::Other
}

/// Test fixture: buttons received on bus 0 and forwarded on bus 2, with the
/// actuation stream sharing the accel command address across directions.
#[cfg(test)]
pub(crate) fn test_profile() -> VehicleProfile {
    use crate::accel::AccelLimits;
    use crate::frame::BusAddress;
    use crate::knockout::DisabledEcuIdentity;
    use crate::profile::{AccelConfig, ButtonsConfig, CruiseConfig, EnablePolicy};
    use crate::signal::{CodeField, FlagField, LinearField};

    let profile = VehicleProfile {
        policy: EnablePolicy::ButtonEdge,
        buttons: ButtonsConfig {
            rx: BusAddress::new(0x4F1, 0),
            tx_bus: 2,
            code: CodeField::new(0, 3),
            main: FlagField::new(3),
        },
        cruise: CruiseConfig {
            rx: BusAddress::new(0x420, 0),
            engaged: FlagField::new(0),
        },
        accel: AccelConfig {
            tx: BusAddress::new(0x421, 0),
            // Dyadic transfer function, so decoded values are exact.
            value: LinearField::new(16, 7, 0.5, -16.0),
            limits: AccelLimits::default(),
        },
        disabled_ecu: Some(DisabledEcuIdentity::new(
            BusAddress::new(0x7D0, 0),
            BusAddress::new(0x421, 0),
        )),
    };
    profile
        .validate()
        .expect("classifier test fixture must be a valid profile");
    profile
}
