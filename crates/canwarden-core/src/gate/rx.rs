//! Receive-path state transitions.
//!
//! Every handler follows the same discipline: re-read the signals the
//! classifier promised, and if a read still comes back absent, change
//! nothing. A malformed frame can never fake a press, a release, or an
//! engagement edge.

use crate::buttons::{ButtonCode, ButtonSample};
use crate::classify::{MessageKind, classify_rx};
use crate::frame::CanFrame;
use crate::profile::EnablePolicy;

use super::SafetyGate;

impl SafetyGate {
    /// Processes one received frame.
    ///
    /// Must be called once per frame, in arrival order, before any
    /// transmit decision that depends on it. Unrelated and malformed
    /// traffic is inert.
    pub fn ingest(&mut self, frame: &CanFrame) {
        match classify_rx(&self.profile, frame) {
            MessageKind::Buttons => self.handle_buttons(frame),
            MessageKind::CruiseStatus => self.handle_cruise_status(frame),
            MessageKind::DisabledEcuActuation => self.handle_actuation_heard(frame),
            MessageKind::AccelCommand | MessageKind::DiagnosticSession | MessageKind::Other => {}
        }
    }

    fn handle_buttons(&mut self, frame: &CanFrame) {
        let (Some(raw), Some(main)) = (
            self.profile.buttons.code.read(frame.data()),
            self.profile.buttons.main.read(frame.data()),
        ) else {
            return;
        };
        let code = ButtonCode::from_raw(raw);
        // The previous code must be read before the push shifts the window.
        let previous = self.state.buttons.latest().code;
        self.state.buttons.push(ButtonSample::new(code, main));

        match self.profile.policy {
            EnablePolicy::ButtonEdge => {
                let released = |button| previous == button && code != button;
                if released(ButtonCode::Resume) || released(ButtonCode::Set) {
                    self.transition_controls(true, "resume/set released");
                }
                if code == ButtonCode::Cancel {
                    self.transition_controls(false, "cancel pressed");
                }
            }
            EnablePolicy::CruiseStatus => {
                if code == ButtonCode::Cancel && self.state.cruise_engaged {
                    self.transition_controls(false, "cancel pressed while engaged");
                }
            }
        }
    }

    fn handle_cruise_status(&mut self, frame: &CanFrame) {
        let Some(engaged) = self.profile.cruise.engaged.read(frame.data()) else {
            return;
        };
        if self.profile.policy == EnablePolicy::CruiseStatus {
            if engaged && !self.state.cruise_engaged {
                if self.state.buttons.main_button_set() || self.state.buttons.recent_enable_button()
                {
                    self.transition_controls(true, "cruise engaged with recent interaction");
                } else {
                    tracing::debug!("cruise engagement without recent interaction; staying disallowed");
                }
            }
            if !engaged {
                self.transition_controls(false, "cruise disengaged");
            }
        }
        // Tracked under both policies: cancel forwarding needs it.
        self.state.cruise_engaged = engaged;
    }

    fn handle_actuation_heard(&mut self, frame: &CanFrame) {
        if !self.state.relay.is_tripped() {
            tracing::warn!(
                frame = %frame,
                "silenced ecu heard on its actuation stream; latching relay malfunction"
            );
        }
        self.state.relay.trip();
    }
}
