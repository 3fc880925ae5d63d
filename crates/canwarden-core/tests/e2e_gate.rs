//! End-to-end conformance tests for the safety gate.
//!
//! These tests drive a [`SafetyGate`] the way a bridge firmware would:
//! raw frames in, transmit verdicts out, no reaching into internals. They
//! cover:
//!
//! - Button forwarding under both enable policies
//! - Cruise-status engagement: rising edges, interaction window, aging
//! - Button-release engagement: falling edges, held buttons, cancel
//! - Acceleration envelope sweeps over the whole raw field
//! - Diagnostic keep-alive filtering
//! - Relay lockout after a silenced ECU comes back
//! - A TOML-loaded profile driving the same behavior
//!
//! # Test Architecture
//!
//! ```text
//! vehicle frames          host commands
//!       |                       |
//!       v                       v
//!   ingest()  --> SafetyGate --> evaluate_tx() --> Granted / Denied
//! ```
//!
//! Signal layouts here are unaligned and cross byte boundaries on purpose;
//! a gate that only works on byte-aligned fields would pass the unit tests
//! and fail on a real vehicle.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::float_cmp)]

use canwarden_core::accel::AccelLimits;
use canwarden_core::frame::{BusAddress, CanFrame};
use canwarden_core::gate::{SafetyGate, TxDecision, TxDenial};
use canwarden_core::knockout::DisabledEcuIdentity;
use canwarden_core::profile::{
    AccelConfig, ButtonsConfig, CruiseConfig, EnablePolicy, VehicleProfile,
};
use canwarden_core::signal::{CodeField, FlagField, LinearField};

// ============================================================================
// Test Helpers
// ============================================================================

const BUTTONS: u32 = 0x4F1;
const CRUISE_STATUS: u32 = 0x420;
const ACCEL_CMD: u32 = 0x421;
const ECU_DIAG: u32 = 0x7D0;
const PT_BUS: u8 = 0;
const CAM_BUS: u8 = 2;

const BTN_NONE: u8 = 0;
const BTN_RESUME: u8 = 1;
const BTN_SET: u8 = 2;
const BTN_CANCEL: u8 = 4;

const ACCEL_SCALE: f64 = 0.25;
const ACCEL_OFFSET: f64 = -40.0;

/// Sets `width` bits starting at `start_bit`, least significant first,
/// using the same bit addressing the gate reads with.
fn put_bits(data: &mut [u8], start_bit: usize, width: usize, raw: u64) {
    for offset in 0..width {
        if (raw >> offset) & 1 == 1 {
            let bit = start_bit + offset;
            data[bit / 8] |= 1 << (bit % 8);
        }
    }
}

/// Stream map modeled on a stock adaptive-cruise variant: buttons and
/// cruise status arrive on the powertrain bus, button frames are forwarded
/// back onto it, and the factory controller stays in charge of engagement.
fn stock_profile() -> VehicleProfile {
    VehicleProfile {
        policy: EnablePolicy::CruiseStatus,
        buttons: ButtonsConfig {
            rx: BusAddress::new(BUTTONS, PT_BUS),
            tx_bus: PT_BUS,
            code: CodeField::new(0, 3),
            main: FlagField::new(3),
        },
        cruise: CruiseConfig {
            rx: BusAddress::new(CRUISE_STATUS, PT_BUS),
            engaged: FlagField::new(13),
        },
        accel: AccelConfig {
            tx: BusAddress::new(ACCEL_CMD, PT_BUS),
            value: LinearField::new(25, 9, ACCEL_SCALE, ACCEL_OFFSET),
            limits: AccelLimits::default(),
        },
        disabled_ecu: None,
    }
}

/// The same vehicle with the factory controller knocked out: enablement
/// moves to button release edges and the gate owns the actuation stream
/// the controller used to publish.
fn longitudinal_profile() -> VehicleProfile {
    VehicleProfile {
        policy: EnablePolicy::ButtonEdge,
        disabled_ecu: Some(DisabledEcuIdentity::new(
            BusAddress::new(ECU_DIAG, PT_BUS),
            BusAddress::new(ACCEL_CMD, PT_BUS),
        )),
        ..stock_profile()
    }
}

fn gate(profile: VehicleProfile) -> SafetyGate {
    SafetyGate::new(profile).expect("profile is valid")
}

fn button_frame(code: u8, main: bool) -> CanFrame {
    let mut data = [0u8; 4];
    put_bits(&mut data, 0, 3, u64::from(code));
    put_bits(&mut data, 3, 1, u64::from(main));
    CanFrame::new(BUTTONS, PT_BUS, &data).expect("frame fits")
}

fn cruise_frame(engaged: bool) -> CanFrame {
    let mut data = [0u8; 8];
    put_bits(&mut data, 13, 1, u64::from(engaged));
    CanFrame::new(CRUISE_STATUS, PT_BUS, &data).expect("frame fits")
}

fn accel_frame(raw: u16) -> CanFrame {
    let mut data = [0u8; 8];
    put_bits(&mut data, 25, 9, u64::from(raw));
    CanFrame::new(ACCEL_CMD, PT_BUS, &data).expect("frame fits")
}

fn diag_frame(payload: &[u8]) -> CanFrame {
    CanFrame::new(ECU_DIAG, PT_BUS, payload).expect("frame fits")
}

/// Inverse of the accel transfer function. The transfer is dyadic, so
/// named boundary values convert without rounding.
fn accel_raw(value: f64) -> u16 {
    ((value - ACCEL_OFFSET) / ACCEL_SCALE) as u16
}

fn raw_to_value(raw: u16) -> f64 {
    f64::from(raw).mul_add(ACCEL_SCALE, ACCEL_OFFSET)
}

/// Pushes enough idle samples to evict every earlier press.
fn drain_button_window(gate: &mut SafetyGate) {
    for _ in 0..8 {
        gate.ingest(&button_frame(BTN_NONE, false));
    }
}

/// Engages a button-edge gate with a set press and release.
fn engage_by_release(gate: &mut SafetyGate) {
    gate.ingest(&button_frame(BTN_SET, false));
    gate.ingest(&button_frame(BTN_NONE, false));
    assert!(gate.controls_allowed());
}

// ============================================================================
// Button Forwarding
// ============================================================================

/// Forwarding rules depend only on gate state, never on the enable policy:
/// resume needs controls, cancel needs an engaged cruise controller, and
/// set or anything unrecognized never leaves the gate.
#[test]
fn button_forwarding_follows_the_send_matrix() {
    for profile in [stock_profile(), longitudinal_profile()] {
        for engaged in [false, true] {
            for allowed in [false, true] {
                let mut gate = gate(profile);
                gate.ingest(&cruise_frame(engaged));
                gate.set_controls_allowed(allowed);

                for code in 0..8u8 {
                    let verdict = gate.authorize_tx(&button_frame(code, false));
                    let expected = match code {
                        BTN_RESUME => allowed,
                        BTN_CANCEL => engaged,
                        _ => false,
                    };
                    assert_eq!(
                        verdict, expected,
                        "policy={:?} code={code} allowed={allowed} engaged={engaged}",
                        profile.policy
                    );
                }
            }
        }
    }
}

/// A camera-harness variant forwards button frames on the camera bus; the
/// powertrain copy of the same identifier is not a configured stream.
#[test]
fn button_forwarding_respects_the_configured_transmit_bus() {
    let mut profile = stock_profile();
    profile.buttons.tx_bus = CAM_BUS;
    let mut gate = gate(profile);
    gate.set_controls_allowed(true);

    let resume = button_frame(BTN_RESUME, false);
    let on_camera_bus = CanFrame::new(BUTTONS, CAM_BUS, resume.data()).expect("frame fits");
    assert!(gate.authorize_tx(&on_camera_bus));
    assert_eq!(
        gate.evaluate_tx(&resume),
        TxDecision::Denied(TxDenial::NotAllowlisted)
    );
}

// ============================================================================
// Engagement via Cruise Status
// ============================================================================

/// A cruise rising edge engages only when the driver touched the stalk
/// recently: any enable button within the window, or the main toggle in
/// the latest sample.
#[test]
fn cruise_rising_edge_engages_only_with_a_recent_interaction() {
    let mut gate = gate(stock_profile());
    for main in [false, true] {
        for code in 0..8u8 {
            gate.ingest(&cruise_frame(false));
            drain_button_window(&mut gate);
            assert!(!gate.controls_allowed());

            gate.ingest(&button_frame(code, main));
            gate.ingest(&cruise_frame(true));
            let expected = main || matches!(code, BTN_RESUME | BTN_SET | BTN_CANCEL);
            assert_eq!(
                gate.controls_allowed(),
                expected,
                "main={main} code={code}"
            );
        }
    }
}

/// A press stays visible for exactly the window length and then ages out.
#[test]
fn interactions_age_out_after_eight_samples() {
    for idle_pushes in 0..12 {
        let mut gate = gate(stock_profile());
        gate.ingest(&button_frame(BTN_SET, false));
        for _ in 0..idle_pushes {
            gate.ingest(&button_frame(BTN_NONE, false));
        }
        gate.ingest(&cruise_frame(true));
        assert_eq!(
            gate.controls_allowed(),
            idle_pushes < 8,
            "idle_pushes={idle_pushes}"
        );
    }
}

/// An unprompted rising edge leaves controls disallowed.
#[test]
fn a_rising_edge_with_no_interaction_stays_disallowed() {
    let mut gate = gate(stock_profile());
    drain_button_window(&mut gate);
    gate.ingest(&cruise_frame(true));
    assert!(!gate.controls_allowed());
}

/// Engagement needs the edge itself: pressing a button while the cruise
/// controller is already engaged does nothing.
#[test]
fn a_press_after_the_edge_does_not_engage() {
    let mut gate = gate(stock_profile());
    gate.ingest(&cruise_frame(true));
    assert!(!gate.controls_allowed());

    gate.ingest(&button_frame(BTN_SET, false));
    gate.ingest(&cruise_frame(true));
    assert!(!gate.controls_allowed());
}

/// The main toggle is level state, not a press: it counts only while it is
/// the latest sample.
#[test]
fn the_main_toggle_counts_only_while_latched() {
    let mut gate = gate(stock_profile());
    gate.ingest(&button_frame(BTN_NONE, true));
    gate.ingest(&button_frame(BTN_NONE, false));
    gate.ingest(&cruise_frame(true));
    assert!(!gate.controls_allowed());

    gate.ingest(&cruise_frame(false));
    gate.ingest(&button_frame(BTN_NONE, true));
    gate.ingest(&cruise_frame(true));
    assert!(gate.controls_allowed());
}

/// Cruise disengagement releases controls immediately, and a later edge
/// with the interaction still in the window may re-engage.
#[test]
fn cruise_disengage_releases_and_a_fresh_edge_reengages() {
    let mut gate = gate(stock_profile());
    gate.ingest(&button_frame(BTN_SET, false));
    gate.ingest(&cruise_frame(true));
    assert!(gate.controls_allowed());

    gate.ingest(&cruise_frame(false));
    assert!(!gate.controls_allowed());

    gate.ingest(&cruise_frame(true));
    assert!(gate.controls_allowed());
}

/// Under the cruise policy a cancel press disables only while the cruise
/// controller is engaged.
#[test]
fn cancel_disables_only_an_engaged_controller_under_cruise_policy() {
    let mut gate = gate(stock_profile());
    gate.ingest(&button_frame(BTN_SET, false));
    gate.ingest(&cruise_frame(true));
    assert!(gate.controls_allowed());

    gate.ingest(&button_frame(BTN_CANCEL, false));
    assert!(!gate.controls_allowed());

    // Disengaged controller: the press has nothing to cancel, so a host
    // override survives it.
    gate.ingest(&cruise_frame(false));
    gate.set_controls_allowed(true);
    gate.ingest(&button_frame(BTN_CANCEL, false));
    assert!(gate.controls_allowed());
}

// ============================================================================
// Engagement via Button Release
// ============================================================================

/// Holding any button never engages; releasing engages only for resume
/// and set.
#[test]
fn resume_and_set_engage_on_release_only() {
    for code in 0..8u8 {
        let mut gate = gate(longitudinal_profile());
        for _ in 0..10 {
            gate.ingest(&button_frame(code, false));
            assert!(!gate.controls_allowed(), "held code={code}");
        }
        gate.ingest(&button_frame(BTN_NONE, false));
        let expected = matches!(code, BTN_RESUME | BTN_SET);
        assert_eq!(gate.controls_allowed(), expected, "released code={code}");
    }
}

/// A release counts even when the stalk moves straight onto another code.
#[test]
fn a_release_onto_another_code_still_engages() {
    let mut gate = gate(longitudinal_profile());
    gate.ingest(&button_frame(BTN_SET, false));
    assert!(!gate.controls_allowed());
    gate.ingest(&button_frame(BTN_RESUME, false));
    assert!(gate.controls_allowed());
}

/// Cancel disables unconditionally, including in the same frame where a
/// set release would have engaged.
#[test]
fn cancel_disables_under_button_edges() {
    let mut engaged = gate(longitudinal_profile());
    engage_by_release(&mut engaged);
    engaged.ingest(&button_frame(BTN_CANCEL, false));
    assert!(!engaged.controls_allowed());

    // Set is still held when cancel arrives; the release edge never lands.
    let mut mid_press = gate(longitudinal_profile());
    mid_press.ingest(&button_frame(BTN_SET, false));
    mid_press.ingest(&button_frame(BTN_CANCEL, false));
    assert!(!mid_press.controls_allowed());
}

/// With the factory controller gone its status stream no longer governs
/// engagement; it still feeds the cancel-forwarding rule.
#[test]
fn cruise_state_feeds_cancel_forwarding_but_not_engagement() {
    let mut gate = gate(longitudinal_profile());
    let cancel = button_frame(BTN_CANCEL, false);

    gate.ingest(&cruise_frame(true));
    assert!(!gate.controls_allowed());
    assert!(gate.authorize_tx(&cancel));

    gate.ingest(&cruise_frame(false));
    assert!(!gate.authorize_tx(&cancel));

    engage_by_release(&mut gate);
    gate.ingest(&cruise_frame(false));
    assert!(gate.controls_allowed());
}

// ============================================================================
// Acceleration Commands
// ============================================================================

/// Sweeps every raw value the field can encode, in both control states.
/// With controls the envelope is the contract; without them only the
/// exact inactive command passes.
#[test]
fn accel_commands_match_the_envelope_across_the_field() {
    for allowed in [false, true] {
        let mut gate = gate(longitudinal_profile());
        gate.set_controls_allowed(allowed);
        for raw in 0..512u16 {
            let value = raw_to_value(raw);
            let expected = if allowed {
                (-3.5..=2.0).contains(&value)
            } else {
                value == 0.0
            };
            assert_eq!(
                gate.authorize_tx(&accel_frame(raw)),
                expected,
                "allowed={allowed} value={value}"
            );
        }
    }
}

/// Both envelope boundaries transmit; one step beyond either does not.
#[test]
fn accel_boundaries_are_inclusive() {
    let mut gate = gate(longitudinal_profile());
    gate.set_controls_allowed(true);

    assert!(gate.authorize_tx(&accel_frame(accel_raw(-3.5))));
    assert!(gate.authorize_tx(&accel_frame(accel_raw(2.0))));
    assert_eq!(
        gate.evaluate_tx(&accel_frame(accel_raw(-3.75))),
        TxDecision::Denied(TxDenial::AccelOutOfBounds { value: -3.75 })
    );
    assert_eq!(
        gate.evaluate_tx(&accel_frame(accel_raw(2.25))),
        TxDecision::Denied(TxDenial::AccelOutOfBounds { value: 2.25 })
    );

    gate.set_controls_allowed(false);
    assert!(gate.authorize_tx(&accel_frame(accel_raw(0.0))));
    assert_eq!(
        gate.evaluate_tx(&accel_frame(accel_raw(0.25))),
        TxDecision::Denied(TxDenial::AccelWithoutControls { value: 0.25 })
    );
}

/// A frame too short to carry the value field is not an accel command at
/// all, and no control state makes it one.
#[test]
fn short_accel_frames_never_transmit() {
    let mut gate = gate(longitudinal_profile());
    gate.set_controls_allowed(true);
    let short = CanFrame::new(ACCEL_CMD, PT_BUS, &[0u8; 4]).expect("frame fits");
    assert_eq!(
        gate.evaluate_tx(&short),
        TxDecision::Denied(TxDenial::NotAllowlisted)
    );
}

// ============================================================================
// Diagnostics and Relay Knockout
// ============================================================================

/// The tester-present keep-alive is the only payload allowed toward the
/// silenced ECU.
#[test]
fn tester_present_is_the_only_diagnostic_payload() {
    let gate = gate(longitudinal_profile());

    assert!(gate.authorize_tx(&diag_frame(&[0x02, 0x3E, 0x80, 0, 0, 0, 0, 0])));
    assert!(gate.authorize_tx(&diag_frame(&[0x02, 0x3E, 0x80])));
    assert_eq!(
        gate.evaluate_tx(&diag_frame(&[0x03, 0xAA, 0xAA, 0, 0, 0, 0, 0])),
        TxDecision::Denied(TxDenial::DiagnosticNotKeepAlive)
    );
    assert_eq!(
        gate.evaluate_tx(&diag_frame(&[0x02, 0x3E])),
        TxDecision::Denied(TxDenial::DiagnosticNotKeepAlive)
    );
}

/// Without a disabled ECU the diagnostic address is not a stream and even
/// the keep-alive is refused.
#[test]
fn diagnostics_without_a_disabled_ecu_are_not_allowlisted() {
    let gate = gate(stock_profile());
    assert_eq!(
        gate.evaluate_tx(&diag_frame(&[0x02, 0x3E, 0x80])),
        TxDecision::Denied(TxDenial::NotAllowlisted)
    );
}

/// A frame from the supposedly silenced ECU proves the relay failed. The
/// latch denies every transmit until reinitialization.
#[test]
fn hearing_the_silenced_ecu_locks_the_relay() {
    let mut gate = gate(longitudinal_profile());
    engage_by_release(&mut gate);
    assert!(gate.authorize_tx(&accel_frame(accel_raw(0.5))));

    gate.ingest(&accel_frame(0));
    assert!(gate.relay_malfunction());
    for frame in [
        accel_frame(accel_raw(0.0)),
        button_frame(BTN_RESUME, false),
        diag_frame(&[0x02, 0x3E, 0x80]),
    ] {
        assert_eq!(
            gate.evaluate_tx(&frame),
            TxDecision::Denied(TxDenial::RelayLockout)
        );
    }

    // No bus traffic or host override clears the latch.
    gate.set_controls_allowed(true);
    engage_by_release(&mut gate);
    assert!(gate.relay_malfunction());
    assert!(!gate.authorize_tx(&accel_frame(accel_raw(0.0))));

    gate.reinitialize();
    assert!(!gate.relay_malfunction());
    assert!(!gate.controls_allowed());
    assert!(gate.authorize_tx(&accel_frame(accel_raw(0.0))));
}

// ============================================================================
// Profile Loading
// ============================================================================

const LONGITUDINAL_TOML: &str = r#"
    policy = "button_edge"

    [buttons]
    rx = { addr = 0x4F1, bus = 0 }
    tx_bus = 0
    code = { start_bit = 0, width = 3 }
    main = { start_bit = 3 }

    [cruise]
    rx = { addr = 0x420, bus = 0 }
    engaged = { start_bit = 13 }

    [accel]
    tx = { addr = 0x421, bus = 0 }
    value = { start_bit = 25, width = 9, scale = 0.25, offset = -40.0 }
    limits = { min = -3.5, max = 2.0 }

    [disabled_ecu]
    diag = { addr = 0x7D0, bus = 0 }
    actuation = { addr = 0x421, bus = 0 }
"#;

/// A profile loaded from TOML is the profile built in code, and the gate
/// it produces behaves identically end to end.
#[test]
fn a_toml_profile_drives_the_gate() {
    let profile = VehicleProfile::from_toml(LONGITUDINAL_TOML).expect("profile parses");
    assert_eq!(profile, longitudinal_profile());

    let mut gate = gate(profile);
    engage_by_release(&mut gate);
    assert!(gate.authorize_tx(&accel_frame(accel_raw(2.0))));
    assert!(gate.authorize_tx(&diag_frame(&[0x02, 0x3E, 0x80])));

    gate.ingest(&accel_frame(0));
    assert!(!gate.authorize_tx(&accel_frame(accel_raw(0.0))));
}
