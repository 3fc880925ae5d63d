//! Fuzz harness for the gate state machine.
//!
//! This target replays arbitrary byte sequences as interleaved receive
//! frames, transmit requests, host overrides, and reinitializations,
//! checking that the gate never panics and that two invariants hold at
//! every step: a tripped relay latch stays tripped until reinitialization,
//! and a tripped latch denies every transmit.

#![no_main]
use canwarden_core::frame::CanFrame;
use canwarden_core::gate::{SafetyGate, TxDecision, TxDenial};
use canwarden_core::profile::VehicleProfile;
use libfuzzer_sys::fuzz_target;

const PROFILE: &str = r#"
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

    [disabled_ecu]
    diag = { addr = 0x7D0, bus = 0 }
    actuation = { addr = 0x421, bus = 0 }
"#;

/// Maps a byte onto an identifier, biased toward the configured streams so
/// coverage reaches the interesting arms without hunting for addresses.
fn pick_id(selector: u8, lo: u8, hi: u8) -> u32 {
    match selector % 8 {
        0 => 0x4F1,
        1 => 0x420,
        2 => 0x421,
        3 => 0x7D0,
        _ => u32::from(u16::from_le_bytes([lo, hi])),
    }
}

fuzz_target!(|data: &[u8]| {
    let profile = match VehicleProfile::from_toml(PROFILE) {
        Ok(profile) => profile,
        Err(_) => return,
    };
    let mut gate = match SafetyGate::new(profile) {
        Ok(gate) => gate,
        Err(_) => return,
    };

    let mut rest = data;
    while rest.len() >= 5 {
        let (header, tail) = rest.split_at(5);
        let payload_len = usize::from(header[4] % 9);
        if tail.len() < payload_len {
            break;
        }
        let (payload, next) = tail.split_at(payload_len);
        rest = next;

        let id = pick_id(header[0] >> 2, header[1], header[2]);
        let bus = header[3] % 4;
        let Ok(frame) = CanFrame::new(id, bus, payload) else {
            continue;
        };

        let was_tripped = gate.relay_malfunction();
        match header[0] % 4 {
            0 => {
                gate.ingest(&frame);
                // The latch is monotone between reinitializations.
                assert!(!was_tripped || gate.relay_malfunction());
            },
            1 => {
                let decision = gate.evaluate_tx(&frame);
                assert_eq!(gate.authorize_tx(&frame), decision.is_granted());
                if gate.relay_malfunction() {
                    assert_eq!(decision, TxDecision::Denied(TxDenial::RelayLockout));
                }
            },
            2 => gate.set_controls_allowed(header[1] & 1 == 1),
            _ => {
                gate.reinitialize();
                assert!(!gate.relay_malfunction());
                assert!(!gate.controls_allowed());
            },
        }
    }
});
