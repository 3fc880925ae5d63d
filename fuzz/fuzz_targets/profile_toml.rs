//! Fuzz harness for profile parsing.
//!
//! This target feeds arbitrary byte sequences to the TOML loader, ensuring
//! the parser and validator never panic, and that any profile the loader
//! accepts is internally consistent: it re-validates cleanly and builds a
//! gate.

#![no_main]
use canwarden_core::gate::SafetyGate;
use canwarden_core::profile::VehicleProfile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(profile) = VehicleProfile::from_toml(text) {
        // Acceptance implies validity; a gate must be constructible.
        assert!(profile.validate().is_ok());
        assert!(SafetyGate::new(profile).is_ok());
    }
});
