//! canwarden-core - vehicle-bus command gating
//!
//! This library is the decision core of a bus guardian that sits between a
//! driver-assistance computer and a vehicle's actuation network. It inspects
//! every frame in both directions and decides, frame by frame, whether the
//! vehicle may accept automated control: engagement happens only through a
//! driver-sanctioned button/cruise sequence, acceleration commands are
//! bounded whenever active, and a silenced ECU heard speaking again latches
//! a permanent relay-malfunction fault.
//!
//! The core never touches the bus. Hosts own transport, framing, and CRC;
//! they feed received frames to [`gate::SafetyGate::ingest`] in arrival
//! order and consult [`gate::SafetyGate::authorize_tx`] before every send.
//!
//! # Design
//!
//! - **Fail closed.** The transmit table is an allowlist; unknown traffic,
//!   malformed payloads, and unverifiable signals all resolve to deny or
//!   inert. Profiles are validated before a gate exists.
//! - **Total over untrusted input.** The message path has no error branch
//!   and must never panic; both entry points are fuzzed.
//! - **Allocation-free message path.** Frames are fixed arrays, the button
//!   window is an array ring, and decisions are plain values. Allocation is
//!   confined to profile loading at initialization.
//! - **No globals.** All state lives in an owned [`gate::SafetyGate`];
//!   variants under test run several gates side by side.
//!
//! ```rust
//! use canwarden_core::accel::AccelLimits;
//! use canwarden_core::frame::{BusAddress, CanFrame};
//! use canwarden_core::gate::SafetyGate;
//! use canwarden_core::profile::{
//!     AccelConfig, ButtonsConfig, CruiseConfig, EnablePolicy, VehicleProfile,
//! };
//! use canwarden_core::signal::{CodeField, FlagField, LinearField};
//!
//! let profile = VehicleProfile {
//!     policy: EnablePolicy::ButtonEdge,
//!     buttons: ButtonsConfig {
//!         rx: BusAddress::new(0x4F1, 0),
//!         tx_bus: 0,
//!         code: CodeField::new(0, 3),
//!         main: FlagField::new(3),
//!     },
//!     cruise: CruiseConfig {
//!         rx: BusAddress::new(0x420, 0),
//!         engaged: FlagField::new(0),
//!     },
//!     accel: AccelConfig {
//!         tx: BusAddress::new(0x421, 0),
//!         value: LinearField::new(16, 7, 0.5, -16.0),
//!         limits: AccelLimits::default(),
//!     },
//!     disabled_ecu: None,
//! };
//! let mut gate = SafetyGate::new(profile)?;
//!
//! // Set pressed, then released: the falling edge engages controls.
//! gate.ingest(&CanFrame::new(0x4F1, 0, &[0x02])?);
//! gate.ingest(&CanFrame::new(0x4F1, 0, &[0x00])?);
//! assert!(gate.controls_allowed());
//!
//! // 0.5 m/s^2 decodes from raw 33 and sits inside the default envelope.
//! assert!(gate.authorize_tx(&CanFrame::new(0x421, 0, &[0, 0, 33])?));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! - [`frame`]: decoded frames and bus-stream addressing
//! - [`signal`]: little-endian bit-addressed signal extraction
//! - [`buttons`]: button codes and the bounded press-history window
//! - [`accel`]: acceleration command envelope
//! - [`knockout`]: ECU keep-alive pattern and the relay-malfunction latch
//! - [`classify`]: directional address-table classification
//! - [`profile`]: per-variant configuration, loaded from TOML
//! - [`gate`]: the controls-allowed state machine and decision surfaces

pub mod accel;
pub mod buttons;
pub mod classify;
pub mod frame;
pub mod gate;
pub mod knockout;
pub mod profile;
pub mod signal;
