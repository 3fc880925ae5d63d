//! ECU knockout keep-alive and the relay-malfunction latch.
//!
//! Some vehicle variants take over a function by silencing the stock ECU
//! with a diagnostic session and keeping it silenced with a periodic
//! keep-alive. Two hazards follow. The keep-alive channel must not become a
//! general diagnostic write path, so exactly one payload pattern is
//! transmittable to the silenced ECU. And the knockout can fail: if the ECU
//! is ever heard transmitting on its actuation stream again, two
//! controllers are driving the same actuator, which is a hardware-level
//! fault that must latch until the core is reinitialized.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::{BusAddress, CanFrame, FrameError};

/// The only payload transmittable to the silenced ECU's diagnostic address:
/// a UDS tester-present single frame, service `0x3E`, sub-function `0x80`
/// (suppress positive response).
pub const TESTER_PRESENT_KEEPALIVE: [u8; 3] = [0x02, 0x3E, 0x80];

/// Whether a payload is the tester-present keep-alive.
///
/// Matched as a prefix; padding beyond the single-frame body is not
/// interpreted. A differing service id, sub-function, or ISO-TP length
/// byte is a different diagnostic request and is refused.
#[must_use]
pub fn is_tester_present(payload: &[u8]) -> bool {
    payload.len() >= TESTER_PRESENT_KEEPALIVE.len()
        && payload[..TESTER_PRESENT_KEEPALIVE.len()] == TESTER_PRESENT_KEEPALIVE
}

/// Errors from [`DisabledEcuIdentity`] validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DisabledEcuError {
    /// The diagnostic and actuation streams name the same address.
    #[error("diagnostic and actuation streams both resolve to {addr:#x} on bus {bus}")]
    IdentityOverlap {
        /// The shared identifier.
        addr: u32,
        /// The shared bus index.
        bus: u8,
    },

    /// A stream identifier is out of range.
    #[error("disabled-ecu stream address invalid")]
    Address(#[from] FrameError),
}

/// The two bus identities of a knocked-out ECU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisabledEcuIdentity {
    /// Diagnostic request stream the keep-alive is sent on.
    pub diag: BusAddress,
    /// Actuation stream the ECU used before it was silenced. Hearing it
    /// again means the knockout failed.
    pub actuation: BusAddress,
}

impl DisabledEcuIdentity {
    /// Builds an identity from the two streams.
    #[must_use]
    pub const fn new(diag: BusAddress, actuation: BusAddress) -> Self {
        Self { diag, actuation }
    }

    /// Checks the streams are distinct and in range.
    pub fn validate(&self) -> Result<(), DisabledEcuError> {
        self.diag.validate()?;
        self.actuation.validate()?;
        if self.diag == self.actuation {
            return Err(DisabledEcuError::IdentityOverlap {
                addr: self.diag.addr,
                bus: self.diag.bus,
            });
        }
        Ok(())
    }

    /// Whether an outbound frame targets the diagnostic stream.
    #[must_use]
    pub fn matches_diag(&self, frame: &CanFrame) -> bool {
        self.diag.matches(frame)
    }

    /// Whether a received frame is the silenced ECU speaking on its
    /// actuation stream. Payload content and length are irrelevant.
    #[must_use]
    pub fn matches_actuation(&self, frame: &CanFrame) -> bool {
        self.actuation.matches(frame)
    }
}

/// One-way fault latch.
///
/// There is no public clear operation: recovery is a full reinitialization
/// of the owning state, which replaces the latch wholesale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayLatch {
    tripped: bool,
}

impl RelayLatch {
    /// Creates an untripped latch.
    #[must_use]
    pub const fn new() -> Self {
        Self { tripped: false }
    }

    /// Trips the latch. Idempotent.
    pub fn trip(&mut self) {
        self.tripped = true;
    }

    /// Whether the latch has ever tripped.
    #[must_use]
    pub const fn is_tripped(&self) -> bool {
        self.tripped
    }
}
