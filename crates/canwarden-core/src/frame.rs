//! Decoded bus frame representation.
//!
//! The surrounding transport owns framing, CRC, and DLC handling; by the time
//! a message reaches this crate it is a plain (identifier, bus, payload)
//! triple. [`CanFrame`] models that triple as a fixed-capacity value type so
//! the message path never allocates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum payload length of a classic CAN data frame, in bytes.
pub const MAX_FRAME_PAYLOAD: usize = 8;

/// Largest valid 29-bit extended CAN identifier.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Number of buses the gate can be configured to watch.
///
/// Runtime frames may still carry any bus index; a frame on an out-of-range
/// bus simply matches no configured stream and stays inert.
pub const BUS_COUNT: u8 = 3;

/// Errors from [`CanFrame`] construction.
///
/// These indicate host misuse (the transport handed us something that cannot
/// be a classic CAN frame), not adversarial bus input: once constructed, a
/// frame is processed without further error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// The identifier does not fit in 29 bits.
    #[error("identifier {id:#x} exceeds the 29-bit extended range")]
    IdOutOfRange {
        /// The rejected identifier.
        id: u32,
    },

    /// The payload is longer than a classic CAN data frame allows.
    #[error("payload of {len} bytes exceeds the {MAX_FRAME_PAYLOAD}-byte frame limit")]
    PayloadTooLong {
        /// The rejected payload length.
        len: usize,
    },

    /// A configured stream names a bus the gate does not watch.
    #[error("bus index {bus} is outside the {BUS_COUNT} watched buses")]
    BusOutOfRange {
        /// The rejected bus index.
        bus: u8,
    },
}

/// A decoded classic CAN data frame.
///
/// Array-backed and `Copy`: the receive path hands frames to the gate by
/// reference and nothing on that path allocates. Payloads shorter than
/// [`MAX_FRAME_PAYLOAD`] are legal; signal extraction treats out-of-range
/// reads as absent rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanFrame {
    id: u32,
    bus: u8,
    len: u8,
    bytes: [u8; MAX_FRAME_PAYLOAD],
}

impl CanFrame {
    /// Builds a frame from a decoded identifier, bus index, and payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::IdOutOfRange`] if `id` exceeds 29 bits and
    /// [`FrameError::PayloadTooLong`] if `data` exceeds
    /// [`MAX_FRAME_PAYLOAD`] bytes.
    pub fn new(id: u32, bus: u8, data: &[u8]) -> Result<Self, FrameError> {
        if id > MAX_EXTENDED_ID {
            return Err(FrameError::IdOutOfRange { id });
        }
        if data.len() > MAX_FRAME_PAYLOAD {
            return Err(FrameError::PayloadTooLong { len: data.len() });
        }

        let mut bytes = [0u8; MAX_FRAME_PAYLOAD];
        bytes[..data.len()].copy_from_slice(data);
        // Fits in u8: length checked against MAX_FRAME_PAYLOAD above.
        #[allow(clippy::cast_possible_truncation)]
        let len = data.len() as u8;
        Ok(Self {
            id,
            bus,
            len,
            bytes,
        })
    }

    /// The frame identifier (11-bit standard or 29-bit extended).
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// The bus index the frame was received on or is destined for.
    #[must_use]
    pub const fn bus(&self) -> u8 {
        self.bus
    }

    /// The payload bytes, at their original length.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// Payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the frame carries no payload.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// An (identifier, bus) pair naming one message stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusAddress {
    /// Frame identifier the stream uses.
    pub addr: u32,
    /// Bus index the stream lives on.
    pub bus: u8,
}

impl BusAddress {
    /// Builds a stream address from an identifier and bus index.
    #[must_use]
    pub const fn new(addr: u32, bus: u8) -> Self {
        Self { addr, bus }
    }

    /// Checks that the identifier fits the 29-bit extended range and the
    /// bus index names a watched bus.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.addr > MAX_EXTENDED_ID {
            return Err(FrameError::IdOutOfRange { id: self.addr });
        }
        if self.bus >= BUS_COUNT {
            return Err(FrameError::BusOutOfRange { bus: self.bus });
        }
        Ok(())
    }

    /// Whether a frame belongs to this stream.
    #[must_use]
    pub fn matches(&self, frame: &CanFrame) -> bool {
        frame.id() == self.addr && frame.bus() == self.bus
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}@{}", self.addr, self.bus)
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}@{} [", self.id, self.bus)?;
        for (i, byte) in self.data().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        write!(f, "]")
    }
}
