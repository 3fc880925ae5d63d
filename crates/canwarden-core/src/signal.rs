//! Little-endian bit-addressed signal extraction.
//!
//! Frame layouts are described by `(start_bit, width)` pairs in Intel bit
//! order: bit 0 is the least significant bit of payload byte 0, bit 8 the
//! least significant bit of byte 1, and multi-bit fields occupy ascending
//! bit positions.
//!
//! ```text
//!   payload byte 0        payload byte 1
//!   [ 7 6 5 4 3 2 1 0 ] [ 15 14 13 12 11 10 9 8 ] ...
//! ```
//!
//! A field at `start_bit = 6, width = 4` therefore reads bits 6..=9: the top
//! two bits of byte 0 followed by the bottom two bits of byte 1.
//!
//! # Invariants
//!
//! - Reads that run past the received payload yield `None`, never a
//!   zero-filled value. A short frame cannot fake a cleared flag.
//! - Field descriptors are validated once, at profile load. Runtime reads
//!   only re-check what depends on the frame itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::MAX_FRAME_PAYLOAD;

/// Widest code field accepted by [`CodeField::validate`], in bits.
///
/// Code fields carry small discriminants (button identifiers, state
/// enumerations). Wide numeric quantities belong in a [`LinearField`].
pub const MAX_CODE_WIDTH: u8 = 8;

/// Total bit capacity of a classic CAN frame.
const FRAME_BITS: u32 = (MAX_FRAME_PAYLOAD as u32) * 8;

/// Errors from field descriptor validation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[non_exhaustive]
pub enum FieldError {
    /// The field has no bits.
    #[error("field width must be at least one bit")]
    ZeroWidth,

    /// The field is wider than its kind allows.
    #[error("field width {width} exceeds the {max}-bit limit")]
    WidthTooLarge {
        /// The rejected width.
        width: u8,
        /// The widest width this field kind accepts.
        max: u8,
    },

    /// The field runs past the end of a classic 8-byte frame.
    #[error("field at bit {start_bit} with width {width} runs past the frame")]
    SpanOutOfFrame {
        /// The field's start bit.
        start_bit: u16,
        /// The field's width.
        width: u8,
    },

    /// A linear field's scale is zero or not finite.
    #[error("scale {scale} must be finite and non-zero")]
    InvalidScale {
        /// The rejected scale.
        scale: f64,
    },

    /// A linear field's offset is not finite.
    #[error("offset {offset} must be finite")]
    NonFiniteOffset {
        /// The rejected offset.
        offset: f64,
    },
}

/// Extracts `width` bits starting at `start_bit` from a payload.
///
/// Returns `None` when the field is degenerate or extends past the received
/// bytes.
fn extract(data: &[u8], start_bit: u16, width: u8) -> Option<u64> {
    if width == 0 {
        return None;
    }
    let start = u32::from(start_bit);
    let end = start.checked_add(u32::from(width))?;
    // Truncation on an oversized slice only shrinks the bound, which denies.
    #[allow(clippy::cast_possible_truncation)]
    let available = (data.len() as u32) * 8;
    if end > available.min(FRAME_BITS) {
        return None;
    }

    let mut word = 0u64;
    for (i, byte) in data.iter().take(MAX_FRAME_PAYLOAD).enumerate() {
        word |= u64::from(*byte) << (8 * i);
    }
    let mask = if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    Some((word >> start) & mask)
}

fn check_span(start_bit: u16, width: u8) -> Result<(), FieldError> {
    if width == 0 {
        return Err(FieldError::ZeroWidth);
    }
    if u32::from(start_bit) + u32::from(width) > FRAME_BITS {
        return Err(FieldError::SpanOutOfFrame { start_bit, width });
    }
    Ok(())
}

/// A single-bit boolean signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagField {
    /// Bit position in Intel order.
    pub start_bit: u16,
}

impl FlagField {
    /// Builds a flag descriptor at the given bit position.
    #[must_use]
    pub const fn new(start_bit: u16) -> Self {
        Self { start_bit }
    }

    /// Checks that the flag lies within a classic frame.
    pub fn validate(&self) -> Result<(), FieldError> {
        check_span(self.start_bit, 1)
    }

    /// Reads the flag, or `None` if the payload does not reach it.
    #[must_use]
    pub fn read(&self, data: &[u8]) -> Option<bool> {
        extract(data, self.start_bit, 1).map(|raw| raw != 0)
    }
}

/// A small multi-bit discriminant, at most [`MAX_CODE_WIDTH`] bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeField {
    /// Start bit position in Intel order.
    pub start_bit: u16,
    /// Field width in bits.
    pub width: u8,
}

impl CodeField {
    /// Builds a code descriptor from a start bit and width.
    #[must_use]
    pub const fn new(start_bit: u16, width: u8) -> Self {
        Self { start_bit, width }
    }

    /// Checks width and span bounds.
    pub fn validate(&self) -> Result<(), FieldError> {
        check_span(self.start_bit, self.width)?;
        if self.width > MAX_CODE_WIDTH {
            return Err(FieldError::WidthTooLarge {
                width: self.width,
                max: MAX_CODE_WIDTH,
            });
        }
        Ok(())
    }

    /// Reads the raw code, or `None` if the payload does not reach it.
    #[must_use]
    pub fn read(&self, data: &[u8]) -> Option<u8> {
        let raw = extract(data, self.start_bit, self.width)?;
        u8::try_from(raw).ok()
    }
}

/// A scaled physical quantity: `value = raw * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearField {
    /// Start bit position in Intel order.
    pub start_bit: u16,
    /// Field width in bits.
    pub width: u8,
    /// Multiplier applied to the raw value.
    pub scale: f64,
    /// Offset added after scaling.
    pub offset: f64,
}

impl LinearField {
    /// Builds a linear descriptor from a layout and transfer function.
    #[must_use]
    pub const fn new(start_bit: u16, width: u8, scale: f64, offset: f64) -> Self {
        Self {
            start_bit,
            width,
            scale,
            offset,
        }
    }

    /// Checks span bounds and that the transfer function is well formed.
    pub fn validate(&self) -> Result<(), FieldError> {
        check_span(self.start_bit, self.width)?;
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(FieldError::InvalidScale { scale: self.scale });
        }
        if !self.offset.is_finite() {
            return Err(FieldError::NonFiniteOffset {
                offset: self.offset,
            });
        }
        Ok(())
    }

    /// Reads the physical value, or `None` if the payload does not reach it.
    #[must_use]
    pub fn read(&self, data: &[u8]) -> Option<f64> {
        let raw = extract(data, self.start_bit, self.width)?;
        // Precision loss above 2^53 is acceptable: validated fields are at
        // most 64 bits and practical signals far narrower.
        #[allow(clippy::cast_precision_loss)]
        Some((raw as f64) * self.scale + self.offset)
    }
}
