//! Acceleration command bounds.
//!
//! Outbound acceleration commands are refused, never clamped: a value
//! outside the envelope indicates a planner fault upstream, and silently
//! rounding it toward legal would hide that fault while still moving the
//! vehicle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default commanded-acceleration floor, m/s^2.
pub const MIN_ACCEL: f64 = -3.5;

/// Default commanded-acceleration ceiling, m/s^2.
pub const MAX_ACCEL: f64 = 2.0;

/// Errors from [`AccelLimits`] validation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[non_exhaustive]
pub enum AccelLimitsError {
    /// A bound is NaN or infinite.
    #[error("acceleration bound {value} must be finite")]
    NonFiniteBound {
        /// The rejected bound.
        value: f64,
    },

    /// The bounds do not bracket zero.
    #[error("acceleration limits [{min}, {max}] must satisfy min <= 0 <= max")]
    InvertedRange {
        /// The configured floor.
        min: f64,
        /// The configured ceiling.
        max: f64,
    },
}

/// Inclusive envelope for commanded acceleration, fixed at gate construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccelLimits {
    /// Most negative permitted command, m/s^2.
    pub min: f64,
    /// Most positive permitted command, m/s^2.
    pub max: f64,
}

impl AccelLimits {
    /// Builds an envelope from explicit bounds.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Checks that both bounds are finite and bracket zero.
    ///
    /// Zero must be inside the envelope: a disengaged system commands
    /// exactly zero, and that command must remain legal after engagement.
    pub fn validate(&self) -> Result<(), AccelLimitsError> {
        for value in [self.min, self.max] {
            if !value.is_finite() {
                return Err(AccelLimitsError::NonFiniteBound { value });
            }
        }
        if self.min > 0.0 || self.max < 0.0 {
            return Err(AccelLimitsError::InvertedRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Decides whether an acceleration command may be transmitted.
    ///
    /// While controls are allowed the envelope applies with inclusive
    /// bounds. While disallowed only an exact zero command passes; anything
    /// else is an actuation attempt without engagement. Non-finite values
    /// are refused in both states.
    #[must_use]
    pub fn permits(&self, controls_allowed: bool, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        if controls_allowed {
            self.min <= value && value <= self.max
        } else {
            // Exact comparison is the contract: 0.005 is not "inactive".
            #[allow(clippy::float_cmp)]
            {
                value == 0.0
            }
        }
    }
}

impl Default for AccelLimits {
    fn default() -> Self {
        Self::new(MIN_ACCEL, MAX_ACCEL)
    }
}
