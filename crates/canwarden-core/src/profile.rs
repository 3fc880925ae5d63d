//! Per-variant vehicle profile: stream addresses, signal layouts, policy.
//!
//! A profile is everything about one vehicle variant that the gate needs to
//! decide: where the three safety signals live on the bus, how their bits
//! are laid out, which enable policy the variant uses, and the identity of
//! a knocked-out ECU if the variant has one.
//!
//! Profiles load from TOML and are validated fail-closed: a profile that
//! parses but names overlapping streams, out-of-range fields, or degenerate
//! limits is refused before a gate is ever built from it. Parsing happens at
//! initialization only; the message path sees an immutable, pre-validated
//! profile.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accel::{AccelLimits, AccelLimitsError};
use crate::frame::{BusAddress, FrameError};
use crate::knockout::{DisabledEcuError, DisabledEcuIdentity};
use crate::signal::{CodeField, FieldError, FlagField, LinearField};

/// How a variant's controls-allowed state may engage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnablePolicy {
    /// Engage on a cruise-status rising edge backed by a recent button
    /// interaction. The stock cruise controller is the authority.
    CruiseStatus,
    /// Engage on the falling edge of a resume or set press. Used when the
    /// gated system itself runs longitudinal control.
    ButtonEdge,
}

/// Button-state stream and signal layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonsConfig {
    /// Stream the vehicle publishes button state on.
    pub rx: BusAddress,
    /// Bus outbound button frames are transmitted on. Shares the receive
    /// identifier; some harnesses forward on a different bus.
    pub tx_bus: u8,
    /// Stalk button code field.
    pub code: CodeField,
    /// Main cruise toggle flag.
    pub main: FlagField,
}

impl ButtonsConfig {
    /// The stream outbound button frames occupy.
    #[must_use]
    pub const fn tx_stream(&self) -> BusAddress {
        BusAddress::new(self.rx.addr, self.tx_bus)
    }
}

/// Cruise-status stream and signal layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CruiseConfig {
    /// Stream the cruise controller reports status on.
    pub rx: BusAddress,
    /// Engagement flag.
    pub engaged: FlagField,
}

/// Acceleration-command stream, signal layout, and envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccelConfig {
    /// Stream outbound acceleration commands occupy.
    pub tx: BusAddress,
    /// Commanded-acceleration value field.
    pub value: LinearField,
    /// Permitted command envelope.
    #[serde(default)]
    pub limits: AccelLimits,
}

/// Errors from profile loading and validation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileError {
    /// The profile file could not be read.
    #[error("failed to read profile at {path}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The profile is not valid TOML for this schema.
    #[error("failed to parse profile")]
    Parse(#[from] toml::de::Error),

    /// A signal field layout is invalid.
    #[error("invalid layout for the {field} field")]
    Field {
        /// Dotted name of the offending field.
        field: &'static str,
        /// Underlying layout defect.
        #[source]
        source: FieldError,
    },

    /// A stream address is invalid.
    #[error("invalid address for the {stream} stream")]
    Stream {
        /// Dotted name of the offending stream.
        stream: &'static str,
        /// Underlying address defect.
        #[source]
        source: FrameError,
    },

    /// The acceleration envelope is degenerate.
    #[error("invalid acceleration limits")]
    AccelLimits(#[from] AccelLimitsError),

    /// The disabled-ECU identity is degenerate.
    #[error("invalid disabled-ecu identity")]
    DisabledEcu(#[from] DisabledEcuError),

    /// Two same-direction streams share an address, which would make
    /// classification ambiguous.
    #[error("{first} and {second} streams collide at {address}")]
    StreamCollision {
        /// First colliding stream.
        first: &'static str,
        /// Second colliding stream.
        second: &'static str,
        /// The shared address.
        address: BusAddress,
    },
}

/// Complete gating configuration for one vehicle variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleProfile {
    /// Enable policy this variant uses.
    pub policy: EnablePolicy,
    /// Button stream and layout.
    pub buttons: ButtonsConfig,
    /// Cruise-status stream and layout.
    pub cruise: CruiseConfig,
    /// Acceleration-command stream, layout, and envelope.
    pub accel: AccelConfig,
    /// Knocked-out ECU identity, for variants that silence one.
    #[serde(default)]
    pub disabled_ecu: Option<DisabledEcuIdentity>,
}

impl VehicleProfile {
    /// Parses and validates a profile from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML does not match the schema or the parsed
    /// profile fails [`VehicleProfile::validate`].
    pub fn from_toml(content: &str) -> Result<Self, ProfileError> {
        let profile: Self = toml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reads, parses, and validates a profile file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content fails
    /// [`VehicleProfile::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Validates every address, layout, and cross-stream constraint.
    ///
    /// Streams in the same direction must be pairwise distinct so every
    /// frame classifies as exactly one kind. A receive stream may share an
    /// address with a transmit stream; the two directions never compete.
    ///
    /// # Errors
    ///
    /// Returns the first defect found; a profile with any defect must not
    /// reach a gate.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let stream = |stream, source| ProfileError::Stream { stream, source };
        self.buttons
            .rx
            .validate()
            .map_err(|e| stream("buttons.rx", e))?;
        self.buttons
            .tx_stream()
            .validate()
            .map_err(|e| stream("buttons.tx", e))?;
        self.cruise
            .rx
            .validate()
            .map_err(|e| stream("cruise.rx", e))?;
        self.accel.tx.validate().map_err(|e| stream("accel.tx", e))?;

        let field = |field, source| ProfileError::Field { field, source };
        self.buttons
            .code
            .validate()
            .map_err(|e| field("buttons.code", e))?;
        self.buttons
            .main
            .validate()
            .map_err(|e| field("buttons.main", e))?;
        self.cruise
            .engaged
            .validate()
            .map_err(|e| field("cruise.engaged", e))?;
        self.accel
            .value
            .validate()
            .map_err(|e| field("accel.value", e))?;

        self.accel.limits.validate()?;

        let mut rx = vec![("buttons.rx", self.buttons.rx), ("cruise.rx", self.cruise.rx)];
        let mut tx = vec![
            ("buttons.tx", self.buttons.tx_stream()),
            ("accel.tx", self.accel.tx),
        ];
        if let Some(ecu) = &self.disabled_ecu {
            ecu.validate()?;
            rx.push(("disabled_ecu.actuation", ecu.actuation));
            tx.push(("disabled_ecu.diag", ecu.diag));
        }
        ensure_distinct(&rx)?;
        ensure_distinct(&tx)?;
        Ok(())
    }
}

fn ensure_distinct(streams: &[(&'static str, BusAddress)]) -> Result<(), ProfileError> {
    for (i, (first, a)) in streams.iter().enumerate() {
        for (second, b) in &streams[i + 1..] {
            if a == b {
                return Err(ProfileError::StreamCollision {
                    first,
                    second,
                    address: *a,
                });
            }
        }
    }
    Ok(())
}
