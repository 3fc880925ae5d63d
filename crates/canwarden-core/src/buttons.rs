//! Cruise button decoding and the bounded press-history window.
//!
//! Button-state messages arrive continuously while the vehicle is awake; the
//! gate keeps only the most recent [`PREV_BUTTON_SAMPLES`] of them in a
//! fixed ring. Eight samples is roughly 160 ms at a 50 Hz button-status
//! rate, which is the freshness bound a cruise-engagement edge must meet to
//! count as driver-sanctioned.
//!
//! # Invariants
//!
//! - The window holds exactly [`PREV_BUTTON_SAMPLES`] samples; the ninth
//!   insert evicts the oldest. An off-by-one here changes whether controls
//!   may legally engage.
//! - The window only answers queries; it never mutates gate state itself.

use serde::{Deserialize, Serialize};

/// Number of button samples retained for the engagement freshness check.
pub const PREV_BUTTON_SAMPLES: usize = 8;

/// A decoded cruise button code.
///
/// The named codes are the only ones that participate in gating decisions.
/// Every other raw value is retained as [`ButtonCode::Unknown`] so decisions
/// about unrecognized codes stay explicit instead of aliasing onto a named
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonCode {
    /// No button pressed.
    None,
    /// Resume/accel stalk position.
    Resume,
    /// Set/decel stalk position.
    Set,
    /// Cancel stalk position.
    Cancel,
    /// Any raw code outside the named set.
    Unknown(u8),
}

impl ButtonCode {
    /// Maps a raw wire code onto a button code.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Resume,
            2 => Self::Set,
            4 => Self::Cancel,
            other => Self::Unknown(other),
        }
    }

    /// Whether a press of this button counts as a driver cruise interaction.
    ///
    /// Cancel is included: the driver touching any cruise control within the
    /// window is what sanctions an engagement edge, even though a cancel
    /// press on its own disengages.
    #[must_use]
    pub const fn is_enable_button(self) -> bool {
        matches!(self, Self::Resume | Self::Set | Self::Cancel)
    }
}

/// One decoded button-state observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonSample {
    /// The stalk button code.
    pub code: ButtonCode,
    /// The main cruise toggle flag.
    pub main: bool,
}

impl ButtonSample {
    /// Builds a sample from a code and the main-toggle flag.
    #[must_use]
    pub const fn new(code: ButtonCode, main: bool) -> Self {
        Self { code, main }
    }

    const IDLE: Self = Self::new(ButtonCode::None, false);
}

/// Fixed ring of the last [`PREV_BUTTON_SAMPLES`] button observations.
///
/// Array plus cursor; no allocation on push. A fresh window reads as all
/// idle, which answers every query with "no recent interaction".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonWindow {
    samples: [ButtonSample; PREV_BUTTON_SAMPLES],
    cursor: usize,
}

impl ButtonWindow {
    /// Creates an all-idle window.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: [ButtonSample::IDLE; PREV_BUTTON_SAMPLES],
            cursor: 0,
        }
    }

    /// Records a sample, evicting the oldest once the window is full.
    pub fn push(&mut self, sample: ButtonSample) {
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % PREV_BUTTON_SAMPLES;
    }

    /// The most recently recorded sample.
    #[must_use]
    pub fn latest(&self) -> ButtonSample {
        self.samples[(self.cursor + PREV_BUTTON_SAMPLES - 1) % PREV_BUTTON_SAMPLES]
    }

    /// Whether any enable button press is still inside the window.
    #[must_use]
    pub fn recent_enable_button(&self) -> bool {
        self.samples.iter().any(|s| s.code.is_enable_button())
    }

    /// Whether the main cruise toggle is set on the latest sample.
    ///
    /// Deliberately not windowed: the toggle is level state, not a press.
    #[must_use]
    pub fn main_button_set(&self) -> bool {
        self.latest().main
    }
}

impl Default for ButtonWindow {
    fn default() -> Self {
        Self::new()
    }
}
