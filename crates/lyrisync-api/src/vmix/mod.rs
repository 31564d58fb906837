// vMix HTTP function API
//
// Every control action is a GET on the configured API URL with a
// `Function=<name>` query plus function-specific parameters. A bare GET
// returns the XML state document.

mod client;
mod status;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::VmixClient;
pub use status::{VmixInput, VmixStatus};

// ── OverlayChannel ──────────────────────────────────────────────────

/// One of the four vMix overlay channels (1–4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OverlayChannel(u8);

/// Returned when a channel number falls outside 1–4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("overlay channel must be between 1 and 4, got {0}")]
pub struct InvalidOverlayChannel(pub u8);

impl OverlayChannel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(number: u8) -> Result<Self, InvalidOverlayChannel> {
        if (Self::MIN..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(InvalidOverlayChannel(number))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position, for indexing per-channel arrays.
    pub(crate) fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl Default for OverlayChannel {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for OverlayChannel {
    type Error = InvalidOverlayChannel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OverlayChannel> for u8 {
    fn from(channel: OverlayChannel) -> Self {
        channel.0
    }
}

impl fmt::Display for OverlayChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── OverlayAction ───────────────────────────────────────────────────

/// Overlay transition verb. `In`/`Out` animate, `On`/`Off` cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum OverlayAction {
    In,
    Out,
    On,
    Off,
}

impl OverlayAction {
    /// Whether the overlay is on air after this action succeeds.
    pub fn shows(self) -> bool {
        matches!(self, Self::In | Self::On)
    }

    /// vMix function name, e.g. `OverlayInput2In`.
    pub fn function_name(self, channel: OverlayChannel) -> String {
        format!("OverlayInput{channel}{self}")
    }
}
