// ── Engine state ──
//
// The single shared record owned by the sync engine. Readers only ever
// see published clones of it.

use chrono::{DateTime, Utc};
use lyrisync_api::ListenerState;
use serde::Serialize;

use crate::error::{CoreError, ErrorKind};

/// Reachability of the production tool, as last observed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProductionHealth {
    #[default]
    Unknown,
    Reachable,
    Unreachable,
}

/// A failure captured for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedError {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl RecordedError {
    pub fn new(error: &CoreError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            at: Utc::now(),
        }
    }
}

/// Current sync state.
///
/// `overlay_visible` is true only after a successful overlay in/on and
/// before any out/off or a lost production link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineState {
    /// Text last pushed to the title, formatted. Empty after a clear.
    pub current_text: String,
    /// Most recent non-empty lyric pushed, kept across clears.
    pub last_lyric: Option<String>,
    pub overlay_visible: bool,
    pub recording: bool,
    pub last_update: Option<DateTime<Utc>>,
    /// Presentation socket state.
    pub connection_status: ListenerState,
    pub production_status: ProductionHealth,
    /// Title text the production tool itself reports, as of the last status query.
    pub production_title: Option<String>,
    /// Whether the most recent presentation event was a blank slide.
    pub slide_blank: bool,
    pub last_error: Option<RecordedError>,
}
