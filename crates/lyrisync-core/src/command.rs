// ── Command vocabulary ──
//
// The only things the production tool is ever asked to do. Both the
// presentation path and the control API produce these through the
// policy planner; the engine executes them one at a time.

use lyrisync_api::{OverlayAction, OverlayChannel, VmixStatus};
use serde::Serialize;

/// One production-tool request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetText(String),
    OverlayIn(OverlayChannel),
    OverlayOut(OverlayChannel),
    OverlayOn(OverlayChannel),
    OverlayOff(OverlayChannel),
    StartRecording,
    StopRecording,
    QueryStatus,
}

impl Command {
    /// Channel and verb for the overlay variants.
    pub fn overlay(&self) -> Option<(OverlayChannel, OverlayAction)> {
        match *self {
            Self::OverlayIn(ch) => Some((ch, OverlayAction::In)),
            Self::OverlayOut(ch) => Some((ch, OverlayAction::Out)),
            Self::OverlayOn(ch) => Some((ch, OverlayAction::On)),
            Self::OverlayOff(ch) => Some((ch, OverlayAction::Off)),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetText(_) => "set_text",
            Self::OverlayIn(_) => "overlay_in",
            Self::OverlayOut(_) => "overlay_out",
            Self::OverlayOn(_) => "overlay_on",
            Self::OverlayOff(_) => "overlay_off",
            Self::StartRecording => "start_recording",
            Self::StopRecording => "stop_recording",
            Self::QueryStatus => "query_status",
        }
    }
}

/// What a successful command returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    Status(ProductionSnapshot),
}

/// The slice of production state the engine reconciles against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductionSnapshot {
    pub recording: bool,
    /// Overlay activity for channels 1–4.
    pub overlays: [bool; 4],
    /// Current value of the configured title field, if the input exists.
    pub title_text: Option<String>,
}

impl ProductionSnapshot {
    pub fn overlay_active(&self, channel: OverlayChannel) -> bool {
        self.overlays
            .get(usize::from(channel.get()) - 1)
            .copied()
            .unwrap_or(false)
    }

    pub(crate) fn from_vmix(status: &VmixStatus, title_input: &str, title_field: &str) -> Self {
        Self {
            recording: status.recording,
            overlays: status.overlays,
            title_text: status
                .title_text(title_input, title_field)
                .map(str::to_owned),
        }
    }
}
