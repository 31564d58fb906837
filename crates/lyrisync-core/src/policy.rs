// ── Policy planner ──
//
// Pure mapping from (trigger, policy, current state) to the ordered list
// of production commands. No I/O, no clocks: the engine executes what
// this returns.

use lyrisync_api::LyricEvent;

use crate::command::Command;
use crate::config::Policy;
use crate::format::wrap;
use crate::state::EngineState;

/// Anything that can cause the engine to talk to the production tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Slide change from the presentation listener.
    Presentation(LyricEvent),
    /// Explicit show from the control API, raw (unformatted) text.
    Show(String),
    /// Explicit clear from the control API.
    Clear,
    /// Idle timer expiry.
    IdleClear,
    ToggleOverlay,
    StartRecording,
    StopRecording,
    QueryStatus,
    /// Put an always-on overlay on air if it is not known to be.
    EnsureOverlay,
}

impl Trigger {
    /// Whether a clean run replaces a recorded dispatch error. Status
    /// polls and overlay maintenance run in the background and do not.
    pub fn supersedes_error(&self) -> bool {
        !matches!(self, Self::QueryStatus | Self::EnsureOverlay)
    }
}

/// Compute the commands for one trigger.
///
/// With `overlay_always_on` the overlay is only ever cut on (never hidden
/// by show/clear logic); otherwise `auto_overlay_on_send` brings it in
/// ahead of the text and `auto_overlay_out_on_clear` takes it out after.
pub fn plan(trigger: &Trigger, policy: &Policy, state: &EngineState) -> Vec<Command> {
    match trigger {
        Trigger::Presentation(LyricEvent::Text(text)) | Trigger::Show(text) => {
            plan_show(text, policy, state)
        }
        Trigger::Presentation(LyricEvent::Blank) => {
            if policy.clear_on_blank {
                plan_clear(policy)
            } else {
                Vec::new()
            }
        }
        Trigger::Clear | Trigger::IdleClear => plan_clear(policy),
        Trigger::ToggleOverlay => vec![plan_toggle(policy, state)],
        Trigger::StartRecording => vec![Command::StartRecording],
        Trigger::StopRecording => vec![Command::StopRecording],
        Trigger::QueryStatus => vec![Command::QueryStatus],
        Trigger::EnsureOverlay => {
            if policy.overlay_always_on && !state.overlay_visible {
                vec![Command::OverlayOn(policy.overlay_channel)]
            } else {
                Vec::new()
            }
        }
    }
}

fn plan_show(text: &str, policy: &Policy, state: &EngineState) -> Vec<Command> {
    let formatted = wrap(text, policy.max_chars_per_line);
    let channel = policy.overlay_channel;

    let overlay = if state.overlay_visible {
        None
    } else if policy.overlay_always_on {
        Some(Command::OverlayOn(channel))
    } else if policy.auto_overlay_on_send {
        Some(Command::OverlayIn(channel))
    } else {
        None
    };

    overlay
        .into_iter()
        .chain(std::iter::once(Command::SetText(formatted)))
        .collect()
}

fn plan_clear(policy: &Policy) -> Vec<Command> {
    let mut commands = vec![Command::SetText(String::new())];
    if policy.auto_overlay_out_on_clear && !policy.overlay_always_on {
        commands.push(Command::OverlayOut(policy.overlay_channel));
    }
    commands
}

fn plan_toggle(policy: &Policy, state: &EngineState) -> Command {
    let channel = policy.overlay_channel;
    match (state.overlay_visible, policy.overlay_always_on) {
        (true, false) => Command::OverlayOut(channel),
        (true, true) => Command::OverlayOff(channel),
        (false, false) => Command::OverlayIn(channel),
        (false, true) => Command::OverlayOn(channel),
    }
}
