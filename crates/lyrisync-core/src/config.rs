// ── Runtime engine configuration ──
//
// These types describe how the engine talks to both tools and which
// overlay policy it follows. They never touch disk: lyrisync-config
// validates the settings document and hands an `EngineConfig` in.

use std::time::Duration;

use lyrisync_api::{OverlayChannel, ReconnectConfig};
use url::Url;

/// Overlay and text policy flags. Read-only for the life of an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub overlay_channel: OverlayChannel,
    /// Bring the overlay in before pushing text when it is not visible.
    pub auto_overlay_on_send: bool,
    /// Keep the overlay on air permanently; takes precedence over the
    /// per-update show/hide flags.
    pub overlay_always_on: bool,
    pub auto_overlay_out_on_clear: bool,
    /// Clear the title when the presentation goes blank.
    pub clear_on_blank: bool,
    /// Inactivity period after which the title is cleared. `None` disables.
    pub idle_auto_clear: Option<Duration>,
    pub max_chars_per_line: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            overlay_channel: OverlayChannel::default(),
            auto_overlay_on_send: true,
            overlay_always_on: false,
            auto_overlay_out_on_clear: true,
            clear_on_blank: true,
            idle_auto_clear: None,
            max_chars_per_line: 48,
        }
    }
}

/// Everything needed to run one engine against one pair of tools.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// vMix API endpoint, e.g. `http://localhost:8088/api`.
    pub production_url: Url,
    /// OpenLP live socket, e.g. `ws://localhost:4317`.
    pub presentation_ws_url: Url,
    /// Input reference (key, number, title or short title) of the lyric title.
    pub title_input: String,
    /// Text field on that input, e.g. `Message.Text`.
    pub title_field: String,
    pub policy: Policy,
    /// Status poll period. `Duration::ZERO` disables polling.
    pub poll_interval: Duration,
    /// Upper bound for each production-tool request.
    pub request_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            production_url: Url::parse("http://localhost:8088/api")
                .unwrap_or_else(|_| unreachable!("static URL")),
            presentation_ws_url: Url::parse("ws://localhost:4317")
                .unwrap_or_else(|_| unreachable!("static URL")),
            title_input: "SongTitle".into(),
            title_field: "Message.Text".into(),
            policy: Policy::default(),
            poll_interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(3),
            reconnect: ReconnectConfig::default(),
        }
    }
}
