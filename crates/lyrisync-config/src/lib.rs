//! Settings for the LyriSync service.
//!
//! One flat TOML document, layered under environment overrides, and its
//! translation into `lyrisync_core::EngineConfig`. Only the binary
//! depends on this crate; the engine never reads files.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use lyrisync_core::{EngineConfig, OverlayChannel, Policy, ReconnectConfig};

/// Prefix for environment overrides, e.g. `LYRISYNC_CONTROL_API_PORT=5050`.
pub const ENV_PREFIX: &str = "LYRISYNC_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("settings loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Settings document ───────────────────────────────────────────────

/// The settings document. Every key is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// vMix web API endpoint.
    pub production_url: String,
    /// OpenLP live WebSocket endpoint.
    pub presentation_ws_url: String,
    pub control_api_port: u16,
    pub control_api_bind: String,
    /// vMix input holding the lyric title (key, number, title or short title).
    pub title_input_id: String,
    pub title_field_name: String,
    /// 1–4.
    pub overlay_channel: u8,
    pub auto_overlay_on_send: bool,
    pub overlay_always_on: bool,
    pub auto_overlay_out_on_clear: bool,
    /// 0 disables.
    pub idle_auto_clear_secs: u64,
    pub max_chars_per_line: usize,
    pub clear_on_blank: bool,
    /// 0 disables.
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub reconnect_initial_secs: u64,
    pub reconnect_max_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            production_url: "http://localhost:8088/api".into(),
            presentation_ws_url: "ws://localhost:4317".into(),
            control_api_port: 5000,
            control_api_bind: "0.0.0.0".into(),
            title_input_id: "SongTitle".into(),
            title_field_name: "Message.Text".into(),
            overlay_channel: 1,
            auto_overlay_on_send: true,
            overlay_always_on: false,
            auto_overlay_out_on_clear: true,
            idle_auto_clear_secs: 0,
            max_chars_per_line: 48,
            clear_on_blank: true,
            poll_interval_secs: 2,
            request_timeout_secs: 3,
            reconnect_initial_secs: 1,
            reconnect_max_secs: 20,
        }
    }
}

impl Settings {
    /// Validate and translate into the engine's runtime configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let production_url = parse_url("production_url", &self.production_url, &["http", "https"])?;
        let presentation_ws_url =
            parse_url("presentation_ws_url", &self.presentation_ws_url, &["ws", "wss"])?;

        if self.title_input_id.trim().is_empty() {
            return Err(invalid("title_input_id", "must not be empty"));
        }
        if self.title_field_name.trim().is_empty() {
            return Err(invalid("title_field_name", "must not be empty"));
        }

        let overlay_channel = OverlayChannel::new(self.overlay_channel)
            .map_err(|e| invalid("overlay_channel", e.to_string()))?;

        if self.max_chars_per_line == 0 {
            return Err(invalid("max_chars_per_line", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        if self.reconnect_initial_secs == 0 {
            return Err(invalid("reconnect_initial_secs", "must be at least 1"));
        }
        if self.reconnect_max_secs < self.reconnect_initial_secs {
            return Err(invalid(
                "reconnect_max_secs",
                format!(
                    "must be at least reconnect_initial_secs ({})",
                    self.reconnect_initial_secs
                ),
            ));
        }

        let policy = Policy {
            overlay_channel,
            auto_overlay_on_send: self.auto_overlay_on_send,
            overlay_always_on: self.overlay_always_on,
            auto_overlay_out_on_clear: self.auto_overlay_out_on_clear,
            clear_on_blank: self.clear_on_blank,
            idle_auto_clear: (self.idle_auto_clear_secs > 0)
                .then(|| Duration::from_secs(self.idle_auto_clear_secs)),
            max_chars_per_line: self.max_chars_per_line,
        };

        Ok(EngineConfig {
            production_url,
            presentation_ws_url,
            title_input: self.title_input_id.trim().to_owned(),
            title_field: self.title_field_name.trim().to_owned(),
            policy,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_secs(self.reconnect_initial_secs),
                max_delay: Duration::from_secs(self.reconnect_max_secs),
            },
        })
    }

    /// Socket address the control API binds to.
    pub fn control_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.control_api_bind.trim().parse().map_err(|_| {
            invalid(
                "control_api_bind",
                format!("not an IP address: {}", self.control_api_bind),
            )
        })?;
        Ok(SocketAddr::new(ip, self.control_api_port))
    }

    /// Run every validation without keeping the result.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_engine_config()?;
        self.control_addr()?;
        Ok(())
    }
}

fn parse_url(field: &str, raw: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| invalid(field, format!("{e}: {raw}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(
            field,
            format!("scheme must be one of {}, got {}", schemes.join("/"), url.scheme()),
        ));
    }
    Ok(url)
}

// ── Settings file path ──────────────────────────────────────────────

/// Resolve the settings file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "lyrisync", "lyrisync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("lyrisync");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Defaults, then the TOML file at `path` (if present), then `LYRISYNC_*`.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config", "log"]))
}

/// Load settings layered from `path` and the environment.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    Ok(figment(path).extract()?)
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize settings to pretty TOML at `path`, creating parent directories.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let toml_str = toml::to_string_pretty(settings)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Write a default settings file, refusing to overwrite unless `force`.
pub fn init_settings(path: &Path, force: bool) -> Result<Settings, ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    let settings = Settings::default();
    save_settings(&settings, path)?;
    Ok(settings)
}
