//! CLI error types with miette diagnostics.
//!
//! Only startup failures end the process. Dispatch failures at runtime are
//! recorded in engine state instead.

use std::net::SocketAddr;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use lyrisync_config::ConfigError;
use lyrisync_control::ControlError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid setting {field}: {reason}")]
    #[diagnostic(
        code(lyrisync::invalid_setting),
        help(
            "Fix `{field}` in the settings file or the LYRISYNC_{env} environment variable.\n\
             Run: lyrisync config check"
        )
    )]
    InvalidSetting {
        field: String,
        env: String,
        reason: String,
    },

    #[error("Could not load settings")]
    #[diagnostic(
        code(lyrisync::config),
        help("Check the TOML syntax and value types. Run: lyrisync config path")
    )]
    Config(#[source] Box<ConfigError>),

    #[error("Settings file already exists at {}", path.display())]
    #[diagnostic(
        code(lyrisync::config_exists),
        help("Use --force to overwrite it with defaults.")
    )]
    ConfigExists { path: PathBuf },

    // ── Startup ──────────────────────────────────────────────────────

    #[error("Could not bind the control API to {addr}")]
    #[diagnostic(
        code(lyrisync::bind_failed),
        help(
            "Another process may already be using this port.\n\
             Choose another with --port or control_api_port."
        )
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not open log file {}: {reason}", path.display())]
    #[diagnostic(code(lyrisync::log_file))]
    LogFile { path: PathBuf, reason: String },

    // ── Runtime ──────────────────────────────────────────────────────

    #[error("Control API server stopped: {message}")]
    #[diagnostic(code(lyrisync::server))]
    Server { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidSetting { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Bind { .. } => exit_code::CONNECTION,
            Self::ConfigExists { .. }
            | Self::LogFile { .. }
            | Self::Server { .. }
            | Self::Io(_) => exit_code::GENERAL,
        }
    }

    pub fn invalid_setting(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field: field.to_owned(),
            env: field.to_ascii_uppercase(),
            reason: reason.into(),
        }
    }
}

// ── Library errors → CliError ────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::invalid_setting(&field, reason),
            ConfigError::AlreadyExists { path } => Self::ConfigExists { path },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl From<ControlError> for CliError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Bind { addr, source } => Self::Bind { addr, source },
            ControlError::Serve(e) => Self::Server {
                message: e.to_string(),
            },
        }
    }
}
