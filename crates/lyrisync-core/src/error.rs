// ── Core error types ──
//
// Consumers never see reqwest or XML failures directly. The
// `From<lyrisync_api::Error>` impl folds transport errors into the four
// dispatch outcomes the engine reasons about.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Failure of a single production-tool command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Production tool unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Production tool rejected the command (HTTP {code}): {message}")]
    Rejected { code: u16, message: String },

    #[error("Production tool timed out after {}s", timeout.as_secs_f32())]
    Timeout { timeout: Duration },

    #[error("Invalid response from production tool: {message}")]
    InvalidResponse { message: String },
}

impl DispatchError {
    /// Connectivity failures abort the rest of a plan; later commands
    /// would hit the same wall.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}

impl From<lyrisync_api::Error> for DispatchError {
    fn from(err: lyrisync_api::Error) -> Self {
        match err {
            lyrisync_api::Error::Timeout { timeout } => Self::Timeout { timeout },
            lyrisync_api::Error::Unreachable { url, reason } => Self::Unreachable {
                reason: format!("{url}: {reason}"),
            },
            lyrisync_api::Error::Rejected { status, message } => Self::Rejected {
                code: status,
                message,
            },
            lyrisync_api::Error::Deserialization { message, body: _ } => {
                Self::InvalidResponse { message }
            }
            lyrisync_api::Error::Transport(e) => Self::Unreachable {
                reason: e.to_string(),
            },
            lyrisync_api::Error::InvalidUrl(e) => Self::Unreachable {
                reason: format!("invalid URL: {e}"),
            },
            lyrisync_api::Error::WebSocketConnect(reason)
            | lyrisync_api::Error::WebSocketRead(reason) => Self::Unreachable { reason },
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Malformed or unusable input from a caller; state is untouched.
    #[error("Invalid request: {message}")]
    Request { message: String },

    /// Presentation link lost. The listener reconnects on its own.
    #[error("Presentation tool connection lost: {reason}")]
    Connectivity { reason: String },

    #[error("Sync engine is shutting down")]
    ShuttingDown,
}

impl CoreError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Dispatch(DispatchError::Unreachable { .. }) => ErrorKind::DispatchUnreachable,
            Self::Dispatch(DispatchError::Rejected { .. }) => ErrorKind::DispatchRejected,
            Self::Dispatch(DispatchError::Timeout { .. }) => ErrorKind::DispatchTimeout,
            Self::Dispatch(DispatchError::InvalidResponse { .. }) => {
                ErrorKind::DispatchInvalidResponse
            }
            Self::Request { .. } => ErrorKind::Request,
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            Self::ShuttingDown => ErrorKind::ShuttingDown,
        }
    }
}

/// Stable machine-readable error category, as reported over the control API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    DispatchUnreachable,
    DispatchRejected,
    DispatchTimeout,
    DispatchInvalidResponse,
    Request,
    Connectivity,
    ShuttingDown,
}

impl ErrorKind {
    /// Failure of a production-tool command.
    pub fn is_dispatch(self) -> bool {
        matches!(
            self,
            Self::DispatchUnreachable
                | Self::DispatchRejected
                | Self::DispatchTimeout
                | Self::DispatchInvalidResponse
        )
    }
}
