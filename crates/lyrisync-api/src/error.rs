use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `lyrisync-api` crate.
///
/// Covers every failure mode of both external tools: the vMix HTTP
/// function API and the OpenLP WebSocket. `lyrisync-core` maps these
/// into dispatch and connectivity errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The remote end could not be reached (connection refused, DNS failure, etc.)
    #[error("Cannot reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Any other HTTP transport error.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── vMix ────────────────────────────────────────────────────────
    /// vMix answered with a non-success status (unknown input, bad function, ...).
    #[error("vMix rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The XML state document could not be parsed.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// An established WebSocket failed while reading frames.
    #[error("WebSocket stream dropped: {0}")]
    WebSocketRead(String),
}

impl Error {
    /// Classify a `reqwest` failure into timeout / unreachable / other.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout }
        } else if err.is_connect() {
            Self::Unreachable {
                url: err
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: err.to_string(),
            }
        } else {
            Self::Transport(err)
        }
    }

    /// Returns `true` if the remote tool could not be talked to at all.
    ///
    /// A connectivity failure means later requests in the same batch
    /// would fail the same way.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::Unreachable { .. }
            | Self::WebSocketConnect(_)
            | Self::WebSocketRead(_) => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// The HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
