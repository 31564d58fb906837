// Control API errors and their HTTP mapping.

use std::net::SocketAddr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lyrisync_core::{CoreError, EngineState, ErrorKind};
use serde::Serialize;
use thiserror::Error;

/// Server lifecycle failures.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("cannot bind control API to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("control API server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// A failed request, rendered as `{"success": false, "error", "kind", "state"?}`.
#[derive(Debug)]
pub struct ApiError {
    error: CoreError,
    state: Option<EngineState>,
}

impl ApiError {
    pub fn new(error: CoreError, state: Option<EngineState>) -> Self {
        Self { error, state }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::new(CoreError::request(message), None)
    }

    pub fn status_code(&self) -> StatusCode {
        match self.error.kind() {
            ErrorKind::Request => StatusCode::BAD_REQUEST,
            ErrorKind::DispatchTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::DispatchUnreachable
            | ErrorKind::DispatchRejected
            | ErrorKind::DispatchInvalidResponse
            | ErrorKind::Connectivity => StatusCode::BAD_GATEWAY,
            ErrorKind::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: String,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a EngineState>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.error.to_string(),
            kind: self.error.kind(),
            state: self.state.as_ref(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
