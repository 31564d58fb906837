// Router and handlers.
//
// Every handler funnels into one `SyncEngine` operation so control
// requests follow the same policy and ordering as presentation events.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lyrisync_core::{CoreError, EngineState, ProductionTool, SyncEngine};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// Build the control API router around `engine`.
pub fn router<P: ProductionTool>(engine: SyncEngine<P>) -> Router {
    Router::new()
        .route("/api/show_lyrics", post(show_lyrics::<P>))
        .route("/api/clear_lyrics", post(clear_lyrics::<P>))
        .route("/api/toggle_overlay", post(toggle_overlay::<P>))
        .route("/api/start_recording", post(start_recording::<P>))
        .route("/api/stop_recording", post(stop_recording::<P>))
        .route("/api/status", get(status::<P>))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

// ── Bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ShowRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct Success {
    success: bool,
    state: EngineState,
}

fn ok(state: EngineState) -> Response {
    Json(Success {
        success: true,
        state,
    })
    .into_response()
}

/// Attach the current snapshot to engine-side failures.
fn respond<P: ProductionTool>(
    engine: &SyncEngine<P>,
    result: Result<EngineState, CoreError>,
) -> Result<Response, ApiError> {
    match result {
        Ok(state) => Ok(ok(state)),
        Err(e @ CoreError::Request { .. }) => Err(ApiError::new(e, None)),
        Err(e) => Err(ApiError::new(e, Some(engine.status()))),
    }
}

// ── Handlers ────────────────────────────────────────────────────────

/// Body is optional: no body, `{}` or `{"text": null}` re-shows the last lyric.
async fn show_lyrics<P: ProductionTool>(
    State(engine): State<SyncEngine<P>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ShowRequest::default()
    } else {
        serde_json::from_slice::<ShowRequest>(&body)
            .map_err(|e| ApiError::request(format!("malformed JSON body: {e}")))?
    };
    let result = engine.show_lyrics(request.text).await;
    respond(&engine, result)
}

async fn clear_lyrics<P: ProductionTool>(
    State(engine): State<SyncEngine<P>>,
) -> Result<Response, ApiError> {
    let result = engine.clear_lyrics().await;
    respond(&engine, result)
}

async fn toggle_overlay<P: ProductionTool>(
    State(engine): State<SyncEngine<P>>,
) -> Result<Response, ApiError> {
    let result = engine.toggle_overlay().await;
    respond(&engine, result)
}

async fn start_recording<P: ProductionTool>(
    State(engine): State<SyncEngine<P>>,
) -> Result<Response, ApiError> {
    let result = engine.start_recording().await;
    respond(&engine, result)
}

async fn stop_recording<P: ProductionTool>(
    State(engine): State<SyncEngine<P>>,
) -> Result<Response, ApiError> {
    let result = engine.stop_recording().await;
    respond(&engine, result)
}

/// Published snapshot; never waits on an in-flight dispatch.
async fn status<P: ProductionTool>(State(engine): State<SyncEngine<P>>) -> Response {
    ok(engine.status())
}

async fn not_found() -> Response {
    with_status(ApiError::request("unknown endpoint"), StatusCode::NOT_FOUND)
}

async fn method_not_allowed() -> Response {
    with_status(
        ApiError::request("method not allowed"),
        StatusCode::METHOD_NOT_ALLOWED,
    )
}

fn with_status(error: ApiError, status: StatusCode) -> Response {
    let mut response = error.into_response();
    *response.status_mut() = status;
    response
}
