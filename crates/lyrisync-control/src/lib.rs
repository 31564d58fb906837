//! Local HTTP control surface for the sync engine.
//!
//! Hardware keypads and companion software hit these routes to trigger
//! the same actions the engine performs on presentation events:
//!
//! | Route | Action |
//! |---|---|
//! | `POST /api/show_lyrics` | push `{"text": ...}`, or re-show the last lyric |
//! | `POST /api/clear_lyrics` | clear the title |
//! | `POST /api/toggle_overlay` | flip the overlay |
//! | `POST /api/start_recording` / `stop_recording` | recording |
//! | `GET /api/status` | state snapshot |

mod error;
mod routes;

use std::net::SocketAddr;

use lyrisync_core::{ProductionTool, SyncEngine};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::{ApiError, ControlError};
pub use routes::router;

/// Bind the control API listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ControlError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ControlError::Bind { addr, source })
}

/// Serve the control API until `shutdown` is cancelled, then drain
/// in-flight requests.
pub async fn serve<P: ProductionTool>(
    listener: TcpListener,
    engine: SyncEngine<P>,
    shutdown: CancellationToken,
) -> Result<(), ControlError> {
    let addr = listener.local_addr().map_err(ControlError::Serve)?;
    info!(%addr, "control API listening");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ControlError::Serve)?;

    info!("control API stopped");
    Ok(())
}
