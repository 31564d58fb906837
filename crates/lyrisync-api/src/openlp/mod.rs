//! OpenLP live WebSocket listener with auto-reconnect.
//!
//! Connects to the presentation tool's live endpoint, turns every frame
//! into a [`LyricEvent`] and forwards it into a bounded
//! [`tokio::sync::mpsc`] channel. Connection progress is published on a
//! [`tokio::sync::watch`] channel as a [`ListenerState`]. Reconnection
//! uses bounded exponential backoff that resets after every successful
//! connect.
//!
//! # Example
//!
//! ```rust,ignore
//! use lyrisync_api::openlp::{ListenerHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(1);
//! let url = url::Url::parse("ws://localhost:4317")?;
//! let cancel = CancellationToken::new();
//! let handle = ListenerHandle::spawn(url, ReconnectConfig::default(), tx, cancel);
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! handle.shutdown();
//! ```

mod message;

use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

pub use message::parse_message;

// ── LyricEvent ──────────────────────────────────────────────────────

/// A slide change reported by the presentation tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricEvent {
    /// Slide body as sent, before any formatting.
    Text(String),
    /// No slide content on screen.
    Blank,
}

// ── ListenerState ───────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListenerState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

// ── ReconnectConfig ─────────────────────────────────────────────────

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,
    /// Upper bound on backoff delay. Default: 20s.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
        }
    }
}

// ── Backoff ─────────────────────────────────────────────────────────

/// Reconnect delay schedule owned by the listener task.
///
/// `delay(n) = min(initial * 2^n, max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Failed attempts since the last successful connect.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay to wait before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2_u32.saturating_pow(self.attempt.min(16));
        let delay = self
            .config
            .initial_delay
            .saturating_mul(factor)
            .min(self.config.max_delay);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

// ── ListenerHandle ──────────────────────────────────────────────────

/// Handle to the running listener task.
pub struct ListenerHandle {
    state_rx: watch::Receiver<ListenerState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Spawn the connect/read/backoff loop.
    ///
    /// Returns immediately; the first connection attempt happens on the
    /// spawned task. The loop ends when `cancel` fires or `events` closes.
    pub fn spawn(
        url: Url,
        reconnect: ReconnectConfig,
        events: mpsc::Sender<LyricEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ListenerState::Disconnected);
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            listen_loop(url, Backoff::new(reconnect), events, state_tx, task_cancel).await;
        });
        Self {
            state_rx,
            cancel,
            task,
        }
    }

    /// Receiver for connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ListenerState> {
        self.state_rx.clone()
    }

    /// Cancel the loop, including any pending backoff sleep.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the listener task to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Presentation listener task panicked");
        }
    }
}

// ── Background reconnection loop ────────────────────────────────────

/// Disconnected → Connecting → Connected → Disconnected, forever.
async fn listen_loop(
    url: Url,
    mut backoff: Backoff,
    events: mpsc::Sender<LyricEvent>,
    state_tx: watch::Sender<ListenerState>,
    cancel: CancellationToken,
) {
    loop {
        state_tx.send_replace(ListenerState::Connecting);

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&url, &events, &state_tx, &mut backoff) => result,
        };

        state_tx.send_replace(ListenerState::Disconnected);

        match result {
            Ok(()) => tracing::info!("Presentation socket closed"),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    attempt = backoff.attempt(),
                    "Presentation socket error"
                );
            }
        }

        if events.is_closed() {
            tracing::debug!("Lyric event receiver dropped, stopping listener");
            break;
        }

        let delay = backoff.next_delay();
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt = backoff.attempt(),
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    state_tx.send_replace(ListenerState::Disconnected);
    tracing::debug!("Presentation listener exiting");
}

// ── Single connection lifecycle ─────────────────────────────────────

/// Connect once and forward events until the socket drops.
async fn connect_and_read(
    url: &Url,
    events: &mpsc::Sender<LyricEvent>,
    state_tx: &watch::Sender<ListenerState>,
    backoff: &mut Backoff,
) -> Result<(), Error> {
    tracing::info!(url = %url, "Connecting to presentation socket");

    let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    backoff.reset();
    state_tx.send_replace(ListenerState::Connected);
    tracing::info!("Presentation socket connected");

    let (_write, mut read) = stream.split();

    while let Some(frame) = read.next().await {
        let payload = match frame {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                Ok(text) => text.to_owned(),
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                if let Some(cf) = frame {
                    tracing::info!(code = %cf.code, reason = %cf.reason, "Close frame received");
                }
                return Ok(());
            }
            Ok(_) => continue,
            Err(e) => return Err(stream_error(&e)),
        };

        let Some(event) = parse_message(&payload) else {
            continue;
        };
        tracing::debug!(?event, "Presentation event");

        if events.send(event).await.is_err() {
            return Ok(());
        }
    }

    tracing::info!("Presentation stream ended");
    Ok(())
}

/// A read failure on an established socket.
fn stream_error(err: &tokio_tungstenite::tungstenite::Error) -> Error {
    Error::WebSocketRead(err.to_string())
}
