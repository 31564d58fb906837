// ── Sync engine ──
//
// Owns `EngineState` and is the only writer. Every mutation goes through
// `run`, which holds the session lock for the whole plan
// (format → dispatch → state update), so triggers from the listener,
// the control API and the idle timer never interleave. The lock is a
// FIFO-fair tokio mutex: triggers are served in arrival order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lyrisync_api::{ListenerState, LyricEvent};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandOutcome};
use crate::config::Policy;
use crate::error::{CoreError, DispatchError, ErrorKind};
use crate::policy::{Trigger, plan};
use crate::state::{EngineState, ProductionHealth, RecordedError};
use crate::tool::ProductionTool;

/// One pending event while another is being dispatched.
const INTAKE_CAPACITY: usize = 1;

// ── SyncEngine ──────────────────────────────────────────────────────

/// The orchestrator between presentation events, the control API and
/// the production tool.
///
/// Cheaply cloneable via `Arc<EngineInner>`. Create with [`new`](Self::new),
/// then [`start`](Self::start) the background tasks.
pub struct SyncEngine<P> {
    inner: Arc<EngineInner<P>>,
}

impl<P> Clone for SyncEngine<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<P> {
    policy: Policy,
    tool: P,
    session: Mutex<Session>,
    snapshot: watch::Sender<EngineState>,
    idle_deadline: watch::Sender<Option<Instant>>,
    intake_tx: mpsc::Sender<LyricEvent>,
    intake_rx: Mutex<Option<mpsc::Receiver<LyricEvent>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Everything guarded by the dispatch critical section.
struct Session {
    state: EngineState,
    idle_deadline: Option<Instant>,
}

impl<P: ProductionTool> SyncEngine<P> {
    pub fn new(policy: Policy, tool: P) -> Self {
        let (snapshot, _) = watch::channel(EngineState::default());
        let (idle_deadline, _) = watch::channel(None);
        let (intake_tx, intake_rx) = mpsc::channel(INTAKE_CAPACITY);

        Self {
            inner: Arc::new(EngineInner {
                policy,
                tool,
                session: Mutex::new(Session {
                    state: EngineState::default(),
                    idle_deadline: None,
                }),
                snapshot,
                idle_deadline,
                intake_tx,
                intake_rx: Mutex::new(Some(intake_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Token cancelled by [`shutdown`](Self::shutdown); share it with the
    /// listener so its backoff stops too.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Spawn the background tasks: event intake, idle timer, listener
    /// state bridge (when a listener runs) and status poller (when
    /// `poll_interval` is non-zero). Puts an always-on overlay on air.
    ///
    /// Calling `start` twice does not spawn a second intake.
    pub async fn start(
        &self,
        listener_state: Option<watch::Receiver<ListenerState>>,
        poll_interval: Duration,
    ) {
        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.intake_rx.lock().await.take() {
            handles.push(tokio::spawn(intake_task(self.clone(), rx)));
        }

        handles.push(tokio::spawn(idle_timer_task(
            self.clone(),
            self.inner.idle_deadline.subscribe(),
        )));

        if let Some(states) = listener_state {
            handles.push(tokio::spawn(listener_bridge_task(self.clone(), states)));
        }

        if !poll_interval.is_zero() {
            handles.push(tokio::spawn(status_poll_task(self.clone(), poll_interval)));
        }
        drop(handles);

        if let Err(e) = self.ensure_overlay_always_on().await {
            warn!(error = %e, "could not put the always-on overlay on air");
        }
        info!("sync engine started");
    }

    /// Cancel every background task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "engine task ended abnormally");
            }
        }
        debug!("sync engine stopped");
    }

    // ── Observation ─────────────────────────────────────────────────

    /// Latest published state. Never waits on an in-flight dispatch.
    pub fn status(&self) -> EngineState {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.inner.snapshot.subscribe()
    }

    /// Sender for presentation events. Capacity one: a second event
    /// waits for the first to be taken rather than being dropped.
    pub fn intake(&self) -> mpsc::Sender<LyricEvent> {
        self.inner.intake_tx.clone()
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Apply one presentation event. Whitespace-only text counts as blank.
    pub async fn handle_event(&self, event: LyricEvent) -> Result<EngineState, CoreError> {
        let event = match event {
            LyricEvent::Text(text) if text.trim().is_empty() => LyricEvent::Blank,
            other => other,
        };
        self.run(Trigger::Presentation(event)).await
    }

    /// Push lyrics from an external controller. `None` re-shows the last lyric.
    pub async fn show_lyrics(&self, text: Option<String>) -> Result<EngineState, CoreError> {
        let text = match text {
            Some(text) if text.trim().is_empty() => {
                return Err(CoreError::request("lyric text is empty"));
            }
            Some(text) => text,
            None => self
                .status()
                .last_lyric
                .ok_or_else(|| CoreError::request("no lyric to re-show"))?,
        };
        self.run(Trigger::Show(text)).await
    }

    pub async fn clear_lyrics(&self) -> Result<EngineState, CoreError> {
        self.run(Trigger::Clear).await
    }

    pub async fn toggle_overlay(&self) -> Result<EngineState, CoreError> {
        self.run(Trigger::ToggleOverlay).await
    }

    pub async fn start_recording(&self) -> Result<EngineState, CoreError> {
        self.run(Trigger::StartRecording).await
    }

    pub async fn stop_recording(&self) -> Result<EngineState, CoreError> {
        self.run(Trigger::StopRecording).await
    }

    /// Query the production tool and reconcile recording/overlay state.
    pub async fn refresh_status(&self) -> Result<EngineState, CoreError> {
        self.run(Trigger::QueryStatus).await
    }

    /// Under `overlay_always_on`, cut the overlay on if it is not known
    /// to be visible. No-op otherwise.
    pub async fn ensure_overlay_always_on(&self) -> Result<EngineState, CoreError> {
        self.run(Trigger::EnsureOverlay).await
    }

    // ── Dispatch critical section ───────────────────────────────────

    async fn run(&self, trigger: Trigger) -> Result<EngineState, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShuttingDown);
        }

        let mut session = self.inner.session.lock().await;
        let policy = &self.inner.policy;

        match &trigger {
            Trigger::Presentation(event) => {
                session.state.slide_blank = matches!(event, LyricEvent::Blank);
            }
            Trigger::IdleClear => {
                // A show may have re-armed the timer while this trigger waited.
                let due = session
                    .idle_deadline
                    .is_some_and(|deadline| deadline <= Instant::now());
                if !due {
                    return Ok(session.state.clone());
                }
                self.set_idle_deadline(&mut session, None);
                info!("idle timeout reached, clearing lyrics");
            }
            _ => {}
        }

        let commands = plan(&trigger, policy, &session.state);
        let planned = commands.len();
        let mut failure: Option<DispatchError> = None;

        for command in commands {
            match self.inner.tool.dispatch(&command).await {
                Ok(outcome) => {
                    session.state.production_status = ProductionHealth::Reachable;
                    self.apply_success(&mut session, &command, outcome);
                }
                Err(e) => {
                    warn!(command = command.name(), error = %e, "dispatch failed");
                    let connectivity = e.is_connectivity();
                    if connectivity {
                        session.state.production_status = ProductionHealth::Unreachable;
                        if command == Command::QueryStatus {
                            session.state.overlay_visible = false;
                        }
                    } else {
                        session.state.production_status = ProductionHealth::Reachable;
                    }
                    session.state.last_error =
                        Some(RecordedError::new(&CoreError::Dispatch(e.clone())));
                    if failure.is_none() {
                        failure = Some(e);
                    }
                    if connectivity {
                        break;
                    }
                }
            }
        }

        // Background reconciliation never hides an error; presentation
        // link errors clear on reconnect.
        let superseded = planned > 0
            && failure.is_none()
            && trigger.supersedes_error()
            && session
                .state
                .last_error
                .as_ref()
                .is_some_and(|e| e.kind.is_dispatch());
        if superseded {
            session.state.last_error = None;
        }

        let snapshot = session.state.clone();
        self.inner.snapshot.send_replace(snapshot.clone());
        drop(session);

        match failure {
            Some(e) => Err(CoreError::Dispatch(e)),
            None => Ok(snapshot),
        }
    }

    /// State effects of one successful command.
    fn apply_success(&self, session: &mut Session, command: &Command, outcome: CommandOutcome) {
        let policy = &self.inner.policy;

        match command {
            Command::SetText(text) => {
                session.state.current_text.clone_from(text);
                session.state.last_update = Some(Utc::now());
                let deadline = if text.is_empty() {
                    None
                } else {
                    session.state.last_lyric = Some(text.clone());
                    policy.idle_auto_clear.map(|idle| Instant::now() + idle)
                };
                self.set_idle_deadline(session, deadline);
            }
            Command::StartRecording => session.state.recording = true,
            Command::StopRecording => session.state.recording = false,
            Command::QueryStatus => {
                if let CommandOutcome::Status(production) = outcome {
                    session.state.recording = production.recording;
                    session.state.overlay_visible =
                        production.overlay_active(policy.overlay_channel);
                    session.state.production_title = production.title_text;
                }
            }
            Command::OverlayIn(_)
            | Command::OverlayOut(_)
            | Command::OverlayOn(_)
            | Command::OverlayOff(_) => {
                if let Some((channel, action)) = command.overlay() {
                    if channel == policy.overlay_channel {
                        session.state.overlay_visible = action.shows();
                    }
                }
            }
        }
    }

    fn set_idle_deadline(&self, session: &mut Session, deadline: Option<Instant>) {
        session.idle_deadline = deadline;
        self.inner.idle_deadline.send_replace(deadline);
    }

    /// Record the presentation link state; called by the listener bridge.
    ///
    /// `notified` is set when `status` arrived through a change
    /// notification. A `Disconnected` seen that way ends a connection
    /// attempt even if the `Connecting` in between was coalesced.
    async fn set_connection_status(&self, status: ListenerState, notified: bool) {
        let mut session = self.inner.session.lock().await;
        let previous = session.state.connection_status;
        let lost = status == ListenerState::Disconnected && (previous != status || notified);
        if previous == status && !lost {
            return;
        }
        session.state.connection_status = status;

        if lost {
            let reason = if previous == ListenerState::Connected {
                "presentation socket disconnected"
            } else {
                "presentation tool unreachable"
            };
            session.state.last_error = Some(RecordedError::new(&CoreError::Connectivity {
                reason: reason.into(),
            }));
        } else if status == ListenerState::Connected
            && session
                .state
                .last_error
                .as_ref()
                .is_some_and(|e| e.kind == ErrorKind::Connectivity)
        {
            session.state.last_error = None;
        }
        self.inner.snapshot.send_replace(session.state.clone());
    }
}

// ── Background tasks ────────────────────────────────────────────────

/// Feed presentation events into the engine one at a time.
async fn intake_task<P: ProductionTool>(engine: SyncEngine<P>, mut rx: mpsc::Receiver<LyricEvent>) {
    let cancel = engine.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                if let Err(e) = engine.handle_event(event).await {
                    warn!(error = %e, "presentation event not fully applied");
                }
            }
        }
    }
}

/// Clear the title once the idle deadline passes without a newer update.
async fn idle_timer_task<P: ProductionTool>(
    engine: SyncEngine<P>,
    mut deadline_rx: watch::Receiver<Option<Instant>>,
) {
    let cancel = engine.inner.cancel.clone();

    loop {
        let deadline = *deadline_rx.borrow_and_update();
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = deadline_rx.changed() => {
                        if changed.is_err() { break; }
                    }
                    () = tokio::time::sleep_until(deadline) => {
                        if let Err(e) = engine.run(Trigger::IdleClear).await {
                            warn!(error = %e, "idle clear failed");
                        }
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = deadline_rx.changed() => {
                        if changed.is_err() { break; }
                    }
                }
            }
        }
    }
}

/// Mirror listener state into the engine; re-assert an always-on
/// overlay after every (re)connect.
async fn listener_bridge_task<P: ProductionTool>(
    engine: SyncEngine<P>,
    mut states: watch::Receiver<ListenerState>,
) {
    let cancel = engine.inner.cancel.clone();
    let mut notified = false;

    loop {
        let status = *states.borrow_and_update();
        engine.set_connection_status(status, notified).await;
        notified = true;

        if status == ListenerState::Connected {
            if let Err(e) = engine.ensure_overlay_always_on().await {
                warn!(error = %e, "could not restore always-on overlay after connect");
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = states.changed() => {
                if changed.is_err() { break; }
            }
        }
    }
}

/// Periodically reconcile against the production tool's own state.
async fn status_poll_task<P: ProductionTool>(engine: SyncEngine<P>, period: Duration) {
    let cancel = engine.inner.cancel.clone();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = engine.refresh_status().await {
                    debug!(error = %e, "status poll failed");
                }
            }
        }
    }
}
