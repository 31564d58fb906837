// Sync engine behaviour against a scripted in-memory production tool.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::watch;
use tokio::time::{Instant, timeout};

use lyrisync_core::{
    Command, CommandOutcome, CoreError, DispatchError, EngineState, ErrorKind, ListenerState,
    LyricEvent, OverlayChannel, Policy, ProductionHealth, ProductionSnapshot, ProductionTool,
    SyncEngine,
};

// ── Scripted tool ───────────────────────────────────────────────────

#[derive(Clone, Default)]
struct ScriptedTool {
    inner: Arc<Script>,
}

#[derive(Default)]
struct Script {
    calls: Mutex<Vec<(Command, Instant)>>,
    failures: Mutex<HashMap<&'static str, DispatchError>>,
    delay: Mutex<Duration>,
    production: Mutex<ProductionSnapshot>,
}

impl ScriptedTool {
    fn with_delay(delay: Duration) -> Self {
        let tool = Self::default();
        *tool.inner.delay.lock().unwrap() = delay;
        tool
    }

    fn fail(&self, command: &'static str, error: DispatchError) {
        self.inner.failures.lock().unwrap().insert(command, error);
    }

    fn heal(&self) {
        self.inner.failures.lock().unwrap().clear();
    }

    fn set_production(&self, snapshot: ProductionSnapshot) {
        *self.inner.production.lock().unwrap() = snapshot;
    }

    fn calls(&self) -> Vec<Command> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect()
    }

    fn timed_calls(&self) -> Vec<(Command, Instant)> {
        self.inner.calls.lock().unwrap().clone()
    }

    fn reset_calls(&self) {
        self.inner.calls.lock().unwrap().clear();
    }
}

impl ProductionTool for ScriptedTool {
    async fn dispatch(&self, command: &Command) -> Result<CommandOutcome, DispatchError> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push((command.clone(), Instant::now()));

        let delay = *self.inner.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = self.inner.failures.lock().unwrap().get(command.name()).cloned();
        if let Some(e) = failure {
            return Err(e);
        }

        match command {
            Command::QueryStatus => Ok(CommandOutcome::Status(
                self.inner.production.lock().unwrap().clone(),
            )),
            _ => Ok(CommandOutcome::Done),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn ch(n: u8) -> OverlayChannel {
    OverlayChannel::new(n).unwrap()
}

fn text(s: &str) -> LyricEvent {
    LyricEvent::Text(s.into())
}

fn timeout_error() -> DispatchError {
    DispatchError::Timeout {
        timeout: Duration::from_secs(3),
    }
}

fn engine(policy: Policy) -> (SyncEngine<ScriptedTool>, ScriptedTool) {
    let tool = ScriptedTool::default();
    (SyncEngine::new(policy, tool.clone()), tool)
}

async fn wait_for_state(
    engine: &SyncEngine<ScriptedTool>,
    predicate: impl FnMut(&EngineState) -> bool,
) -> EngineState {
    let mut rx = engine.subscribe();
    timeout(Duration::from_secs(60), rx.wait_for(predicate))
        .await
        .unwrap()
        .unwrap()
        .clone()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn blank_clears_text_and_takes_overlay_out() {
    let (engine, tool) = engine(Policy {
        clear_on_blank: true,
        auto_overlay_out_on_clear: true,
        overlay_channel: ch(2),
        ..Policy::default()
    });

    let state = engine.handle_event(text("Amazing grace")).await.unwrap();
    assert_eq!(
        tool.calls(),
        vec![
            Command::OverlayIn(ch(2)),
            Command::SetText("Amazing grace".into())
        ]
    );
    assert!(state.overlay_visible);
    assert_eq!(state.current_text, "Amazing grace");
    assert!(!state.slide_blank);

    tool.reset_calls();
    let state = engine.handle_event(LyricEvent::Blank).await.unwrap();
    assert_eq!(
        tool.calls(),
        vec![Command::SetText(String::new()), Command::OverlayOut(ch(2))]
    );
    assert!(!state.overlay_visible);
    assert_eq!(state.current_text, "");
    assert!(state.slide_blank);
    assert_eq!(state.last_lyric.as_deref(), Some("Amazing grace"));
}

#[tokio::test]
async fn blank_without_clear_on_blank_leaves_lyric_on_screen() {
    let (engine, tool) = engine(Policy {
        clear_on_blank: false,
        ..Policy::default()
    });

    engine.handle_event(text("Hello")).await.unwrap();
    tool.reset_calls();

    let state = engine.handle_event(LyricEvent::Blank).await.unwrap();
    assert!(tool.calls().is_empty());
    assert_eq!(state.current_text, "Hello");
    assert!(state.slide_blank);
    assert!(state.overlay_visible);
}

#[tokio::test]
async fn timed_out_set_text_is_recorded_and_next_event_still_dispatches() {
    let (engine, tool) = engine(Policy {
        auto_overlay_on_send: false,
        ..Policy::default()
    });

    tool.fail("set_text", timeout_error());
    let err = engine.handle_event(text("Verse 1")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DispatchTimeout);

    let status = engine.status();
    let recorded = status.last_error.clone().unwrap();
    assert_eq!(recorded.kind, ErrorKind::DispatchTimeout);
    assert_eq!(status.current_text, "");
    assert_eq!(status.production_status, ProductionHealth::Unreachable);

    tool.heal();
    let state = engine.handle_event(text("Verse 2")).await.unwrap();
    assert_eq!(state.current_text, "Verse 2");
    assert!(state.last_error.is_none());
    assert_eq!(state.production_status, ProductionHealth::Reachable);
    assert_eq!(
        tool.calls(),
        vec![
            Command::SetText("Verse 1".into()),
            Command::SetText("Verse 2".into())
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn back_to_back_events_are_serialized_in_order() {
    let tool = ScriptedTool::with_delay(Duration::from_millis(100));
    let engine = SyncEngine::new(
        Policy {
            auto_overlay_on_send: false,
            ..Policy::default()
        },
        tool.clone(),
    );
    engine.start(None, Duration::ZERO).await;

    let intake = engine.intake();
    intake.send(text("first")).await.unwrap();
    intake.send(text("second")).await.unwrap();

    let state = wait_for_state(&engine, |s| s.current_text == "second").await;
    assert_eq!(state.current_text, "second");

    let calls = tool.timed_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, Command::SetText("first".into()));
    assert_eq!(calls[1].0, Command::SetText("second".into()));
    assert!(calls[1].1 - calls[0].1 >= Duration::from_millis(100));

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_wait_for_the_critical_section() {
    let tool = ScriptedTool::with_delay(Duration::from_millis(50));
    let engine = SyncEngine::new(Policy::default(), tool.clone());

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.show_lyrics(Some("one".into())).await })
    };
    // Let the first caller take the lock and start dispatching.
    while tool.calls().is_empty() {
        tokio::task::yield_now().await;
    }
    let second = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.show_lyrics(Some("two".into())).await })
    };

    first.await.unwrap().unwrap();
    let state = second.await.unwrap().unwrap();

    // The overlay came in once: the second plan saw the first's effect.
    assert_eq!(
        tool.calls(),
        vec![
            Command::OverlayIn(ch(1)),
            Command::SetText("one".into()),
            Command::SetText("two".into()),
        ]
    );
    assert_eq!(state.current_text, "two");
}

// ── Toggle ──────────────────────────────────────────────────────────

#[tokio::test]
async fn toggle_flips_visibility_only_on_success() {
    let (engine, tool) = engine(Policy::default());

    let state = engine.toggle_overlay().await.unwrap();
    assert!(state.overlay_visible);
    let state = engine.toggle_overlay().await.unwrap();
    assert!(!state.overlay_visible);

    tool.fail("overlay_in", timeout_error());
    assert!(engine.toggle_overlay().await.is_err());
    assert!(!engine.status().overlay_visible);

    tool.heal();
    assert!(engine.toggle_overlay().await.unwrap().overlay_visible);

    tool.fail(
        "overlay_out",
        DispatchError::Rejected {
            code: 500,
            message: "nope".into(),
        },
    );
    assert!(engine.toggle_overlay().await.is_err());
    assert!(engine.status().overlay_visible);

    assert_eq!(
        tool.calls(),
        vec![
            Command::OverlayIn(ch(1)),
            Command::OverlayOut(ch(1)),
            Command::OverlayIn(ch(1)),
            Command::OverlayIn(ch(1)),
            Command::OverlayOut(ch(1)),
        ]
    );
}

#[tokio::test]
async fn toggle_uses_cut_verbs_under_always_on() {
    let (engine, tool) = engine(Policy {
        overlay_always_on: true,
        ..Policy::default()
    });

    engine.toggle_overlay().await.unwrap();
    engine.toggle_overlay().await.unwrap();
    assert_eq!(
        tool.calls(),
        vec![Command::OverlayOn(ch(1)), Command::OverlayOff(ch(1))]
    );
}

// ── Plan execution rules ────────────────────────────────────────────

#[tokio::test]
async fn rejected_command_does_not_stop_the_plan() {
    let (engine, tool) = engine(Policy::default());
    tool.fail(
        "overlay_in",
        DispatchError::Rejected {
            code: 500,
            message: "bad channel".into(),
        },
    );

    let err = engine.show_lyrics(Some("Still sent".into())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DispatchRejected);

    let status = engine.status();
    assert_eq!(status.current_text, "Still sent");
    assert!(!status.overlay_visible);
    assert_eq!(status.production_status, ProductionHealth::Reachable);
    assert_eq!(status.last_error.unwrap().kind, ErrorKind::DispatchRejected);
    assert_eq!(tool.calls().len(), 2);
}

#[tokio::test]
async fn connectivity_failure_aborts_the_rest_of_the_plan() {
    let (engine, tool) = engine(Policy::default());
    tool.fail(
        "overlay_in",
        DispatchError::Unreachable {
            reason: "connection refused".into(),
        },
    );

    assert!(engine.show_lyrics(Some("Not sent".into())).await.is_err());
    assert_eq!(tool.calls(), vec![Command::OverlayIn(ch(1))]);

    let status = engine.status();
    assert_eq!(status.current_text, "");
    assert_eq!(status.production_status, ProductionHealth::Unreachable);
    assert_eq!(status.last_error.unwrap().kind, ErrorKind::DispatchUnreachable);
}

#[tokio::test]
async fn text_is_wrapped_before_dispatch() {
    let (engine, tool) = engine(Policy {
        max_chars_per_line: 14,
        auto_overlay_on_send: false,
        ..Policy::default()
    });

    let state = engine
        .handle_event(text("Amazing grace how sweet the sound"))
        .await
        .unwrap();
    assert_eq!(state.current_text, "Amazing grace\nhow sweet the\nsound");
    assert_eq!(
        tool.calls(),
        vec![Command::SetText("Amazing grace\nhow sweet the\nsound".into())]
    );
}

// ── Control operations ──────────────────────────────────────────────

#[tokio::test]
async fn show_without_text_reshows_last_lyric() {
    let (engine, tool) = engine(Policy::default());

    let err = engine.show_lyrics(None).await.unwrap_err();
    assert!(matches!(err, CoreError::Request { .. }));

    engine.show_lyrics(Some("Be thou my vision".into())).await.unwrap();
    engine.clear_lyrics().await.unwrap();
    assert_eq!(engine.status().current_text, "");

    tool.reset_calls();
    let state = engine.show_lyrics(None).await.unwrap();
    assert_eq!(state.current_text, "Be thou my vision");
    assert_eq!(
        tool.calls(),
        vec![
            Command::OverlayIn(ch(1)),
            Command::SetText("Be thou my vision".into())
        ]
    );
}

#[tokio::test]
async fn empty_show_is_a_request_error_without_dispatch() {
    let (engine, tool) = engine(Policy::default());

    let err = engine.show_lyrics(Some("   ".into())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Request);
    assert!(tool.calls().is_empty());
    assert_eq!(engine.status(), EngineState::default());
}

#[tokio::test]
async fn whitespace_slide_counts_as_blank() {
    let (engine, tool) = engine(Policy::default());

    let state = engine.handle_event(text(" \n ")).await.unwrap();
    assert!(state.slide_blank);
    assert_eq!(
        tool.calls(),
        vec![Command::SetText(String::new()), Command::OverlayOut(ch(1))]
    );
}

#[tokio::test]
async fn recording_commands_track_state() {
    let (engine, tool) = engine(Policy::default());

    assert!(engine.start_recording().await.unwrap().recording);
    assert!(!engine.stop_recording().await.unwrap().recording);

    tool.fail("start_recording", timeout_error());
    assert!(engine.start_recording().await.is_err());
    assert!(!engine.status().recording);
}

#[tokio::test]
async fn refresh_reconciles_with_production_state() {
    let (engine, tool) = engine(Policy {
        overlay_channel: ch(3),
        ..Policy::default()
    });

    tool.set_production(ProductionSnapshot {
        recording: true,
        overlays: [false, false, true, false],
        title_text: Some("from vmix".into()),
    });
    let state = engine.refresh_status().await.unwrap();
    assert!(state.recording);
    assert!(state.overlay_visible);
    assert_eq!(state.production_title.as_deref(), Some("from vmix"));
    assert_eq!(state.production_status, ProductionHealth::Reachable);

    tool.fail(
        "query_status",
        DispatchError::Unreachable {
            reason: "down".into(),
        },
    );
    assert!(engine.refresh_status().await.is_err());
    let state = engine.status();
    assert!(!state.overlay_visible);
    assert_eq!(state.production_status, ProductionHealth::Unreachable);
}

#[tokio::test]
async fn operations_after_shutdown_are_refused() {
    let (engine, tool) = engine(Policy::default());
    engine.start(None, Duration::ZERO).await;
    engine.shutdown().await;

    let err = engine.clear_lyrics().await.unwrap_err();
    assert_eq!(err, CoreError::ShuttingDown);
    assert!(tool.calls().is_empty());
}

// ── Idle auto-clear ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn idle_timer_clears_after_the_configured_period_and_not_before() {
    let (engine, tool) = engine(Policy {
        idle_auto_clear: Some(Duration::from_secs(5)),
        ..Policy::default()
    });
    engine.start(None, Duration::ZERO).await;

    engine.handle_event(text("Verse")).await.unwrap();
    let shown_at = Instant::now();

    tokio::time::sleep(Duration::from_millis(4900)).await;
    assert_eq!(engine.status().current_text, "Verse");
    assert_eq!(tool.calls().len(), 2);

    let state = wait_for_state(&engine, |s| s.current_text.is_empty()).await;
    assert!(!state.overlay_visible);

    let calls = tool.timed_calls();
    assert_eq!(calls[2].0, Command::SetText(String::new()));
    assert_eq!(calls[3].0, Command::OverlayOut(ch(1)));
    assert!(calls[2].1 - shown_at >= Duration::from_secs(5));

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn new_text_rearms_the_idle_timer() {
    let (engine, tool) = engine(Policy {
        idle_auto_clear: Some(Duration::from_secs(5)),
        auto_overlay_on_send: false,
        auto_overlay_out_on_clear: false,
        ..Policy::default()
    });
    engine.start(None, Duration::ZERO).await;

    engine.handle_event(text("one")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    engine.handle_event(text("two")).await.unwrap();
    let second_at = Instant::now();

    tokio::time::sleep(Duration::from_millis(4500)).await;
    assert_eq!(engine.status().current_text, "two");

    wait_for_state(&engine, |s| s.current_text.is_empty()).await;
    let calls = tool.timed_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].1 - second_at >= Duration::from_secs(5));

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_clear_disarms_the_idle_timer() {
    let (engine, tool) = engine(Policy {
        idle_auto_clear: Some(Duration::from_secs(5)),
        auto_overlay_on_send: false,
        auto_overlay_out_on_clear: false,
        ..Policy::default()
    });
    engine.start(None, Duration::ZERO).await;

    engine.handle_event(text("one")).await.unwrap();
    engine.clear_lyrics().await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(tool.calls().len(), 2);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn idle_timer_disabled_by_default() {
    let (engine, tool) = engine(Policy::default());
    engine.start(None, Duration::ZERO).await;

    engine.handle_event(text("stays")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(engine.status().current_text, "stays");
    assert_eq!(tool.calls().len(), 2);
    engine.shutdown().await;
}

// ── Background integration ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn always_on_overlay_is_restored_after_reconnect() {
    let (engine, tool) = engine(Policy {
        overlay_always_on: true,
        ..Policy::default()
    });
    let (state_tx, state_rx) = watch::channel(ListenerState::Disconnected);
    engine.start(Some(state_rx), Duration::ZERO).await;
    assert_eq!(tool.calls(), vec![Command::OverlayOn(ch(1))]);

    state_tx.send_replace(ListenerState::Connected);
    let state = wait_for_state(&engine, |s| s.connection_status == ListenerState::Connected).await;
    assert!(state.overlay_visible);
    // Already visible: nothing re-sent.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(tool.calls().len(), 1);

    engine.toggle_overlay().await.unwrap();
    state_tx.send_replace(ListenerState::Disconnected);
    let state =
        wait_for_state(&engine, |s| s.connection_status == ListenerState::Disconnected).await;
    assert_eq!(state.last_error.unwrap().kind, ErrorKind::Connectivity);

    state_tx.send_replace(ListenerState::Connected);
    wait_for_state(&engine, |s| s.overlay_visible).await;
    assert_eq!(
        tool.calls(),
        vec![
            Command::OverlayOn(ch(1)),
            Command::OverlayOff(ch(1)),
            Command::OverlayOn(ch(1)),
        ]
    );

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn status_poller_tracks_production_reachability() {
    let (engine, tool) = engine(Policy::default());
    tool.set_production(ProductionSnapshot {
        recording: true,
        ..ProductionSnapshot::default()
    });
    engine.start(None, Duration::from_secs(2)).await;

    let state = wait_for_state(&engine, |s| s.recording).await;
    assert_eq!(state.production_status, ProductionHealth::Reachable);

    tool.fail(
        "query_status",
        DispatchError::Unreachable {
            reason: "vMix closed".into(),
        },
    );
    let state = wait_for_state(&engine, |s| {
        s.production_status == ProductionHealth::Unreachable
    })
    .await;
    assert_eq!(state.last_error.unwrap().kind, ErrorKind::DispatchUnreachable);

    tool.heal();
    let state = wait_for_state(&engine, |s| s.production_status == ProductionHealth::Reachable)
        .await;
    // A clean poll is not a new event: the failure stays visible.
    assert_eq!(state.last_error.unwrap().kind, ErrorKind::DispatchUnreachable);
    assert!(tool.calls().iter().all(|c| *c == Command::QueryStatus));

    let state = engine.clear_lyrics().await.unwrap();
    assert!(state.last_error.is_none());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn recorded_dispatch_error_survives_status_polls() {
    let (engine, tool) = engine(Policy::default());
    engine.start(None, Duration::from_secs(2)).await;
    tool.fail(
        "set_text",
        DispatchError::Rejected {
            code: 500,
            message: "Input not found".into(),
        },
    );

    assert!(engine.handle_event(text("Verse 1")).await.is_err());
    assert_eq!(
        engine.status().last_error.unwrap().kind,
        ErrorKind::DispatchRejected
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    let polls = tool
        .calls()
        .iter()
        .filter(|c| **c == Command::QueryStatus)
        .count();
    assert!(polls >= 2, "expected the poller to run, saw {polls} polls");
    assert_eq!(
        engine.status().last_error.unwrap().kind,
        ErrorKind::DispatchRejected
    );

    tool.heal();
    let state = engine.handle_event(text("Verse 2")).await.unwrap();
    assert!(state.last_error.is_none());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unreachable_presentation_tool_is_reported_until_connected() {
    let (engine, _tool) = engine(Policy::default());
    let (state_tx, state_rx) = watch::channel(ListenerState::Disconnected);
    engine.start(Some(state_rx), Duration::ZERO).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(engine.status().last_error.is_none());

    // A failed attempt; the engine may only ever observe the Disconnected.
    state_tx.send_replace(ListenerState::Connecting);
    state_tx.send_replace(ListenerState::Disconnected);
    let state = wait_for_state(&engine, |s| s.last_error.is_some()).await;
    let recorded = state.last_error.unwrap();
    assert_eq!(recorded.kind, ErrorKind::Connectivity);
    assert!(recorded.message.contains("unreachable"), "{}", recorded.message);

    // Production dispatches succeeding does not hide the presentation link loss.
    engine.show_lyrics(Some("Hello".into())).await.unwrap();
    assert_eq!(
        engine.status().last_error.unwrap().kind,
        ErrorKind::Connectivity
    );

    state_tx.send_replace(ListenerState::Connected);
    let state =
        wait_for_state(&engine, |s| s.connection_status == ListenerState::Connected).await;
    assert!(state.last_error.is_none());

    engine.shutdown().await;
}
