//! End-to-end session scenarios driven on tokio's paused clock.

use std::time::Duration;

use breathwork_core::session::format_elapsed;
use breathwork_core::{
    run_session, BreathingPlan, ButtonAction, Database, DisplayText, Event, Lap, Round,
    RoundDuration, RoundType, SessionCommand, SessionController, SessionPhase,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

fn controller(plan: BreathingPlan) -> SessionController {
    SessionController::new(plan, Handle::current()).with_period_ms(1000)
}

async fn run_for(ctrl: &mut SessionController, ms: u64) -> Vec<Event> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(ms);
    let mut events = Vec::new();
    loop {
        tokio::select! {
            biased;
            Some(ev) = ctrl.next_timer_event() => events.extend(ctrl.handle_timer_event(ev)),
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }
    events
}

fn hold_then_breathe() -> BreathingPlan {
    BreathingPlan::new(
        DisplayText::literal("hold then breathe"),
        vec![
            Round::open(RoundType::Hold, false),
            Round::timed(120, RoundType::LowerBreathing, true),
            Round::timed(60, RoundType::NormalBreathing, true),
        ],
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn open_hold_followed_by_automatic_rounds() {
    let mut ctrl = controller(hold_then_breathe());

    let started = ctrl.click();
    assert!(matches!(
        started,
        Some(Event::SessionStarted {
            round_count: 3,
            round_type: RoundType::Hold,
            timer_end_ms: None,
            ..
        })
    ));
    assert_eq!(ctrl.snapshot().button.action, ButtonAction::Next);

    run_for(&mut ctrl, 3_500).await;
    let advanced = ctrl.click();
    assert!(matches!(
        advanced,
        Some(Event::RoundAdvanced {
            round_index: 1,
            timer_end_ms: Some(120_000),
            ..
        })
    ));
    assert_eq!(ctrl.snapshot().button.action, ButtonAction::Pause);

    let events = run_for(&mut ctrl, 120_500).await;
    assert!(matches!(
        events.as_slice(),
        [Event::RoundAdvanced {
            round_index: 2,
            round_type: RoundType::NormalBreathing,
            timer_end_ms: Some(60_000),
            ..
        }]
    ));

    let events = run_for(&mut ctrl, 60_000).await;
    assert!(matches!(
        events.as_slice(),
        [Event::SessionFinished {
            lap_count: 3,
            total_ms: 183_000,
            ..
        }]
    ));

    let snap = ctrl.snapshot();
    assert_eq!(ctrl.phase(), SessionPhase::Finished);
    assert_eq!(snap.view.round_type, RoundType::Finished);
    assert_eq!(snap.button.action, ButtonAction::Start);
    assert_eq!(
        snap.view.laps,
        vec![Lap::new(1, 3_000), Lap::new(2, 120_000), Lap::new(3, 60_000)]
    );
    let lap_sum: u64 = snap.view.laps.iter().map(|l| l.duration_ms).sum();
    assert_eq!(snap.view.total_time_text, format_elapsed(lap_sum));
    assert_eq!(snap.view.total_time_text, "03:03");
}

#[tokio::test(start_paused = true)]
async fn reference_exercise_alternates_breathing_and_holds() {
    let mut ctrl = controller(BreathingPlan::lower_breathing());
    ctrl.click();
    assert_eq!(ctrl.timer().and_then(|t| t.config().end_ms()), Some(120_000));

    let events = run_for(&mut ctrl, 120_500).await;
    assert!(matches!(
        events.as_slice(),
        [Event::RoundAdvanced {
            round_index: 1,
            round_type: RoundType::Hold,
            timer_end_ms: None,
            ..
        }]
    ));
    assert_eq!(ctrl.snapshot().button.action, ButtonAction::Next);

    run_for(&mut ctrl, 45_000).await;
    assert!(matches!(
        ctrl.click(),
        Some(Event::RoundAdvanced {
            round_index: 2,
            timer_end_ms: Some(120_000),
            ..
        })
    ));

    run_for(&mut ctrl, 120_500).await;
    assert_eq!(ctrl.current_round().map(|r| r.duration), Some(RoundDuration::Open));
    run_for(&mut ctrl, 50_000).await;
    ctrl.click();
    assert_eq!(
        ctrl.current_round().map(|r| r.round_type),
        Some(RoundType::NormalBreathing)
    );

    let events = run_for(&mut ctrl, 30_500).await;
    assert!(matches!(
        events.as_slice(),
        [Event::SessionFinished {
            lap_count: 5,
            total_ms: 365_000,
            ..
        }]
    ));
    let laps: Vec<u64> = ctrl.laps().iter().map(|l| l.duration_ms).collect();
    assert_eq!(laps, vec![120_000, 45_000, 120_000, 50_000, 30_000]);
    assert_eq!(ctrl.snapshot().view.total_time_text, "06:05");
}

#[tokio::test(start_paused = true)]
async fn finished_session_lands_in_history() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("BREATHWORK_DATA_DIR", dir.path());

    let db = Database::open().unwrap();
    let mut ctrl = controller(hold_then_breathe()).with_sink(db);
    ctrl.click();
    run_for(&mut ctrl, 10_500).await;
    ctrl.click();
    run_for(&mut ctrl, 181_000).await;
    assert_eq!(ctrl.phase(), SessionPhase::Finished);
    drop(ctrl);

    let db = Database::open().unwrap();
    let rows = db.list_sessions(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "hold then breathe");
    assert_eq!(rows[0].total_ms, 190_000);
    assert_eq!(rows[0].round_count, 3);
    assert_eq!(db.stats().unwrap().longest_hold_ms, Some(10_000));
}

#[tokio::test(start_paused = true)]
async fn runner_serializes_clicks_and_ticks() {
    let plan = BreathingPlan::new(
        DisplayText::literal("short"),
        vec![
            Round::open(RoundType::Hold, false),
            Round::timed(2, RoundType::NormalBreathing, true),
        ],
    )
    .unwrap();
    let ctrl = controller(plan);
    let mut snapshots = ctrl.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(run_session(ctrl, cmd_rx, event_tx));

    cmd_tx.send(SessionCommand::Click).await.unwrap();
    assert!(matches!(event_rx.recv().await, Some(Event::SessionStarted { .. })));

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    cmd_tx.send(SessionCommand::Click).await.unwrap();
    assert!(matches!(
        event_rx.recv().await,
        Some(Event::RoundAdvanced { round_index: 1, .. })
    ));
    assert!(matches!(
        event_rx.recv().await,
        Some(Event::SessionFinished { lap_count: 2, total_ms: 3_000, .. })
    ));
    snapshots.changed().await.unwrap();
    assert_eq!(snapshots.borrow().view.round_type, RoundType::Finished);

    cmd_tx.send(SessionCommand::Stop).await.unwrap();
    let ctrl = runner.await.unwrap();
    assert_eq!(ctrl.phase(), SessionPhase::Finished);
    assert!(ctrl.timer().is_none());
    assert!(event_rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_command_sender_stops_runner_mid_round() {
    let ctrl = controller(hold_then_breathe());
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let runner = tokio::spawn(run_session(ctrl, cmd_rx, event_tx));

    cmd_tx.send(SessionCommand::Click).await.unwrap();
    assert!(matches!(event_rx.recv().await, Some(Event::SessionStarted { .. })));
    tokio::time::sleep(Duration::from_millis(4_500)).await;
    drop(cmd_tx);

    assert!(matches!(
        event_rx.recv().await,
        Some(Event::SessionStopped {
            round_index: 0,
            elapsed_ms: 4_000,
            ..
        })
    ));
    runner.await.unwrap();
}
