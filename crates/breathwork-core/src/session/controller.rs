//! Breathing session state machine.
//!
//! The controller owns the current plan, the round cursor, the active
//! [`IntervalTimer`] and the lap history. Timer callbacks arrive through a
//! channel and are applied with [`SessionController::handle_timer_event`], so
//! clicks and ticks are serialized by whoever drives the controller (see
//! [`run_session`](super::run_session)).
//!
//! ## Phases
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           v
//!        Finished -> Running (restart)
//! ```
//!
//! ## Timer sizing
//!
//! | round    | next round           | timer              |
//! |----------|----------------------|--------------------|
//! | open     | any                  | unbounded          |
//! | fixed(d) | none / starts itself | bounded at `d`     |
//! | fixed(d) | needs a manual start | unbounded          |

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use super::summary::{RoundRecord, SessionSink, SessionSummary};
use super::view::{
    format_elapsed, ActionButtonState, ButtonAction, Lap, SessionSnapshot, SessionViewState,
};
use crate::events::Event;
use crate::plan::{BreathingPlan, PlanSource, Round, RoundDuration, RoundType};
use crate::timer::{
    ChannelListener, IntervalTimer, TimerConfig, TimerEvent, TimerEventKind, DEFAULT_PERIOD_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No timer has been started yet.
    Idle,
    Running,
    Paused,
    /// Every round of the plan has been completed.
    Finished,
}

pub struct SessionController {
    plans: Box<dyn PlanSource>,
    sink: Option<Box<dyn SessionSink>>,
    scheduler: Handle,
    period_ms: i64,

    phase: SessionPhase,
    plan: Option<BreathingPlan>,
    round_index: usize,
    timer: Option<IntervalTimer>,
    /// Id of the timer whose events are current; older ids are stale.
    timer_id: u64,
    round_elapsed_ms: u64,
    /// Whether `NextRequired` went out for the current round.
    next_required_sent: bool,
    /// Sum of recorded lap durations.
    completed_ms: u64,
    laps: Vec<Lap>,
    records: Vec<RoundRecord>,
    last_summary: Option<SessionSummary>,

    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    published: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    /// Create an idle controller. Timers run on `scheduler`.
    pub fn new(plans: impl PlanSource + 'static, scheduler: Handle) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (published, _) = watch::channel(SessionSnapshot::default());
        Self {
            plans: Box::new(plans),
            sink: None,
            scheduler,
            period_ms: DEFAULT_PERIOD_MS as i64,
            phase: SessionPhase::Idle,
            plan: None,
            round_index: 0,
            timer: None,
            timer_id: 0,
            round_elapsed_ms: 0,
            next_required_sent: false,
            completed_ms: 0,
            laps: Vec::new(),
            records: Vec::new(),
            last_summary: None,
            timer_tx,
            timer_rx,
            published,
        }
    }

    /// Tick period for every timer this controller creates.
    pub fn with_period_ms(mut self, period_ms: i64) -> Self {
        self.period_ms = period_ms;
        self
    }

    /// Where finished sessions are saved.
    pub fn with_sink(mut self, sink: impl SessionSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn plan(&self) -> Option<&BreathingPlan> {
        self.plan.as_ref()
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.plan.as_ref()?.round(self.round_index)
    }

    pub fn timer(&self) -> Option<&IntervalTimer> {
        self.timer.as_ref()
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.published.subscribe()
    }

    /// Summary of the most recently finished session.
    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    /// Wait for the next callback from the active timer.
    pub async fn next_timer_event(&mut self) -> Option<TimerEvent> {
        self.timer_rx.recv().await
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Perform whatever the action button currently offers.
    pub fn click(&mut self) -> Option<Event> {
        match self.button_action() {
            ButtonAction::Start => Some(self.start()),
            ButtonAction::Pause => self.pause(),
            ButtonAction::Resume => self.resume(),
            ButtonAction::Next => self.advance(),
        }
    }

    /// Begin a session with a fresh plan, discarding any previous progress.
    pub fn start(&mut self) -> Event {
        self.teardown_timer();
        let plan = self.plans.fetch();

        self.round_index = 0;
        self.round_elapsed_ms = 0;
        self.completed_ms = 0;
        self.laps.clear();
        self.records.clear();
        self.phase = SessionPhase::Running;

        let title = plan.title().clone();
        let round_count = plan.len();
        self.plan = Some(plan);
        let timer_end_ms = self.start_round_timer();
        self.publish();

        let round_type = self.current_round_type();
        info!(title = %title, round_count, "breathing session started");
        Event::SessionStarted {
            title,
            round_count,
            round_type,
            timer_end_ms,
            at: Utc::now(),
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.button_action() != ButtonAction::Pause {
            return None;
        }
        self.timer.as_mut()?.pause();
        self.phase = SessionPhase::Paused;
        self.publish();
        debug!(round = self.round_index, elapsed_ms = self.round_elapsed_ms, "session paused");
        Some(Event::SessionPaused {
            round_index: self.round_index,
            elapsed_ms: self.round_elapsed_ms,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.phase != SessionPhase::Paused {
            return None;
        }
        self.timer.as_mut()?.resume();
        self.phase = SessionPhase::Running;
        self.publish();
        debug!(round = self.round_index, elapsed_ms = self.round_elapsed_ms, "session resumed");
        Some(Event::SessionResumed {
            round_index: self.round_index,
            elapsed_ms: self.round_elapsed_ms,
            at: Utc::now(),
        })
    }

    /// Apply a timer callback. Events from replaced timers are ignored.
    pub fn handle_timer_event(&mut self, event: TimerEvent) -> Option<Event> {
        if event.timer_id != self.timer_id || self.timer.is_none() {
            trace!(timer_id = event.timer_id, current = self.timer_id, "stale timer event");
            return None;
        }
        match event.kind {
            TimerEventKind::Tick(time_ms) => self.on_tick(time_ms),
            TimerEventKind::Finished => self.advance(),
        }
    }

    /// Stop the timer and drop back to idle. No-op without a timer.
    pub fn teardown(&mut self) -> Option<Event> {
        let elapsed_ms = self.teardown_timer()?;
        let round_index = self.round_index;
        let unfinished = matches!(self.phase, SessionPhase::Running | SessionPhase::Paused);

        self.phase = SessionPhase::Idle;
        self.plan = None;
        self.round_index = 0;
        self.round_elapsed_ms = 0;
        self.completed_ms = 0;
        self.laps.clear();
        self.records.clear();
        self.publish();

        unfinished.then(|| {
            debug!(round = round_index, elapsed_ms, "session torn down");
            Event::SessionStopped {
                round_index,
                elapsed_ms,
                at: Utc::now(),
            }
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Ticks applied while paused still advance the round; the overrun is
    /// announced on the first tick seen while running.
    fn on_tick(&mut self, time_ms: u64) -> Option<Event> {
        self.round_elapsed_ms = time_ms;
        self.publish();

        let fixed = matches!(
            self.current_round().map(|r| r.duration),
            Some(RoundDuration::Fixed(_))
        );
        if fixed && !self.next_required_sent && self.button_action() == ButtonAction::Next {
            self.next_required_sent = true;
            debug!(round = self.round_index, time_ms, "round ran past its length");
            return Some(Event::NextRequired {
                round_index: self.round_index,
                elapsed_ms: time_ms,
                at: Utc::now(),
            });
        }
        None
    }

    /// Record a lap for the current round and move on, or finish.
    fn advance(&mut self) -> Option<Event> {
        if !matches!(self.phase, SessionPhase::Running | SessionPhase::Paused) {
            return None;
        }
        let plan = self.plan.as_ref()?;
        let round = *plan.round(self.round_index)?;
        let has_next = plan.has_next_round(self.round_index);
        let manual_next = has_next && !plan.next_round_starts_automatically(self.round_index);

        let elapsed_ms = self.teardown_timer().unwrap_or(self.round_elapsed_ms);
        let lap_ms = match round.duration {
            RoundDuration::Fixed(expected) if !manual_next => expected,
            _ => elapsed_ms,
        };

        self.completed_ms = self.completed_ms.saturating_add(lap_ms);
        let lap = Lap::new(self.laps.len() + 1, lap_ms);
        self.laps.push(lap.clone());
        if let Some(round_type) = round.round_type.recorded() {
            self.records.push(RoundRecord {
                round_type,
                expected_ms: round.duration.fixed_ms(),
                actual_ms: lap_ms,
            });
        }

        if has_next {
            self.round_index += 1;
            self.phase = SessionPhase::Running;
            let timer_end_ms = self.start_round_timer();
            self.publish();
            debug!(round = self.round_index, ?timer_end_ms, "advanced to next round");
            Some(Event::RoundAdvanced {
                lap,
                round_index: self.round_index,
                round_type: self.current_round_type(),
                timer_end_ms,
                at: Utc::now(),
            })
        } else {
            self.phase = SessionPhase::Finished;
            self.round_elapsed_ms = 0;
            self.publish();
            self.save_summary();
            info!(laps = self.laps.len(), total_ms = self.completed_ms, "breathing session finished");
            Some(Event::SessionFinished {
                lap,
                lap_count: self.laps.len(),
                total_ms: self.completed_ms,
                at: Utc::now(),
            })
        }
    }

    /// Create and start the timer for the current round. Returns its bound.
    fn start_round_timer(&mut self) -> Option<u64> {
        let plan = self.plan.as_ref()?;
        let round = plan.round(self.round_index)?;
        let end_ms = match round.duration {
            RoundDuration::Open => None,
            RoundDuration::Fixed(expected) => {
                let auto_advance = !plan.has_next_round(self.round_index)
                    || plan.next_round_starts_automatically(self.round_index);
                auto_advance.then_some(expected)
            }
        };

        self.timer_id += 1;
        let mut timer = IntervalTimer::new(
            TimerConfig::new(0, self.period_ms, end_ms),
            self.scheduler.clone(),
        );
        timer.set_listener(ChannelListener::new(self.timer_id, self.timer_tx.clone()));
        timer.start();

        self.timer = Some(timer);
        self.round_elapsed_ms = 0;
        self.next_required_sent = false;
        end_ms
    }

    /// Stop and detach the active timer, returning its elapsed time.
    fn teardown_timer(&mut self) -> Option<u64> {
        let mut timer = self.timer.take()?;
        let elapsed = timer.stop();
        timer.remove_listener();
        Some(elapsed)
    }

    fn save_summary(&mut self) {
        let Some(plan) = self.plan.as_ref() else {
            return;
        };
        let summary = SessionSummary {
            title: plan.title().raw().to_string(),
            completed_at: Utc::now(),
            rounds: self.records.clone(),
        };
        if let Some(sink) = self.sink.as_ref() {
            if let Err(e) = sink.save(&summary) {
                warn!(error = %e, "failed to save session summary");
            }
        }
        self.last_summary = Some(summary);
    }

    fn current_round_type(&self) -> RoundType {
        self.current_round()
            .map(|r| r.round_type)
            .unwrap_or(RoundType::Idle)
    }

    fn button_action(&self) -> ButtonAction {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Finished => ButtonAction::Start,
            SessionPhase::Paused => ButtonAction::Resume,
            SessionPhase::Running => {
                let Some(plan) = self.plan.as_ref() else {
                    return ButtonAction::Start;
                };
                let Some(round) = plan.round(self.round_index) else {
                    return ButtonAction::Start;
                };
                let manual_next = plan.has_next_round(self.round_index)
                    && !plan.next_round_starts_automatically(self.round_index);
                match round.duration {
                    RoundDuration::Fixed(expected) if manual_next => {
                        if self.round_elapsed_ms > expected {
                            ButtonAction::Next
                        } else {
                            ButtonAction::Pause
                        }
                    }
                    RoundDuration::Open => ButtonAction::Next,
                    RoundDuration::Fixed(_) => ButtonAction::Pause,
                }
            }
        }
    }

    fn view(&self) -> SessionViewState {
        match self.phase {
            SessionPhase::Idle => SessionViewState::idle(),
            SessionPhase::Finished => SessionViewState {
                total_time_text: format_elapsed(self.completed_ms),
                laps: self.laps.clone(),
                ..SessionViewState::placeholder(RoundType::Finished)
            },
            SessionPhase::Running | SessionPhase::Paused => {
                let round_type = if self.phase == SessionPhase::Paused {
                    RoundType::Pause
                } else {
                    self.current_round_type()
                };
                let progress = match self.current_round().map(|r| r.duration) {
                    Some(RoundDuration::Fixed(expected)) if expected > 0 => {
                        (self.round_elapsed_ms as f64 / expected as f64).min(1.0)
                    }
                    _ => 0.0,
                };
                SessionViewState {
                    round_type,
                    current_time_text: format_elapsed(self.round_elapsed_ms),
                    total_time_text: format_elapsed(
                        self.completed_ms.saturating_add(self.round_elapsed_ms),
                    ),
                    progress,
                    laps: self.laps.clone(),
                }
            }
        }
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            view: self.view(),
            button: ActionButtonState::from(self.button_action()),
        };
        self.published.send_replace(snapshot);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown_timer();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .field("round_index", &self.round_index)
            .field("timer", &self.timer)
            .field("laps", &self.laps.len())
            .finish()
    }
}
