//! Restartable count-up interval timer.
//!
//! The timer runs one periodic task on an injected tokio runtime handle. Each
//! period it adds the period to `time` and notifies the current listener.
//! With a bound it stops itself once `time >= end_ms` and reports completion.
//!
//! ```text
//! start() -> [wait period -> time += period -> on_tick(time)]* -> on_finish()
//!              ^ pause() suspends here, resume() continues
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Tick period used when a non-positive period is requested.
pub const DEFAULT_PERIOD_MS: u64 = 1000;

/// Normalized timer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    start_ms: u64,
    period_ms: u64,
    end_ms: Option<u64>,
}

impl TimerConfig {
    /// Negative start times clamp to zero; non-positive periods fall back to
    /// [`DEFAULT_PERIOD_MS`]. `end_ms = None` counts up forever.
    pub fn new(start_ms: i64, period_ms: i64, end_ms: Option<u64>) -> Self {
        let period_ms = if period_ms > 0 {
            period_ms as u64
        } else {
            DEFAULT_PERIOD_MS
        };
        Self {
            start_ms: start_ms.max(0) as u64,
            period_ms,
            end_ms,
        }
    }

    pub fn unbounded(period_ms: i64) -> Self {
        Self::new(0, period_ms, None)
    }

    pub fn bounded(period_ms: i64, end_ms: u64) -> Self {
        Self::new(0, period_ms, Some(end_ms))
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn end_ms(&self) -> Option<u64> {
        self.end_ms
    }

    pub fn is_bounded(&self) -> bool {
        self.end_ms.is_some()
    }

    /// A bound at or before the start emits nothing.
    fn is_degenerate(&self) -> bool {
        self.end_ms.is_some_and(|end| end <= self.start_ms)
    }
}

/// Receives timer callbacks. Only one listener is attached at a time.
pub trait TimerListener: Send + 'static {
    fn on_tick(&mut self, time_ms: u64);

    fn on_finish(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEventKind {
    Tick(u64),
    Finished,
}

/// A timer callback tagged with the id of the timer that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub timer_id: u64,
    pub kind: TimerEventKind,
}

/// Forwards callbacks into an mpsc channel so a single consumer can
/// serialize them with other input.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    timer_id: u64,
    tx: mpsc::UnboundedSender<TimerEvent>,
}

impl ChannelListener {
    pub fn new(timer_id: u64, tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self { timer_id, tx }
    }

    fn send(&self, kind: TimerEventKind) {
        // A closed receiver means nobody is listening anymore.
        let _ = self.tx.send(TimerEvent {
            timer_id: self.timer_id,
            kind,
        });
    }
}

impl TimerListener for ChannelListener {
    fn on_tick(&mut self, time_ms: u64) {
        self.send(TimerEventKind::Tick(time_ms));
    }

    fn on_finish(&mut self) {
        self.send(TimerEventKind::Finished);
    }
}

type ListenerSlot = Arc<Mutex<Option<Box<dyn TimerListener>>>>;

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct IntervalTimer {
    config: TimerConfig,
    scheduler: Handle,
    time: Arc<AtomicU64>,
    listener: ListenerSlot,
    paused: watch::Sender<bool>,
    task: Option<RunningTask>,
}

impl IntervalTimer {
    pub fn new(config: TimerConfig, scheduler: Handle) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            time: Arc::new(AtomicU64::new(config.start_ms)),
            config,
            scheduler,
            listener: Arc::new(Mutex::new(None)),
            paused,
            task: None,
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Last observed time in milliseconds.
    pub fn time(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn set_listener(&mut self, listener: impl TimerListener) {
        *self.slot() = Some(Box::new(listener));
    }

    pub fn remove_listener(&mut self) {
        self.slot().take();
    }

    /// Start counting from `start_ms`, replacing any task already running.
    pub fn start(&mut self) {
        self.cancel_task();
        self.time.store(self.config.start_ms, Ordering::SeqCst);
        self.paused.send_replace(false);

        if self.config.is_degenerate() {
            debug!(
                start_ms = self.config.start_ms,
                end_ms = ?self.config.end_ms,
                "timer bound not after start, nothing to run"
            );
            return;
        }

        let cancel = CancellationToken::new();
        let handle = self.scheduler.spawn(run_ticks(
            self.config,
            self.time.clone(),
            self.listener.clone(),
            self.paused.subscribe(),
            cancel.clone(),
        ));
        trace!(config = ?self.config, "timer started");
        self.task = Some(RunningTask { cancel, handle });
    }

    /// Cancel ticking and return the last observed time. Safe to call when
    /// nothing is running.
    pub fn stop(&mut self) -> u64 {
        self.cancel_task();
        self.time()
    }

    pub fn pause(&mut self) {
        self.paused.send_if_modified(|paused| !std::mem::replace(paused, true));
    }

    pub fn resume(&mut self) {
        self.paused.send_if_modified(|paused| std::mem::replace(paused, false));
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            task.handle.abort();
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Box<dyn TimerListener>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.cancel_task();
    }
}

impl std::fmt::Debug for IntervalTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalTimer")
            .field("config", &self.config)
            .field("time", &self.time())
            .field("running", &self.is_running())
            .field("paused", &self.is_paused())
            .finish()
    }
}

fn notify(listener: &ListenerSlot, f: impl FnOnce(&mut dyn TimerListener)) {
    let mut guard = listener.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(listener) = guard.as_mut() {
        f(listener.as_mut());
    }
}

async fn run_ticks(
    config: TimerConfig,
    time: Arc<AtomicU64>,
    listener: ListenerSlot,
    mut paused: watch::Receiver<bool>,
    cancel: CancellationToken,
) {
    let period = Duration::from_millis(config.period_ms);
    let mut ticked = false;

    while config
        .end_ms
        .map_or(true, |end| time.load(Ordering::SeqCst) < end)
    {
        let is_paused = *paused.borrow_and_update();
        if is_paused {
            tokio::select! {
                _ = cancel.cancelled() => return,
                resumed = paused.wait_for(|p| !*p) => {
                    if resumed.is_err() {
                        return;
                    }
                }
            }
            paused.borrow_and_update();
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(period) => {}
            changed = paused.changed() => {
                if changed.is_err() {
                    return;
                }
                // Paused mid-period; the partial wait is dropped.
                continue;
            }
        }

        let now = time
            .fetch_add(config.period_ms, Ordering::SeqCst)
            .saturating_add(config.period_ms);
        notify(&listener, |l| l.on_tick(now));
        ticked = true;
    }

    if ticked {
        notify(&listener, |l| l.on_finish());
    }
}
