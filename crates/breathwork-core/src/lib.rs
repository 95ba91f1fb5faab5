//! # Breathwork Core Library
//!
//! This library provides the logic behind a guided breathing exercise. The
//! CLI binary is a thin terminal front-end over the same core library.
//!
//! ## Architecture
//!
//! - **Interval timer**: a restartable count-up clock that ticks on a fixed
//!   period on an injected tokio runtime and reports each tick to a single
//!   listener
//! - **Plans**: immutable, ordered lists of breathing rounds, each fixed-length
//!   or open-ended and optionally starting on its own
//! - **Session controller**: the state machine that sequences rounds, records
//!   laps and publishes what the exercise screen shows
//! - **Storage**: SQLite session history and TOML configuration
//!
//! ## Key Components
//!
//! - [`IntervalTimer`]: periodic count-up timer
//! - [`BreathingPlan`]: rounds of an exercise
//! - [`SessionController`]: session state machine
//! - [`Database`]: finished session history
//! - [`Config`]: application configuration

pub mod error;
pub mod events;
pub mod plan;
pub mod session;
pub mod storage;
pub mod text;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use plan::{BreathingPlan, PlanSource, RecordedRoundType, Round, RoundDuration, RoundType};
pub use session::{
    run_session, ActionButtonState, ButtonAction, Lap, SessionCommand, SessionController,
    SessionPhase, SessionSink, SessionSnapshot, SessionSummary, SessionViewState,
};
pub use storage::{Config, Database};
pub use text::{DisplayText, EnglishText, TextResolver};
pub use timer::{IntervalTimer, TimerConfig, TimerEvent, TimerEventKind, TimerListener};
