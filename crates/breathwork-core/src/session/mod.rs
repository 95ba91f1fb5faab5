mod controller;
mod runner;
mod summary;
mod view;

pub use controller::{SessionController, SessionPhase};
pub use runner::{run_session, SessionCommand};
pub use summary::{RoundRecord, SessionSink, SessionSummary};
pub use view::{
    format_elapsed, ActionButtonState, ButtonAction, Lap, SessionSnapshot, SessionViewState,
};
