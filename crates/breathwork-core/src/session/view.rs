//! UI-facing state published by the session controller.

use serde::{Deserialize, Serialize};

use crate::plan::RoundType;
use crate::text::{keys, DisplayText};

/// Format elapsed milliseconds as `MM:SS`, or `H:MM:SS` past one hour.
pub fn format_elapsed(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// A completed round as shown in the session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    /// 1-based position in the session.
    pub index: usize,
    pub display_time: String,
    pub duration_ms: u64,
}

impl Lap {
    pub fn new(index: usize, duration_ms: u64) -> Self {
        Self {
            index,
            display_time: format_elapsed(duration_ms),
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionViewState {
    pub round_type: RoundType,
    pub current_time_text: String,
    pub total_time_text: String,
    /// Fraction of the current fixed round elapsed, 0.0 for open rounds.
    pub progress: f64,
    pub laps: Vec<Lap>,
}

impl SessionViewState {
    pub fn idle() -> Self {
        Self::placeholder(RoundType::Idle)
    }

    /// Zeroed times for `round_type`.
    pub fn placeholder(round_type: RoundType) -> Self {
        Self {
            round_type,
            current_time_text: format_elapsed(0),
            total_time_text: format_elapsed(0),
            progress: 0.0,
            laps: Vec::new(),
        }
    }
}

impl Default for SessionViewState {
    fn default() -> Self {
        Self::idle()
    }
}

/// What pressing the action button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonAction {
    Start,
    Pause,
    Resume,
    Next,
}

impl ButtonAction {
    pub fn label_key(self) -> &'static str {
        match self {
            ButtonAction::Start => keys::ACTION_START,
            ButtonAction::Pause => keys::ACTION_PAUSE,
            ButtonAction::Resume => keys::ACTION_RESUME,
            ButtonAction::Next => keys::ACTION_NEXT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButtonState {
    pub label: DisplayText,
    pub action: ButtonAction,
}

impl From<ButtonAction> for ActionButtonState {
    fn from(action: ButtonAction) -> Self {
        Self {
            label: DisplayText::resource(action.label_key()),
            action,
        }
    }
}

impl Default for ActionButtonState {
    fn default() -> Self {
        ButtonAction::Start.into()
    }
}

/// Everything a screen needs to render the exercise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub view: SessionViewState,
    pub button: ActionButtonState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(999), "00:00");
        assert_eq!(format_elapsed(61_000), "01:01");
        assert_eq!(format_elapsed(59 * 60_000 + 59_999), "59:59");
    }

    #[test]
    fn formats_hours_without_padding() {
        assert_eq!(format_elapsed(3_600_000), "1:00:00");
        assert_eq!(format_elapsed(10 * 3_600_000 + 5 * 60_000 + 7_000), "10:05:07");
    }

    #[test]
    fn lap_carries_formatted_time() {
        let lap = Lap::new(2, 125_000);
        assert_eq!(lap.display_time, "02:05");
        assert_eq!(lap.index, 2);
    }

    #[test]
    fn button_label_matches_action() {
        let state = ActionButtonState::from(ButtonAction::Resume);
        assert_eq!(state.label, DisplayText::resource(keys::ACTION_RESUME));
        assert_eq!(ActionButtonState::default().action, ButtonAction::Start);
    }
}
