use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::RoundType;
use crate::session::Lap;
use crate::text::DisplayText;

/// Every state change of a session produces an Event.
/// Front-ends print or forward them; the published snapshot carries the
/// full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        title: DisplayText,
        round_count: usize,
        round_type: RoundType,
        /// `None` when the first round's timer counts up without a bound.
        timer_end_ms: Option<u64>,
        at: DateTime<Utc>,
    },
    RoundAdvanced {
        lap: Lap,
        round_index: usize,
        round_type: RoundType,
        timer_end_ms: Option<u64>,
        at: DateTime<Utc>,
    },
    /// A fixed round ran past its length and waits for a manual advance.
    NextRequired {
        round_index: usize,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        round_index: usize,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        round_index: usize,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    SessionFinished {
        lap: Lap,
        lap_count: usize,
        total_ms: u64,
        at: DateTime<Utc>,
    },
    /// The session was torn down before it finished.
    SessionStopped {
        round_index: usize,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::SessionStarted { at, .. }
            | Event::RoundAdvanced { at, .. }
            | Event::NextRequired { at, .. }
            | Event::SessionPaused { at, .. }
            | Event::SessionResumed { at, .. }
            | Event::SessionFinished { at, .. }
            | Event::SessionStopped { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::NextRequired {
            round_index: 1,
            elapsed_ms: 2000,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "next_required");
        assert_eq!(json["round_index"], 1);

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back.at(), event.at());
    }
}
