use std::fmt;

use serde::{Deserialize, Serialize};

/// What the user is asked to do during a round.
///
/// `Idle` and `Finished` describe the session rather than a round and never
/// appear in a plan. `Pause` is only ever shown transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    Idle,
    Inhale,
    Exhale,
    Hold,
    Pause,
    LowerBreathing,
    NormalBreathing,
    Finished,
}

impl RoundType {
    /// Meta states describe the session, not a breathing round.
    pub fn is_meta(self) -> bool {
        matches!(self, RoundType::Idle | RoundType::Pause | RoundType::Finished)
    }

    /// Map to the subset that is written to session history.
    pub fn recorded(self) -> Option<RecordedRoundType> {
        match self {
            RoundType::Inhale => Some(RecordedRoundType::Inhale),
            RoundType::Exhale => Some(RecordedRoundType::Exhale),
            RoundType::Hold => Some(RecordedRoundType::Hold),
            RoundType::LowerBreathing => Some(RecordedRoundType::LowerBreathing),
            RoundType::NormalBreathing => Some(RecordedRoundType::NormalBreathing),
            RoundType::Idle | RoundType::Pause | RoundType::Finished => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoundType::Idle => "idle",
            RoundType::Inhale => "inhale",
            RoundType::Exhale => "exhale",
            RoundType::Hold => "hold",
            RoundType::Pause => "pause",
            RoundType::LowerBreathing => "lower_breathing",
            RoundType::NormalBreathing => "normal_breathing",
            RoundType::Finished => "finished",
        }
    }
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Round types that are persisted in session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedRoundType {
    Inhale,
    Exhale,
    Hold,
    LowerBreathing,
    NormalBreathing,
}

impl RecordedRoundType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordedRoundType::Inhale => "inhale",
            RecordedRoundType::Exhale => "exhale",
            RecordedRoundType::Hold => "hold",
            RecordedRoundType::LowerBreathing => "lower_breathing",
            RecordedRoundType::NormalBreathing => "normal_breathing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inhale" => Some(RecordedRoundType::Inhale),
            "exhale" => Some(RecordedRoundType::Exhale),
            "hold" => Some(RecordedRoundType::Hold),
            "lower_breathing" => Some(RecordedRoundType::LowerBreathing),
            "normal_breathing" => Some(RecordedRoundType::NormalBreathing),
            _ => None,
        }
    }
}

impl From<RecordedRoundType> for RoundType {
    fn from(value: RecordedRoundType) -> Self {
        match value {
            RecordedRoundType::Inhale => RoundType::Inhale,
            RecordedRoundType::Exhale => RoundType::Exhale,
            RecordedRoundType::Hold => RoundType::Hold,
            RecordedRoundType::LowerBreathing => RoundType::LowerBreathing,
            RecordedRoundType::NormalBreathing => RoundType::NormalBreathing,
        }
    }
}

/// Expected length of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundDuration {
    /// Fixed length in milliseconds.
    Fixed(u64),
    /// No fixed length; the user advances manually.
    Open,
}

impl RoundDuration {
    pub fn fixed_ms(self) -> Option<u64> {
        match self {
            RoundDuration::Fixed(ms) => Some(ms),
            RoundDuration::Open => None,
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, RoundDuration::Open)
    }
}

/// One phase of a breathing exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub duration: RoundDuration,
    pub round_type: RoundType,
    /// Whether this round begins on its own once the previous round's timer
    /// runs out.
    #[serde(default)]
    pub starts_automatically: bool,
}

impl Round {
    pub fn new(duration: RoundDuration, round_type: RoundType, starts_automatically: bool) -> Self {
        Self {
            duration,
            round_type,
            starts_automatically,
        }
    }

    /// Fixed round of `secs` seconds.
    pub fn timed(secs: u64, round_type: RoundType, starts_automatically: bool) -> Self {
        Self::new(
            RoundDuration::Fixed(secs.saturating_mul(1000)),
            round_type,
            starts_automatically,
        )
    }

    /// Open-ended round.
    pub fn open(round_type: RoundType, starts_automatically: bool) -> Self {
        Self::new(RoundDuration::Open, round_type, starts_automatically)
    }

    pub fn is_open(&self) -> bool {
        self.duration.is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_types_are_not_recorded() {
        assert_eq!(RoundType::Idle.recorded(), None);
        assert_eq!(RoundType::Pause.recorded(), None);
        assert_eq!(RoundType::Finished.recorded(), None);
        assert_eq!(RoundType::Hold.recorded(), Some(RecordedRoundType::Hold));
    }

    #[test]
    fn recorded_type_parses_its_own_name() {
        for t in [
            RecordedRoundType::Inhale,
            RecordedRoundType::Exhale,
            RecordedRoundType::Hold,
            RecordedRoundType::LowerBreathing,
            RecordedRoundType::NormalBreathing,
        ] {
            assert_eq!(RecordedRoundType::parse(t.as_str()), Some(t));
            assert_eq!(RoundType::from(t).as_str(), t.as_str());
        }
        assert_eq!(RecordedRoundType::parse("finished"), None);
    }

    #[test]
    fn timed_round_converts_seconds() {
        let round = Round::timed(30, RoundType::NormalBreathing, true);
        assert_eq!(round.duration.fixed_ms(), Some(30_000));
        assert!(!round.is_open());
    }

    #[test]
    fn duration_serializes_as_tagged_value() {
        let json = serde_json::to_string(&RoundDuration::Fixed(1500)).unwrap();
        assert_eq!(json, r#"{"fixed":1500}"#);
        let open = serde_json::to_string(&RoundDuration::Open).unwrap();
        assert_eq!(open, r#""open""#);
    }
}
