//! Session summaries handed to durable storage when a session finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::plan::RecordedRoundType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_type: RecordedRoundType,
    /// `None` for open-ended rounds.
    pub expected_ms: Option<u64>,
    pub actual_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub title: String,
    pub completed_at: DateTime<Utc>,
    pub rounds: Vec<RoundRecord>,
}

impl SessionSummary {
    pub fn total_ms(&self) -> u64 {
        self.rounds
            .iter()
            .map(|r| r.actual_ms)
            .fold(0u64, u64::saturating_add)
    }
}

/// Durable storage for finished sessions.
pub trait SessionSink: Send {
    fn save(&self, summary: &SessionSummary) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_actual_times() {
        let summary = SessionSummary {
            title: "t".into(),
            completed_at: Utc::now(),
            rounds: vec![
                RoundRecord {
                    round_type: RecordedRoundType::Hold,
                    expected_ms: None,
                    actual_ms: 42_000,
                },
                RoundRecord {
                    round_type: RecordedRoundType::NormalBreathing,
                    expected_ms: Some(30_000),
                    actual_ms: 30_000,
                },
            ],
        };
        assert_eq!(summary.total_ms(), 72_000);
    }
}
