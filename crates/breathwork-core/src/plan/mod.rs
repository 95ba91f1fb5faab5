//! Breathing plans.
//!
//! A plan is an immutable, non-empty list of rounds. The position inside the
//! plan is a cursor owned by the session controller; the navigation helpers
//! here take that cursor as an argument.

mod round;

pub use round::{RecordedRoundType, Round, RoundDuration, RoundType};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::text::{keys, DisplayText};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathingPlan {
    title: DisplayText,
    rounds: Vec<Round>,
}

impl BreathingPlan {
    /// Build a plan, rejecting empty round lists, meta round types and
    /// zero-length fixed rounds.
    pub fn new(title: DisplayText, rounds: Vec<Round>) -> Result<Self, ValidationError> {
        if rounds.is_empty() {
            return Err(ValidationError::EmptyPlan {
                title: title.raw().to_string(),
            });
        }
        if let Some((index, round)) = rounds
            .iter()
            .enumerate()
            .find(|(_, r)| r.round_type.is_meta())
        {
            return Err(ValidationError::MetaRound {
                index,
                round_type: round.round_type.to_string(),
            });
        }
        if let Some(index) = rounds
            .iter()
            .position(|r| r.duration == RoundDuration::Fixed(0))
        {
            return Err(ValidationError::InvalidValue {
                field: format!("rounds[{index}].duration"),
                message: "fixed rounds must last longer than 0 ms".into(),
            });
        }
        Ok(Self { title, rounds })
    }

    /// The reference exercise: lower breathing, an open breath hold, a second
    /// lower breathing block, another open hold, then 30 s of normal breathing.
    pub fn lower_breathing() -> Self {
        Self {
            title: DisplayText::resource(keys::LOWER_BREATHING_TITLE),
            rounds: vec![
                Round::timed(120, RoundType::LowerBreathing, false),
                Round::open(RoundType::Hold, true),
                Round::timed(120, RoundType::LowerBreathing, false),
                Round::open(RoundType::Hold, true),
                Round::timed(30, RoundType::NormalBreathing, false),
            ],
        }
    }

    pub fn title(&self) -> &DisplayText {
        &self.title
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Always false for a validated plan.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    // ── Navigation ───────────────────────────────────────────────────

    pub fn round(&self, index: usize) -> Option<&Round> {
        self.rounds.get(index)
    }

    pub fn has_next_round(&self, index: usize) -> bool {
        index + 1 < self.rounds.len()
    }

    pub fn next_round_starts_automatically(&self, index: usize) -> bool {
        self.has_next_round(index) && self.rounds[index + 1].starts_automatically
    }

    /// Sum of all fixed round lengths; open rounds count as zero.
    pub fn total_fixed_ms(&self) -> u64 {
        self.rounds
            .iter()
            .filter_map(|r| r.duration.fixed_ms())
            .fold(0u64, u64::saturating_add)
    }

    pub fn open_round_count(&self) -> usize {
        self.rounds.iter().filter(|r| r.is_open()).count()
    }
}

impl Default for BreathingPlan {
    fn default() -> Self {
        Self::lower_breathing()
    }
}

/// Supplies a fresh plan every time a session starts.
pub trait PlanSource: Send {
    fn fetch(&self) -> BreathingPlan;
}

impl<F> PlanSource for F
where
    F: Fn() -> BreathingPlan + Send,
{
    fn fetch(&self) -> BreathingPlan {
        self()
    }
}

impl PlanSource for BreathingPlan {
    fn fetch(&self) -> BreathingPlan {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(rounds: Vec<Round>) -> BreathingPlan {
        BreathingPlan::new(DisplayText::literal("test"), rounds).unwrap()
    }

    #[test]
    fn empty_plan_is_rejected() {
        let err = BreathingPlan::new(DisplayText::literal("empty"), vec![]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::EmptyPlan {
                title: "empty".into()
            }
        );
    }

    #[test]
    fn meta_round_is_rejected() {
        let err = BreathingPlan::new(
            DisplayText::literal("bad"),
            vec![
                Round::timed(5, RoundType::Inhale, false),
                Round::timed(5, RoundType::Finished, true),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::MetaRound { index: 1, .. }));
    }

    #[test]
    fn zero_length_round_is_rejected() {
        let err = BreathingPlan::new(
            DisplayText::literal("zero"),
            vec![Round::new(RoundDuration::Fixed(0), RoundType::Inhale, false)],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn navigation_over_rounds() {
        let p = plan(vec![
            Round::open(RoundType::Hold, false),
            Round::timed(120, RoundType::LowerBreathing, true),
            Round::timed(60, RoundType::NormalBreathing, false),
        ]);

        assert_eq!(p.round(0).map(|r| r.round_type), Some(RoundType::Hold));
        assert!(p.has_next_round(0));
        assert!(p.next_round_starts_automatically(0));

        assert!(p.has_next_round(1));
        assert!(!p.next_round_starts_automatically(1));

        assert!(!p.has_next_round(2));
        assert!(!p.next_round_starts_automatically(2));
        assert!(p.round(3).is_none());
    }

    #[test]
    fn reference_exercise_shape() {
        let p = BreathingPlan::lower_breathing();
        assert_eq!(p.len(), 5);
        assert_eq!(p.open_round_count(), 2);
        assert_eq!(
            p.rounds().last().and_then(|r| r.duration.fixed_ms()),
            Some(30_000)
        );
        assert_eq!(p.total_fixed_ms(), 270_000);
        assert!(BreathingPlan::new(p.title().clone(), p.rounds().to_vec()).is_ok());
    }

    #[test]
    fn closure_plan_source_returns_fresh_plan() {
        let source = || BreathingPlan::lower_breathing();
        assert_eq!(source.fetch(), BreathingPlan::lower_breathing());
    }
}
