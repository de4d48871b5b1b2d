//! Read-only schedule tables produced by the generator.
//!
//! One [`ConditionSchedule`] per payout condition, indexed block-then-trial.
//! The presentation layer walks the trial plans in order; nothing here is
//! mutated after generation.

use serde::{Deserialize, Serialize};

use crate::pool::StimulusId;
use crate::reward::PayoutCondition;

/// A withheld stimulus and the trial offset at which it enters the block.
/// The offset uses the configured indexing convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holdout {
    pub id: StimulusId,
    pub intro_offset: usize,
}

/// One trial's presented pair. Element order is the left/right display
/// order; it carries no other meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialPlan {
    pub pair: [StimulusId; 2],
}

impl TrialPlan {
    pub fn left(&self) -> StimulusId {
        self.pair[0]
    }

    pub fn right(&self) -> StimulusId {
        self.pair[1]
    }

    pub fn contains(&self, id: StimulusId) -> bool {
        self.pair[0] == id || self.pair[1] == id
    }
}

/// One block of the schedule: active set, probability assignment, holdouts,
/// and the trial-by-trial presentation plan.
///
/// `active_set` and `probabilities` are parallel: `probabilities[i]` is the
/// reward probability assigned to `active_set[i]` for the whole block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSchedule {
    pub index: usize,
    pub active_set: Vec<StimulusId>,
    pub probabilities: Vec<f64>,
    pub novel_holdout: Option<Holdout>,
    pub familiar_holdout: Option<Holdout>,
    pub trials: Vec<TrialPlan>,
}

impl BlockSchedule {
    /// Reward probability assigned to `id` in this block.
    pub fn assigned_probability(&self, id: StimulusId) -> Option<f64> {
        self.active_set
            .iter()
            .position(|&a| a == id)
            .map(|i| self.probabilities[i])
    }
}

/// Full schedule for one payout condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSchedule {
    pub condition: PayoutCondition,
    pub blocks: Vec<BlockSchedule>,
}

impl ConditionSchedule {
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Presented pair of a trial, by block and 0-indexed trial ordinal.
    pub fn pair(&self, block: usize, trial: usize) -> Option<[StimulusId; 2]> {
        self.blocks.get(block)?.trials.get(trial).map(|t| t.pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigned_probability_follows_the_parallel_tables() {
        let block = BlockSchedule {
            index: 0,
            active_set: vec![StimulusId(3), StimulusId(8), StimulusId(1)],
            probabilities: vec![0.2, 0.5, 0.8],
            novel_holdout: None,
            familiar_holdout: None,
            trials: vec![],
        };
        assert_eq!(block.assigned_probability(StimulusId(8)), Some(0.5));
        assert_eq!(block.assigned_probability(StimulusId(4)), None);
    }
}
