//! Schedule generation parameters.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// How holdout introduction offsets are matched against trial ordinals.
///
/// The two historical runs of this task disagreed: one compared the drawn
/// offset against a 0-indexed trial counter, the other against a 1-indexed
/// one, shifting every introduction by one trial. Which convention the study
/// design intends is an explicit configuration choice, not something the
/// generator guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldoutIndexing {
    /// Offset `k` introduces the holdout on the trial with 0-indexed ordinal `k`.
    ZeroBased,
    /// Offset `k` introduces the holdout on the trial with 1-indexed ordinal `k`.
    OneBased,
}

/// Parameters for one condition's schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Blocks per condition.
    pub blocks: usize,
    /// Trials per block.
    pub trials_per_block: usize,
    /// Novel stimuli entering the active set of each block after the first.
    /// The first block's active set is entirely novel.
    pub novel_per_block: usize,
    /// Familiar stimuli entering the active set of each block after the first.
    pub familiar_per_block: usize,
    /// Reward probabilities assigned within a block, one per active stimulus.
    pub reward_probs: Vec<f64>,
    /// Trial offsets eligible for holdout introduction.
    pub holdout_window: Vec<usize>,
    /// Indexing convention for `holdout_window` offsets.
    pub holdout_indexing: HoldoutIndexing,
    /// Exposure count a stimulus must exceed to count as familiar.
    pub familiar_threshold: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            blocks: 15,
            trials_per_block: 20,
            novel_per_block: 2,
            familiar_per_block: 3,
            reward_probs: vec![0.2, 0.35, 0.5, 0.65, 0.8],
            holdout_window: (8..=16).collect(),
            holdout_indexing: HoldoutIndexing::OneBased,
            familiar_threshold: 4,
        }
    }
}

impl ScheduleConfig {
    /// Active-set size of every block.
    pub fn active_per_block(&self) -> usize {
        self.novel_per_block + self.familiar_per_block
    }

    /// Distinct never-before-seen stimuli the whole condition consumes: the
    /// first block is all novel, every later block adds `novel_per_block`.
    pub fn novel_demand(&self) -> usize {
        if self.blocks == 0 {
            0
        } else {
            self.active_per_block() + self.novel_per_block * (self.blocks - 1)
        }
    }

    /// Whether a window offset lands on a real trial of a block.
    pub(crate) fn offset_in_range(&self, offset: usize) -> bool {
        match self.holdout_indexing {
            HoldoutIndexing::ZeroBased => offset < self.trials_per_block,
            HoldoutIndexing::OneBased => (1..=self.trials_per_block).contains(&offset),
        }
    }

    /// Check internal consistency. Generation refuses to start on an
    /// invalid configuration.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.blocks >= 1, "at least one block is required");
        ensure!(self.trials_per_block >= 1, "at least one trial per block is required");
        ensure!(
            self.active_per_block() >= 2,
            "active set of {} cannot fill a two-stimulus trial",
            self.active_per_block()
        );
        ensure!(
            self.reward_probs.len() == self.active_per_block(),
            "{} reward probabilities cannot cover an active set of {}",
            self.reward_probs.len(),
            self.active_per_block()
        );
        for &p in &self.reward_probs {
            ensure!(
                (0.0..=1.0).contains(&p),
                "reward probability {p} is outside [0, 1]"
            );
        }
        if self.blocks > 1 {
            ensure!(
                self.novel_per_block >= 2 && self.familiar_per_block >= 2,
                "holdout selection needs at least 2 novel and 2 familiar stimuli per block"
            );
            ensure!(
                self.active_per_block() >= 4,
                "with two stimuli held out, an active set of {} cannot fill a trial",
                self.active_per_block()
            );
            ensure!(
                self.holdout_window.len() >= 2,
                "holdout window of {} offsets cannot yield two distinct introduction trials",
                self.holdout_window.len()
            );
            for &offset in &self.holdout_window {
                ensure!(
                    self.offset_in_range(offset),
                    "holdout offset {} is outside the {} trials of a block ({:?} indexing)",
                    offset,
                    self.trials_per_block,
                    self.holdout_indexing
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ScheduleConfig::default();
        config.validate().unwrap();
        assert_eq!(config.active_per_block(), 5);
        assert_eq!(config.novel_demand(), 5 + 2 * 14);
    }

    #[test]
    fn probability_count_must_match_active_set() {
        let config = ScheduleConfig {
            reward_probs: vec![0.2, 0.5, 0.8],
            ..ScheduleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn single_offset_window_is_rejected() {
        let config = ScheduleConfig {
            holdout_window: vec![8],
            ..ScheduleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let config = ScheduleConfig {
            trials_per_block: 10,
            holdout_window: vec![9, 11],
            ..ScheduleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn indexing_shifts_the_valid_offset_range() {
        let one_based = ScheduleConfig {
            trials_per_block: 16,
            ..ScheduleConfig::default()
        };
        assert!(one_based.validate().is_ok());

        // Offset 16 names the 17th trial under zero-based indexing.
        let zero_based = ScheduleConfig {
            trials_per_block: 16,
            holdout_indexing: HoldoutIndexing::ZeroBased,
            ..ScheduleConfig::default()
        };
        assert!(zero_based.validate().is_err());
    }
}
