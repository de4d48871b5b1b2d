//! Per-condition schedule generator.
//!
//! Produces the block/trial tables for one payout condition in a single
//! pass: active-set selection from the exposure tracker's eligibility pools,
//! holdout designation and introduction timing, reward-probability
//! assignment, and the trial-by-trial presented pairs. The tracker is
//! updated as each trial is scheduled, so eligibility for later blocks
//! reflects everything scheduled so far.
//!
//! Generation is a pure function of (config, tracker state, random source):
//! re-running with the same seed and starting state reproduces identical
//! tables. Any sampling step whose pool is too small aborts the whole
//! condition with a configuration error; a block is never under-filled.

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use tracing::debug;

use crate::config::{HoldoutIndexing, ScheduleConfig};
use crate::pool::StimulusId;
use crate::reward::PayoutCondition;
use crate::sampling::{sample_without_replacement, shuffled};
use crate::schedule::{BlockSchedule, ConditionSchedule, Holdout, TrialPlan};
use crate::tracker::ExposureTracker;

/// Schedule generator for one payout condition.
///
/// The condition is a label threaded into the output tables; the algorithm
/// itself never branches on it. Low and high conditions are generated by two
/// instances, each with its own tracker.
pub struct ScheduleGenerator {
    config: ScheduleConfig,
    condition: PayoutCondition,
}

/// Working selection for one block before its trials are laid out.
struct BlockSelection {
    active_set: Vec<StimulusId>,
    available: Vec<StimulusId>,
    novel_holdout: Option<Holdout>,
    familiar_holdout: Option<Holdout>,
}

impl ScheduleGenerator {
    pub fn new(config: ScheduleConfig, condition: PayoutCondition) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, condition })
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn condition(&self) -> PayoutCondition {
        self.condition
    }

    /// Generate the full condition schedule, updating `tracker` with one
    /// presentation per stimulus per scheduled trial.
    pub fn generate(
        &self,
        tracker: &mut ExposureTracker,
        rng: &mut impl Rng,
    ) -> Result<ConditionSchedule> {
        let mut blocks = Vec::with_capacity(self.config.blocks);
        for index in 0..self.config.blocks {
            let block = self
                .generate_block(index, tracker, rng)
                .with_context(|| format!("generating block {index} of the {} condition", self.condition))?;
            blocks.push(block);
        }
        Ok(ConditionSchedule {
            condition: self.condition,
            blocks,
        })
    }

    /// Select the active set for block `index` and lay out its trials.
    fn generate_block(
        &self,
        index: usize,
        tracker: &mut ExposureTracker,
        rng: &mut impl Rng,
    ) -> Result<BlockSchedule> {
        let selection = if index == 0 {
            self.select_first_block(tracker, rng)?
        } else {
            self.select_later_block(tracker, rng)?
        };

        // Fresh bijection from active stimuli to the fixed probability set.
        let probabilities = shuffled(rng, &self.config.reward_probs);

        debug!(
            block = index,
            active = ?selection.active_set,
            novel_holdout = ?selection.novel_holdout,
            familiar_holdout = ?selection.familiar_holdout,
            "block selection"
        );

        let trials = self.lay_out_trials(&selection, tracker, rng)?;

        Ok(BlockSchedule {
            index,
            active_set: selection.active_set,
            probabilities,
            novel_holdout: selection.novel_holdout,
            familiar_holdout: selection.familiar_holdout,
            trials,
        })
    }

    /// Block 0: the whole active set comes from the novel pool and is
    /// available from the first trial.
    fn select_first_block(
        &self,
        tracker: &ExposureTracker,
        rng: &mut impl Rng,
    ) -> Result<BlockSelection> {
        let novel_pool = tracker.novel_ids();
        let active_set =
            sample_without_replacement(rng, &novel_pool, self.config.active_per_block())
                .context("selecting the first block's all-novel active set")?;
        Ok(BlockSelection {
            available: active_set.clone(),
            active_set,
            novel_holdout: None,
            familiar_holdout: None,
        })
    }

    /// Blocks after the first: novel and familiar stimuli are sampled from
    /// their eligibility pools; the last-sampled of each kind is withheld
    /// until an introduction offset drawn from the holdout window. The two
    /// offsets are drawn without replacement, so they always differ.
    fn select_later_block(
        &self,
        tracker: &ExposureTracker,
        rng: &mut impl Rng,
    ) -> Result<BlockSelection> {
        let novel_pool = tracker.novel_ids();
        let novel = sample_without_replacement(rng, &novel_pool, self.config.novel_per_block)
            .context("selecting novel stimuli for the active set")?;

        let familiar_pool = tracker.familiar_ids();
        let familiar =
            sample_without_replacement(rng, &familiar_pool, self.config.familiar_per_block)
                .context("selecting familiar stimuli for the active set")?;

        let offsets = sample_without_replacement(rng, &self.config.holdout_window, 2)
            .context("drawing holdout introduction offsets")?;

        let (&novel_holdout_id, novel_open) = novel
            .split_last()
            .ok_or_else(|| anyhow!("empty novel selection"))?;
        let (&familiar_holdout_id, familiar_open) = familiar
            .split_last()
            .ok_or_else(|| anyhow!("empty familiar selection"))?;

        let mut available = Vec::with_capacity(self.config.active_per_block());
        available.extend_from_slice(novel_open);
        available.extend_from_slice(familiar_open);

        let mut active_set = Vec::with_capacity(self.config.active_per_block());
        active_set.extend_from_slice(&novel);
        active_set.extend_from_slice(&familiar);

        Ok(BlockSelection {
            active_set,
            available,
            novel_holdout: Some(Holdout {
                id: novel_holdout_id,
                intro_offset: offsets[0],
            }),
            familiar_holdout: Some(Holdout {
                id: familiar_holdout_id,
                intro_offset: offsets[1],
            }),
        })
    }

    /// Walk the block's trials, forcing holdouts in at their introduction
    /// offsets and filling the remaining slots from the available set.
    fn lay_out_trials(
        &self,
        selection: &BlockSelection,
        tracker: &mut ExposureTracker,
        rng: &mut impl Rng,
    ) -> Result<Vec<TrialPlan>> {
        let mut available = selection.available.clone();
        let mut trials = Vec::with_capacity(self.config.trials_per_block);

        for t in 0..self.config.trials_per_block {
            let ordinal = match self.config.holdout_indexing {
                HoldoutIndexing::ZeroBased => t,
                HoldoutIndexing::OneBased => t + 1,
            };

            let mut forced: Vec<StimulusId> = Vec::new();
            for holdout in [&selection.novel_holdout, &selection.familiar_holdout]
                .into_iter()
                .flatten()
            {
                if holdout.intro_offset == ordinal {
                    // Forced into this trial, available for every later one.
                    forced.push(holdout.id);
                    available.push(holdout.id);
                }
            }

            let fill_count = 2usize.saturating_sub(forced.len());
            let candidates: Vec<StimulusId> = available
                .iter()
                .copied()
                .filter(|id| !forced.contains(id))
                .collect();
            let fill = sample_without_replacement(rng, &candidates, fill_count)
                .with_context(|| format!("filling presentation slots of trial {ordinal}"))?;

            let mut members = forced;
            members.extend(fill);
            // Left/right order is display-only.
            let pair: [StimulusId; 2] = shuffled(rng, &members)
                .try_into()
                .map_err(|_| anyhow!("trial {ordinal} did not resolve to exactly two stimuli"))?;

            tracker.record_presentation(pair[0])?;
            tracker.record_presentation(pair[1])?;
            trials.push(TrialPlan { pair });
        }

        Ok(trials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ids(range: std::ops::Range<u32>) -> Vec<StimulusId> {
        range.map(StimulusId).collect()
    }

    /// Tracker with `familiar` pre-exposed stimuli followed by `novel` fresh
    /// ones, mirroring the state a condition reaches mid-session.
    fn seeded_tracker(familiar: u32, novel: u32, threshold: u32) -> ExposureTracker {
        let all = ids(0..familiar + novel);
        let mut tracker = ExposureTracker::new(&all, threshold);
        for id in ids(0..familiar) {
            for _ in 0..threshold + 1 {
                tracker.record_presentation(id).unwrap();
            }
        }
        tracker
    }

    #[test]
    fn first_block_is_all_novel_and_fully_available() {
        let config = ScheduleConfig {
            blocks: 1,
            trials_per_block: 3,
            ..ScheduleConfig::default()
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::Low).unwrap();
        let mut tracker = ExposureTracker::new(&ids(0..5), 4);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let schedule = generator.generate(&mut tracker, &mut rng).unwrap();
        let block = &schedule.blocks[0];

        assert_eq!(block.active_set.len(), 5);
        assert!(block.novel_holdout.is_none());
        assert!(block.familiar_holdout.is_none());
        for trial in &block.trials {
            assert_ne!(trial.pair[0], trial.pair[1]);
            assert!(block.active_set.contains(&trial.pair[0]));
            assert!(block.active_set.contains(&trial.pair[1]));
        }
    }

    #[test]
    fn later_block_mixes_two_novel_with_three_familiar() {
        let config = ScheduleConfig {
            blocks: 2,
            trials_per_block: 20,
            ..ScheduleConfig::default()
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::High).unwrap();
        // 5 familiar seeds plus 7 novel: 5 consumed by block 0, 2 by block 1.
        let mut tracker = seeded_tracker(5, 7, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let schedule = generator.generate(&mut tracker, &mut rng).unwrap();
        let block = &schedule.blocks[1];

        // Replay exposures up to the start of block 1: the 5 seeds start at
        // threshold + 1, everything else at 0, block 0 adds one per
        // appearance.
        let mut exposures = vec![0u32; 12];
        for id in 0..5 {
            exposures[id] = 5;
        }
        for trial in &schedule.blocks[0].trials {
            exposures[trial.pair[0].0 as usize] += 1;
            exposures[trial.pair[1].0 as usize] += 1;
        }

        assert_eq!(block.active_set.len(), 5);
        let novel_count = block
            .active_set
            .iter()
            .filter(|id| exposures[id.0 as usize] == 0)
            .count();
        let familiar_count = block
            .active_set
            .iter()
            .filter(|id| exposures[id.0 as usize] > 4)
            .count();
        assert_eq!(novel_count, 2);
        assert_eq!(familiar_count, 3);
    }

    #[test]
    fn holdouts_are_absent_before_and_forced_at_their_offset() {
        let config = ScheduleConfig {
            blocks: 2,
            trials_per_block: 20,
            ..ScheduleConfig::default()
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::Low).unwrap();
        let mut tracker = seeded_tracker(5, 7, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let schedule = generator.generate(&mut tracker, &mut rng).unwrap();
        let block = &schedule.blocks[1];
        let novel_holdout = block.novel_holdout.unwrap();
        let familiar_holdout = block.familiar_holdout.unwrap();

        assert_ne!(novel_holdout.intro_offset, familiar_holdout.intro_offset);

        for holdout in [novel_holdout, familiar_holdout] {
            // One-based offsets in the default config.
            let intro_index = holdout.intro_offset - 1;
            for (t, trial) in block.trials.iter().enumerate() {
                if t < intro_index {
                    assert!(
                        !trial.contains(holdout.id),
                        "holdout {} appeared on trial {t}, before offset {}",
                        holdout.id,
                        holdout.intro_offset
                    );
                }
            }
            assert!(block.trials[intro_index].contains(holdout.id));
        }
    }

    #[test]
    fn zero_based_indexing_shifts_the_forced_trial() {
        let config = ScheduleConfig {
            blocks: 2,
            trials_per_block: 20,
            holdout_indexing: HoldoutIndexing::ZeroBased,
            ..ScheduleConfig::default()
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::Low).unwrap();
        let mut tracker = seeded_tracker(5, 7, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let schedule = generator.generate(&mut tracker, &mut rng).unwrap();
        let block = &schedule.blocks[1];
        let holdout = block.novel_holdout.unwrap();
        assert!(block.trials[holdout.intro_offset].contains(holdout.id));
    }

    #[test]
    fn exposure_counts_match_scheduled_appearances() {
        let config = ScheduleConfig {
            blocks: 2,
            trials_per_block: 20,
            ..ScheduleConfig::default()
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::Low).unwrap();
        let mut tracker = seeded_tracker(5, 7, 4);
        let baseline: Vec<u32> = ids(0..12)
            .iter()
            .map(|&id| tracker.stats(id).unwrap().exposures)
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let schedule = generator.generate(&mut tracker, &mut rng).unwrap();

        for id in ids(0..12) {
            let appearances = schedule
                .blocks
                .iter()
                .flat_map(|b| &b.trials)
                .filter(|t| t.contains(id))
                .count() as u32;
            let gained = tracker.stats(id).unwrap().exposures - baseline[id.0 as usize];
            assert_eq!(gained, appearances, "exposure mismatch for {id}");
        }
    }

    #[test]
    fn insufficient_familiar_pool_aborts_generation() {
        // The miniature case: 2 blocks of 3 trials over 7 stimuli. Block 0
        // spreads 6 presentation slots over 5 stimuli, so nothing can exceed
        // 4 exposures and block 1 finds no familiar candidates.
        let config = ScheduleConfig {
            blocks: 2,
            trials_per_block: 3,
            holdout_window: vec![1, 2],
            ..ScheduleConfig::default()
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::Low).unwrap();
        let mut tracker = ExposureTracker::new(&ids(0..7), 4);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let err = generator.generate(&mut tracker, &mut rng).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("block 1"), "unexpected error: {message}");
        assert!(message.contains("familiar"), "unexpected error: {message}");
    }

    #[test]
    fn miniature_first_block_spreads_six_slots_over_five_stimuli() {
        let config = ScheduleConfig {
            blocks: 1,
            trials_per_block: 3,
            holdout_window: vec![1, 2],
            ..ScheduleConfig::default()
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::Low).unwrap();
        let mut tracker = ExposureTracker::new(&ids(0..7), 4);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let schedule = generator.generate(&mut tracker, &mut rng).unwrap();
        let block = &schedule.blocks[0];
        let mut appearances: Vec<usize> = block
            .active_set
            .iter()
            .map(|&id| block.trials.iter().filter(|t| t.contains(id)).count())
            .collect();
        appearances.sort_unstable();
        // 6 slots over 5 distinct stimuli: exactly one appears twice.
        assert_eq!(appearances, vec![1, 1, 1, 1, 2]);
    }

    #[test]
    fn generation_is_deterministic_for_a_fixed_seed() {
        let config = ScheduleConfig {
            blocks: 2,
            trials_per_block: 20,
            ..ScheduleConfig::default()
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::High).unwrap();

        let mut tracker1 = seeded_tracker(5, 7, 4);
        let mut rng1 = ChaCha8Rng::seed_from_u64(99);
        let first = generator.generate(&mut tracker1, &mut rng1).unwrap();

        let mut tracker2 = seeded_tracker(5, 7, 4);
        let mut rng2 = ChaCha8Rng::seed_from_u64(99);
        let second = generator.generate(&mut tracker2, &mut rng2).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn probability_rows_are_permutations_of_the_configured_set() {
        let config = ScheduleConfig {
            blocks: 2,
            trials_per_block: 20,
            ..ScheduleConfig::default()
        };
        let expected = {
            let mut probs = config.reward_probs.clone();
            probs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            probs
        };
        let generator = ScheduleGenerator::new(config, PayoutCondition::Low).unwrap();
        let mut tracker = seeded_tracker(5, 7, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let schedule = generator.generate(&mut tracker, &mut rng).unwrap();
        for block in &schedule.blocks {
            let mut probs = block.probabilities.clone();
            probs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(probs, expected);
        }
    }
}
