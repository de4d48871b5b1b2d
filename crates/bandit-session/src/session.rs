//! Simulated session runner.
//!
//! Stands in for the interactive presentation layer: assigns the stimulus
//! pools, generates both condition schedules up front (each condition with
//! its own generation tracker), then walks every block strictly
//! sequentially. Each trial fully resolves - choice or timeout, coin gate,
//! magnitude - before the next begins. Runtime exposure and win/loss
//! counters live in separate per-condition trackers that feed the chooser
//! and the trial records; win/loss counters are reset for both conditions at
//! every block boundary.

use anyhow::{anyhow, ensure, Result};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bandit_core::{
    ExposureTracker, MemoryTestPlan, PayoutCondition, PayoutProfile, PoolLayout, RewardModel,
    ScheduleConfig, ScheduleGenerator, StimulusPool,
};

use crate::chooser::{ChoicePolicy, Chooser, Side};
use crate::records::{BlockPoints, SessionResult, TrialRecord};

/// Order in which the two conditions' blocks are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockOrder {
    /// All low-condition blocks, then all high-condition blocks.
    LowFirst,
    /// All high-condition blocks, then all low-condition blocks.
    HighFirst,
    /// Random interleaving, half low and half high.
    Interleaved,
}

impl BlockOrder {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "low-first" => Ok(Self::LowFirst),
            "high-first" => Ok(Self::HighFirst),
            "interleaved" => Ok(Self::Interleaved),
            other => Err(anyhow!(
                "unknown block order '{other}' (expected 'low-first', 'high-first' or 'interleaved')"
            )),
        }
    }

    /// Sequence of `blocks_per_condition` blocks of each condition.
    fn sequence(self, blocks_per_condition: usize, rng: &mut impl Rng) -> Vec<PayoutCondition> {
        let mut order: Vec<PayoutCondition> = match self {
            BlockOrder::HighFirst => std::iter::repeat(PayoutCondition::High)
                .take(blocks_per_condition)
                .chain(std::iter::repeat(PayoutCondition::Low).take(blocks_per_condition))
                .collect(),
            BlockOrder::LowFirst | BlockOrder::Interleaved => {
                std::iter::repeat(PayoutCondition::Low)
                    .take(blocks_per_condition)
                    .chain(std::iter::repeat(PayoutCondition::High).take(blocks_per_condition))
                    .collect()
            }
        };
        if self == BlockOrder::Interleaved {
            order.shuffle(rng);
        }
        order
    }
}

/// Full configuration of a simulated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub schedule: ScheduleConfig,
    pub layout: PoolLayout,
    /// Total stimulus inventory the pool permutes.
    pub inventory: usize,
    /// Payout profile name ('classic' or 'extended').
    pub payout_profile: String,
    pub block_order: BlockOrder,
    pub policy: ChoicePolicy,
    /// Probability that a trial ends without a response.
    pub timeout_rate: f64,
    /// Familiar stimuli per condition in the memory test.
    pub memory_items_per_condition: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let layout = PoolLayout::default();
        Self {
            schedule: ScheduleConfig::default(),
            inventory: layout.total(),
            layout,
            payout_profile: "extended".to_string(),
            block_order: BlockOrder::Interleaved,
            policy: ChoicePolicy::Greedy { epsilon: 0.1 },
            timeout_rate: 0.02,
            memory_items_per_condition: 15,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;
        let demand = self.schedule.novel_demand();
        ensure!(
            self.layout.low_main >= demand,
            "low-condition pool of {} cannot cover the {} novel stimuli the schedule consumes",
            self.layout.low_main,
            demand
        );
        ensure!(
            self.layout.high_main >= demand,
            "high-condition pool of {} cannot cover the {} novel stimuli the schedule consumes",
            self.layout.high_main,
            demand
        );
        ensure!(
            self.layout.memory_probe >= self.memory_items_per_condition * 2,
            "memory-probe pool of {} cannot supply {} unseen foils",
            self.layout.memory_probe,
            self.memory_items_per_condition * 2
        );
        Ok(())
    }
}

/// Runs one seeded session end to end.
pub struct SessionRunner {
    config: SessionConfig,
}

impl SessionRunner {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the session. Every draw routes through one generator seeded from
    /// `seed`, so the whole run (schedules plus outcomes) is reproducible.
    pub fn run(&self, seed: u64) -> Result<SessionResult> {
        let started_at = Utc::now();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let config = &self.config;

        let profile = PayoutProfile::by_name(&config.payout_profile)?;
        let reward_model = RewardModel::new(profile);
        let chooser = Chooser::new(config.policy, config.timeout_rate)?;

        let pool = StimulusPool::assign(config.inventory, &config.layout, &mut rng)?;
        let threshold = config.schedule.familiar_threshold;

        // Generation pass: each condition gets its own bookkeeping tracker.
        let low_schedule = ScheduleGenerator::new(config.schedule.clone(), PayoutCondition::Low)?
            .generate(
                &mut ExposureTracker::new(pool.low_main(), threshold),
                &mut rng,
            )?;
        let high_schedule = ScheduleGenerator::new(config.schedule.clone(), PayoutCondition::High)?
            .generate(
                &mut ExposureTracker::new(pool.high_main(), threshold),
                &mut rng,
            )?;
        info!(
            seed,
            blocks = config.schedule.blocks * 2,
            trials = config.schedule.blocks * 2 * config.schedule.trials_per_block,
            "schedules generated"
        );

        // Runtime trackers: what the participant-facing layer has observed.
        let mut low_tracker = ExposureTracker::new(pool.low_main(), threshold);
        let mut high_tracker = ExposureTracker::new(pool.high_main(), threshold);

        let order = config
            .block_order
            .sequence(config.schedule.blocks, &mut rng);

        let mut trials = Vec::new();
        let mut block_points = Vec::new();
        let mut cursor_low = 0usize;
        let mut cursor_high = 0usize;
        let mut session_trial = 0usize;

        for condition in order {
            let (schedule, tracker, cursor) = match condition {
                PayoutCondition::Low => (&low_schedule, &mut low_tracker, &mut cursor_low),
                PayoutCondition::High => (&high_schedule, &mut high_tracker, &mut cursor_high),
            };
            let block = schedule
                .blocks
                .get(*cursor)
                .ok_or_else(|| anyhow!("block cursor overran the {condition} schedule"))?;
            *cursor += 1;

            let mut points = 0u64;
            for (t, plan) in block.trials.iter().enumerate() {
                let pair = plan.pair;
                let side = chooser.choose(pair, tracker, &mut rng)?;

                let record = match side {
                    None => TrialRecord {
                        condition,
                        block: block.index,
                        trial: t,
                        session_trial,
                        left: pair[0],
                        right: pair[1],
                        chosen: None,
                        unchosen: None,
                        chosen_exposures: None,
                        chosen_wins: None,
                        chosen_losses: None,
                        assigned_probability: None,
                        success: false,
                        magnitude: None,
                        timed_out: true,
                    },
                    Some(side) => {
                        let (chosen, unchosen) = match side {
                            Side::Left => (pair[0], pair[1]),
                            Side::Right => (pair[1], pair[0]),
                        };
                        let stats = tracker.stats(chosen)?;
                        let p = block.assigned_probability(chosen).ok_or_else(|| {
                            anyhow!("{chosen} has no probability assignment in block {}", block.index)
                        })?;
                        let draw = reward_model.draw(p, condition, &mut rng)?;
                        tracker.record_outcome(chosen, draw.success)?;
                        points += u64::from(draw.magnitude.unwrap_or(0));

                        TrialRecord {
                            condition,
                            block: block.index,
                            trial: t,
                            session_trial,
                            left: pair[0],
                            right: pair[1],
                            chosen: Some(chosen),
                            unchosen: Some(unchosen),
                            chosen_exposures: Some(stats.exposures),
                            chosen_wins: Some(stats.wins),
                            chosen_losses: Some(stats.losses),
                            assigned_probability: Some(p),
                            success: draw.success,
                            magnitude: draw.magnitude,
                            timed_out: false,
                        }
                    }
                };

                // Both displayed stimuli count as one more exposure.
                tracker.record_presentation(pair[0])?;
                tracker.record_presentation(pair[1])?;
                trials.push(record);
                session_trial += 1;
            }

            debug!(%condition, block = block.index, points, "block finished");
            block_points.push(BlockPoints {
                condition,
                block: block.index,
                points,
            });

            // Block boundary: outcome counters start fresh for both
            // conditions, exposure is untouched.
            low_tracker.reset_outcome_counters();
            high_tracker.reset_outcome_counters();
        }

        let memory_test = MemoryTestPlan::build(
            &low_tracker,
            &high_tracker,
            pool.memory_probe(),
            config.memory_items_per_condition,
            &mut rng,
        )?;

        Ok(SessionResult {
            seed,
            payout_profile: config.payout_profile.clone(),
            started_at,
            ended_at: Utc::now(),
            trials,
            block_points,
            memory_test,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SessionConfig {
        SessionConfig {
            schedule: ScheduleConfig {
                blocks: 2,
                trials_per_block: 20,
                ..ScheduleConfig::default()
            },
            layout: PoolLayout {
                low_main: 7,
                high_main: 7,
                memory_probe: 6,
                practice: 0,
            },
            inventory: 20,
            payout_profile: "extended".to_string(),
            block_order: BlockOrder::LowFirst,
            policy: ChoicePolicy::Random,
            timeout_rate: 0.0,
            memory_items_per_condition: 2,
        }
    }

    /// Familiar-pool availability in later blocks depends on how block 0's
    /// presentations spread, so tests scan seeds and use the first run that
    /// completes.
    fn first_successful_run(config: &SessionConfig) -> (u64, SessionResult) {
        let runner = SessionRunner::new(config.clone()).unwrap();
        for seed in 0..20 {
            if let Ok(result) = runner.run(seed) {
                return (seed, result);
            }
        }
        panic!("no seed in 0..20 completed a session");
    }

    #[test]
    fn session_covers_every_scheduled_trial() {
        let config = small_config();
        let (_, result) = first_successful_run(&config);

        assert_eq!(result.trials.len(), 2 * 2 * 20);
        assert_eq!(result.block_points.len(), 4);
        let low = result
            .trials
            .iter()
            .filter(|t| t.condition == PayoutCondition::Low)
            .count();
        assert_eq!(low, 40);

        for record in &result.trials {
            assert!(!record.timed_out);
            let chosen = record.chosen.unwrap();
            let unchosen = record.unchosen.unwrap();
            assert!(chosen == record.left || chosen == record.right);
            assert_ne!(chosen, unchosen);
            assert_eq!(record.success, record.magnitude.is_some());
        }
    }

    #[test]
    fn identical_seeds_reproduce_identical_runs() {
        let config = small_config();
        let (seed, first) = first_successful_run(&config);
        let runner = SessionRunner::new(config).unwrap();
        let second = runner.run(seed).unwrap();

        let strip = |r: &SessionResult| {
            serde_json::to_value(&r.trials).unwrap()
        };
        assert_eq!(strip(&first), strip(&second));
        assert_eq!(
            serde_json::to_value(&first.memory_test).unwrap(),
            serde_json::to_value(&second.memory_test).unwrap()
        );
    }

    #[test]
    fn full_timeout_sessions_score_nothing() {
        let config = SessionConfig {
            timeout_rate: 1.0,
            ..small_config()
        };
        let (_, result) = first_successful_run(&config);

        assert_eq!(result.timeout_count(), result.trials.len());
        assert_eq!(result.total_points(), 0);
        for record in &result.trials {
            assert!(record.chosen.is_none());
            assert!(!record.success);
            assert!(record.magnitude.is_none());
        }
    }

    #[test]
    fn undersized_pools_are_rejected_up_front() {
        let config = SessionConfig {
            layout: PoolLayout {
                low_main: 6, // schedule needs 7
                high_main: 7,
                memory_probe: 6,
                practice: 0,
            },
            ..small_config()
        };
        assert!(SessionRunner::new(config).is_err());
    }

    #[test]
    fn memory_test_draws_familiar_and_unseen_items() {
        let config = small_config();
        let (_, result) = first_successful_run(&config);
        assert_eq!(result.memory_test.items.len(), 8);
    }
}
