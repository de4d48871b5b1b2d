//! Simulated participant: picks one of the two presented stimuli.

use anyhow::{anyhow, ensure, Result};
use bandit_core::{ExposureTracker, StimulusId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which of the displayed pair was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Choice policy for the simulated participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoicePolicy {
    /// Uniform over the two options.
    Random,
    /// Pick the option with the higher observed win rate; explore with
    /// probability `epsilon`. Unobserved options tie at 0.5.
    Greedy { epsilon: f64 },
}

impl ChoicePolicy {
    pub fn parse(name: &str, epsilon: f64) -> Result<Self> {
        match name {
            "random" => Ok(Self::Random),
            "greedy" => Ok(Self::Greedy { epsilon }),
            other => Err(anyhow!("unknown choice policy '{other}' (expected 'random' or 'greedy')")),
        }
    }
}

/// Chooser with a timeout path: with probability `timeout_rate` the trial
/// ends without a response, which is a normal terminal transition, not an
/// error.
#[derive(Debug, Clone, Copy)]
pub struct Chooser {
    policy: ChoicePolicy,
    timeout_rate: f64,
}

impl Chooser {
    pub fn new(policy: ChoicePolicy, timeout_rate: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&timeout_rate),
            "timeout rate {timeout_rate} is outside [0, 1]"
        );
        if let ChoicePolicy::Greedy { epsilon } = policy {
            ensure!(
                (0.0..=1.0).contains(&epsilon),
                "epsilon {epsilon} is outside [0, 1]"
            );
        }
        Ok(Self { policy, timeout_rate })
    }

    /// Choose between the displayed pair, or time out.
    pub fn choose(
        &self,
        pair: [StimulusId; 2],
        tracker: &ExposureTracker,
        rng: &mut impl Rng,
    ) -> Result<Option<Side>> {
        if self.timeout_rate > 0.0 && rng.random_bool(self.timeout_rate) {
            return Ok(None);
        }

        let side = match self.policy {
            ChoicePolicy::Random => {
                if rng.random_bool(0.5) {
                    Side::Left
                } else {
                    Side::Right
                }
            }
            ChoicePolicy::Greedy { epsilon } => {
                if epsilon > 0.0 && rng.random_bool(epsilon) {
                    if rng.random_bool(0.5) {
                        Side::Left
                    } else {
                        Side::Right
                    }
                } else {
                    let left = win_rate(tracker, pair[0])?;
                    let right = win_rate(tracker, pair[1])?;
                    if (left - right).abs() < f64::EPSILON {
                        if rng.random_bool(0.5) {
                            Side::Left
                        } else {
                            Side::Right
                        }
                    } else if left > right {
                        Side::Left
                    } else {
                        Side::Right
                    }
                }
            }
        };
        Ok(Some(side))
    }
}

fn win_rate(tracker: &ExposureTracker, id: StimulusId) -> Result<f64> {
    let stats = tracker.stats(id)?;
    let observed = stats.wins + stats.losses;
    if observed == 0 {
        Ok(0.5)
    } else {
        Ok(f64::from(stats.wins) / f64::from(observed))
    }
}
