//! Reward model: Bernoulli coin gate plus condition-keyed magnitude draw.

use anyhow::{anyhow, ensure, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Block-level payout condition. Selects the magnitude distribution only;
/// coin probabilities are per-stimulus and independent of the condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutCondition {
    Low,
    High,
}

impl std::fmt::Display for PayoutCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutCondition::Low => write!(f, "low"),
            PayoutCondition::High => write!(f, "high"),
        }
    }
}

/// Magnitude distribution parameters for one condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutParams {
    pub mean: f64,
    pub sd: f64,
}

/// Named pair of low/high magnitude distributions.
///
/// Two profiles are carried because the two historical runs of the task used
/// different constants. Neither is collapsed into the other; which one a
/// session uses is a configuration choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutProfile {
    pub low: PayoutParams,
    pub high: PayoutParams,
}

impl PayoutProfile {
    /// Constants of the original single-schedule run: low 5±1, high 50±10.
    pub fn classic() -> Self {
        Self {
            low: PayoutParams { mean: 5.0, sd: 1.0 },
            high: PayoutParams { mean: 50.0, sd: 10.0 },
        }
    }

    /// Constants of the two-condition run: low 10±1, high 100±10.
    pub fn extended() -> Self {
        Self {
            low: PayoutParams { mean: 10.0, sd: 1.0 },
            high: PayoutParams { mean: 100.0, sd: 10.0 },
        }
    }

    /// Look up a profile by name.
    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "classic" => Ok(Self::classic()),
            "extended" => Ok(Self::extended()),
            other => Err(anyhow!(
                "unknown payout profile '{other}' (expected 'classic' or 'extended')"
            )),
        }
    }

    pub fn params(&self, condition: PayoutCondition) -> PayoutParams {
        match condition {
            PayoutCondition::Low => self.low,
            PayoutCondition::High => self.high,
        }
    }
}

impl Default for PayoutProfile {
    fn default() -> Self {
        Self::extended()
    }
}

/// Outcome of one trial's reward draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDraw {
    /// Whether the coin gate succeeded.
    pub success: bool,
    /// Reward magnitude; present only on success. Negative normal samples
    /// are clipped to zero before rounding.
    pub magnitude: Option<u32>,
}

/// Stateless reward sampler for one payout profile.
#[derive(Debug, Clone, Copy)]
pub struct RewardModel {
    profile: PayoutProfile,
}

impl RewardModel {
    pub fn new(profile: PayoutProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> PayoutProfile {
        self.profile
    }

    /// Draw one trial outcome: Bernoulli(`p`) coin, then on success a
    /// rounded, zero-clipped normal magnitude for `condition`.
    pub fn draw(
        &self,
        p: f64,
        condition: PayoutCondition,
        rng: &mut impl Rng,
    ) -> Result<RewardDraw> {
        ensure!(
            (0.0..=1.0).contains(&p),
            "reward probability {p} is outside [0, 1]"
        );
        let success = rng.random_bool(p);
        let magnitude = if success {
            let params = self.profile.params(condition);
            let normal = Normal::new(params.mean, params.sd)
                .map_err(|e| anyhow!("invalid magnitude distribution for {condition}: {e}"))?;
            let value: f64 = normal.sample(rng);
            Some(value.max(0.0).round() as u32)
        } else {
            None
        };
        Ok(RewardDraw { success, magnitude })
    }
}
