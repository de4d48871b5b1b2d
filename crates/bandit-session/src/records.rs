//! Per-trial records and session results.
//!
//! These are the fields an external log writer reads after each trial:
//! chosen/unchosen identity, the chooser-visible counters at the moment of
//! choice, the assigned probability, and the reward outcome.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bandit_core::{MemoryTestPlan, PayoutCondition, StimulusId};

/// Outcome of one presented trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub condition: PayoutCondition,
    /// Block ordinal within the condition.
    pub block: usize,
    /// Trial ordinal within the block, 0-indexed.
    pub trial: usize,
    /// Trial ordinal across the whole session, 0-indexed.
    pub session_trial: usize,
    pub left: StimulusId,
    pub right: StimulusId,
    /// Chosen stimulus; absent on timeout.
    pub chosen: Option<StimulusId>,
    /// Unchosen stimulus; absent on timeout.
    pub unchosen: Option<StimulusId>,
    /// Exposure count of the chosen stimulus at the moment of choice.
    pub chosen_exposures: Option<u32>,
    /// Win count of the chosen stimulus since the last block boundary.
    pub chosen_wins: Option<u32>,
    /// Loss count of the chosen stimulus since the last block boundary.
    pub chosen_losses: Option<u32>,
    /// Reward probability assigned to the chosen stimulus for this block.
    pub assigned_probability: Option<f64>,
    /// Coin-gate outcome; false on timeout.
    pub success: bool,
    /// Reward magnitude; present only on success.
    pub magnitude: Option<u32>,
    /// Whether the trial ended without a response.
    pub timed_out: bool,
}

/// Points accumulated within one block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockPoints {
    pub condition: PayoutCondition,
    pub block: usize,
    pub points: u64,
}

/// Full output of one simulated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub seed: u64,
    /// Name of the payout profile in force.
    pub payout_profile: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub trials: Vec<TrialRecord>,
    pub block_points: Vec<BlockPoints>,
    pub memory_test: MemoryTestPlan,
}

impl SessionResult {
    /// Save as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing results to {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Load a previously saved result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("reading results from {}", path.as_ref().display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn total_points(&self) -> u64 {
        self.block_points.iter().map(|b| b.points).sum()
    }

    pub fn timeout_count(&self) -> usize {
        self.trials.iter().filter(|t| t.timed_out).count()
    }
}
