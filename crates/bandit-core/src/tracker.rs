//! Per-stimulus exposure and outcome bookkeeping for one payout condition.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pool::StimulusId;

/// Counters for a single stimulus.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StimulusStats {
    /// Trials in which the stimulus was presented. Never reset within a
    /// condition run.
    pub exposures: u32,
    /// Rewarded choices since the last block boundary.
    pub wins: u32,
    /// Unrewarded choices since the last block boundary.
    pub losses: u32,
}

/// Exposure tracker for the stimuli of one condition.
///
/// Eligibility for the schedule generator is derived from the exposure
/// counter: a stimulus is *novel* while it has never been presented and
/// *familiar* once its exposure count exceeds the familiarity threshold.
/// Win/loss counters exist for the presentation layer, which resets them at
/// block boundaries; the reset never touches exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureTracker {
    ids: Vec<StimulusId>,
    index: HashMap<StimulusId, usize>,
    stats: Vec<StimulusStats>,
    familiar_threshold: u32,
}

impl ExposureTracker {
    /// Track the given stimuli. `familiar_threshold` is the exposure count a
    /// stimulus must exceed to count as familiar.
    pub fn new(ids: &[StimulusId], familiar_threshold: u32) -> Self {
        let index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self {
            ids: ids.to_vec(),
            index,
            stats: vec![StimulusStats::default(); ids.len()],
            familiar_threshold,
        }
    }

    fn slot(&self, id: StimulusId) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| anyhow!("stimulus {id} is not tracked in this condition"))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn stats(&self, id: StimulusId) -> Result<StimulusStats> {
        Ok(self.stats[self.slot(id)?])
    }

    pub fn is_novel(&self, id: StimulusId) -> Result<bool> {
        Ok(self.stats[self.slot(id)?].exposures == 0)
    }

    pub fn is_familiar(&self, id: StimulusId) -> Result<bool> {
        Ok(self.stats[self.slot(id)?].exposures > self.familiar_threshold)
    }

    /// Stimuli never presented so far, in tracking order.
    pub fn novel_ids(&self) -> Vec<StimulusId> {
        self.ids
            .iter()
            .zip(&self.stats)
            .filter(|(_, s)| s.exposures == 0)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Stimuli presented more than the familiarity threshold, in tracking
    /// order.
    pub fn familiar_ids(&self) -> Vec<StimulusId> {
        self.ids
            .iter()
            .zip(&self.stats)
            .filter(|(_, s)| s.exposures > self.familiar_threshold)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Count one presentation of `id`.
    pub fn record_presentation(&mut self, id: StimulusId) -> Result<()> {
        let slot = self.slot(id)?;
        self.stats[slot].exposures += 1;
        Ok(())
    }

    /// Count one choice outcome for `id`.
    pub fn record_outcome(&mut self, id: StimulusId, success: bool) -> Result<()> {
        let slot = self.slot(id)?;
        if success {
            self.stats[slot].wins += 1;
        } else {
            self.stats[slot].losses += 1;
        }
        Ok(())
    }

    /// Zero every win/loss counter, leaving exposure untouched. Called by
    /// the presentation layer at block boundaries.
    pub fn reset_outcome_counters(&mut self) {
        for s in &mut self.stats {
            s.wins = 0;
            s.losses = 0;
        }
    }
}
