//! Post-session memory-test selection.
//!
//! After both condition runs, the memory test shows familiar stimuli from
//! each condition interleaved with never-presented foils, in one shuffled
//! order. Selection reads the final exposure state of the two condition
//! trackers.

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pool::StimulusId;
use crate::sampling::{sample_without_replacement, shuffled};
use crate::tracker::ExposureTracker;

/// Provenance of a memory-test item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryItemKind {
    /// Familiar stimulus from the high-payout condition.
    HighFamiliar,
    /// Familiar stimulus from the low-payout condition.
    LowFamiliar,
    /// Foil from the memory-probe pool, never presented.
    Unseen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: StimulusId,
    pub kind: MemoryItemKind,
}

/// Shuffled presentation order for the memory test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTestPlan {
    pub items: Vec<MemoryItem>,
}

impl MemoryTestPlan {
    /// Select `per_condition` familiar stimuli from each condition tracker
    /// and `2 * per_condition` unseen foils, then shuffle the combined
    /// order. Fails when either condition produced too few familiar stimuli
    /// or the foil pool is too small.
    pub fn build(
        low: &ExposureTracker,
        high: &ExposureTracker,
        foils: &[StimulusId],
        per_condition: usize,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        let low_familiar = sample_without_replacement(rng, &low.familiar_ids(), per_condition)
            .context("selecting familiar memory items from the low condition")?;
        let high_familiar = sample_without_replacement(rng, &high.familiar_ids(), per_condition)
            .context("selecting familiar memory items from the high condition")?;
        let unseen = sample_without_replacement(rng, foils, per_condition * 2)
            .context("selecting unseen memory foils")?;

        let mut items: Vec<MemoryItem> = Vec::with_capacity(per_condition * 4);
        items.extend(high_familiar.into_iter().map(|id| MemoryItem {
            id,
            kind: MemoryItemKind::HighFamiliar,
        }));
        items.extend(low_familiar.into_iter().map(|id| MemoryItem {
            id,
            kind: MemoryItemKind::LowFamiliar,
        }));
        items.extend(unseen.into_iter().map(|id| MemoryItem {
            id,
            kind: MemoryItemKind::Unseen,
        }));

        Ok(Self {
            items: shuffled(rng, &items),
        })
    }
}
