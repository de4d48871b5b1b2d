//! Stimulus pool: one-shot role assignment for the stimulus inventory.
//!
//! The inventory is a flat range of stimulus identities. One permutation is
//! drawn, then sliced contiguously into the role pools, so no identity ever
//! appears in two pools.

use anyhow::{ensure, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sampling::shuffled;

/// Identity of a stimulus within the session inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StimulusId(pub u32);

impl std::fmt::Display for StimulusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Role a stimulus was assigned at pool construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulusRole {
    /// Main-task stimulus for the low-payout condition.
    LowMain,
    /// Main-task stimulus for the high-payout condition.
    HighMain,
    /// Never presented in the main task; foil for the memory test.
    MemoryProbe,
    /// Practice-block stimulus.
    Practice,
    /// Left over after all pools are filled.
    Unused,
}

/// Sizes of the named sub-pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolLayout {
    pub low_main: usize,
    pub high_main: usize,
    pub memory_probe: usize,
    pub practice: usize,
}

impl PoolLayout {
    /// Total number of identities the layout consumes.
    pub fn total(&self) -> usize {
        self.low_main + self.high_main + self.memory_probe + self.practice
    }
}

impl Default for PoolLayout {
    fn default() -> Self {
        // 33 main stimuli per condition, 30 memory foils, 5 practice.
        Self {
            low_main: 33,
            high_main: 33,
            memory_probe: 30,
            practice: 5,
        }
    }
}

/// Disjoint role pools over the stimulus inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StimulusPool {
    low_main: Vec<StimulusId>,
    high_main: Vec<StimulusId>,
    memory_probe: Vec<StimulusId>,
    practice: Vec<StimulusId>,
    unused: Vec<StimulusId>,
}

impl StimulusPool {
    /// Permute `inventory_size` identities and slice them into role pools.
    ///
    /// Fails when the layout asks for more identities than the inventory
    /// holds. Deterministic for a fixed random source.
    pub fn assign(
        inventory_size: usize,
        layout: &PoolLayout,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        ensure!(
            layout.total() <= inventory_size,
            "pool layout needs {} stimuli but the inventory holds only {}",
            layout.total(),
            inventory_size
        );

        let ids: Vec<StimulusId> = (0..inventory_size as u32).map(StimulusId).collect();
        let mut ids = shuffled(rng, &ids).into_iter();

        let mut take = |n: usize| -> Vec<StimulusId> { ids.by_ref().take(n).collect() };
        let low_main = take(layout.low_main);
        let high_main = take(layout.high_main);
        let memory_probe = take(layout.memory_probe);
        let practice = take(layout.practice);
        let unused = take(inventory_size - layout.total());

        Ok(Self {
            low_main,
            high_main,
            memory_probe,
            practice,
            unused,
        })
    }

    pub fn low_main(&self) -> &[StimulusId] {
        &self.low_main
    }

    pub fn high_main(&self) -> &[StimulusId] {
        &self.high_main
    }

    pub fn memory_probe(&self) -> &[StimulusId] {
        &self.memory_probe
    }

    pub fn practice(&self) -> &[StimulusId] {
        &self.practice
    }

    /// Role of an identity, `Unused` when it fell outside every named pool.
    pub fn role(&self, id: StimulusId) -> StimulusRole {
        if self.low_main.contains(&id) {
            StimulusRole::LowMain
        } else if self.high_main.contains(&id) {
            StimulusRole::HighMain
        } else if self.memory_probe.contains(&id) {
            StimulusRole::MemoryProbe
        } else if self.practice.contains(&id) {
            StimulusRole::Practice
        } else {
            StimulusRole::Unused
        }
    }
}
