//! Bandit Core - stimulus scheduling and reward model for a
//! multi-armed-bandit learning task.
//!
//! The task presents two stimuli per trial drawn from a per-block active set
//! of five. Across blocks, stimuli move from *novel* (never presented) to
//! *familiar* (presented more than a threshold number of times), and each
//! block after the first withholds one novel and one familiar stimulus until
//! a randomly drawn introduction trial.
//!
//! This crate owns the generation side only:
//!
//! - [`pool`]: one-shot partition of the stimulus inventory into role pools
//! - [`tracker`]: per-stimulus exposure and win/loss bookkeeping
//! - [`generator`]: the per-condition block/trial schedule generator
//! - [`reward`]: the Bernoulli-gated reward-magnitude model
//! - [`memory`]: post-session memory-probe selection
//!
//! Presentation (screens, key collection, persistence) lives elsewhere and
//! consumes the read-only tables produced here. Every random draw takes an
//! explicit `&mut impl Rng`, so a single seeded source reproduces an entire
//! schedule byte for byte.

pub mod config;
pub mod generator;
pub mod memory;
pub mod pool;
pub mod reward;
pub mod sampling;
pub mod schedule;
pub mod tracker;

pub use config::{HoldoutIndexing, ScheduleConfig};
pub use generator::ScheduleGenerator;
pub use memory::{MemoryItem, MemoryItemKind, MemoryTestPlan};
pub use pool::{PoolLayout, StimulusId, StimulusPool, StimulusRole};
pub use reward::{PayoutCondition, PayoutParams, PayoutProfile, RewardDraw, RewardModel};
pub use schedule::{BlockSchedule, ConditionSchedule, Holdout, TrialPlan};
pub use tracker::ExposureTracker;
