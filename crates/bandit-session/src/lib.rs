//! Bandit Session - simulated runtime for the bandit learning task.
//!
//! Drives the schedules produced by `bandit-core` through a sequential
//! per-trial state machine (choose, outcome gate, magnitude reveal,
//! timeout), standing in for the interactive presentation layer. Produces
//! the per-trial records an external log writer would consume.

pub mod chooser;
pub mod records;
pub mod session;

pub use chooser::{ChoicePolicy, Chooser, Side};
pub use records::{BlockPoints, SessionResult, TrialRecord};
pub use session::{BlockOrder, SessionConfig, SessionRunner};
