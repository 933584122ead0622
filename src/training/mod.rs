//! Training infrastructure for boosted policy and value forests.
//!
//! ## Building blocks
//!
//! - [`TreeAlgorithm`]: split criteria and leaf formulae
//! - [`Builder`]: recursive best-split tree construction
//! - [`compute_objective`], [`BatchObjective`]: surrogate objectives and
//!   their per-sample gradients
//!
//! ## Algorithms
//!
//! - [`PolicyGradient`]: vanilla policy-gradient boosting step
//! - [`PPO`]: clipped-surrogate boosting step with weight fine-tuning
//! - [`Judger`]: value-function training and advantage estimation
//! - [`Trainer`]: the full iteration loop over collected rollouts

mod algorithm;
mod builder;
mod judger;
mod logger;
mod objective;
mod pg;
mod ppo;
mod trainer;

pub use algorithm::{SplitTracker, TreeAlgorithm};
pub use builder::Builder;
pub use judger::Judger;
pub use logger::{TrainingLogger, Verbosity};
pub use objective::{compute_objective, BatchObjective, GradientSample, ObjectiveTerms};
pub use pg::PolicyGradient;
pub use ppo::{PPO, DEFAULT_PPO_EPSILON};
pub use trainer::{IterationReport, Surrogate, Trainer, TrainerParams, TrainerParamsBuilder};
