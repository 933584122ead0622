//! forestrl: gradient-boosted decision forests for reinforcement learning.
//!
//! This crate represents policies and value functions as weighted forests of
//! axis-aligned regression trees and improves them with gradient boosting
//! applied to a policy-gradient (or PPO) surrogate objective.

pub mod data;
pub mod io;
pub mod repr;
pub mod space;
pub mod testing;
pub mod training;

pub use repr::{Forest, ParamVec, Tree};
