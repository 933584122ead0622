//! Training data plumbing: samples, sample streams, and rollouts.

mod rollout;
mod sample;

pub use rollout::{samples_with_advantages, Rollout, RolloutStep};
pub use sample::{compact_samples, minibatch, ByteSample, FeatureSource, MemorySample, Sample};
