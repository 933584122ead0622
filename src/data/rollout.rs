//! In-memory episode rollouts.

use crate::data::{MemorySample, Sample};

/// A single timestep of an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutStep {
    /// Observed features.
    pub features: Vec<f64>,
    /// The action that was taken, encoded for the action space.
    pub action: Vec<f64>,
    /// The action parameters the policy produced for this observation.
    pub action_params: Vec<f64>,
    /// Reward received for the action.
    pub reward: f64,
}

/// One complete episode. The final step is terminal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rollout {
    pub steps: Vec<RolloutStep>,
}

impl Rollout {
    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the episode has no timesteps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of the per-step rewards.
    pub fn total_reward(&self) -> f64 {
        self.steps.iter().map(|s| s.reward).sum()
    }
}

/// Pair rollout steps with advantage estimates, producing training samples.
///
/// `advantages` holds one value per step of each rollout, in the layout
/// produced by `Judger::judge_actions`. Samples are emitted episode by
/// episode, in step order.
pub fn samples_with_advantages(rollouts: &[Rollout], advantages: &[Vec<f64>]) -> Vec<Box<dyn Sample>> {
    assert_eq!(
        rollouts.len(),
        advantages.len(),
        "advantage batch count {} does not match rollout count {}",
        advantages.len(),
        rollouts.len()
    );

    let mut samples: Vec<Box<dyn Sample>> = Vec::new();
    for (rollout, advs) in rollouts.iter().zip(advantages) {
        assert_eq!(
            rollout.len(),
            advs.len(),
            "advantage count {} does not match step count {}",
            advs.len(),
            rollout.len()
        );
        for (step, &advantage) in rollout.steps.iter().zip(advs) {
            samples.push(Box::new(MemorySample {
                features: step.features.clone(),
                action: step.action.clone(),
                action_params: step.action_params.clone(),
                advantage,
            }));
        }
    }
    samples
}
