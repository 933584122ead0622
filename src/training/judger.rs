//! Value-function training and advantage estimation.

use std::borrow::Borrow;

use rand::Rng;

use crate::data::{Rollout, Sample};
use crate::repr::{Forest, ParamVec, Tree};
use crate::training::{Builder, GradientSample, TreeAlgorithm};

/// Trains and applies a value-function approximator to compute action
/// advantages, reducing variance during policy training.
#[derive(Debug, Clone)]
pub struct Judger {
    /// Predicts the mean reward following a state. Scalar output.
    pub value_func: Forest,

    /// Reward discount factor.
    pub discount: f64,

    /// The GAE parameter. 0 is high-bias and low-variance; 1 is low-bias
    /// and high-variance.
    ///
    /// For more on GAE, see: <https://arxiv.org/abs/1506.02438>.
    pub lambda: f64,

    /// Fraction of features to try for each branching node when training
    /// the value function. If 0, all features are tried.
    pub feature_frac: f64,
}

impl Judger {
    /// Create a judger with a fresh scalar value forest.
    pub fn new(discount: f64, lambda: f64) -> Self {
        Self {
            value_func: Forest::new(1),
            discount,
            lambda,
            feature_frac: 0.0,
        }
    }

    /// Produce advantage estimations for every step of every rollout.
    ///
    /// Uses Generalized Advantage Estimation with the configured discount
    /// and lambda, evaluating the current value forest on each observation.
    pub fn judge_actions(&self, rollouts: &[Rollout]) -> Vec<Vec<f64>> {
        rollouts
            .iter()
            .map(|rollout| {
                let values: Vec<f64> = rollout
                    .steps
                    .iter()
                    .map(|step| self.value_func.apply(&step.features)[0])
                    .collect();

                let mut advantages = vec![0.0; rollout.len()];
                let mut acc = 0.0;
                for t in (0..rollout.len()).rev() {
                    let next_value = if t + 1 < rollout.len() { values[t + 1] } else { 0.0 };
                    let delta = rollout.steps[t].reward + self.discount * next_value - values[t];
                    acc = delta + self.discount * self.lambda * acc;
                    advantages[t] = acc;
                }
                advantages
            })
            .collect()
    }

    /// Produce samples suitable for [`train`](Judger::train) and
    /// [`optimal_weight`](Judger::optimal_weight).
    ///
    /// Each sample's advantage field holds the discounted remaining reward
    /// of its episode, the regression target for the value function. One
    /// batch of training samples can be reused across several iterations.
    pub fn training_samples(&self, rollouts: &[Rollout]) -> Vec<Box<dyn Sample>> {
        let returns: Vec<Vec<f64>> = rollouts
            .iter()
            .map(|rollout| {
                let mut returns = vec![0.0; rollout.len()];
                let mut acc = 0.0;
                for t in (0..rollout.len()).rev() {
                    acc = rollout.steps[t].reward + self.discount * acc;
                    returns[t] = acc;
                }
                returns
            })
            .collect();
        crate::data::samples_with_advantages(rollouts, &returns)
    }

    /// Generate a tree that improves the value function.
    ///
    /// Returns the tree and the mean squared error it aims to reduce.
    pub fn train<B, R>(&self, data: &[B], max_depth: usize, rng: &mut R) -> (Tree, f64)
    where
        B: Borrow<dyn Sample>,
        R: Rng,
    {
        let mut loss = 0.0;
        let mut grads: Vec<GradientSample> = Vec::with_capacity(data.len());
        for sample in data {
            let sample: &dyn Sample = (*sample).borrow();
            let approximation = self.value_func.apply_source(sample)[0];
            let residual = sample.advantage() - approximation;
            loss += residual * residual;
            grads.push(GradientSample {
                sample,
                gradient: ParamVec::from(vec![residual]),
            });
        }

        let builder = Builder::new(TreeAlgorithm::Mse, max_depth)
            .with_feature_frac(self.feature_frac);
        let tree = builder.build(&mut grads, rng);
        (tree, loss / data.len() as f64)
    }

    /// Closed-form optimal weight for a value tree.
    ///
    /// Returns 0 when the tree outputs nothing on the data (zero
    /// denominator).
    pub fn optimal_weight<B>(&self, data: &[B], tree: &Tree) -> f64
    where
        B: Borrow<dyn Sample>,
    {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for sample in data {
            let sample: &dyn Sample = (*sample).borrow();
            let out = tree.apply_source(sample)[0];
            let approximation = self.value_func.apply_source(sample)[0];
            numerator += out * (sample.advantage() - approximation);
            denominator += out * out;
        }
        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::data::{MemorySample, RolloutStep};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rollout(rewards: &[f64]) -> Rollout {
        Rollout {
            steps: rewards
                .iter()
                .enumerate()
                .map(|(i, &reward)| RolloutStep {
                    features: vec![i as f64],
                    action: vec![1.0],
                    action_params: vec![0.0],
                    reward,
                })
                .collect(),
        }
    }

    #[test]
    fn gae_with_zero_value_function_discounts_rewards() {
        // With V == 0, delta_t = r_t and the GAE recursion reduces to a
        // (gamma * lambda)-discounted sum of rewards.
        let judger = Judger::new(0.5, 1.0);
        let advantages = judger.judge_actions(&[rollout(&[1.0, 1.0, 1.0])]);

        assert_eq!(advantages.len(), 1);
        assert_approx_eq!(advantages[0][2], 1.0, 1e-12);
        assert_approx_eq!(advantages[0][1], 1.5, 1e-12);
        assert_approx_eq!(advantages[0][0], 1.75, 1e-12);
    }

    #[test]
    fn gae_subtracts_the_baseline() {
        let mut judger = Judger::new(1.0, 0.0);
        // Constant value function predicting 2.
        judger
            .value_func
            .add(Tree::leaf(ParamVec::from(vec![2.0])), 1.0);

        // Single step episode with reward 3: delta = 3 + 0 - 2 = 1.
        let advantages = judger.judge_actions(&[rollout(&[3.0])]);
        assert_approx_eq!(advantages[0][0], 1.0, 1e-12);
    }

    #[test]
    fn training_samples_carry_discounted_returns() {
        let judger = Judger::new(0.5, 0.95);
        let samples = judger.training_samples(&[rollout(&[1.0, 2.0, 4.0])]);

        assert_eq!(samples.len(), 3);
        // 1 + 0.5 * (2 + 0.5 * 4) = 3
        assert_approx_eq!(samples[0].advantage(), 3.0, 1e-12);
        assert_approx_eq!(samples[1].advantage(), 4.0, 1e-12);
        assert_approx_eq!(samples[2].advantage(), 4.0, 1e-12);
    }

    #[test]
    fn train_reports_current_mse() {
        let judger = Judger::new(0.9, 0.95);
        let data: Vec<Box<dyn Sample>> = vec![
            Box::new(MemorySample {
                features: vec![0.0],
                action: vec![1.0],
                action_params: vec![0.0],
                advantage: 2.0,
            }),
            Box::new(MemorySample {
                features: vec![1.0],
                action: vec![1.0],
                action_params: vec![0.0],
                advantage: -2.0,
            }),
        ];

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let (tree, mse) = judger.train(&data, 2, &mut rng);
        // Zero value function: mse = (4 + 4) / 2.
        assert_approx_eq!(mse, 4.0, 1e-12);
        // The tree regresses the residuals exactly.
        assert_approx_eq!(tree.apply(&[0.0])[0], 2.0, 1e-12);
        assert_approx_eq!(tree.apply(&[1.0])[0], -2.0, 1e-12);
    }

    #[test]
    fn optimal_weight_solves_least_squares() {
        let judger = Judger::new(0.9, 0.95);
        let data: Vec<Box<dyn Sample>> = vec![Box::new(MemorySample {
            features: vec![0.0],
            action: vec![1.0],
            action_params: vec![0.0],
            advantage: 3.0,
        })];

        // A tree predicting 2 against a target of 3 wants weight 1.5.
        let tree = Tree::leaf(ParamVec::from(vec![2.0]));
        assert_approx_eq!(judger.optimal_weight(&data, &tree), 1.5, 1e-12);

        // A tree outputting zero gets weight 0, not a division error.
        let zero_tree = Tree::leaf(ParamVec::from(vec![0.0]));
        assert_eq!(judger.optimal_weight(&data, &zero_tree), 0.0);
    }
}
