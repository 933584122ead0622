//! Proximal Policy Optimization with tree-based steps.
//!
//! See the PPO paper: <https://arxiv.org/abs/1707.06347>.

use std::borrow::Borrow;

use rand::Rng;

use crate::data::Sample;
use crate::repr::{Forest, Tree};
use crate::space::{ActionSpace, Regularizer};
use crate::training::{compute_objective, BatchObjective, Builder, ObjectiveTerms};

/// Clip range used when [`PPO::epsilon`] is left at 0.
pub const DEFAULT_PPO_EPSILON: f64 = 0.2;

/// A tree-based variant of Proximal Policy Optimization.
///
/// Each step re-evaluates the current forest on the samples (which may have
/// been collected under an earlier forest), computes the clipped-surrogate
/// gradient, and approximates it with a tree.
pub struct PPO<S: ActionSpace> {
    /// Configures how individual trees are built.
    pub builder: Builder,

    /// Determines the probability of actions given action parameters.
    pub space: S,

    /// The amount by which the probability ratio may move before clipping.
    ///
    /// If 0, [`DEFAULT_PPO_EPSILON`] is used.
    pub epsilon: f64,

    /// If set, regularizes the action distributions of the policy.
    pub regularizer: Option<Box<dyn Regularizer>>,
}

impl<S: ActionSpace> PPO<S> {
    /// Perform a single PPO step on the samples.
    ///
    /// Returns a tree approximation of the gradient, the mean objective,
    /// and the mean regularization term (or 0).
    pub fn step<'a, B, R>(&self, samples: &'a [B], forest: &Forest, rng: &mut R) -> (Tree, f64, f64)
    where
        B: Borrow<dyn Sample + 'a>,
        R: Rng,
    {
        let objective = self.objective();
        let (terms, mut grads) = compute_objective(samples, Some(forest), &objective);
        let tree = self.builder.build(&mut grads, rng);
        let scale = 1.0 / samples.len() as f64;
        (tree, terms.objective * scale, terms.regularization * scale)
    }

    /// Gradient of the mean objective with respect to the forest's tree
    /// weights.
    ///
    /// Enables a fine-tuning step that nudges the weights along the
    /// objective before a new tree is added.
    pub fn weight_gradient<'a, B>(&self, samples: &'a [B], forest: &Forest) -> Vec<f64>
    where
        B: Borrow<dyn Sample + 'a>,
    {
        let objective = self.objective();
        let (_, grads) = compute_objective(samples, Some(forest), &objective);

        let scale = 1.0 / samples.len() as f64;
        let mut gradient = vec![0.0; forest.len()];
        for gs in &grads {
            for (slot, tree) in gradient.iter_mut().zip(forest.trees()) {
                *slot += gs.gradient.dot(tree.apply_source(gs.sample)) * scale;
            }
        }
        gradient
    }

    fn objective(&self) -> ClippedObjective<'_, S> {
        ClippedObjective {
            space: &self.space,
            epsilon: if self.epsilon == 0.0 {
                DEFAULT_PPO_EPSILON
            } else {
                self.epsilon
            },
            regularizer: self.regularizer.as_deref(),
        }
    }
}

/// The clipped surrogate objective.
///
/// `L_i = min(r_i * A_i, clip(r_i, 1 - eps, 1 + eps) * A_i)` with
/// `r_i = exp(log pi_new - log pi_old)`. The gradient flows through the
/// unclipped branch exactly when it attains the minimum, so samples pushed
/// outside the trust region contribute nothing.
struct ClippedObjective<'a, S: ActionSpace> {
    space: &'a S,
    epsilon: f64,
    regularizer: Option<&'a dyn Regularizer>,
}

impl<S: ActionSpace> BatchObjective for ClippedObjective<'_, S> {
    fn evaluate(
        &self,
        new_params: &[f64],
        old_params: &[f64],
        actions: &[f64],
        advantages: &[f64],
        n: usize,
        grad: &mut [f64],
    ) -> ObjectiveTerms {
        let dim = new_params.len() / n;
        let act_dim = actions.len() / n;

        let mut objective = 0.0;
        let mut buf = vec![0.0; dim];
        for i in 0..n {
            let new_p = &new_params[i * dim..(i + 1) * dim];
            let old_p = &old_params[i * dim..(i + 1) * dim];
            let action = &actions[i * act_dim..(i + 1) * act_dim];
            let advantage = advantages[i];

            let ratio =
                (self.space.log_prob(new_p, action) - self.space.log_prob(old_p, action)).exp();
            let clipped = ratio.clamp(1.0 - self.epsilon, 1.0 + self.epsilon);

            let raw_term = ratio * advantage;
            let clipped_term = clipped * advantage;
            if raw_term <= clipped_term {
                objective += raw_term;
                self.space.log_prob_grad(new_p, action, &mut buf);
                for (g, &d) in grad[i * dim..(i + 1) * dim].iter_mut().zip(&buf) {
                    *g += advantage * ratio * d;
                }
            } else {
                objective += clipped_term;
            }
        }

        let regularization = match self.regularizer {
            Some(reg) => {
                reg.add_gradient(new_params, n, grad);
                reg.regularize(new_params, n)
            }
            None => 0.0,
        };

        ObjectiveTerms {
            objective,
            regularization,
        }
    }
}
