//! Vanilla policy-gradient boosting.

use std::borrow::Borrow;

use rand::Rng;

use crate::data::Sample;
use crate::repr::Tree;
use crate::space::{ActionSpace, Regularizer};
use crate::training::{compute_objective, BatchObjective, Builder, ObjectiveTerms};

/// Policy-gradient optimization with trees as the gradient approximator.
///
/// The surrogate objective is `sum_i log pi(a_i | theta_i) * A_i`, with an
/// optional regularization term added.
pub struct PolicyGradient<S: ActionSpace> {
    /// Configures how individual trees are built.
    pub builder: Builder,

    /// Determines the probability of actions given action parameters.
    pub space: S,

    /// If set, regularizes the action distributions of the policy.
    pub regularizer: Option<Box<dyn Regularizer>>,
}

impl<S: ActionSpace> PolicyGradient<S> {
    /// Approximate the policy gradient with a tree.
    ///
    /// Returns the tree and the per-sample means of the surrogate objective
    /// and the regularization term.
    pub fn build<'a, B, R>(&self, samples: &'a [B], rng: &mut R) -> (Tree, f64, f64)
    where
        B: Borrow<dyn Sample + 'a>,
        R: Rng,
    {
        let objective = LogProbObjective {
            space: &self.space,
            regularizer: self.regularizer.as_deref(),
        };
        let (terms, mut grads) = compute_objective(samples, None, &objective);
        let tree = self.builder.build(&mut grads, rng);
        let scale = 1.0 / samples.len() as f64;
        (tree, terms.objective * scale, terms.regularization * scale)
    }
}

/// The advantage-weighted log-probability objective.
struct LogProbObjective<'a, S: ActionSpace> {
    space: &'a S,
    regularizer: Option<&'a dyn Regularizer>,
}

impl<S: ActionSpace> BatchObjective for LogProbObjective<'_, S> {
    fn evaluate(
        &self,
        new_params: &[f64],
        _old_params: &[f64],
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
            let params = &new_params[i * dim..(i + 1) * dim];
            let action = &actions[i * act_dim..(i + 1) * act_dim];
            let advantage = advantages[i];

            objective += self.space.log_prob(params, action) * advantage;
            self.space.log_prob_grad(params, action, &mut buf);
            for (g, &d) in grad[i * dim..(i + 1) * dim].iter_mut().zip(&buf) {
                *g += d * advantage;
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
