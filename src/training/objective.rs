//! Surrogate objectives and their per-sample gradients.
//!
//! Tree construction consumes one gradient vector per sample: the gradient
//! of a scalar surrogate objective with respect to that sample's action
//! parameters. The objectives used here are closed-form, so the backward
//! pass is written out by hand instead of going through an autodiff engine.

use std::borrow::Borrow;

use crate::data::{FeatureSource, Sample};
use crate::repr::{Forest, ParamVec};

/// The components of an objective evaluation.
///
/// The surrogate objective proper and the regularization term are tracked
/// separately for reporting; their sum is the scalar the tree-building step
/// maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObjectiveTerms {
    /// Objective summed over the batch.
    pub objective: f64,
    /// Regularization summed over the batch (0 when no regularizer is set).
    pub regularization: f64,
}

/// A batched surrogate objective with a hand-rolled backward pass.
///
/// `new_params`, `old_params` are `n * D` concatenations of per-sample
/// action parameters, `actions` the `n * A` concatenation of encoded
/// actions, and `advantages` has length `n`. `evaluate` returns the
/// objective terms and accumulates `d(objective + regularization) /
/// d(new_params)` into `grad`.
pub trait BatchObjective {
    fn evaluate(
        &self,
        new_params: &[f64],
        old_params: &[f64],
        actions: &[f64],
        advantages: &[f64],
        n: usize,
        grad: &mut [f64],
    ) -> ObjectiveTerms;
}

/// A sample paired with the gradient of an objective with respect to the
/// sample's action parameters.
#[derive(Debug)]
pub struct GradientSample<'a> {
    pub sample: &'a dyn Sample,
    pub gradient: ParamVec,
}

impl FeatureSource for GradientSample<'_> {
    #[inline]
    fn feature(&self, idx: usize) -> f64 {
        self.sample.feature(idx)
    }
}

/// Evaluate an objective over a batch and split its gradient per sample.
///
/// When a forest is supplied it is re-applied to every sample to produce the
/// current action parameters (the off-policy case, where samples may have
/// been collected under an earlier forest). Otherwise the parameters
/// recorded in the samples are used as-is.
pub fn compute_objective<'a, S>(
    samples: &'a [S],
    forest: Option<&Forest>,
    objective: &dyn BatchObjective,
) -> (ObjectiveTerms, Vec<GradientSample<'a>>)
where
    S: Borrow<dyn Sample + 'a>,
{
    assert!(!samples.is_empty(), "cannot compute an objective over no samples");

    let first: &dyn Sample = samples[0].borrow();
    let dim = first.action_params().len();
    let act_dim = first.action().len();
    let n = samples.len();

    let mut old_params = Vec::with_capacity(n * dim);
    let mut actions = Vec::with_capacity(n * act_dim);
    let mut advantages = Vec::with_capacity(n);
    for s in samples {
        let s: &dyn Sample = (*s).borrow();
        assert_eq!(
            s.action_params().len(),
            dim,
            "mismatched parameter dimension across samples"
        );
        assert_eq!(
            s.action().len(),
            act_dim,
            "mismatched action dimension across samples"
        );
        old_params.extend_from_slice(s.action_params());
        actions.extend_from_slice(s.action());
        advantages.push(s.advantage());
    }

    let new_params = match forest {
        Some(forest) => {
            assert_eq!(
                forest.param_dim(),
                dim,
                "forest parameter dimension does not match the samples"
            );
            let mut joined = Vec::with_capacity(n * dim);
            for s in samples {
                let s: &dyn Sample = (*s).borrow();
                joined.extend_from_slice(forest.apply_source(s).as_slice());
            }
            joined
        }
        None => old_params.clone(),
    };

    let mut grad = vec![0.0; n * dim];
    let terms = objective.evaluate(&new_params, &old_params, &actions, &advantages, n, &mut grad);

    let grads = samples
        .iter()
        .zip(grad.chunks_exact(dim))
        .map(|(s, g)| GradientSample {
            sample: (*s).borrow(),
            gradient: ParamVec::from(g),
        })
        .collect();

    (terms, grads)
}
