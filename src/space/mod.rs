//! Action-space capabilities.
//!
//! An [`ActionSpace`] maps between parameter vectors produced by the model
//! and concrete actions: it scores actions (`log_prob`), draws them
//! (`sample`), and measures distribution entropy, together with the
//! closed-form gradients of both with respect to the parameters. The core
//! requires `f64` throughout; adapters that collect observations in other
//! precisions convert at the boundary.

mod bernoulli;
mod gaussian;
mod softmax;

pub use bernoulli::Bernoulli;
pub use gaussian::{standard_normal, Gaussian};
pub use softmax::Softmax;

use rand::RngCore;

/// A parametric action distribution.
///
/// `params` slices always have length [`param_dim`](ActionSpace::param_dim)
/// and `action` slices length [`action_dim`](ActionSpace::action_dim).
pub trait ActionSpace {
    /// Length of the parameter vector driving the distribution.
    fn param_dim(&self) -> usize;

    /// Length of an encoded action.
    fn action_dim(&self) -> usize;

    /// Log-probability (or log-density) of `action` under `params`.
    fn log_prob(&self, params: &[f64], action: &[f64]) -> f64;

    /// Write `d log_prob / d params` into `grad`.
    fn log_prob_grad(&self, params: &[f64], action: &[f64], grad: &mut [f64]);

    /// Entropy of the distribution.
    fn entropy(&self, params: &[f64]) -> f64;

    /// Write `d entropy / d params` into `grad`.
    fn entropy_grad(&self, params: &[f64], grad: &mut [f64]);

    /// Draw an action from the distribution.
    fn sample(&self, params: &[f64], rng: &mut dyn RngCore) -> Vec<f64>;
}

/// Entropy regularization over a batch of action parameters.
///
/// Adds `coeff * entropy(params_i)` per sample to the objective, encouraging
/// exploration. A small coefficient such as 0.01 is typical.
#[derive(Debug, Clone)]
pub struct EntropyReg<S> {
    pub space: S,
    pub coeff: f64,
}

/// A differentiable penalty over batched action parameters.
pub trait Regularizer {
    /// Sum of the regularization term over a batch of `n` samples.
    fn regularize(&self, params: &[f64], n: usize) -> f64;

    /// Accumulate `d regularize / d params` into `grad`.
    fn add_gradient(&self, params: &[f64], n: usize, grad: &mut [f64]);
}

impl<S: ActionSpace> Regularizer for EntropyReg<S> {
    fn regularize(&self, params: &[f64], n: usize) -> f64 {
        let dim = params.len() / n;
        params
            .chunks_exact(dim)
            .map(|p| self.coeff * self.space.entropy(p))
            .sum()
    }

    fn add_gradient(&self, params: &[f64], n: usize, grad: &mut [f64]) {
        let dim = params.len() / n;
        let mut buf = vec![0.0; dim];
        for (p, g) in params.chunks_exact(dim).zip(grad.chunks_exact_mut(dim)) {
            self.space.entropy_grad(p, &mut buf);
            for (out, &d) in g.iter_mut().zip(&buf) {
                *out += self.coeff * d;
            }
        }
    }
}
