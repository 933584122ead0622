//! Softmax distribution over discrete actions.

use rand::{Rng, RngCore};

use super::ActionSpace;

/// Discrete action space parameterized by logits.
///
/// Parameters are `actions` logits; actions are one-hot vectors of the same
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Softmax {
    actions: usize,
}

impl Softmax {
    /// Create a softmax space over `actions` discrete actions.
    pub fn new(actions: usize) -> Self {
        assert!(actions > 0, "softmax needs at least one action");
        Self { actions }
    }

    /// Log-probabilities of every action, computed stably from the logits.
    fn log_probs(&self, logits: &[f64]) -> Vec<f64> {
        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let log_sum = logits.iter().map(|x| (x - max).exp()).sum::<f64>().ln() + max;
        logits.iter().map(|x| x - log_sum).collect()
    }
}

impl ActionSpace for Softmax {
    fn param_dim(&self) -> usize {
        self.actions
    }

    fn action_dim(&self) -> usize {
        self.actions
    }

    fn log_prob(&self, params: &[f64], action: &[f64]) -> f64 {
        self.log_probs(params)
            .iter()
            .zip(action)
            .map(|(lp, a)| lp * a)
            .sum()
    }

    fn log_prob_grad(&self, params: &[f64], action: &[f64], grad: &mut [f64]) {
        // d log p(a) / d x_j = a_j - (sum a) * p_j
        let log_probs = self.log_probs(params);
        let total: f64 = action.iter().sum();
        for ((g, &a), lp) in grad.iter_mut().zip(action).zip(&log_probs) {
            *g = a - total * lp.exp();
        }
    }

    fn entropy(&self, params: &[f64]) -> f64 {
        self.log_probs(params)
            .iter()
            .map(|&lp| -lp.exp() * lp)
            .sum()
    }

    fn entropy_grad(&self, params: &[f64], grad: &mut [f64]) {
        // d H / d x_j = -p_j * (log p_j + H)
        let log_probs = self.log_probs(params);
        let entropy: f64 = log_probs.iter().map(|&lp| -lp.exp() * lp).sum();
        for (g, &lp) in grad.iter_mut().zip(&log_probs) {
            *g = -lp.exp() * (lp + entropy);
        }
    }

    fn sample(&self, params: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        let log_probs = self.log_probs(params);
        let mut draw: f64 = rng.gen();
        let mut one_hot = vec![0.0; self.actions];
        for (i, &lp) in log_probs.iter().enumerate() {
            draw -= lp.exp();
            if draw <= 0.0 {
                one_hot[i] = 1.0;
                return one_hot;
            }
        }
        // Rounding can leave a sliver of probability unassigned.
        one_hot[self.actions - 1] = 1.0;
        one_hot
    }
}
