//! Bernoulli distribution over a single binary action.

use rand::{Rng, RngCore};

use super::ActionSpace;

/// Binary action space parameterized by a single logit.
///
/// Actions are one-hot vectors of length two; index 1 is the positive class
/// with probability `sigmoid(logit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bernoulli;

/// `ln(1 + e^x)` computed without overflow.
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl ActionSpace for Bernoulli {
    fn param_dim(&self) -> usize {
        1
    }

    fn action_dim(&self) -> usize {
        2
    }

    fn log_prob(&self, params: &[f64], action: &[f64]) -> f64 {
        let logit = params[0];
        // log sigma(l) = -softplus(-l), log(1 - sigma(l)) = -softplus(l)
        action[1] * -softplus(-logit) + action[0] * -softplus(logit)
    }

    fn log_prob_grad(&self, params: &[f64], action: &[f64], grad: &mut [f64]) {
        let p = sigmoid(params[0]);
        grad[0] = action[1] * (1.0 - p) - action[0] * p;
    }

    fn entropy(&self, params: &[f64]) -> f64 {
        let logit = params[0];
        let p = sigmoid(logit);
        p * softplus(-logit) + (1.0 - p) * softplus(logit)
    }

    fn entropy_grad(&self, params: &[f64], grad: &mut [f64]) {
        let logit = params[0];
        let p = sigmoid(logit);
        grad[0] = -logit * p * (1.0 - p);
    }

    fn sample(&self, params: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        if rng.gen::<f64>() < sigmoid(params[0]) {
            vec![0.0, 1.0]
        } else {
            vec![1.0, 0.0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn zero_logit_is_a_fair_coin() {
        let space = Bernoulli;
        assert_approx_eq!(space.log_prob(&[0.0], &[0.0, 1.0]), 0.5f64.ln(), 1e-12);
        assert_approx_eq!(space.log_prob(&[0.0], &[1.0, 0.0]), 0.5f64.ln(), 1e-12);
        assert_approx_eq!(space.entropy(&[0.0]), std::f64::consts::LN_2, 1e-12);
    }

    #[test]
    fn log_prob_grad_matches_finite_difference() {
        let space = Bernoulli;
        for &logit in &[-1.5, 0.0, 2.0] {
            for action in [[1.0, 0.0], [0.0, 1.0]] {
                let mut grad = [0.0];
                space.log_prob_grad(&[logit], &action, &mut grad);

                let eps = 1e-6;
                let numeric = (space.log_prob(&[logit + eps], &action)
                    - space.log_prob(&[logit - eps], &action))
                    / (2.0 * eps);
                assert_approx_eq!(grad[0], numeric, 1e-6);
            }
        }
    }

    #[test]
    fn entropy_grad_matches_finite_difference() {
        let space = Bernoulli;
        for &logit in &[-2.0, -0.3, 0.0, 1.7] {
            let mut grad = [0.0];
            space.entropy_grad(&[logit], &mut grad);

            let eps = 1e-6;
            let numeric =
                (space.entropy(&[logit + eps]) - space.entropy(&[logit - eps])) / (2.0 * eps);
            assert_approx_eq!(grad[0], numeric, 1e-6);
        }
    }

    #[test]
    fn extreme_logits_stay_finite() {
        let space = Bernoulli;
        assert!(space.log_prob(&[500.0], &[0.0, 1.0]).is_finite());
        assert!(space.log_prob(&[-500.0], &[1.0, 0.0]).is_finite());
        assert!(space.entropy(&[500.0]).is_finite());
    }
}
