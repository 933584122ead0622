//! Diagonal Gaussian distribution over continuous actions.

use rand::{Rng, RngCore};

use super::ActionSpace;

/// Continuous action space with per-dimension mean and log-stddev.
///
/// Parameters are `2 * dim` values: the `dim` means followed by the `dim`
/// log standard deviations. Actions are plain length-`dim` vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gaussian {
    dim: usize,
}

const LN_2PI: f64 = 1.8378770664093453;

impl Gaussian {
    /// Create a Gaussian space over `dim` action dimensions.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "gaussian needs at least one dimension");
        Self { dim }
    }
}

/// Draw from the standard normal distribution via the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

impl ActionSpace for Gaussian {
    fn param_dim(&self) -> usize {
        2 * self.dim
    }

    fn action_dim(&self) -> usize {
        self.dim
    }

    fn log_prob(&self, params: &[f64], action: &[f64]) -> f64 {
        let (means, log_stddevs) = params.split_at(self.dim);
        let mut total = 0.0;
        for d in 0..self.dim {
            let diff = action[d] - means[d];
            let inv_var = (-2.0 * log_stddevs[d]).exp();
            total += -0.5 * LN_2PI - log_stddevs[d] - 0.5 * diff * diff * inv_var;
        }
        total
    }

    fn log_prob_grad(&self, params: &[f64], action: &[f64], grad: &mut [f64]) {
        let (means, log_stddevs) = params.split_at(self.dim);
        for d in 0..self.dim {
            let diff = action[d] - means[d];
            let inv_var = (-2.0 * log_stddevs[d]).exp();
            grad[d] = diff * inv_var;
            grad[self.dim + d] = diff * diff * inv_var - 1.0;
        }
    }

    fn entropy(&self, params: &[f64]) -> f64 {
        let log_stddevs = &params[self.dim..];
        log_stddevs
            .iter()
            .map(|&s| s + 0.5 * (LN_2PI + 1.0))
            .sum()
    }

    fn entropy_grad(&self, _params: &[f64], grad: &mut [f64]) {
        let (mean_grad, stddev_grad) = grad.split_at_mut(self.dim);
        mean_grad.fill(0.0);
        stddev_grad.fill(1.0);
    }

    fn sample(&self, params: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        let (means, log_stddevs) = params.split_at(self.dim);
        (0..self.dim)
            .map(|d| means[d] + log_stddevs[d].exp() * standard_normal(rng))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn standard_density_at_mean() {
        let space = Gaussian::new(1);
        // N(0, 1) density at 0 is 1/sqrt(2*pi).
        let expected = -(0.5 * LN_2PI);
        assert_approx_eq!(space.log_prob(&[0.0, 0.0], &[0.0]), expected, 1e-12);
    }

    #[test]
    fn log_prob_grad_matches_finite_difference() {
        let space = Gaussian::new(2);
        let params = [0.5, -0.3, 0.2, -0.4];
        let action = [1.0, 0.0];

        let mut grad = vec![0.0; 4];
        space.log_prob_grad(&params, &action, &mut grad);

        let eps = 1e-6;
        for j in 0..4 {
            let mut up = params;
            up[j] += eps;
            let mut down = params;
            down[j] -= eps;
            let numeric =
                (space.log_prob(&up, &action) - space.log_prob(&down, &action)) / (2.0 * eps);
            assert_approx_eq!(grad[j], numeric, 1e-5);
        }
    }

    #[test]
    fn entropy_depends_only_on_log_stddevs() {
        let space = Gaussian::new(2);
        let a = space.entropy(&[0.0, 0.0, 0.1, -0.2]);
        let b = space.entropy(&[5.0, -5.0, 0.1, -0.2]);
        assert_approx_eq!(a, b, 1e-12);

        let mut grad = vec![0.0; 4];
        space.entropy_grad(&[0.0, 0.0, 0.1, -0.2], &mut grad);
        assert_eq!(grad, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn sample_mean_and_spread() {
        let space = Gaussian::new(1);
        // mean 2, stddev e^0 = 1
        let params = [2.0, 0.0];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);

        let n = 20_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let a = space.sample(&params, &mut rng)[0];
            sum += a;
            sum_sq += a * a;
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;
        assert!((mean - 2.0).abs() < 0.05, "sample mean {mean} is off");
        assert!((var - 1.0).abs() < 0.05, "sample variance {var} is off");
    }
}
