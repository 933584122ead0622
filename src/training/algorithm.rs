//! Tree-building algorithms: split criteria and leaf formulae.
//!
//! Each algorithm pairs an incrementally maintained split statistic with a
//! recipe for the parameter vector stored in a leaf. Different algorithms
//! solve different objectives, so different step sizes may suit them.

use std::fmt;

use crate::repr::ParamVec;
use crate::training::GradientSample;

/// An algorithm for building trees from gradient samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeAlgorithm {
    /// Leaves contain gradient sums scaled by the total sample count.
    Sum,
    /// Leaves contain gradient means; splits maximize per-side mean energy.
    Mean,
    /// Minimizes the mean squared error between leaves and gradients.
    Mse,
    /// Like [`Sum`](TreeAlgorithm::Sum), with splits biased towards
    /// balanced trees.
    BalancedSum,
    /// Same leaves as [`Mse`](TreeAlgorithm::Mse), splitting on gradient
    /// standard deviations.
    Stddev,
    /// Maximizes the dot product between gradient sums and their signs;
    /// leaf parameters are -1, 0, or +1.
    Sign,
    /// Same splitting criterion as [`Sign`](TreeAlgorithm::Sign), with
    /// gradient means in the leaves.
    Abs,
}

impl TreeAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [TreeAlgorithm; 7] = [
        TreeAlgorithm::Sum,
        TreeAlgorithm::Mean,
        TreeAlgorithm::Mse,
        TreeAlgorithm::BalancedSum,
        TreeAlgorithm::Stddev,
        TreeAlgorithm::Sign,
        TreeAlgorithm::Abs,
    ];

    /// Create the split tracker for this algorithm.
    pub fn tracker(&self) -> Box<dyn SplitTracker> {
        match self {
            TreeAlgorithm::Sum => Box::<SumTracker>::default(),
            TreeAlgorithm::Mean => Box::<MeanTracker>::default(),
            TreeAlgorithm::Mse => Box::<MseTracker>::default(),
            TreeAlgorithm::BalancedSum => Box::<BalancedSumTracker>::default(),
            TreeAlgorithm::Stddev => Box::<StddevTracker>::default(),
            TreeAlgorithm::Sign | TreeAlgorithm::Abs => Box::<SignTracker>::default(),
        }
    }

    /// Parameter vector for a leaf representing `leaf` samples out of
    /// `total` samples in the whole tree.
    pub fn leaf_params(&self, leaf: &[&GradientSample], total: usize) -> ParamVec {
        let sum = sum_gradients(leaf);
        match self {
            TreeAlgorithm::Sign => sum.signs(),
            TreeAlgorithm::Sum | TreeAlgorithm::BalancedSum => sum.scaled(1.0 / total as f64),
            TreeAlgorithm::Mean
            | TreeAlgorithm::Mse
            | TreeAlgorithm::Stddev
            | TreeAlgorithm::Abs => sum.scaled(1.0 / leaf.len() as f64),
        }
    }
}

impl fmt::Display for TreeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TreeAlgorithm::Sum => "sum",
            TreeAlgorithm::Mean => "mean",
            TreeAlgorithm::Mse => "mse",
            TreeAlgorithm::BalancedSum => "balancedsum",
            TreeAlgorithm::Stddev => "stddev",
            TreeAlgorithm::Sign => "sign",
            TreeAlgorithm::Abs => "abs",
        };
        f.write_str(name)
    }
}

/// Sum of the samples' gradients.
pub(crate) fn sum_gradients(samples: &[&GradientSample]) -> ParamVec {
    let mut sum = samples[0].gradient.clone();
    for sample in &samples[1..] {
        sum.add(&sample.gradient);
    }
    sum
}

/// Incrementally scores splits along a spectrum of partitions.
///
/// After `reset`, the left partition is empty and the right partition holds
/// every sample; each `move_to_left` transfers one sample. `quality` is
/// O(1) given the maintained state, and higher is better for every
/// algorithm.
pub trait SplitTracker {
    /// Start over with every sample on the right.
    fn reset(&mut self, right: &[&GradientSample]);

    /// Transfer one sample from the right partition to the left.
    fn move_to_left(&mut self, sample: &GradientSample);

    /// Score of the current partition; higher is better.
    fn quality(&self) -> f64;
}

/// Tracker for [`TreeAlgorithm::Sum`].
#[derive(Debug, Default)]
struct SumTracker {
    left_sum: ParamVec,
    right_sum: ParamVec,
}

impl SplitTracker for SumTracker {
    fn reset(&mut self, right: &[&GradientSample]) {
        self.right_sum = sum_gradients(right);
        self.left_sum = ParamVec::zeros(self.right_sum.len());
    }

    fn move_to_left(&mut self, sample: &GradientSample) {
        self.right_sum.sub(&sample.gradient);
        self.left_sum.add(&sample.gradient);
    }

    fn quality(&self) -> f64 {
        self.left_sum.dot(&self.left_sum) + self.right_sum.dot(&self.right_sum)
    }
}

/// Tracker for [`TreeAlgorithm::Mean`].
#[derive(Debug, Default)]
struct MeanTracker {
    sums: SumTracker,
    left_count: usize,
    right_count: usize,
}

impl MeanTracker {
    fn reset(&mut self, right: &[&GradientSample]) {
        self.sums.reset(right);
        self.left_count = 0;
        self.right_count = right.len();
    }

    fn move_to_left(&mut self, sample: &GradientSample) {
        self.sums.move_to_left(sample);
        self.left_count += 1;
        self.right_count -= 1;
    }
}

impl SplitTracker for MeanTracker {
    fn reset(&mut self, right: &[&GradientSample]) {
        MeanTracker::reset(self, right);
    }

    fn move_to_left(&mut self, sample: &GradientSample) {
        MeanTracker::move_to_left(self, sample);
    }

    fn quality(&self) -> f64 {
        let mut total = 0.0;
        for (sum, count) in [
            (&self.sums.left_sum, self.left_count),
            (&self.sums.right_sum, self.right_count),
        ] {
            if count > 0 {
                total += sum.dot(sum) / count as f64;
            }
        }
        total
    }
}

/// Tracker for [`TreeAlgorithm::Mse`].
///
/// Maintains per-side sums of squared gradient norms so the per-side
/// residual `sum(|g|^2) - |sum(g)|^2 / n` is available in O(1).
#[derive(Debug, Default)]
struct MseTracker {
    means: MeanTracker,
    left_squares: f64,
    right_squares: f64,
}

impl MseTracker {
    fn reset(&mut self, right: &[&GradientSample]) {
        self.means.reset(right);
        self.left_squares = 0.0;
        self.right_squares = right
            .iter()
            .map(|s| s.gradient.dot(&s.gradient))
            .sum();
    }

    fn move_to_left(&mut self, sample: &GradientSample) {
        self.means.move_to_left(sample);
        let sq = sample.gradient.dot(&sample.gradient);
        self.left_squares += sq;
        self.right_squares -= sq;
    }

    /// Per-side residuals, each `sum(|g|^2) - |sum(g)|^2 / n`.
    ///
    /// The residual is the minimal squared error achievable by a constant
    /// leaf over the side, scaled by the side's sample count.
    fn side_errors(&self) -> (f64, f64) {
        let mut errors = [0.0; 2];
        let sides = [
            (&self.means.sums.left_sum, self.left_squares, self.means.left_count),
            (&self.means.sums.right_sum, self.right_squares, self.means.right_count),
        ];
        for (i, (sum, squares, count)) in sides.into_iter().enumerate() {
            if count > 0 {
                errors[i] = squares - sum.dot(sum) / count as f64;
            }
        }
        (errors[0], errors[1])
    }
}

impl SplitTracker for MseTracker {
    fn reset(&mut self, right: &[&GradientSample]) {
        MseTracker::reset(self, right);
    }

    fn move_to_left(&mut self, sample: &GradientSample) {
        MseTracker::move_to_left(self, sample);
    }

    fn quality(&self) -> f64 {
        let (left, right) = self.side_errors();
        -(left + right)
    }
}

/// Tracker for [`TreeAlgorithm::BalancedSum`].
#[derive(Debug, Default)]
struct BalancedSumTracker {
    means: MeanTracker,
}

impl SplitTracker for BalancedSumTracker {
    fn reset(&mut self, right: &[&GradientSample]) {
        self.means.reset(right);
    }

    fn move_to_left(&mut self, sample: &GradientSample) {
        self.means.move_to_left(sample);
    }

    fn quality(&self) -> f64 {
        self.means.sums.quality() * (self.means.left_count * self.means.right_count) as f64
    }
}

/// Tracker for [`TreeAlgorithm::Stddev`].
#[derive(Debug, Default)]
struct StddevTracker {
    mse: MseTracker,
}

impl SplitTracker for StddevTracker {
    fn reset(&mut self, right: &[&GradientSample]) {
        self.mse.reset(right);
    }

    fn move_to_left(&mut self, sample: &GradientSample) {
        self.mse.move_to_left(sample);
    }

    fn quality(&self) -> f64 {
        // Equivalent to minimizing n_left * stddev_left + n_right * stddev_right.
        let (left, right) = self.mse.side_errors();
        let left_count = self.mse.means.left_count as f64;
        let right_count = self.mse.means.right_count as f64;
        // Rounding can push a residual a hair below zero.
        -((left_count * left.max(0.0)).sqrt() + (right_count * right.max(0.0)).sqrt())
    }
}

/// Tracker for [`TreeAlgorithm::Sign`] and [`TreeAlgorithm::Abs`].
#[derive(Debug, Default)]
struct SignTracker {
    sums: SumTracker,
}

impl SplitTracker for SignTracker {
    fn reset(&mut self, right: &[&GradientSample]) {
        self.sums.reset(right);
    }

    fn move_to_left(&mut self, sample: &GradientSample) {
        self.sums.move_to_left(sample);
    }

    fn quality(&self) -> f64 {
        self.sums.left_sum.abs_sum() + self.sums.right_sum.abs_sum()
    }
}
