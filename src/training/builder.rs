//! Recursive best-split tree construction.

use std::cmp::Ordering;

use rand::Rng;
use rayon::prelude::*;

use crate::repr::{ParamVec, Tree};
use crate::training::{GradientSample, TreeAlgorithm};

/// Builds decision trees that locally improve a surrogate objective.
///
/// The builder consumes per-sample gradient vectors and performs a greedy
/// recursive best-split search: at every node it examines a (possibly
/// subsampled) set of features in parallel, scores every admissible
/// boundary between distinct feature values with the algorithm's
/// [`SplitTracker`](crate::training::SplitTracker), and recurses on the
/// winning partition.
#[derive(Debug, Clone)]
pub struct Builder {
    /// Maximum tree depth.
    pub max_depth: usize,

    /// Split criterion and leaf formula.
    pub algorithm: TreeAlgorithm,

    /// Fraction of features to try at each branching node.
    ///
    /// If 0, all features are tried.
    pub feature_frac: f64,

    /// Minimum number of representative samples for a leaf node. A split
    /// never leaves either branch with fewer samples than this.
    pub min_leaf: usize,

    /// Like [`min_leaf`](Builder::min_leaf), expressed as a fraction of the
    /// samples reaching the node. The larger of the two bounds applies.
    pub min_leaf_frac: f64,

    /// If set, the parameter indices to target with the trees. Gradient
    /// components outside the whitelist are zeroed before building.
    pub param_whitelist: Option<Vec<u32>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            max_depth: 4,
            algorithm: TreeAlgorithm::Sum,
            feature_frac: 0.0,
            min_leaf: 0,
            min_leaf_frac: 0.0,
            param_whitelist: None,
        }
    }
}

impl Builder {
    /// Create a builder for the given algorithm and depth.
    pub fn new(algorithm: TreeAlgorithm, max_depth: usize) -> Self {
        Self {
            algorithm,
            max_depth,
            ..Self::default()
        }
    }

    /// Builder: set the fraction of features tried per node.
    pub fn with_feature_frac(mut self, feature_frac: f64) -> Self {
        self.feature_frac = feature_frac;
        self
    }

    /// Builder: set the minimum leaf sample count.
    pub fn with_min_leaf(mut self, min_leaf: usize) -> Self {
        self.min_leaf = min_leaf;
        self
    }

    /// Builder: set the minimum leaf sample fraction.
    pub fn with_min_leaf_frac(mut self, min_leaf_frac: f64) -> Self {
        self.min_leaf_frac = min_leaf_frac;
        self
    }

    /// Builder: restrict trees to the given parameter indices.
    pub fn with_param_whitelist(mut self, whitelist: Vec<u32>) -> Self {
        self.param_whitelist = Some(whitelist);
        self
    }

    /// Build a tree from the training data.
    ///
    /// Feature subsets are drawn from `rng`, so a seeded generator makes the
    /// construction reproducible.
    ///
    /// # Panics
    ///
    /// Panics when `samples` is empty, when `feature_frac` is outside
    /// `[0, 1]`, or when the parameter whitelist names an out-of-range
    /// index.
    pub fn build<R: Rng>(&self, samples: &mut [GradientSample<'_>], rng: &mut R) -> Tree {
        assert!(!samples.is_empty(), "cannot build a tree with no samples");
        assert!(
            (0.0..=1.0).contains(&self.feature_frac),
            "feature fraction out of range"
        );
        self.mask_gradients(samples);

        let refs: Vec<&GradientSample> = samples.iter().collect();
        let total = refs.len();
        self.build_node(refs, total, self.max_depth, rng)
    }

    fn build_node<R: Rng>(
        &self,
        samples: Vec<&GradientSample<'_>>,
        total: usize,
        depth: usize,
        rng: &mut R,
    ) -> Tree {
        if depth == 0 || samples.len() == 1 {
            return Tree::leaf(self.algorithm.leaf_params(&samples, total));
        }

        let num_features = samples[0].sample.num_features();
        let features = self.select_features(num_features, rng);
        let min_leaf = self.min_leaf_effective(samples.len());

        // Features are independent; examine them in parallel and reduce in
        // ascending feature order so ties resolve the same way every run.
        let candidates: Vec<Option<SplitInfo>> = features
            .par_iter()
            .map(|&feature| self.optimal_split(&samples, feature, min_leaf))
            .collect();

        let mut best: Option<SplitInfo> = None;
        for candidate in candidates.into_iter().flatten() {
            best = match best {
                Some(current) if candidate.quality < current.quality => Some(current),
                _ => Some(candidate),
            };
        }

        let Some(split) = best else {
            // No split can help; emit a leaf over everything.
            return self.build_node(samples, total, 0, rng);
        };

        let left: Vec<&GradientSample> = split.order[..split.split_at]
            .iter()
            .map(|&i| samples[i as usize])
            .collect();
        let right: Vec<&GradientSample> = split.order[split.split_at..]
            .iter()
            .map(|&i| samples[i as usize])
            .collect();

        Tree::branch(
            split.feature,
            split.threshold,
            self.build_node(left, total, depth - 1, rng),
            self.build_node(right, total, depth - 1, rng),
        )
    }

    /// Find the optimal split of `samples` along one feature.
    ///
    /// Returns `None` when no boundary satisfies the leaf-size constraint.
    fn optimal_split(
        &self,
        samples: &[&GradientSample<'_>],
        feature: u32,
        min_leaf: usize,
    ) -> Option<SplitInfo> {
        let values: Vec<f64> = samples
            .iter()
            .map(|s| s.sample.feature(feature as usize))
            .collect();
        let mut order: Vec<u32> = (0..samples.len() as u32).collect();
        order.sort_unstable_by(|&a, &b| {
            values[a as usize]
                .partial_cmp(&values[b as usize])
                .unwrap_or(Ordering::Equal)
        });

        let mut tracker = self.algorithm.tracker();
        tracker.reset(samples);

        let mut best: Option<(f64, f64, usize)> = None;
        let mut last_value = values[order[0] as usize];
        for (i, &idx) in order.iter().enumerate() {
            let value = values[idx as usize];
            if value > last_value {
                if i >= min_leaf && samples.len() - i >= min_leaf {
                    let quality = tracker.quality();
                    let better = match best {
                        None => true,
                        Some((best_quality, _, _)) => quality >= best_quality,
                    };
                    if better {
                        best = Some((quality, (value + last_value) / 2.0, i));
                    }
                }
                last_value = value;
            }
            tracker.move_to_left(samples[idx as usize]);
        }

        best.map(|(quality, threshold, split_at)| SplitInfo {
            feature,
            threshold,
            quality,
            order,
            split_at,
        })
    }

    /// Sample the feature subset for one node, in ascending order.
    fn select_features<R: Rng>(&self, num_features: usize, rng: &mut R) -> Vec<u32> {
        let use_features = if self.feature_frac == 0.0 {
            num_features
        } else {
            (self.feature_frac * num_features as f64).ceil() as usize
        };
        if use_features >= num_features {
            return (0..num_features as u32).collect();
        }

        // Partial Fisher-Yates shuffle.
        let mut indices: Vec<u32> = (0..num_features as u32).collect();
        for i in 0..use_features {
            let j = rng.gen_range(i..num_features);
            indices.swap(i, j);
        }
        let mut selected = indices[..use_features].to_vec();
        selected.sort_unstable();
        selected
    }

    fn min_leaf_effective(&self, num_samples: usize) -> usize {
        let frac_bound = (self.min_leaf_frac * num_samples as f64).ceil() as usize;
        self.min_leaf.max(frac_bound)
    }

    fn mask_gradients(&self, samples: &mut [GradientSample<'_>]) {
        let Some(whitelist) = &self.param_whitelist else {
            return;
        };
        let dim = samples[0].gradient.len();
        let mut mask = ParamVec::zeros(dim);
        for &idx in whitelist {
            assert!(
                (idx as usize) < dim,
                "whitelist parameter index {} out of range for dimension {}",
                idx,
                dim
            );
            mask[idx as usize] = 1.0;
        }
        for sample in samples {
            sample.gradient.mul(&mask);
        }
    }
}

/// A candidate split of one node's samples.
///
/// `order` is the node's sample indices sorted by the split feature;
/// the first `split_at` entries form the left partition.
#[derive(Debug, Clone)]
struct SplitInfo {
    feature: u32,
    threshold: f64,
    quality: f64,
    order: Vec<u32>,
    split_at: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemorySample, Sample};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn holders(rows: &[(Vec<f64>, Vec<f64>)]) -> Vec<MemorySample> {
        rows.iter()
            .map(|(features, _)| MemorySample {
                features: features.clone(),
                action: vec![],
                action_params: vec![],
                advantage: 0.0,
            })
            .collect()
    }

    fn gradient_samples<'a>(
        holders: &'a [MemorySample],
        rows: &[(Vec<f64>, Vec<f64>)],
    ) -> Vec<GradientSample<'a>> {
        holders
            .iter()
            .zip(rows)
            .map(|(h, (_, gradient))| GradientSample {
                sample: h as &dyn Sample,
                gradient: ParamVec::from(gradient.clone()),
            })
            .collect()
    }

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(1337)
    }

    #[test]
    fn splits_separate_opposed_gradients() {
        // Feature 0 separates positive from negative gradients; feature 1
        // is constant and useless.
        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..20)
            .map(|i| {
                let gradient = if i < 10 { vec![1.0] } else { vec![-1.0] };
                (vec![i as f64, 5.0], gradient)
            })
            .collect();
        let holders = holders(&rows);
        let mut samples = gradient_samples(&holders, &rows);

        let builder = Builder::new(TreeAlgorithm::Mse, 1);
        let tree = builder.build(&mut samples, &mut rng());

        match tree {
            Tree::Branch {
                feature, threshold, ..
            } => {
                assert_eq!(feature, 0);
                assert_eq!(threshold, 9.5);
            }
            Tree::Leaf { .. } => panic!("expected a branching root"),
        }
    }

    #[test]
    fn constant_features_produce_a_leaf() {
        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..8)
            .map(|i| (vec![3.0, 3.0], vec![i as f64]))
            .collect();
        let holders = holders(&rows);
        let mut samples = gradient_samples(&holders, &rows);

        let builder = Builder::new(TreeAlgorithm::Mean, 3);
        let tree = builder.build(&mut samples, &mut rng());
        assert!(tree.is_leaf());
        // Mean leaf over all gradients: (0 + ... + 7) / 8.
        assert_eq!(tree.apply(&[3.0, 3.0])[0], 3.5);
    }

    #[test]
    fn min_leaf_blocks_unbalanced_splits() {
        // One outlier at feature value 100; every boundary strands it.
        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..6)
            .map(|i| {
                let x = if i == 5 { 100.0 } else { 0.0 };
                (vec![x], vec![if i == 5 { 10.0 } else { -1.0 }])
            })
            .collect();
        let holders = holders(&rows);
        let mut samples = gradient_samples(&holders, &rows);

        let builder = Builder::new(TreeAlgorithm::Mse, 2).with_min_leaf(2);
        let tree = builder.build(&mut samples, &mut rng());
        assert!(tree.is_leaf());

        // Without the bound the same data splits.
        let mut samples = gradient_samples(&holders, &rows);
        let tree = Builder::new(TreeAlgorithm::Mse, 2).build(&mut samples, &mut rng());
        assert!(!tree.is_leaf());
    }

    #[test]
    fn min_leaf_frac_scales_with_node_size() {
        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..10)
            .map(|i| (vec![i as f64], vec![if i < 9 { -1.0 } else { 9.0 }]))
            .collect();
        let holders = holders(&rows);

        // 0.3 of 10 samples rounds up to 3, so a 9|1 boundary is rejected.
        let mut samples = gradient_samples(&holders, &rows);
        let builder = Builder::new(TreeAlgorithm::Mse, 1).with_min_leaf_frac(0.3);
        let tree = builder.build(&mut samples, &mut rng());
        match tree {
            Tree::Branch { threshold, .. } => {
                assert!((3.0..=7.0).contains(&threshold), "threshold {threshold}");
            }
            Tree::Leaf { .. } => panic!("expected a branching root"),
        }
    }

    #[test]
    fn sign_trees_have_sign_leaves() {
        let mut rng = rng();
        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..40)
            .map(|i| {
                (
                    vec![i as f64, (i % 7) as f64],
                    vec![
                        crate::space::standard_normal(&mut rng),
                        crate::space::standard_normal(&mut rng),
                    ],
                )
            })
            .collect();
        let holders = holders(&rows);
        let mut samples = gradient_samples(&holders, &rows);

        let tree = Builder::new(TreeAlgorithm::Sign, 3).build(&mut samples, &mut rng);

        fn check(tree: &Tree) {
            match tree {
                Tree::Leaf { params } => {
                    for &p in params.iter() {
                        assert!(p == 0.0 || p == 1.0 || p == -1.0, "leaf value {p}");
                    }
                }
                Tree::Branch {
                    less_than,
                    greater_equal,
                    ..
                } => {
                    check(less_than);
                    check(greater_equal);
                }
            }
        }
        check(&tree);
    }

    #[test]
    fn whitelist_masks_other_params() {
        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..4)
            .map(|i| (vec![i as f64], vec![1.0, 2.0, 3.0]))
            .collect();
        let holders = holders(&rows);
        let mut samples = gradient_samples(&holders, &rows);

        let builder = Builder::new(TreeAlgorithm::Mean, 0).with_param_whitelist(vec![1]);
        let tree = builder.build(&mut samples, &mut rng());
        assert_eq!(tree.apply(&[0.0]).as_slice(), &[0.0, 2.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn whitelist_out_of_range_is_fatal() {
        let rows = vec![(vec![0.0], vec![1.0])];
        let holders = holders(&rows);
        let mut samples = gradient_samples(&holders, &rows);
        Builder::new(TreeAlgorithm::Mean, 1)
            .with_param_whitelist(vec![3])
            .build(&mut samples, &mut rng());
    }

    #[test]
    #[should_panic(expected = "no samples")]
    fn empty_samples_are_fatal() {
        let mut samples: Vec<GradientSample> = vec![];
        Builder::default().build(&mut samples, &mut rng());
    }

    #[test]
    fn seeded_builds_are_reproducible() {
        let mut seeded = Xoshiro256PlusPlus::seed_from_u64(99);
        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..50)
            .map(|i| {
                (
                    (0..6).map(|j| ((i * 7 + j * 3) % 11) as f64).collect(),
                    vec![crate::space::standard_normal(&mut seeded)],
                )
            })
            .collect();
        let holders = holders(&rows);

        let builder = Builder::new(TreeAlgorithm::Mse, 3).with_feature_frac(0.5);
        let mut first = gradient_samples(&holders, &rows);
        let mut second = gradient_samples(&holders, &rows);
        let a = builder.build(&mut first, &mut Xoshiro256PlusPlus::seed_from_u64(7));
        let b = builder.build(&mut second, &mut Xoshiro256PlusPlus::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn max_depth_limits_tree_height() {
        let mut seeded = rng();
        let rows: Vec<(Vec<f64>, Vec<f64>)> = (0..64)
            .map(|i| {
                (
                    vec![i as f64],
                    vec![crate::space::standard_normal(&mut seeded)],
                )
            })
            .collect();
        let holders = holders(&rows);
        let mut samples = gradient_samples(&holders, &rows);

        let tree = Builder::new(TreeAlgorithm::Mse, 2).build(&mut samples, &mut seeded);
        assert!(tree.depth() <= 2);
    }
}
