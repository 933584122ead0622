//! Weighted additive forests.

use crate::data::FeatureSource;
use crate::repr::{ParamVec, Tree};

/// A linearly-weighted additive ensemble of trees.
///
/// Evaluation produces `base + Σ weights[i] · trees[i].apply(features)`.
/// The base vector fixes the parameter dimension; every tree added to the
/// forest must produce leaf vectors of the same length.
///
/// Forests are long-lived model state: the training loop mutates them through
/// [`add`](Forest::add), [`scale`](Forest::scale),
/// [`remove_first`](Forest::remove_first), [`add_weights`](Forest::add_weights)
/// and [`prune_non_positive`](Forest::prune_non_positive). None of these
/// operations are concurrency-safe; drivers serialize training and
/// persistence around the forest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forest {
    base: ParamVec,
    trees: Vec<Tree>,
    weights: Vec<f64>,
}

impl Forest {
    /// Create an empty forest with a zero base of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self::with_base(ParamVec::zeros(dim))
    }

    /// Create an empty forest with an explicit base vector.
    pub fn with_base(base: ParamVec) -> Self {
        Self {
            base,
            trees: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Parameter dimension of the forest output.
    #[inline]
    pub fn param_dim(&self) -> usize {
        self.base.len()
    }

    /// Number of trees.
    #[inline]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the forest holds no trees.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// The base parameter vector.
    #[inline]
    pub fn base(&self) -> &ParamVec {
        &self.base
    }

    /// Iterate over the trees in insertion order.
    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// The per-tree weights, aligned with [`trees`](Forest::trees).
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Get a tree and its weight by index.
    pub fn tree(&self, idx: usize) -> (&Tree, f64) {
        (&self.trees[idx], self.weights[idx])
    }

    /// Append a tree with the given weight.
    pub fn add(&mut self, tree: Tree, weight: f64) {
        debug_assert_eq!(tree.param_dim(), self.base.len());
        self.trees.push(tree);
        self.weights.push(weight);
    }

    /// Multiply every tree weight by `scale`. The base is unchanged.
    pub fn scale(&mut self, scale: f64) {
        for w in &mut self.weights {
            *w *= scale;
        }
    }

    /// Remove the oldest tree and its weight, keeping the rest in order.
    pub fn remove_first(&mut self) {
        if !self.trees.is_empty() {
            self.trees.remove(0);
            self.weights.remove(0);
        }
    }

    /// Add `step * gradient[i]` to each tree weight.
    ///
    /// Used to fine-tune weights in the direction of the weight gradient of
    /// an objective before a new tree is appended.
    pub fn add_weights(&mut self, gradient: &[f64], step: f64) {
        assert_eq!(
            gradient.len(),
            self.weights.len(),
            "weight gradient length {} does not match tree count {}",
            gradient.len(),
            self.weights.len()
        );
        for (w, g) in self.weights.iter_mut().zip(gradient) {
            *w += g * step;
        }
    }

    /// Remove every tree whose weight is zero or negative.
    ///
    /// Returns the number of trees removed.
    pub fn prune_non_positive(&mut self) -> usize {
        let before = self.trees.len();
        let mut trees = Vec::with_capacity(before);
        let mut weights = Vec::with_capacity(before);
        for (tree, weight) in self.trees.drain(..).zip(self.weights.drain(..)) {
            if weight > 0.0 {
                trees.push(tree);
                weights.push(weight);
            }
        }
        self.trees = trees;
        self.weights = weights;
        before - self.trees.len()
    }

    /// Evaluate the forest on a single feature row.
    pub fn apply(&self, features: &[f64]) -> ParamVec {
        let mut out = self.base.clone();
        for (tree, &weight) in self.trees.iter().zip(&self.weights) {
            out.add_scaled(tree.apply(features), weight);
        }
        out
    }

    /// Evaluate the forest on a feature source.
    pub fn apply_source<F: FeatureSource + ?Sized>(&self, source: &F) -> ParamVec {
        let mut out = self.base.clone();
        for (tree, &weight) in self.trees.iter().zip(&self.weights) {
            out.add_scaled(tree.apply_source(source), weight);
        }
        out
    }

    /// Evaluate the forest on a contiguous block of feature rows.
    ///
    /// `rows` holds `batch` rows of `num_features` values each; the result is
    /// the `batch * param_dim` concatenation of the per-row outputs.
    pub fn apply_batch(&self, rows: &[f64], num_features: usize) -> Vec<f64> {
        assert!(num_features > 0, "num_features must be positive");
        assert_eq!(
            rows.len() % num_features,
            0,
            "row block length {} is not a multiple of the feature count {}",
            rows.len(),
            num_features
        );
        let batch = rows.len() / num_features;
        let mut out = Vec::with_capacity(batch * self.param_dim());
        for row in rows.chunks_exact(num_features) {
            out.extend_from_slice(self.apply(row).as_slice());
        }
        out
    }
}
