//! Sample interfaces and in-memory sample storage.

use std::borrow::Borrow;

use rand::Rng;

/// A list of numerical features addressed by index.
pub trait FeatureSource {
    /// Value of the feature at `idx`.
    fn feature(&self, idx: usize) -> f64;
}

/// A training sample for building a tree.
///
/// Each sample describes a single timestep of an episode: the observed
/// features, the action that was taken, the action parameters the policy
/// produced at collection time, and an advantage estimate for the action.
pub trait Sample: FeatureSource + Send + Sync + std::fmt::Debug {
    /// Number of features.
    fn num_features(&self) -> usize;

    /// The action that was taken, encoded for the action space.
    fn action(&self) -> &[f64];

    /// The action parameters the policy produced when the action was taken.
    fn action_params(&self) -> &[f64];

    /// Advantage estimate for the action.
    fn advantage(&self) -> f64;
}

/// A sample stored entirely as `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySample {
    pub features: Vec<f64>,
    pub action: Vec<f64>,
    pub action_params: Vec<f64>,
    pub advantage: f64,
}

impl FeatureSource for MemorySample {
    #[inline]
    fn feature(&self, idx: usize) -> f64 {
        self.features[idx]
    }
}

impl Sample for MemorySample {
    #[inline]
    fn num_features(&self) -> usize {
        self.features.len()
    }

    #[inline]
    fn action(&self) -> &[f64] {
        &self.action
    }

    #[inline]
    fn action_params(&self) -> &[f64] {
        &self.action_params
    }

    #[inline]
    fn advantage(&self) -> f64 {
        self.advantage
    }
}

/// A sample whose features are stored as bytes and cast on demand.
///
/// Shrinks the footprint of large batches when the features are known to be
/// 8-bit integers (for example, downsampled image observations).
/// Interchangeable with [`MemorySample`] everywhere a [`Sample`] is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct ByteSample {
    features: Vec<u8>,
    action: Vec<f64>,
    action_params: Vec<f64>,
    advantage: f64,
}

impl ByteSample {
    /// Create a sample from byte features.
    pub fn new(features: Vec<u8>, action: Vec<f64>, action_params: Vec<f64>, advantage: f64) -> Self {
        Self {
            features,
            action,
            action_params,
            advantage,
        }
    }

    /// Convert any sample, truncating each feature to a byte.
    pub fn from_sample(sample: &dyn Sample) -> Self {
        let features = (0..sample.num_features())
            .map(|i| sample.feature(i) as u8)
            .collect();
        Self {
            features,
            action: sample.action().to_vec(),
            action_params: sample.action_params().to_vec(),
            advantage: sample.advantage(),
        }
    }
}

impl FeatureSource for ByteSample {
    #[inline]
    fn feature(&self, idx: usize) -> f64 {
        self.features[idx] as f64
    }
}

impl Sample for ByteSample {
    #[inline]
    fn num_features(&self) -> usize {
        self.features.len()
    }

    #[inline]
    fn action(&self) -> &[f64] {
        &self.action
    }

    #[inline]
    fn action_params(&self) -> &[f64] {
        &self.action_params
    }

    #[inline]
    fn advantage(&self) -> f64 {
        self.advantage
    }
}

/// Convert a stream of samples into byte-backed samples.
///
/// The input order is preserved. Use only when the features are known to fit
/// in 8-bit integers.
pub fn compact_samples<'a, S>(samples: &'a [S]) -> impl Iterator<Item = ByteSample> + 'a
where
    S: Borrow<dyn Sample>,
{
    samples
        .iter()
        .map(|s| ByteSample::from_sample((*s).borrow()))
}

/// Select a random fraction of the samples without replacement.
///
/// Picks `ceil(frac * samples.len())` samples; a fraction that rounds to
/// zero selects everything.
pub fn minibatch<'a, S, R>(samples: &'a [S], frac: f64, rng: &mut R) -> Vec<&'a dyn Sample>
where
    S: Borrow<dyn Sample>,
    R: Rng,
{
    let mut count = (samples.len() as f64 * frac).ceil() as usize;
    if count == 0 {
        count = samples.len();
    }

    // Partial Fisher-Yates over the index range.
    let mut indices: Vec<usize> = (0..samples.len()).collect();
    for i in 0..count {
        let j = rng.gen_range(i..indices.len());
        indices.swap(i, j);
    }

    indices[..count]
        .iter()
        .map(|&i| samples[i].borrow())
        .collect()
}
