//! The full training loop over collected rollouts.

use derive_builder::Builder;
use rand::Rng;

use crate::data::{samples_with_advantages, Rollout};
use crate::repr::Forest;
use crate::space::{ActionSpace, EntropyReg, Regularizer};
use crate::training::builder::Builder as TreeBuilder;
use crate::training::{
    Judger, PolicyGradient, TrainingLogger, TreeAlgorithm, Verbosity, PPO,
};

/// Which surrogate objective drives the policy trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surrogate {
    /// Vanilla policy gradient.
    PolicyGradient,
    /// Clipped PPO surrogate.
    #[default]
    Ppo,
}

/// Parameters for [`Trainer`].
///
/// Use [`TrainerParams::builder()`] for a fluent configuration API, or
/// [`TrainerParams::default()`] for sensible defaults.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct TrainerParams {
    /// Surrogate objective for policy trees.
    #[builder(default = "Surrogate::Ppo")]
    pub surrogate: Surrogate,

    /// Tree-building algorithm for policy trees.
    #[builder(default = "TreeAlgorithm::Sum")]
    pub algorithm: TreeAlgorithm,

    /// Maximum policy tree depth.
    #[builder(default = "4")]
    pub max_depth: usize,

    /// Weight given to each new policy tree.
    #[builder(default = "0.1")]
    pub step_size: f64,

    /// Step along the weight gradient before each PPO tree is added.
    /// 0 disables fine-tuning.
    #[builder(default = "0.0")]
    pub weight_tune_step: f64,

    /// Scale applied to the optimal weight of each value tree.
    #[builder(default = "1.0")]
    pub value_step: f64,

    /// Maximum value tree depth.
    #[builder(default = "4")]
    pub value_depth: usize,

    /// Reward discount factor.
    #[builder(default = "0.99")]
    pub discount: f64,

    /// GAE lambda.
    #[builder(default = "0.95")]
    pub lambda: f64,

    /// PPO clip range; 0 uses the default.
    #[builder(default = "0.0")]
    pub epsilon: f64,

    /// Entropy regularization coefficient; 0 disables regularization.
    #[builder(default = "0.0")]
    pub entropy_coeff: f64,

    /// Fraction of features tried per branching node; 0 tries all.
    #[builder(default = "0.0")]
    pub feature_frac: f64,

    /// Minimum samples per leaf.
    #[builder(default = "0")]
    pub min_leaf: usize,

    /// Minimum samples per leaf as a fraction of the node's samples.
    #[builder(default = "0.0")]
    pub min_leaf_frac: f64,

    /// Cap on the policy forest size; 0 leaves it unbounded. The oldest
    /// trees are dropped once the cap is exceeded.
    #[builder(default = "0")]
    pub max_trees: usize,

    /// Per-round weight decay; 0 disables decay.
    #[builder(default = "0.0")]
    pub decay: f64,

    /// Drop policy trees whose weight falls to zero or below.
    #[builder(default = "false")]
    pub prune: bool,

    /// Logging verbosity.
    #[builder(default = "Verbosity::Info")]
    pub verbosity: Verbosity,
}

impl TrainerParams {
    /// Fluent builder for trainer parameters.
    pub fn builder() -> TrainerParamsBuilder {
        TrainerParamsBuilder::default()
    }
}

impl Default for TrainerParams {
    fn default() -> Self {
        Self {
            surrogate: Surrogate::Ppo,
            algorithm: TreeAlgorithm::Sum,
            max_depth: 4,
            step_size: 0.1,
            weight_tune_step: 0.0,
            value_step: 1.0,
            value_depth: 4,
            discount: 0.99,
            lambda: 0.95,
            epsilon: 0.0,
            entropy_coeff: 0.0,
            feature_frac: 0.0,
            min_leaf: 0,
            min_leaf_frac: 0.0,
            max_trees: 0,
            decay: 0.0,
            prune: false,
            verbosity: Verbosity::Info,
        }
    }
}

/// Summary of one training iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// Mean total reward of the iteration's rollouts.
    pub mean_reward: f64,
    /// Mean surrogate objective of the policy step.
    pub objective: f64,
    /// Mean regularization term of the policy step.
    pub regularization: f64,
    /// Mean squared error the value step trained against.
    pub value_mse: f64,
    /// Number of policy trees removed by pruning.
    pub pruned: usize,
}

/// Drives training: one policy tree and one value tree per iteration.
///
/// The caller collects rollouts with the current [`policy`](Trainer::policy)
/// forest and hands them to [`run_iteration`](Trainer::run_iteration);
/// everything from advantage estimation to forest maintenance happens here.
pub struct Trainer<S: ActionSpace + Clone> {
    space: S,
    params: TrainerParams,
    policy: Forest,
    judger: Judger,
    logger: TrainingLogger,
    round: usize,
}

impl<S: ActionSpace + Clone + 'static> Trainer<S> {
    /// Create a trainer with an empty policy over a zero base.
    pub fn new(space: S, params: TrainerParams) -> Self {
        let policy = Forest::new(space.param_dim());
        let mut judger = Judger::new(params.discount, params.lambda);
        judger.feature_frac = params.feature_frac;
        let logger = TrainingLogger::new(params.verbosity);
        Self {
            space,
            params,
            policy,
            judger,
            logger,
            round: 0,
        }
    }

    /// The current policy forest.
    pub fn policy(&self) -> &Forest {
        &self.policy
    }

    /// The current value-function forest.
    pub fn value_func(&self) -> &Forest {
        &self.judger.value_func
    }

    /// Run one training iteration over a batch of rollouts.
    pub fn run_iteration<R: Rng>(&mut self, rollouts: &[Rollout], rng: &mut R) -> IterationReport {
        assert!(!rollouts.is_empty(), "cannot train on an empty rollout batch");

        let advantages = self.judger.judge_actions(rollouts);
        let samples = samples_with_advantages(rollouts, &advantages);

        let builder = TreeBuilder::new(self.params.algorithm, self.params.max_depth)
            .with_feature_frac(self.params.feature_frac)
            .with_min_leaf(self.params.min_leaf)
            .with_min_leaf_frac(self.params.min_leaf_frac);
        let regularizer = self.regularizer();

        let (tree, objective, regularization) = match self.params.surrogate {
            Surrogate::PolicyGradient => {
                let pg = PolicyGradient {
                    builder,
                    space: self.space.clone(),
                    regularizer,
                };
                pg.build(&samples, rng)
            }
            Surrogate::Ppo => {
                let ppo = PPO {
                    builder,
                    space: self.space.clone(),
                    epsilon: self.params.epsilon,
                    regularizer,
                };
                if self.params.weight_tune_step != 0.0 && !self.policy.is_empty() {
                    let gradient = ppo.weight_gradient(&samples, &self.policy);
                    self.policy.add_weights(&gradient, self.params.weight_tune_step);
                    self.logger.debug("fine-tuned forest weights");
                }
                ppo.step(&samples, &self.policy, rng)
            }
        };
        self.policy.add(tree, self.params.step_size);

        let value_samples = self.judger.training_samples(rollouts);
        let (value_tree, value_mse) = self.judger.train(&value_samples, self.params.value_depth, rng);
        let weight = self.judger.optimal_weight(&value_samples, &value_tree);
        self.judger
            .value_func
            .add(value_tree, self.params.value_step * weight);

        if self.params.decay != 0.0 {
            self.policy.scale(1.0 - self.params.decay);
        }
        let mut pruned = 0;
        if self.params.prune {
            pruned = self.policy.prune_non_positive();
        }
        if self.params.max_trees != 0 {
            while self.policy.len() > self.params.max_trees {
                self.policy.remove_first();
            }
        }

        let mean_reward =
            rollouts.iter().map(Rollout::total_reward).sum::<f64>() / rollouts.len() as f64;
        self.logger.round(self.round, mean_reward, objective, value_mse);
        self.round += 1;

        IterationReport {
            mean_reward,
            objective,
            regularization,
            value_mse,
            pruned,
        }
    }

    fn regularizer(&self) -> Option<Box<dyn Regularizer>> {
        if self.params.entropy_coeff == 0.0 {
            return None;
        }
        Some(Box::new(EntropyReg {
            space: self.space.clone(),
            coeff: self.params.entropy_coeff,
        }))
    }
}
