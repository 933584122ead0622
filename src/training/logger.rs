//! Structured logging for training runs.

/// How much the trainer prints while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Print nothing.
    Silent,
    /// One line per training round.
    #[default]
    Info,
    /// Round lines plus per-step diagnostics.
    Debug,
}

/// Prints per-round training summaries.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    /// Create a logger with the given verbosity.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Log the summary line for one training round.
    pub fn round(
        &self,
        round: usize,
        mean_reward: f64,
        objective: f64,
        value_mse: f64,
    ) {
        if self.verbosity >= Verbosity::Info {
            println!(
                "round {round}: mean_reward={mean_reward:.4} objective={objective:.6} value_mse={value_mse:.6}"
            );
        }
    }

    /// Log a diagnostic message, shown only at [`Verbosity::Debug`].
    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Debug {
            println!("{message}");
        }
    }
}
