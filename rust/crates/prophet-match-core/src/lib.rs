pub mod experiment;
pub mod graph;
pub mod grid;
pub mod online;
pub mod pricing;
pub mod runtime;
pub mod sampler;

use thiserror::Error;

pub use experiment::{
    run_instance, run_parameter_grid, ExperimentReport, InstanceSummary, RatioStats,
};
pub use graph::{max_weight_assignment, Assignment, WeightMatrix};
pub use grid::SamplerGrid;
pub use online::{
    evaluate_realization, greedy_match, run_online_trial, verify_outcome, GreedyOutcome,
    OnlineMatcher, TrialResult, ViolationReport,
};
pub use pricing::{compute_prices, estimate_prices, PriceVector, PRICE_CALIBRATION};
pub use sampler::{EdgeDistribution, EdgeSampler, FnSampler};

#[derive(Debug, Clone)]
pub struct ProphetOptions {
    /// Realizations averaged per posted price.
    pub price_samples: usize,
    /// Online trials per instance.
    pub trials: usize,
    pub seed: u64,
    /// Relative slack allowed when checking `ALG <= OPT`.
    pub tolerance: f64,
    pub threads: usize,
}

impl Default for ProphetOptions {
    fn default() -> Self {
        Self {
            price_samples: 1000,
            trials: 10_000,
            seed: 0,
            tolerance: 1e-9,
            threads: 1,
        }
    }
}

impl ProphetOptions {
    pub fn validate(&self) -> Result<(), ProphetError> {
        if self.price_samples == 0 {
            return Err(ProphetError::InvalidInput(
                "price_samples must be positive".to_string(),
            ));
        }
        if self.trials == 0 {
            return Err(ProphetError::InvalidInput(
                "trials must be positive".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ProphetError::InvalidInput(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ProphetError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
    #[error("sampler for edge ({offline}, {online}) produced invalid weight {value}")]
    InvalidSample {
        offline: usize,
        online: usize,
        value: f64,
    },
    #[error("degenerate trial: offline optimum is {opt} (online gain {alg})")]
    DegenerateTrial { alg: f64, opt: f64 },
    #[error("online gain exceeds offline optimum\n{0}")]
    InvariantViolation(Box<ViolationReport>),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}
