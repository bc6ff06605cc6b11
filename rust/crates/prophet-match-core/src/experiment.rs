use rand::rngs::StdRng;
use rand::Rng;
use tracing::info;

use crate::grid::SamplerGrid;
use crate::online::{run_online_trial, TrialResult};
use crate::pricing::{estimate_prices_on, PriceVector};
use crate::runtime::{stream_rng, WorkerPool, INSTANCE_STREAM, TRIAL_STREAM};
use crate::sampler::EdgeSampler;
use crate::{ProphetError, ProphetOptions};

/// Summary of `ALG / OPT` over a batch of trials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl RatioStats {
    pub fn from_trials(trials: &[TrialResult]) -> Result<Self, ProphetError> {
        if trials.is_empty() {
            return Err(ProphetError::InvalidInput(
                "ratio statistics need at least one trial".to_string(),
            ));
        }
        let ratios = trials
            .iter()
            .map(TrialResult::competitive_ratio)
            .collect::<Result<Vec<_>, _>>()?;
        let count = ratios.len();
        let mean = ratios.iter().sum::<f64>() / count as f64;
        let variance = ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / count as f64;
        let min = ratios.iter().copied().fold(f64::INFINITY, f64::min);
        let max = ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            count,
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct InstanceSummary {
    pub offline_count: usize,
    pub online_count: usize,
    pub prices: PriceVector,
    pub trials: Vec<TrialResult>,
    pub ratio: RatioStats,
}

/// Prices one instance and runs `opts.trials` independent online trials on it.
pub fn run_instance<S>(
    grid: &SamplerGrid<S>,
    opts: &ProphetOptions,
) -> Result<InstanceSummary, ProphetError>
where
    S: EdgeSampler + Sync,
{
    opts.validate()?;
    let workers = WorkerPool::new(opts.threads)?;
    run_instance_on(grid, opts, &workers)
}

fn run_instance_on<S>(
    grid: &SamplerGrid<S>,
    opts: &ProphetOptions,
    workers: &WorkerPool,
) -> Result<InstanceSummary, ProphetError>
where
    S: EdgeSampler + Sync,
{
    let prices = estimate_prices_on(grid, opts, workers)?;
    let trials = workers.map_indexed(opts.trials, |k| {
        let mut rng = stream_rng(opts.seed, TRIAL_STREAM, k as u64);
        run_online_trial(grid, &prices, opts, &mut rng)
    })?;
    let ratio = RatioStats::from_trials(&trials)?;
    Ok(InstanceSummary {
        offline_count: grid.offline_count(),
        online_count: grid.online_count(),
        prices,
        trials,
        ratio,
    })
}

/// Results of a sweep over offline and online sizes. Cells are stored
/// row-major: offline size first, then online size.
#[derive(Debug, Clone, Default)]
pub struct ExperimentReport {
    pub offline_sizes: Vec<usize>,
    pub online_sizes: Vec<usize>,
    pub cells: Vec<InstanceSummary>,
}

impl ExperimentReport {
    pub fn cell(&self, offline_idx: usize, online_idx: usize) -> Option<&InstanceSummary> {
        if offline_idx >= self.offline_sizes.len() || online_idx >= self.online_sizes.len() {
            return None;
        }
        self.cells
            .get(offline_idx * self.online_sizes.len() + online_idx)
    }

    /// Mean competitive ratio per `(offline size, online size)` cell.
    pub fn mean_ratio_table(&self) -> Vec<Vec<f64>> {
        self.cells
            .chunks(self.online_sizes.len().max(1))
            .map(|row| row.iter().map(|cell| cell.ratio.mean).collect())
            .collect()
    }

    pub fn ratios(&self) -> Vec<f64> {
        self.cells
            .iter()
            .flat_map(|cell| cell.trials.iter())
            .map(|trial| trial.alg / trial.opt)
            .collect()
    }

    pub fn alg_opt_pairs(&self) -> Vec<(f64, f64)> {
        self.cells
            .iter()
            .flat_map(|cell| cell.trials.iter())
            .map(|trial| (trial.alg, trial.opt))
            .collect()
    }
}

/// Runs [`run_instance`] for every `(n, m)` pair. `make_grid` builds the
/// instance for a cell from a seeded generator.
pub fn run_parameter_grid<S, F>(
    offline_sizes: &[usize],
    online_sizes: &[usize],
    opts: &ProphetOptions,
    mut make_grid: F,
) -> Result<ExperimentReport, ProphetError>
where
    S: EdgeSampler + Sync,
    F: FnMut(usize, usize, &mut StdRng) -> Result<SamplerGrid<S>, ProphetError>,
{
    opts.validate()?;
    if offline_sizes.is_empty() || online_sizes.is_empty() {
        return Err(ProphetError::InvalidInput(
            "parameter grid needs at least one offline and one online size".to_string(),
        ));
    }
    if offline_sizes.iter().chain(online_sizes).any(|&size| size == 0) {
        return Err(ProphetError::InvalidInput(
            "vertex counts must be positive".to_string(),
        ));
    }

    let workers = WorkerPool::new(opts.threads)?;
    let mut cells = Vec::with_capacity(offline_sizes.len() * online_sizes.len());
    for (offline_idx, &n) in offline_sizes.iter().enumerate() {
        for (online_idx, &m) in online_sizes.iter().enumerate() {
            info!(offline = n, online = m, "running experiments");
            let cell_index = (offline_idx * online_sizes.len() + online_idx) as u64;
            let mut rng = stream_rng(opts.seed, INSTANCE_STREAM, cell_index);
            let grid = make_grid(n, m, &mut rng)?;
            if grid.dimensions() != (n, m) {
                return Err(ProphetError::InvalidInput(format!(
                    "generator returned a {}x{} grid for cell {n}x{m}",
                    grid.offline_count(),
                    grid.online_count()
                )));
            }
            let cell_opts = ProphetOptions {
                seed: rng.gen(),
                ..opts.clone()
            };
            let summary = run_instance_on(&grid, &cell_opts, &workers)?;
            info!(
                offline = n,
                online = m,
                mean_ratio = summary.ratio.mean,
                min_ratio = summary.ratio.min,
                "cell finished"
            );
            cells.push(summary);
        }
    }

    Ok(ExperimentReport {
        offline_sizes: offline_sizes.to_vec(),
        online_sizes: online_sizes.to_vec(),
        cells,
    })
}
