use rand::Rng;
use tracing::debug;

use crate::graph::max_weight_assignment;
use crate::grid::SamplerGrid;
use crate::runtime::{stream_rng, WorkerPool, PRICE_STREAM};
use crate::sampler::EdgeSampler;
use crate::{ProphetError, ProphetOptions};

/// Fixed factor applied to the expected matched weight of each offline vertex.
pub const PRICE_CALIBRATION: f64 = 0.5;

/// One non-negative price per offline vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceVector(Vec<f64>);

impl PriceVector {
    pub fn new(prices: Vec<f64>) -> Result<Self, ProphetError> {
        if prices.is_empty() {
            return Err(ProphetError::InvalidInput(
                "price vector must cover at least one offline vertex".to_string(),
            ));
        }
        if let Some((offline, price)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(ProphetError::InvalidInput(format!(
                "price for offline vertex {offline} must be finite and non-negative, got {price}"
            )));
        }
        Ok(Self(prices))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, offline: usize) -> Option<f64> {
        self.0.get(offline).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Samples folded into one running total per worker job. Fixed, so the
/// summation order never depends on the thread count.
const PRICE_CHUNK: usize = 64;

/// Draws one realization and credits each matched offline vertex with the
/// weight it was matched at.
fn accumulate_sample<S: EdgeSampler, R: Rng>(
    grid: &SamplerGrid<S>,
    totals: &mut [f64],
    rng: &mut R,
) -> Result<(), ProphetError> {
    let weights = grid.sample_matrix(rng)?;
    let assignment = max_weight_assignment(&weights)?;
    for &(offline, online) in &assignment.pairs {
        totals[offline] += weights.get(offline, online);
    }
    Ok(())
}

fn prices_from_totals(totals: Vec<f64>, samples: usize) -> PriceVector {
    let scale = PRICE_CALIBRATION / samples as f64;
    PriceVector(totals.into_iter().map(|total| total * scale).collect())
}

/// Estimates posted prices from `samples` realizations drawn from `rng`.
pub fn compute_prices<S: EdgeSampler, R: Rng>(
    grid: &SamplerGrid<S>,
    samples: usize,
    rng: &mut R,
) -> Result<PriceVector, ProphetError> {
    if samples == 0 {
        return Err(ProphetError::InvalidInput(
            "price estimation needs at least one sample".to_string(),
        ));
    }
    let mut totals = vec![0.0; grid.offline_count()];
    for _ in 0..samples {
        accumulate_sample(grid, &mut totals, rng)?;
    }
    debug!(
        offline = grid.offline_count(),
        online = grid.online_count(),
        samples,
        "computed posted prices"
    );
    Ok(prices_from_totals(totals, samples))
}

/// Seeded variant of [`compute_prices`]. Sample `t` draws from its own
/// stream, so the result does not depend on `opts.threads`.
pub fn estimate_prices<S>(
    grid: &SamplerGrid<S>,
    opts: &ProphetOptions,
) -> Result<PriceVector, ProphetError>
where
    S: EdgeSampler + Sync,
{
    let workers = WorkerPool::new(opts.threads)?;
    estimate_prices_on(grid, opts, &workers)
}

pub(crate) fn estimate_prices_on<S>(
    grid: &SamplerGrid<S>,
    opts: &ProphetOptions,
    workers: &WorkerPool,
) -> Result<PriceVector, ProphetError>
where
    S: EdgeSampler + Sync,
{
    let samples = opts.price_samples;
    if samples == 0 {
        return Err(ProphetError::InvalidInput(
            "price estimation needs at least one sample".to_string(),
        ));
    }
    let offline_count = grid.offline_count();
    let chunk_totals = workers.map_indexed(samples.div_ceil(PRICE_CHUNK), |chunk| {
        let mut totals = vec![0.0; offline_count];
        let end = ((chunk + 1) * PRICE_CHUNK).min(samples);
        for t in chunk * PRICE_CHUNK..end {
            let mut rng = stream_rng(opts.seed, PRICE_STREAM, t as u64);
            accumulate_sample(grid, &mut totals, &mut rng)?;
        }
        Ok(totals)
    })?;

    let mut totals = vec![0.0; offline_count];
    for chunk in chunk_totals {
        for (total, part) in totals.iter_mut().zip(chunk) {
            *total += part;
        }
    }
    debug!(
        offline = offline_count,
        online = grid.online_count(),
        samples,
        threads = workers.threads(),
        seed = opts.seed,
        "estimated posted prices"
    );
    Ok(prices_from_totals(totals, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::EdgeDistribution;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn price_vector_rejects_negative_entries() {
        assert!(PriceVector::new(vec![0.1, -0.2]).is_err());
        assert!(PriceVector::new(vec![f64::NAN]).is_err());
        assert!(PriceVector::new(Vec::new()).is_err());
        assert_eq!(PriceVector::new(vec![0.0, 0.3]).unwrap().get(1), Some(0.3));
    }

    #[test]
    fn constant_single_edge_is_priced_at_half() {
        let grid = SamplerGrid::new(vec![vec![EdgeDistribution::Constant(0.8)]]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let prices = compute_prices(&grid, 50, &mut rng).unwrap();
        assert_eq!(prices.len(), 1);
        assert!((prices.as_slice()[0] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn unmatched_offline_vertex_gets_zero_price() {
        // two offline vertices compete for one online vertex; row 0 always wins
        let grid = SamplerGrid::new(vec![
            vec![EdgeDistribution::Constant(1.0)],
            vec![EdgeDistribution::Constant(0.5)],
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let prices = compute_prices(&grid, 10, &mut rng).unwrap();
        assert!((prices.as_slice()[0] - 0.5).abs() < 1e-12);
        assert_eq!(prices.as_slice()[1], 0.0);
    }

    #[test]
    fn zero_samples_is_invalid() {
        let grid = SamplerGrid::new(vec![vec![EdgeDistribution::Constant(1.0)]]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            compute_prices(&grid, 0, &mut rng),
            Err(ProphetError::InvalidInput(_))
        ));
        let opts = ProphetOptions {
            price_samples: 0,
            ..ProphetOptions::default()
        };
        assert!(estimate_prices(&grid, &opts).is_err());
    }

    #[test]
    fn partial_last_chunk_is_counted_once() {
        let grid = SamplerGrid::new(vec![
            vec![EdgeDistribution::Constant(0.6), EdgeDistribution::Constant(0.2)],
            vec![EdgeDistribution::Constant(0.1), EdgeDistribution::Constant(0.9)],
        ])
        .unwrap();
        let opts = ProphetOptions {
            price_samples: 2 * PRICE_CHUNK + 3,
            ..ProphetOptions::default()
        };
        let prices = estimate_prices(&grid, &opts).unwrap();
        assert!((prices.as_slice()[0] - 0.3).abs() < 1e-12);
        assert!((prices.as_slice()[1] - 0.45).abs() < 1e-12);

        let uniform = SamplerGrid::from_fn(3, 2, |_, _| EdgeDistribution::uniform(0.0, 1.0)).unwrap();
        let sequential = estimate_prices(&uniform, &opts).unwrap();
        let parallel = estimate_prices(
            &uniform,
            &ProphetOptions {
                threads: 3,
                ..opts.clone()
            },
        )
        .unwrap();
        assert_eq!(sequential, parallel);
    }
}
