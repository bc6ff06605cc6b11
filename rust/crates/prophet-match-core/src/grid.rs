use rand::Rng;

use crate::graph::WeightMatrix;
use crate::sampler::EdgeSampler;
use crate::ProphetError;

/// Rectangular table of edge samplers, `offline_count` rows by
/// `online_count` columns. Immutable once built.
#[derive(Debug, Clone)]
pub struct SamplerGrid<S> {
    offline_count: usize,
    online_count: usize,
    samplers: Vec<S>,
}

impl<S: EdgeSampler> SamplerGrid<S> {
    pub fn new(rows: Vec<Vec<S>>) -> Result<Self, ProphetError> {
        let offline_count = rows.len();
        let online_count = rows.first().map(Vec::len).unwrap_or(0);
        if offline_count == 0 || online_count == 0 {
            return Err(ProphetError::InvalidInput(format!(
                "sampler grid must be non-empty, got {offline_count}x{online_count}"
            )));
        }
        let mut samplers = Vec::with_capacity(offline_count * online_count);
        for (offline, row) in rows.into_iter().enumerate() {
            if row.len() != online_count {
                return Err(ProphetError::InvalidInput(format!(
                    "sampler row {offline} has {} entries, expected {online_count}",
                    row.len()
                )));
            }
            samplers.extend(row);
        }
        Ok(Self {
            offline_count,
            online_count,
            samplers,
        })
    }

    /// Builds an `offline_count x online_count` grid from a per-edge factory.
    pub fn from_fn<F>(
        offline_count: usize,
        online_count: usize,
        mut make: F,
    ) -> Result<Self, ProphetError>
    where
        F: FnMut(usize, usize) -> Result<S, ProphetError>,
    {
        let mut rows = Vec::with_capacity(offline_count);
        for offline in 0..offline_count {
            let row = (0..online_count)
                .map(|online| make(offline, online))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Self::new(rows)
    }

    pub fn offline_count(&self) -> usize {
        self.offline_count
    }

    pub fn online_count(&self) -> usize {
        self.online_count
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.offline_count, self.online_count)
    }

    pub fn sampler(&self, offline: usize, online: usize) -> Option<&S> {
        if offline >= self.offline_count || online >= self.online_count {
            return None;
        }
        self.samplers.get(offline * self.online_count + online)
    }

    /// Draws one weight for the edge; negative or non-finite draws are rejected.
    pub fn sample<R: Rng>(
        &self,
        offline: usize,
        online: usize,
        rng: &mut R,
    ) -> Result<f64, ProphetError> {
        let sampler = self.sampler(offline, online).ok_or_else(|| {
            ProphetError::InvalidInput(format!(
                "edge ({offline}, {online}) outside {}x{} grid",
                self.offline_count, self.online_count
            ))
        })?;
        let value = sampler.sample(rng);
        if !value.is_finite() || value < 0.0 {
            return Err(ProphetError::InvalidSample {
                offline,
                online,
                value,
            });
        }
        Ok(value)
    }

    /// One full realization, drawn column by column in arrival order.
    pub fn sample_matrix<R: Rng>(&self, rng: &mut R) -> Result<WeightMatrix, ProphetError> {
        let mut weights = WeightMatrix::zeros(self.offline_count, self.online_count);
        for online in 0..self.online_count {
            for offline in 0..self.offline_count {
                weights.set(offline, online, self.sample(offline, online, rng)?);
            }
        }
        Ok(weights)
    }
}
