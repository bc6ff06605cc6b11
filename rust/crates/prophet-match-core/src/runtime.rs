use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::ProphetError;

pub const PRICE_STREAM: u64 = 0x7072_6963;
pub const TRIAL_STREAM: u64 = 0x7472_6961;
pub const INSTANCE_STREAM: u64 = 0x696e_7374;

#[inline]
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for element `index` of `stream` under the root `seed`.
pub fn stream_seed(seed: u64, stream: u64, index: u64) -> u64 {
    splitmix64(splitmix64(seed ^ splitmix64(stream)) ^ index)
}

pub fn stream_rng(seed: u64, stream: u64, index: u64) -> StdRng {
    StdRng::seed_from_u64(stream_seed(seed, stream, index))
}

/// Worker threads shared by every fan-out of one run. A single thread runs
/// jobs inline without a pool.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    pool: Option<ThreadPool>,
}

impl WorkerPool {
    pub(crate) fn new(threads: usize) -> Result<Self, ProphetError> {
        if threads <= 1 {
            return Ok(Self { pool: None });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|err| ProphetError::ThreadPool(err.to_string()))?;
        Ok(Self { pool: Some(pool) })
    }

    pub(crate) fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, ThreadPool::current_num_threads)
    }

    /// Evaluates `job(0..count)`; output keeps index order.
    pub(crate) fn map_indexed<T, F>(&self, count: usize, job: F) -> Result<Vec<T>, ProphetError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, ProphetError> + Sync + Send,
    {
        match &self.pool {
            None => (0..count).map(job).collect(),
            Some(pool) => pool.install(|| (0..count).into_par_iter().map(job).collect()),
        }
    }
}
