use std::fmt;

use rand::RngCore;
use rand_distr::{Binomial, Distribution, Normal, Pareto, Uniform};

use crate::ProphetError;

/// Draws one non-negative weight per call. Randomness comes from the caller.
pub trait EdgeSampler {
    fn sample(&self, rng: &mut dyn RngCore) -> f64;
}

impl<S: EdgeSampler + ?Sized> EdgeSampler for Box<S> {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        (**self).sample(rng)
    }
}

impl<S: EdgeSampler + ?Sized> EdgeSampler for &S {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        (**self).sample(rng)
    }
}

/// Adapts a plain closure into an [`EdgeSampler`].
#[derive(Clone, Copy)]
pub struct FnSampler<F>(pub F);

impl<F> EdgeSampler for FnSampler<F>
where
    F: Fn(&mut dyn RngCore) -> f64,
{
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        (self.0)(rng)
    }
}

impl<F> fmt::Debug for FnSampler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSampler(..)")
    }
}

/// Distribution families used for edge weights.
#[derive(Debug, Clone)]
pub enum EdgeDistribution {
    Constant(f64),
    Uniform(Uniform<f64>),
    /// Gaussian clamped at zero.
    Normal(Normal<f64>),
    /// Pareto II with unit location, scaled: `(X - 1) * scale` with
    /// `X ~ Pareto(1, alpha)`.
    Lomax { shape: Pareto<f64>, scale: f64 },
    /// Fraction of successes, `Binomial(trials, p) / trials`.
    BinomialFraction { binomial: Binomial, trials: u64 },
}

impl EdgeDistribution {
    pub fn constant(value: f64) -> Result<Self, ProphetError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ProphetError::InvalidDistribution(format!(
                "constant weight must be finite and non-negative, got {value}"
            )));
        }
        Ok(Self::Constant(value))
    }

    pub fn uniform(low: f64, high: f64) -> Result<Self, ProphetError> {
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
            return Err(ProphetError::InvalidDistribution(format!(
                "uniform bounds must satisfy 0 <= low <= high, got [{low}, {high})"
            )));
        }
        if low == high {
            return Ok(Self::Constant(low));
        }
        Ok(Self::Uniform(Uniform::new(low, high)))
    }

    pub fn normal(mean: f64, std_dev: f64) -> Result<Self, ProphetError> {
        if !mean.is_finite() {
            return Err(ProphetError::InvalidDistribution(format!(
                "normal mean must be finite, got {mean}"
            )));
        }
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(ProphetError::InvalidDistribution(format!(
                "normal standard deviation must be finite and non-negative, got {std_dev}"
            )));
        }
        Normal::new(mean, std_dev)
            .map(Self::Normal)
            .map_err(|err| ProphetError::InvalidDistribution(format!("normal: {err:?}")))
    }

    pub fn lomax(alpha: f64, scale: f64) -> Result<Self, ProphetError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ProphetError::InvalidDistribution(format!(
                "lomax scale must be positive, got {scale}"
            )));
        }
        let shape = Pareto::new(1.0, alpha)
            .map_err(|err| ProphetError::InvalidDistribution(format!("lomax: {err:?}")))?;
        Ok(Self::Lomax { shape, scale })
    }

    pub fn binomial_fraction(trials: u64, p: f64) -> Result<Self, ProphetError> {
        if trials == 0 {
            return Err(ProphetError::InvalidDistribution(
                "binomial needs at least one trial".to_string(),
            ));
        }
        let binomial = Binomial::new(trials, p)
            .map_err(|err| ProphetError::InvalidDistribution(format!("binomial: {err:?}")))?;
        Ok(Self::BinomialFraction { binomial, trials })
    }
}

impl EdgeSampler for EdgeDistribution {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::Uniform(uniform) => uniform.sample(rng),
            Self::Normal(normal) => normal.sample(rng).max(0.0),
            Self::Lomax { shape, scale } => (shape.sample(rng) - 1.0) * scale,
            Self::BinomialFraction { binomial, trials } => {
                binomial.sample(rng) as f64 / *trials as f64
            }
        }
    }
}
