//! Pluggable standard-normal sampling and the lognormal growth step.
//!
//! Each Monte Carlo trial gets its own [`NormalSource`] from a [`SourceFactory`], keyed by trial
//! index, so results do not depend on how trials are scheduled across threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::domain::error::NestcastError;

/// A stream of standard normal draws.
pub trait NormalSource {
    fn next_standard_normal(&mut self) -> f64;
}

/// Creates one independent source per trial.
pub trait SourceFactory: Sync {
    type Source: NormalSource;

    fn for_trial(&self, trial: usize) -> Self::Source;
}

/// Box–Muller transform over any uniform generator.
///
/// `z = sqrt(-2 ln u1) * cos(2π u2)` with both uniforms drawn from (0, 1).
#[derive(Debug, Clone)]
pub struct BoxMuller<R> {
    rng: R,
}

impl<R: Rng> BoxMuller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn open_unit(&mut self) -> f64 {
        loop {
            let u: f64 = self.rng.r#gen();
            if u > 0.0 {
                return u;
            }
        }
    }
}

impl<R: Rng> NormalSource for BoxMuller<R> {
    fn next_standard_normal(&mut self) -> f64 {
        let u1 = self.open_unit();
        let u2 = self.open_unit();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

/// SplitMix64 finalizer, used to spread a base seed over trial indices.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed for `trial` within `stream` derived from `base`.
pub fn trial_seed(base: u64, stream: u64, trial: usize) -> u64 {
    mix(mix(base ^ mix(stream)).wrapping_add(trial as u64))
}

/// Default factory: Box–Muller over a `StdRng` seeded per trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededBoxMuller {
    pub seed: u64,
    pub stream: u64,
}

impl SeededBoxMuller {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    /// Same seed, independent stream. Used to keep chained simulations decorrelated.
    pub fn with_stream(self, stream: u64) -> Self {
        Self { stream, ..self }
    }
}

impl SourceFactory for SeededBoxMuller {
    type Source = BoxMuller<StdRng>;

    fn for_trial(&self, trial: usize) -> Self::Source {
        BoxMuller::new(StdRng::seed_from_u64(trial_seed(self.seed, self.stream, trial)))
    }
}

/// Always returns the same draw. `ConstantNormal(0.0)` gives the deterministic path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantNormal(pub f64);

impl NormalSource for ConstantNormal {
    fn next_standard_normal(&mut self) -> f64 {
        self.0
    }
}

impl SourceFactory for ConstantNormal {
    type Source = ConstantNormal;

    fn for_trial(&self, _trial: usize) -> Self::Source {
        *self
    }
}

/// Lognormal (GBM) growth over one period of `1 / periods_per_year` years.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNormalStep {
    pub mean: f64,
    pub volatility: f64,
}

impl LogNormalStep {
    /// `mean = ln(1 + r) / p - 0.5 σ² / p`, `volatility = σ / √p`.
    pub fn new(
        annual_return: f64,
        annual_volatility: f64,
        periods_per_year: u32,
    ) -> Result<Self, NestcastError> {
        if !annual_return.is_finite() || annual_return <= -1.0 {
            return Err(NestcastError::invalid(
                "annual_return",
                format!("{annual_return} must be finite and greater than -1"),
            ));
        }
        if !annual_volatility.is_finite() || annual_volatility < 0.0 {
            return Err(NestcastError::invalid(
                "annual_volatility",
                format!("{annual_volatility} must be finite and non-negative"),
            ));
        }
        if periods_per_year == 0 {
            return Err(NestcastError::invalid(
                "periods_per_year",
                "must be positive",
            ));
        }
        let p = f64::from(periods_per_year);
        Ok(LogNormalStep {
            mean: (1.0 + annual_return).ln() / p - 0.5 * annual_volatility.powi(2) / p,
            volatility: annual_volatility / p.sqrt(),
        })
    }

    /// Multiplicative growth factor for a standard normal draw `z`.
    pub fn growth(&self, z: f64) -> f64 {
        (self.mean + z * self.volatility).exp()
    }

    pub fn sample<S: NormalSource + ?Sized>(&self, source: &mut S) -> f64 {
        self.growth(source.next_standard_normal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_muller_is_reproducible_per_trial() {
        let factory = SeededBoxMuller::new(42);
        let mut a = factory.for_trial(7);
        let mut b = factory.for_trial(7);
        for _ in 0..16 {
            assert_eq!(a.next_standard_normal(), b.next_standard_normal());
        }
    }

    #[test]
    fn trials_and_streams_differ() {
        let factory = SeededBoxMuller::new(42);
        assert_ne!(
            factory.for_trial(0).next_standard_normal(),
            factory.for_trial(1).next_standard_normal()
        );
        assert_ne!(trial_seed(42, 0, 3), trial_seed(42, 1, 3));
    }

    #[test]
    fn box_muller_moments() {
        let mut source = SeededBoxMuller::new(7).for_trial(0);
        let n = 200_000;
        let draws: Vec<f64> = (0..n).map(|_| source.next_standard_normal()).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.01, "mean {mean}");
        assert!((var - 1.0).abs() < 0.02, "var {var}");
        assert!(draws.iter().all(|z| z.is_finite()));
    }

    #[test]
    fn zero_volatility_step_reproduces_annual_return() {
        let step = LogNormalStep::new(0.06, 0.0, 12).unwrap();
        let annual: f64 = (0..12).map(|_| step.growth(0.0)).product();
        assert_relative_eq!(annual, 1.06, epsilon = 1e-12);
    }

    #[test]
    fn zero_return_zero_volatility_is_identity() {
        let step = LogNormalStep::new(0.0, 0.0, 12).unwrap();
        assert_eq!(step.growth(0.0), 1.0);
        assert_eq!(step.sample(&mut ConstantNormal(2.5)), 1.0);
    }

    #[test]
    fn monthly_parameters() {
        let step = LogNormalStep::new(0.07, 0.15, 12).unwrap();
        assert_relative_eq!(
            step.mean,
            1.07f64.ln() / 12.0 - 0.5 * 0.0225 / 12.0,
            epsilon = 1e-15
        );
        assert_relative_eq!(step.volatility, 0.15 / 12f64.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(LogNormalStep::new(-1.0, 0.1, 12).is_err());
        assert!(LogNormalStep::new(0.05, -0.1, 12).is_err());
        assert!(LogNormalStep::new(f64::NAN, 0.1, 12).is_err());
        assert!(LogNormalStep::new(0.05, 0.1, 0).is_err());
    }
}
