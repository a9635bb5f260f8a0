//! Accumulation phase: months until a savings target is first reached.
//!
//! Each trial starts from the current balance, adds the monthly contribution and then applies one
//! lognormal monthly growth factor. The first month with `balance >= target` is the success month.
//! Trials that never get there within `max_months` count as failures.
//!
//! Only success months are kept per trial. Representative paths are rebuilt afterwards by replaying
//! the selected trials from their own seeds.

use std::collections::BTreeMap;

use crate::domain::error::NestcastError;
use crate::domain::random::{ConstantNormal, LogNormalStep, NormalSource, SourceFactory};
use crate::domain::simulation::{SimulationControl, SimulationPath, percentile_index, run_trials};

pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationParams {
    pub initial_asset: f64,
    pub monthly_contribution: f64,
    pub target_asset: f64,
    pub mean_annual_return: f64,
    pub annual_volatility: f64,
    pub trials: usize,
    pub max_months: u32,
    pub track_paths: bool,
}

impl AccumulationParams {
    fn monthly_step(&self) -> Result<LogNormalStep, NestcastError> {
        if self.trials == 0 {
            return Err(NestcastError::invalid("trials", "must be at least 1"));
        }
        check_amount("initial_asset", self.initial_asset)?;
        check_amount("monthly_contribution", self.monthly_contribution)?;
        check_amount("target_asset", self.target_asset)?;
        LogNormalStep::new(self.mean_annual_return, self.annual_volatility, MONTHS_PER_YEAR)
    }
}

fn check_amount(name: &'static str, value: f64) -> Result<(), NestcastError> {
    if !value.is_finite() || value < 0.0 {
        return Err(NestcastError::invalid(
            name,
            format!("{value} must be finite and non-negative"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthPercentiles {
    pub p10: u32,
    pub p50: u32,
    pub p90: u32,
}

/// Real trials sitting at the 10th, 50th and 90th percentile success months.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentativePaths {
    pub best: SimulationPath,
    pub median: SimulationPath,
    pub worst: SimulationPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationResult {
    pub trials: usize,
    pub successes: usize,
    pub success_rate: f64,
    /// Sorted ascending.
    pub success_months: Vec<u32>,
    pub percentiles: Option<MonthPercentiles>,
    /// Successes per year, where months 1..=12 fall in year 1 and month 0 in year 0.
    pub year_histogram: BTreeMap<u32, usize>,
    pub representative: Option<RepresentativePaths>,
}

/// Runs one trial. When `path` is given, every month's balance (month 0 included) is pushed
/// onto it.
fn run_trial<S: NormalSource>(
    params: &AccumulationParams,
    step: &LogNormalStep,
    source: &mut S,
    mut path: Option<&mut Vec<f64>>,
) -> Option<u32> {
    let mut balance = params.initial_asset;
    if let Some(p) = path.as_mut() {
        p.push(balance);
    }
    if balance >= params.target_asset {
        return Some(0);
    }
    for month in 1..=params.max_months {
        balance = (balance + params.monthly_contribution) * step.sample(source);
        if let Some(p) = path.as_mut() {
            p.push(balance);
        }
        if balance >= params.target_asset {
            return Some(month);
        }
    }
    None
}

fn replay<F: SourceFactory>(
    params: &AccumulationParams,
    step: &LogNormalStep,
    factory: &F,
    trial: usize,
) -> SimulationPath {
    let mut values = Vec::new();
    let mut source = factory.for_trial(trial);
    run_trial(params, step, &mut source, Some(&mut values));
    SimulationPath { trial, values }
}

pub fn simulate_accumulation<F: SourceFactory>(
    params: &AccumulationParams,
    factory: &F,
    control: &SimulationControl,
) -> Result<AccumulationResult, NestcastError> {
    let step = params.monthly_step()?;
    tracing::info!(
        trials = params.trials,
        max_months = params.max_months,
        target = params.target_asset,
        "starting accumulation simulation"
    );

    let outcomes = run_trials(params.trials, control, |trial| {
        let mut source = factory.for_trial(trial);
        run_trial(params, &step, &mut source, None)
    })?;

    // (month, trial) so equal months keep a stable trial order.
    let mut successes: Vec<(u32, usize)> = outcomes
        .iter()
        .enumerate()
        .filter_map(|(trial, month)| month.map(|m| (m, trial)))
        .collect();
    successes.sort_unstable();

    let pick = |p: f64| percentile_index(successes.len(), p).map(|i| successes[i]);
    let (percentiles, representative) = match (pick(0.10), pick(0.50), pick(0.90)) {
        (Some(best), Some(median), Some(worst)) => {
            let percentiles = MonthPercentiles {
                p10: best.0,
                p50: median.0,
                p90: worst.0,
            };
            let representative = params.track_paths.then(|| RepresentativePaths {
                best: replay(params, &step, factory, best.1),
                median: replay(params, &step, factory, median.1),
                worst: replay(params, &step, factory, worst.1),
            });
            (Some(percentiles), representative)
        }
        _ => (None, None),
    };

    let mut year_histogram = BTreeMap::new();
    for &(month, _) in &successes {
        *year_histogram
            .entry(month.div_ceil(MONTHS_PER_YEAR))
            .or_insert(0) += 1;
    }

    let success_rate = successes.len() as f64 / params.trials as f64;
    tracing::info!(
        successes = successes.len(),
        success_rate,
        "accumulation simulation finished"
    );

    Ok(AccumulationResult {
        trials: params.trials,
        successes: successes.len(),
        success_rate,
        success_months: successes.into_iter().map(|(m, _)| m).collect(),
        percentiles,
        year_histogram,
        representative,
    })
}

/// Months to reach the target with zero volatility, or `None` within `max_months`.
pub fn deterministic_months_to_target(
    params: &AccumulationParams,
) -> Result<Option<u32>, NestcastError> {
    let flat = AccumulationParams {
        annual_volatility: 0.0,
        ..params.clone()
    };
    let step = flat.monthly_step()?;
    Ok(run_trial(&flat, &step, &mut ConstantNormal(0.0), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::random::SeededBoxMuller;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn params() -> AccumulationParams {
        AccumulationParams {
            initial_asset: 100_000.0,
            monthly_contribution: 2_000.0,
            target_asset: 500_000.0,
            mean_annual_return: 0.07,
            annual_volatility: 0.15,
            trials: 2_000,
            max_months: 600,
            track_paths: true,
        }
    }

    fn run(params: &AccumulationParams) -> AccumulationResult {
        simulate_accumulation(params, &SeededBoxMuller::new(42), &SimulationControl::default())
            .unwrap()
    }

    #[test]
    fn already_at_target_succeeds_at_month_zero() {
        let p = AccumulationParams {
            initial_asset: 1_000.0,
            monthly_contribution: 0.0,
            target_asset: 1_000.0,
            mean_annual_return: 0.0,
            annual_volatility: 0.0,
            trials: 50,
            max_months: 120,
            track_paths: true,
        };
        let result = run(&p);
        assert_eq!(result.successes, 50);
        assert_eq!(result.success_rate, 1.0);
        assert!(result.success_months.iter().all(|&m| m == 0));
        assert_eq!(
            result.percentiles,
            Some(MonthPercentiles { p10: 0, p50: 0, p90: 0 })
        );
        assert_eq!(result.year_histogram.get(&0), Some(&50));
        let paths = result.representative.unwrap();
        assert_eq!(paths.median.values, vec![1_000.0]);
    }

    #[test]
    fn success_rate_non_increasing_as_max_months_shrinks() {
        let mut previous = f64::INFINITY;
        for max_months in [600, 240, 120, 60, 12] {
            let result = run(&AccumulationParams {
                max_months,
                track_paths: false,
                ..params()
            });
            assert!(result.success_rate <= previous);
            previous = result.success_rate;
        }
    }

    #[test]
    fn identical_seed_gives_identical_result() {
        assert_eq!(run(&params()), run(&params()));
    }

    #[test]
    fn representative_paths_are_real_trials() {
        let result = run(&params());
        let pct = result.percentiles.unwrap();
        assert!(pct.p10 <= pct.p50 && pct.p50 <= pct.p90);

        let paths = result.representative.unwrap();
        for (path, month) in [
            (&paths.best, pct.p10),
            (&paths.median, pct.p50),
            (&paths.worst, pct.p90),
        ] {
            assert_eq!(path.values.len(), month as usize + 1);
            assert_eq!(path.values[0], 100_000.0);
            assert!(path.final_value().unwrap() >= 500_000.0);
            assert!(path.values[..path.values.len() - 1].iter().all(|&v| v < 500_000.0));
        }
    }

    #[test]
    fn histogram_counts_every_success() {
        let result = run(&params());
        let counted: usize = result.year_histogram.values().sum();
        assert_eq!(counted, result.successes);
        assert_eq!(result.success_months.len(), result.successes);
        assert!(result.success_months.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unreachable_target_has_no_percentiles() {
        let result = run(&AccumulationParams {
            monthly_contribution: 0.0,
            mean_annual_return: 0.0,
            annual_volatility: 0.0,
            ..params()
        });
        assert_eq!(result.successes, 0);
        assert_eq!(result.success_rate, 0.0);
        assert!(result.percentiles.is_none());
        assert!(result.representative.is_none());
        assert!(result.year_histogram.is_empty());
    }

    #[test]
    fn paths_not_tracked_when_disabled() {
        let result = run(&AccumulationParams {
            track_paths: false,
            ..params()
        });
        assert!(result.percentiles.is_some());
        assert!(result.representative.is_none());
    }

    #[test]
    fn deterministic_months_with_flat_growth() {
        let p = AccumulationParams {
            initial_asset: 0.0,
            monthly_contribution: 100.0,
            target_asset: 1_200.0,
            mean_annual_return: 0.0,
            annual_volatility: 0.25,
            ..params()
        };
        assert_eq!(deterministic_months_to_target(&p).unwrap(), Some(12));

        let capped = AccumulationParams { max_months: 11, ..p };
        assert_eq!(deterministic_months_to_target(&capped).unwrap(), None);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let control = SimulationControl::default();
        let factory = SeededBoxMuller::new(1);
        for bad in [
            AccumulationParams { trials: 0, ..params() },
            AccumulationParams { annual_volatility: -0.1, ..params() },
            AccumulationParams { mean_annual_return: -1.0, ..params() },
            AccumulationParams { target_asset: f64::NAN, ..params() },
            AccumulationParams { initial_asset: -5.0, ..params() },
        ] {
            assert!(matches!(
                simulate_accumulation(&bad, &factory, &control),
                Err(NestcastError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn cancellation_is_reported() {
        let control = SimulationControl::default().with_cancel(Arc::new(AtomicBool::new(true)));
        let result = simulate_accumulation(&params(), &SeededBoxMuller::new(42), &control);
        assert!(matches!(result, Err(NestcastError::Cancelled { .. })));
    }
}
