//! Decumulation phase: yearly spending against a lognormally growing balance.
//!
//! Every year the annual spending is withdrawn first, then one annual growth factor is applied.
//! A balance at or below zero depletes the trial; the path stays at zero from then on.
//!
//! All trial paths live in one contiguous arena so that a shorter horizon can be re-ranked from the
//! same trials without simulating again.

use std::cmp::Ordering;
use std::fmt;

use crate::domain::error::NestcastError;
use crate::domain::random::{ConstantNormal, LogNormalStep, NormalSource, SourceFactory};
use crate::domain::simulation::{PathArena, SimulationControl, fill_paths, percentile_index};

pub const DEFAULT_HORIZON_YEARS: u32 = 40;
pub const DEFAULT_SHORT_HORIZON_YEARS: u32 = 10;

/// Outcome statistic used to order trials before picking bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankingStatistic {
    /// Balance at the end of the horizon, ties broken by time-weighted wealth.
    #[default]
    FinalBalance,
    /// Sum of year-end balances over the horizon.
    TimeWeightedWealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Band {
    VeryBest,
    Lucky,
    Median,
    Unlucky,
    VeryWorst,
}

impl Band {
    pub const ALL: [Band; 5] = [
        Band::VeryBest,
        Band::Lucky,
        Band::Median,
        Band::Unlucky,
        Band::VeryWorst,
    ];

    /// Position in the best-first ordering.
    pub fn percentile(self) -> f64 {
        match self {
            Band::VeryBest => 0.10,
            Band::Lucky => 0.30,
            Band::Median => 0.50,
            Band::Unlucky => 0.70,
            Band::VeryWorst => 0.90,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Band::VeryBest => "very best",
            Band::Lucky => "lucky",
            Band::Median => "median",
            Band::Unlucky => "unlucky",
            Band::VeryWorst => "very worst",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecumulationParams {
    pub initial_asset: f64,
    pub monthly_spending: f64,
    pub spending_ratio: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub trials: usize,
    pub horizon_years: u32,
    pub ranking: RankingStatistic,
}

impl DecumulationParams {
    pub fn annual_spending(&self) -> f64 {
        self.monthly_spending * 12.0 * self.spending_ratio
    }

    fn annual_step(&self) -> Result<LogNormalStep, NestcastError> {
        if self.trials == 0 {
            return Err(NestcastError::invalid("trials", "must be at least 1"));
        }
        if self.horizon_years == 0 {
            return Err(NestcastError::invalid("horizon_years", "must be at least 1"));
        }
        for (name, value) in [
            ("initial_asset", self.initial_asset),
            ("monthly_spending", self.monthly_spending),
            ("spending_ratio", self.spending_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(NestcastError::invalid(
                    name,
                    format!("{value} must be finite and non-negative"),
                ));
            }
        }
        LogNormalStep::new(self.annual_return, self.annual_volatility, 1)
    }
}

/// Year-end balances, index 0 being the starting balance.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyPath {
    pub values: Vec<f64>,
    pub depletion_year: Option<u32>,
}

impl YearlyPath {
    fn from_row(row: &[f64]) -> Self {
        YearlyPath {
            values: row.to_vec(),
            depletion_year: depletion_year(row),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandPath {
    pub band: Band,
    pub trial: usize,
    pub path: YearlyPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecumulationResult {
    pub horizon_years: u32,
    pub trials: usize,
    /// One entry per [`Band`], best first.
    pub bands: Vec<BandPath>,
    /// Zero-volatility reference.
    pub deterministic: YearlyPath,
    /// Fraction of trials depleted within the horizon.
    pub depletion_rate: f64,
}

impl DecumulationResult {
    pub fn band(&self, band: Band) -> Option<&BandPath> {
        self.bands.iter().find(|b| b.band == band)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecumulationProjection {
    pub long: DecumulationResult,
    pub short: DecumulationResult,
}

/// Fills `row` with one trial. `row[0]` is the starting balance.
fn run_trial<S: NormalSource>(
    initial_asset: f64,
    annual_spending: f64,
    step: &LogNormalStep,
    source: &mut S,
    row: &mut [f64],
) {
    let Some((first, years)) = row.split_first_mut() else {
        return;
    };
    *first = initial_asset;
    let mut balance = initial_asset;
    let mut depleted = false;
    for slot in years {
        if !depleted {
            balance = (balance - annual_spending) * step.sample(source);
            if balance <= 0.0 {
                depleted = true;
                balance = 0.0;
            }
        }
        *slot = balance;
    }
}

/// First year (≥ 1) whose balance is at or below zero.
fn depletion_year(row: &[f64]) -> Option<u32> {
    row.iter()
        .enumerate()
        .skip(1)
        .find(|&(_, &v)| v <= 0.0)
        .map(|(year, _)| year as u32)
}

fn time_weighted_wealth(row: &[f64]) -> f64 {
    row.iter().skip(1).sum()
}

/// Best-first comparison of two rows truncated to the same window.
fn compare_rows(ranking: RankingStatistic, a: &[f64], b: &[f64]) -> Ordering {
    let final_a = a.last().copied().unwrap_or(0.0);
    let final_b = b.last().copied().unwrap_or(0.0);
    let wealth = time_weighted_wealth(b).total_cmp(&time_weighted_wealth(a));
    match ranking {
        RankingStatistic::FinalBalance => final_b.total_cmp(&final_a).then(wealth),
        RankingStatistic::TimeWeightedWealth => wealth.then(final_b.total_cmp(&final_a)),
    }
}

/// Ranks the arena on its first `years` years and picks the five bands.
fn summarize(
    arena: &PathArena,
    years: u32,
    ranking: RankingStatistic,
    deterministic: &[f64],
) -> DecumulationResult {
    let width = (years as usize + 1).min(arena.stride());
    let window = |trial: usize| &arena.row(trial)[..width];

    let mut order: Vec<usize> = (0..arena.len()).collect();
    order.sort_by(|&a, &b| compare_rows(ranking, window(a), window(b)).then(a.cmp(&b)));

    let bands = Band::ALL
        .iter()
        .filter_map(|&band| {
            let trial = order[percentile_index(order.len(), band.percentile())?];
            Some(BandPath {
                band,
                trial,
                path: YearlyPath::from_row(window(trial)),
            })
        })
        .collect();

    let depleted = (0..arena.len())
        .filter(|&t| depletion_year(window(t)).is_some())
        .count();

    DecumulationResult {
        horizon_years: years,
        trials: arena.len(),
        bands,
        deterministic: YearlyPath::from_row(&deterministic[..width.min(deterministic.len())]),
        depletion_rate: if arena.is_empty() {
            0.0
        } else {
            depleted as f64 / arena.len() as f64
        },
    }
}

fn simulate_arena<F: SourceFactory>(
    params: &DecumulationParams,
    factory: &F,
    control: &SimulationControl,
) -> Result<(PathArena, Vec<f64>), NestcastError> {
    let step = params.annual_step()?;
    let spending = params.annual_spending();
    let stride = params.horizon_years as usize + 1;
    tracing::info!(
        trials = params.trials,
        horizon_years = params.horizon_years,
        annual_spending = spending,
        "starting decumulation simulation"
    );

    let (arena, _) = fill_paths(params.trials, stride, control, |trial, row| {
        let mut source = factory.for_trial(trial);
        run_trial(params.initial_asset, spending, &step, &mut source, row);
    })?;

    let flat = LogNormalStep::new(params.annual_return, 0.0, 1)?;
    let mut deterministic = vec![0.0; stride];
    run_trial(
        params.initial_asset,
        spending,
        &flat,
        &mut ConstantNormal(0.0),
        &mut deterministic,
    );
    Ok((arena, deterministic))
}

pub fn simulate_decumulation<F: SourceFactory>(
    params: &DecumulationParams,
    factory: &F,
    control: &SimulationControl,
) -> Result<DecumulationResult, NestcastError> {
    let (arena, deterministic) = simulate_arena(params, factory, control)?;
    let result = summarize(&arena, params.horizon_years, params.ranking, &deterministic);
    tracing::info!(
        depletion_rate = result.depletion_rate,
        "decumulation simulation finished"
    );
    Ok(result)
}

/// Long and short horizon results from one set of trials. The short horizon is ranked on its own
/// window, so its bands may come from different trials than the long ones.
pub fn simulate_decumulation_horizons<F: SourceFactory>(
    params: &DecumulationParams,
    short_horizon_years: u32,
    factory: &F,
    control: &SimulationControl,
) -> Result<DecumulationProjection, NestcastError> {
    if short_horizon_years == 0 || short_horizon_years > params.horizon_years {
        return Err(NestcastError::invalid(
            "short_horizon_years",
            format!(
                "{short_horizon_years} must be between 1 and the horizon ({})",
                params.horizon_years
            ),
        ));
    }
    let (arena, deterministic) = simulate_arena(params, factory, control)?;
    let long = summarize(&arena, params.horizon_years, params.ranking, &deterministic);
    let short = summarize(&arena, short_horizon_years, params.ranking, &deterministic);
    tracing::info!(
        long_depletion_rate = long.depletion_rate,
        short_depletion_rate = short.depletion_rate,
        "decumulation simulation finished"
    );
    Ok(DecumulationProjection { long, short })
}
