//! Retirement plan projection: accumulation to a target, then decumulation from the balance
//! reached.

use crate::domain::accumulation::{
    AccumulationParams, AccumulationResult, MONTHS_PER_YEAR, deterministic_months_to_target,
    simulate_accumulation,
};
use crate::domain::decumulation::{
    DEFAULT_HORIZON_YEARS, DEFAULT_SHORT_HORIZON_YEARS, DecumulationParams,
    DecumulationProjection, RankingStatistic, simulate_decumulation_horizons,
};
use crate::domain::error::NestcastError;
use crate::domain::random::SeededBoxMuller;
use crate::domain::simulation::{DEFAULT_TRIALS, SimulationControl};

pub const DEFAULT_WITHDRAWAL_RATE: f64 = 0.04;
pub const DEFAULT_FAILURE_THRESHOLD_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MAX_YEARS: u32 = 50;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_SPENDING_RATIO: f64 = 1.0;

const ACCUMULATION_STREAM: u64 = 0;
const DECUMULATION_STREAM: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct RetirementPlan {
    pub current_assets: f64,
    pub monthly_contribution: f64,
    pub desired_monthly_income: f64,
    pub withdrawal_rate: f64,
    pub pre_retirement_return: f64,
    pub pre_retirement_volatility: f64,
    pub post_retirement_return: f64,
    pub post_retirement_volatility: f64,
    pub failure_threshold_multiplier: f64,
    pub spending_ratio: f64,
}

impl RetirementPlan {
    /// Assets needed to fund the desired income at the withdrawal rate.
    pub fn target_asset(&self) -> Result<f64, NestcastError> {
        if !self.withdrawal_rate.is_finite() || self.withdrawal_rate <= 0.0 {
            return Err(NestcastError::invalid(
                "withdrawal_rate",
                format!("{} must be positive", self.withdrawal_rate),
            ));
        }
        Ok(self.desired_monthly_income * 12.0 / self.withdrawal_rate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSettings {
    pub trials: usize,
    pub seed: u64,
    pub max_years: u32,
    pub horizon_years: u32,
    pub short_horizon_years: u32,
    pub ranking: RankingStatistic,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        ProjectionSettings {
            trials: DEFAULT_TRIALS,
            seed: DEFAULT_SEED,
            max_years: DEFAULT_MAX_YEARS,
            horizon_years: DEFAULT_HORIZON_YEARS,
            short_horizon_years: DEFAULT_SHORT_HORIZON_YEARS,
            ranking: RankingStatistic::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanProjection {
    pub target_asset: f64,
    /// Zero-volatility months to target, `None` if unreachable within `max_years`.
    pub deterministic_months: Option<u32>,
    /// Month bound used for every accumulation trial.
    pub max_months: u32,
    pub accumulation: AccumulationResult,
    /// Balance handed to decumulation.
    pub retirement_balance: f64,
    pub decumulation: DecumulationProjection,
}

/// Accumulation bound: deterministic months scaled by the failure multiplier, capped at `cap`.
fn accumulation_bound(deterministic: Option<u32>, multiplier: f64, cap: u32) -> u32 {
    match deterministic {
        Some(months) => {
            let scaled = (f64::from(months) * multiplier).ceil();
            if scaled >= f64::from(cap) { cap } else { scaled as u32 }
        }
        None => cap,
    }
}

pub fn project(
    plan: &RetirementPlan,
    settings: &ProjectionSettings,
    control: &SimulationControl,
) -> Result<PlanProjection, NestcastError> {
    let target_asset = plan.target_asset()?;
    if !plan.failure_threshold_multiplier.is_finite() || plan.failure_threshold_multiplier < 1.0 {
        return Err(NestcastError::invalid(
            "failure_threshold_multiplier",
            format!("{} must be at least 1", plan.failure_threshold_multiplier),
        ));
    }
    let cap = settings.max_years.saturating_mul(MONTHS_PER_YEAR);

    let mut accumulation_params = AccumulationParams {
        initial_asset: plan.current_assets,
        monthly_contribution: plan.monthly_contribution,
        target_asset,
        mean_annual_return: plan.pre_retirement_return,
        annual_volatility: plan.pre_retirement_volatility,
        trials: settings.trials,
        max_months: cap,
        track_paths: true,
    };
    let deterministic_months = deterministic_months_to_target(&accumulation_params)?;
    accumulation_params.max_months = accumulation_bound(
        deterministic_months,
        plan.failure_threshold_multiplier,
        cap,
    );
    tracing::debug!(
        target_asset,
        ?deterministic_months,
        max_months = accumulation_params.max_months,
        "accumulation bound"
    );

    let factory = SeededBoxMuller::new(settings.seed);
    let accumulation = simulate_accumulation(
        &accumulation_params,
        &factory.with_stream(ACCUMULATION_STREAM),
        control,
    )?;

    let retirement_balance = accumulation
        .representative
        .as_ref()
        .and_then(|paths| paths.median.final_value())
        .unwrap_or(target_asset);

    let decumulation = simulate_decumulation_horizons(
        &DecumulationParams {
            initial_asset: retirement_balance,
            monthly_spending: plan.desired_monthly_income,
            spending_ratio: plan.spending_ratio,
            annual_return: plan.post_retirement_return,
            annual_volatility: plan.post_retirement_volatility,
            trials: settings.trials,
            horizon_years: settings.horizon_years,
            ranking: settings.ranking,
        },
        settings.short_horizon_years,
        &factory.with_stream(DECUMULATION_STREAM),
        control,
    )?;

    Ok(PlanProjection {
        target_asset,
        deterministic_months,
        max_months: accumulation_params.max_months,
        accumulation,
        retirement_balance,
        decumulation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> RetirementPlan {
        RetirementPlan {
            current_assets: 150_000.0,
            monthly_contribution: 3_000.0,
            desired_monthly_income: 4_000.0,
            withdrawal_rate: DEFAULT_WITHDRAWAL_RATE,
            pre_retirement_return: 0.07,
            pre_retirement_volatility: 0.15,
            post_retirement_return: 0.05,
            post_retirement_volatility: 0.10,
            failure_threshold_multiplier: DEFAULT_FAILURE_THRESHOLD_MULTIPLIER,
            spending_ratio: 1.0,
        }
    }

    fn settings() -> ProjectionSettings {
        ProjectionSettings {
            trials: 500,
            ..ProjectionSettings::default()
        }
    }

    #[test]
    fn target_from_income_and_withdrawal_rate() {
        assert!((plan().target_asset().unwrap() - 1_200_000.0).abs() < 1e-6);
        let bad = RetirementPlan {
            withdrawal_rate: 0.0,
            ..plan()
        };
        assert!(bad.target_asset().is_err());
    }

    #[test]
    fn bound_scales_and_caps() {
        assert_eq!(accumulation_bound(Some(100), 1.5, 600), 150);
        assert_eq!(accumulation_bound(Some(101), 1.5, 600), 152);
        assert_eq!(accumulation_bound(Some(500), 1.5, 600), 600);
        assert_eq!(accumulation_bound(None, 1.5, 600), 600);
        assert_eq!(accumulation_bound(Some(0), 1.5, 600), 0);
    }

    #[test]
    fn projection_chains_median_balance() {
        let projection = project(&plan(), &settings(), &SimulationControl::default()).unwrap();
        let median = projection
            .accumulation
            .representative
            .as_ref()
            .unwrap()
            .median
            .final_value()
            .unwrap();
        assert_eq!(projection.retirement_balance, median);
        assert!(projection.retirement_balance >= projection.target_asset);
        assert_eq!(projection.decumulation.long.bands[0].path.values[0], median);
        assert_eq!(projection.decumulation.long.horizon_years, 40);
        assert_eq!(projection.decumulation.short.horizon_years, 10);
        assert!(projection.max_months <= DEFAULT_MAX_YEARS * 12);
    }

    #[test]
    fn projection_is_reproducible() {
        let a = project(&plan(), &settings(), &SimulationControl::default()).unwrap();
        let b = project(&plan(), &settings(), &SimulationControl::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn falls_back_to_target_without_successes() {
        let stuck = RetirementPlan {
            current_assets: 0.0,
            monthly_contribution: 0.0,
            pre_retirement_return: 0.0,
            pre_retirement_volatility: 0.0,
            ..plan()
        };
        let projection = project(&stuck, &settings(), &SimulationControl::default()).unwrap();
        assert_eq!(projection.deterministic_months, None);
        assert_eq!(projection.accumulation.successes, 0);
        assert_eq!(projection.retirement_balance, projection.target_asset);
    }

    #[test]
    fn rejects_multiplier_below_one() {
        let bad = RetirementPlan {
            failure_threshold_multiplier: 0.5,
            ..plan()
        };
        assert!(project(&bad, &settings(), &SimulationControl::default()).is_err());
    }
}
