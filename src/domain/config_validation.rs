//! Configuration validation.
//!
//! Validates every section up front so the engine only ever sees well-formed parameters. Errors
//! name the offending section and key.

use std::collections::HashMap;

use crate::domain::decumulation::{DEFAULT_HORIZON_YEARS, DEFAULT_SHORT_HORIZON_YEARS};
use crate::domain::error::NestcastError;
use crate::domain::metrics::{DEFAULT_RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use crate::domain::plan::{
    DEFAULT_FAILURE_THRESHOLD_MULTIPLIER, DEFAULT_MAX_YEARS, DEFAULT_SEED, DEFAULT_SPENDING_RATIO,
    DEFAULT_WITHDRAWAL_RATE,
};
use crate::domain::price::{DividendProfile, Holding};
use crate::domain::simulation::{DEFAULT_PROGRESS_INTERVAL, DEFAULT_TRIALS};
use crate::ports::config_port::ConfigPort;

pub const PORTFOLIO: &str = "portfolio";
pub const DIVIDENDS: &str = "dividends";
pub const PLAN: &str = "plan";
pub const SIMULATION: &str = "simulation";

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> NestcastError {
    NestcastError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Reads a float that must be present.
pub fn required_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<f64, NestcastError> {
    match config.get_string(section, key) {
        None => Err(NestcastError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        Some(raw) => parse_finite(section, key, &raw),
    }
}

/// Reads a float, falling back to `default` when absent. Present but malformed values are errors.
pub fn optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, NestcastError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_finite(section, key, &raw),
    }
}

/// Reads a non-negative integer, falling back to `default` when absent.
pub fn optional_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: u64,
) -> Result<u64, NestcastError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => {
            let value: i64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid(section, key, format!("{raw:?} is not an integer")))?;
            u64::try_from(value)
                .map_err(|_| invalid(section, key, format!("{key} must be non-negative")))
        }
    }
}

fn parse_finite(section: &str, key: &str, raw: &str) -> Result<f64, NestcastError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(section, key, format!("{raw:?} is not a finite number"))),
    }
}

/// Parses `TICKER:weight,TICKER:weight`.
pub fn parse_holdings(raw: &str) -> Result<Vec<Holding>, NestcastError> {
    let mut holdings = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (ticker, weight) = entry.split_once(':').ok_or_else(|| {
            invalid(PORTFOLIO, "holdings", format!("{entry:?} is not TICKER:weight"))
        })?;
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(invalid(PORTFOLIO, "holdings", format!("empty ticker in {entry:?}")));
        }
        let weight = parse_finite(PORTFOLIO, "holdings", weight)?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(invalid(
                PORTFOLIO,
                "holdings",
                format!("weight for {ticker} must be between 0 and 1"),
            ));
        }
        holdings.push(Holding::new(ticker, weight));
    }
    if holdings.is_empty() {
        return Err(invalid(PORTFOLIO, "holdings", "at least one holding is required"));
    }
    Ok(holdings)
}

/// Parses `yield,growth` for one `[dividends]` entry.
pub fn parse_dividend_profile(ticker: &str, raw: &str) -> Result<DividendProfile, NestcastError> {
    let (annual_yield, growth_rate) = match raw.split_once(',') {
        Some((y, g)) => (
            parse_finite(DIVIDENDS, ticker, y)?,
            parse_finite(DIVIDENDS, ticker, g)?,
        ),
        None => (parse_finite(DIVIDENDS, ticker, raw)?, 0.0),
    };
    if !(0.0..1.0).contains(&annual_yield) {
        return Err(invalid(DIVIDENDS, ticker, "yield must be between 0 and 1"));
    }
    if growth_rate <= -1.0 {
        return Err(invalid(DIVIDENDS, ticker, "growth must be greater than -1"));
    }
    Ok(DividendProfile {
        annual_yield,
        growth_rate,
    })
}

pub fn parse_dividends(
    config: &dyn ConfigPort,
) -> Result<HashMap<String, DividendProfile>, NestcastError> {
    let mut dividends = HashMap::new();
    for ticker in config.keys(DIVIDENDS) {
        if let Some(raw) = config.get_string(DIVIDENDS, &ticker) {
            let profile = parse_dividend_profile(&ticker, &raw)?;
            dividends.insert(ticker, profile);
        }
    }
    Ok(dividends)
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), NestcastError> {
    match config.get_string(PORTFOLIO, "holdings") {
        Some(raw) => {
            parse_holdings(&raw)?;
        }
        None => {
            return Err(NestcastError::ConfigMissing {
                section: PORTFOLIO.to_string(),
                key: "holdings".to_string(),
            });
        }
    }

    let rate = optional_double(config, PORTFOLIO, "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    if !(0.0..1.0).contains(&rate) {
        return Err(invalid(
            PORTFOLIO,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    let periods = optional_double(config, PORTFOLIO, "periods_per_year", TRADING_DAYS_PER_YEAR)?;
    if periods <= 0.0 {
        return Err(invalid(
            PORTFOLIO,
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    parse_dividends(config)?;
    Ok(())
}

pub fn validate_plan_config(config: &dyn ConfigPort) -> Result<(), NestcastError> {
    for key in ["current_assets", "monthly_contribution", "desired_monthly_income"] {
        if required_double(config, PLAN, key)? < 0.0 {
            return Err(invalid(PLAN, key, format!("{key} must be non-negative")));
        }
    }
    for key in ["pre_retirement_return", "post_retirement_return"] {
        if required_double(config, PLAN, key)? <= -1.0 {
            return Err(invalid(PLAN, key, format!("{key} must be greater than -1")));
        }
    }
    for key in ["pre_retirement_volatility", "post_retirement_volatility"] {
        if required_double(config, PLAN, key)? < 0.0 {
            return Err(invalid(PLAN, key, format!("{key} must be non-negative")));
        }
    }

    let rate = optional_double(config, PLAN, "withdrawal_rate", DEFAULT_WITHDRAWAL_RATE)?;
    if rate <= 0.0 || rate > 1.0 {
        return Err(invalid(PLAN, "withdrawal_rate", "withdrawal_rate must be in (0, 1]"));
    }
    let multiplier = optional_double(
        config,
        PLAN,
        "failure_threshold_multiplier",
        DEFAULT_FAILURE_THRESHOLD_MULTIPLIER,
    )?;
    if multiplier < 1.0 {
        return Err(invalid(
            PLAN,
            "failure_threshold_multiplier",
            "failure_threshold_multiplier must be at least 1",
        ));
    }
    if optional_double(config, PLAN, "spending_ratio", DEFAULT_SPENDING_RATIO)? < 0.0 {
        return Err(invalid(PLAN, "spending_ratio", "spending_ratio must be non-negative"));
    }
    Ok(())
}

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), NestcastError> {
    for (key, default) in [
        ("trials", DEFAULT_TRIALS as u64),
        ("max_years", u64::from(DEFAULT_MAX_YEARS)),
        ("horizon_years", u64::from(DEFAULT_HORIZON_YEARS)),
        ("short_horizon_years", u64::from(DEFAULT_SHORT_HORIZON_YEARS)),
        ("progress_interval", DEFAULT_PROGRESS_INTERVAL as u64),
    ] {
        if optional_count(config, SIMULATION, key, default)? < 1 {
            return Err(invalid(SIMULATION, key, format!("{key} must be at least 1")));
        }
    }
    let horizon = optional_count(
        config,
        SIMULATION,
        "horizon_years",
        u64::from(DEFAULT_HORIZON_YEARS),
    )?;
    let short = optional_count(
        config,
        SIMULATION,
        "short_horizon_years",
        u64::from(DEFAULT_SHORT_HORIZON_YEARS),
    )?;
    if short > horizon {
        return Err(invalid(
            SIMULATION,
            "short_horizon_years",
            "short_horizon_years must not exceed horizon_years",
        ));
    }
    optional_count(config, SIMULATION, "seed", DEFAULT_SEED)?;
    Ok(())
}
