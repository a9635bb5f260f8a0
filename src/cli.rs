//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{AnalysisConfig, PortfolioAnalysis, analyze};
use crate::domain::breakdown::HoldingMetric;
use crate::domain::config_validation::{
    PLAN, PORTFOLIO, SIMULATION, optional_count, optional_double, parse_dividends,
    parse_holdings, required_double, validate_plan_config, validate_portfolio_config,
    validate_simulation_config,
};
use crate::domain::decumulation::{
    DEFAULT_HORIZON_YEARS, DEFAULT_SHORT_HORIZON_YEARS, DecumulationResult, RankingStatistic,
};
use crate::domain::error::NestcastError;
use crate::domain::metrics::{DEFAULT_RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use crate::domain::plan::{
    DEFAULT_FAILURE_THRESHOLD_MULTIPLIER, DEFAULT_MAX_YEARS, DEFAULT_SEED, DEFAULT_SPENDING_RATIO,
    DEFAULT_WITHDRAWAL_RATE, PlanProjection, ProjectionSettings, RetirementPlan, project,
};
use crate::domain::price::{Holding, PriceSeries};
use crate::domain::scoring::ScoringConfig;
use crate::domain::simulation::{DEFAULT_PROGRESS_INTERVAL, DEFAULT_TRIALS, SimulationControl};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_data_port::PriceDataPort;

#[derive(Parser, Debug)]
#[command(name = "nestcast", about = "Portfolio analytics and retirement projections")]
pub struct Cli {
    /// Log level for nestcast events (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze historical portfolio performance
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <TICKER>.csv files (overrides [portfolio] price_dir)
        #[arg(short, long)]
        prices: Option<PathBuf>,
    },
    /// Project a retirement plan with Monte Carlo simulation
    Project {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        trials: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analyze { config, prices } => run_analyze(&config, prices.as_deref()),
        Command::Project {
            config,
            trials,
            seed,
        } => run_project(&config, trials, seed),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, NestcastError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn build_holdings(config: &dyn ConfigPort) -> Result<Vec<Holding>, NestcastError> {
    let raw = config
        .get_string(PORTFOLIO, "holdings")
        .ok_or_else(|| NestcastError::ConfigMissing {
            section: PORTFOLIO.into(),
            key: "holdings".into(),
        })?;
    parse_holdings(&raw)
}

pub fn build_analysis_config(config: &dyn ConfigPort) -> Result<AnalysisConfig, NestcastError> {
    Ok(AnalysisConfig {
        risk_free_rate: optional_double(
            config,
            PORTFOLIO,
            "risk_free_rate",
            DEFAULT_RISK_FREE_RATE,
        )?,
        periods_per_year: optional_double(
            config,
            PORTFOLIO,
            "periods_per_year",
            TRADING_DAYS_PER_YEAR,
        )?,
        scoring: ScoringConfig::default(),
    })
}

pub fn build_retirement_plan(config: &dyn ConfigPort) -> Result<RetirementPlan, NestcastError> {
    Ok(RetirementPlan {
        current_assets: required_double(config, PLAN, "current_assets")?,
        monthly_contribution: required_double(config, PLAN, "monthly_contribution")?,
        desired_monthly_income: required_double(config, PLAN, "desired_monthly_income")?,
        withdrawal_rate: optional_double(config, PLAN, "withdrawal_rate", DEFAULT_WITHDRAWAL_RATE)?,
        pre_retirement_return: required_double(config, PLAN, "pre_retirement_return")?,
        pre_retirement_volatility: required_double(config, PLAN, "pre_retirement_volatility")?,
        post_retirement_return: required_double(config, PLAN, "post_retirement_return")?,
        post_retirement_volatility: required_double(config, PLAN, "post_retirement_volatility")?,
        failure_threshold_multiplier: optional_double(
            config,
            PLAN,
            "failure_threshold_multiplier",
            DEFAULT_FAILURE_THRESHOLD_MULTIPLIER,
        )?,
        spending_ratio: optional_double(config, PLAN, "spending_ratio", DEFAULT_SPENDING_RATIO)?,
    })
}

fn years(config: &dyn ConfigPort, key: &str, default: u32) -> Result<u32, NestcastError> {
    let value = optional_count(config, SIMULATION, key, u64::from(default))?;
    u32::try_from(value).map_err(|_| NestcastError::ConfigInvalid {
        section: SIMULATION.into(),
        key: key.into(),
        reason: format!("{value} is too large"),
    })
}

pub fn build_projection_settings(
    config: &dyn ConfigPort,
) -> Result<ProjectionSettings, NestcastError> {
    let trials = optional_count(config, SIMULATION, "trials", DEFAULT_TRIALS as u64)?;
    Ok(ProjectionSettings {
        trials: usize::try_from(trials).map_err(|_| NestcastError::ConfigInvalid {
            section: SIMULATION.into(),
            key: "trials".into(),
            reason: format!("{trials} is too large"),
        })?,
        seed: optional_count(config, SIMULATION, "seed", DEFAULT_SEED)?,
        max_years: years(config, "max_years", DEFAULT_MAX_YEARS)?,
        horizon_years: years(config, "horizon_years", DEFAULT_HORIZON_YEARS)?,
        short_horizon_years: years(config, "short_horizon_years", DEFAULT_SHORT_HORIZON_YEARS)?,
        ranking: RankingStatistic::default(),
    })
}

/// Progress goes to the log at `progress_interval` trials.
pub fn build_simulation_control(
    config: &dyn ConfigPort,
) -> Result<SimulationControl, NestcastError> {
    let interval = optional_count(
        config,
        SIMULATION,
        "progress_interval",
        DEFAULT_PROGRESS_INTERVAL as u64,
    )?;
    Ok(SimulationControl {
        progress_interval: usize::try_from(interval).unwrap_or(DEFAULT_PROGRESS_INTERVAL),
        ..SimulationControl::default()
    }
    .with_progress(|p| {
        tracing::info!(completed = p.completed, total = p.total, "simulation progress")
    }))
}

/// Fetches every holding's history. Tickers without data are skipped with a warning.
pub fn load_prices(
    port: &dyn PriceDataPort,
    holdings: &[Holding],
) -> Result<Vec<PriceSeries>, NestcastError> {
    let mut prices = Vec::with_capacity(holdings.len());
    for holding in holdings {
        match port.fetch_prices(&holding.ticker) {
            Ok(series) if !series.is_empty() => prices.push(series),
            Ok(_) | Err(NestcastError::NoData { .. }) => {
                eprintln!("warning: skipping {} (no price data)", holding.ticker);
            }
            Err(e) => return Err(e),
        }
    }
    if prices.is_empty() {
        return Err(NestcastError::NoData {
            ticker: holdings
                .iter()
                .map(|h| h.ticker.as_str())
                .collect::<Vec<_>>()
                .join(","),
        });
    }
    Ok(prices)
}

/// Holdings whose ticker the port has no history for, in holding order.
pub fn missing_tickers(
    port: &dyn PriceDataPort,
    holdings: &[Holding],
) -> Result<Vec<String>, NestcastError> {
    let available = port.list_tickers()?;
    Ok(holdings
        .iter()
        .filter(|h| available.binary_search(&h.ticker).is_err())
        .map(|h| h.ticker.clone())
        .collect())
}

fn run_analyze(config_path: &Path, prices_override: Option<&Path>) -> Result<(), NestcastError> {
    let config = load_config(config_path)?;
    validate_portfolio_config(&config)?;

    let holdings = build_holdings(&config)?;
    let dividends = parse_dividends(&config)?;
    let analysis_config = build_analysis_config(&config)?;

    let price_dir = match prices_override {
        Some(dir) => dir.to_path_buf(),
        None => config
            .get_string(PORTFOLIO, "price_dir")
            .map(PathBuf::from)
            .ok_or_else(|| NestcastError::ConfigMissing {
                section: PORTFOLIO.into(),
                key: "price_dir".into(),
            })?,
    };
    eprintln!("Loading prices from {}", price_dir.display());
    let prices = load_prices(&CsvPriceAdapter::new(price_dir), &holdings)?;

    let analysis = analyze(&holdings, &prices, &dividends, &analysis_config);
    print_analysis(&analysis);
    Ok(())
}

fn run_project(
    config_path: &Path,
    trials: Option<usize>,
    seed: Option<u64>,
) -> Result<(), NestcastError> {
    let config = load_config(config_path)?;
    validate_plan_config(&config)?;
    validate_simulation_config(&config)?;

    let plan = build_retirement_plan(&config)?;
    let mut settings = build_projection_settings(&config)?;
    if let Some(t) = trials {
        settings.trials = t;
    }
    if let Some(s) = seed {
        settings.seed = s;
    }
    let control = build_simulation_control(&config)?;

    eprintln!(
        "Running projection: {} trials, seed {}",
        settings.trials, settings.seed
    );
    let projection = project(&plan, &settings, &control)?;
    print_projection(&projection);
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), NestcastError> {
    let config = load_config(config_path)?;
    let has_portfolio = !config.keys(PORTFOLIO).is_empty();
    let has_plan = !config.keys(PLAN).is_empty();
    if !has_portfolio && !has_plan {
        return Err(NestcastError::ConfigMissing {
            section: PORTFOLIO.into(),
            key: "holdings".into(),
        });
    }

    if has_portfolio {
        validate_portfolio_config(&config)?;
        let holdings = build_holdings(&config)?;
        let total: f64 = holdings.iter().map(|h| h.weight).sum();
        eprintln!("  [portfolio] {} holdings, total weight {:.2}", holdings.len(), total);
        if (total - 1.0).abs() > 1e-6 {
            eprintln!("  warning: holding weights sum to {:.4}, not 1", total);
        }
        if let Some(dir) = config.get_string(PORTFOLIO, "price_dir") {
            let missing = missing_tickers(&CsvPriceAdapter::new(PathBuf::from(dir)), &holdings)?;
            if !missing.is_empty() {
                eprintln!("  warning: no price file for {}", missing.join(", "));
            }
        }
    }
    if has_plan {
        validate_plan_config(&config)?;
        let plan = build_retirement_plan(&config)?;
        eprintln!("  [plan] target asset {:.0}", plan.target_asset()?);
    }
    validate_simulation_config(&config)?;
    eprintln!("  [simulation] ok");

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn print_analysis(analysis: &PortfolioAnalysis) {
    let m = &analysis.metrics;
    let s = &analysis.score;

    eprintln!("\n=== Portfolio Metrics ===");
    eprintln!("Trading Days:     {}", m.trading_days);
    eprintln!("CAGR:             {:.2}%", m.cagr * 100.0);
    eprintln!("CAGR + Dividends: {:.2}%", m.cagr_with_dividends * 100.0);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Dividend Yield:   {:.2}%", m.dividend_yield * 100.0);
    eprintln!("Volatility:       {:.2}% ({:?})", m.volatility * 100.0, m.volatility_method);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.1}%", m.max_drawdown * 100.0);

    eprintln!("\n=== Score ===");
    eprintln!("Profitability:    {}/40", s.profitability);
    eprintln!("Stability:        {}/30", s.stability);
    eprintln!("Efficiency:       {}/30", s.efficiency);
    eprintln!("Total:            {}/100 (grade {})", s.total, s.grade);

    if analysis.correlation.size() > 1 {
        eprintln!("\n=== Correlation ===");
        for (ticker, row) in analysis
            .correlation
            .tickers
            .iter()
            .zip(analysis.correlation.rows())
        {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>6.2}")).collect();
            eprintln!("  {:<8}{}", ticker, cells.join(" "));
        }
    }

    for (title, metric) in [
        ("CAGR", HoldingMetric::Cagr),
        ("Volatility", HoldingMetric::Volatility),
        ("Dividend Yield", HoldingMetric::DividendYield),
    ] {
        eprintln!("\n=== By {} ===", title);
        for r in analysis.ranked(metric) {
            eprintln!(
                "  {:<8} {:>7.2}%  weight {:>5.1}%  contribution {:>6.2}%",
                r.ticker,
                r.value * 100.0,
                r.weight * 100.0,
                r.contribution * 100.0,
            );
        }
    }
}

fn print_decumulation(title: &str, result: &DecumulationResult) {
    eprintln!("\n=== Decumulation ({} years) ===", result.horizon_years);
    eprintln!("{title}: depleted in {:.1}% of trials", result.depletion_rate * 100.0);
    for band in &result.bands {
        let end = band.path.values.last().copied().unwrap_or(0.0);
        match band.path.depletion_year {
            Some(year) => eprintln!("  {:<11} depleted in year {}", band.band.to_string(), year),
            None => eprintln!("  {:<11} ends at {:.0}", band.band.to_string(), end),
        }
    }
    match result.deterministic.depletion_year {
        Some(year) => eprintln!("  {:<11} depleted in year {}", "expected", year),
        None => eprintln!(
            "  {:<11} ends at {:.0}",
            "expected",
            result.deterministic.values.last().copied().unwrap_or(0.0)
        ),
    }
}

fn print_projection(projection: &PlanProjection) {
    let acc = &projection.accumulation;

    eprintln!("\n=== Accumulation ===");
    eprintln!("Target Asset:     {:.0}", projection.target_asset);
    match projection.deterministic_months {
        Some(m) => eprintln!("Expected Months:  {m}"),
        None => eprintln!("Expected Months:  not reached"),
    }
    eprintln!("Month Limit:      {}", projection.max_months);
    eprintln!(
        "Success Rate:     {:.1}% ({}/{})",
        acc.success_rate * 100.0,
        acc.successes,
        acc.trials
    );
    if let Some(p) = acc.percentiles {
        eprintln!("Months p10/50/90: {} / {} / {}", p.p10, p.p50, p.p90);
    }
    for (year, count) in &acc.year_histogram {
        eprintln!("  year {:>3}: {}", year, count);
    }
    eprintln!("Retirement Balance: {:.0}", projection.retirement_balance);

    print_decumulation("Long horizon", &projection.decumulation.long);
    print_decumulation("Short horizon", &projection.decumulation.short);
}
