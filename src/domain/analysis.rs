//! Historical portfolio analysis pipeline.
//!
//! Aligner → correlation → value aggregation → metrics → score. Every stage is pure; degenerate
//! input produces neutral output.

use std::collections::HashMap;

use crate::domain::alignment::aligned_returns;
use crate::domain::breakdown::{
    HoldingMetric, HoldingMetrics, RankedContribution, holding_metrics, rank_by,
    standalone_volatility,
};
use crate::domain::correlation::{
    CorrelationMatrix, heuristic_portfolio_volatility, portfolio_volatility,
};
use crate::domain::metrics::{
    DEFAULT_RISK_FREE_RATE, DividendSummary, PortfolioMetrics, TRADING_DAYS_PER_YEAR,
    VolatilityMethod,
};
use crate::domain::portfolio::{
    MonthlyPerformancePoint, ValuePoint, build_value_series, monthly_performance, pair_holdings,
};
use crate::domain::price::{DividendProfile, Holding, PriceSeries};
use crate::domain::scoring::{PortfolioScore, ScoringConfig, score_metrics};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
    pub scoring: ScoringConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            periods_per_year: TRADING_DAYS_PER_YEAR,
            scoring: ScoringConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioAnalysis {
    pub metrics: PortfolioMetrics,
    pub score: PortfolioScore,
    pub correlation: CorrelationMatrix,
    pub holdings: Vec<HoldingMetrics>,
    pub value_series: Vec<ValuePoint>,
    pub monthly_performance: Vec<MonthlyPerformancePoint>,
}

impl PortfolioAnalysis {
    pub fn ranked(&self, metric: HoldingMetric) -> Vec<RankedContribution> {
        rank_by(&self.holdings, metric)
    }
}

/// Runs the full historical pipeline.
pub fn analyze(
    holdings: &[Holding],
    prices: &[PriceSeries],
    dividends: &HashMap<String, DividendProfile>,
    config: &AnalysisConfig,
) -> PortfolioAnalysis {
    let priced = pair_holdings(holdings, prices);
    let series: Vec<&PriceSeries> = priced.iter().map(|p| p.prices).collect();
    let returns = aligned_returns(&series);
    let correlation = CorrelationMatrix::from_returns(&returns);
    let holding_rows = holding_metrics(&priced, &returns, dividends, config.periods_per_year);

    let weights: Vec<f64> = holding_rows.iter().map(|h| h.weight).collect();
    let has_signal = !returns.is_empty() && returns.iter().all(|r| !r.is_empty());
    let (volatility, method) = if has_signal {
        let vols: Vec<f64> = holding_rows.iter().map(|h| h.volatility).collect();
        (
            portfolio_volatility(&weights, &vols, &correlation),
            VolatilityMethod::Correlated,
        )
    } else {
        tracing::debug!(
            holdings = weights.len(),
            "no aligned returns, using heuristic portfolio volatility"
        );
        // The aligned window is empty here, so each holding falls back to its own history.
        let vols: Vec<f64> = priced
            .iter()
            .map(|p| standalone_volatility(p.prices, config.periods_per_year))
            .collect();
        (
            heuristic_portfolio_volatility(&weights, &vols),
            VolatilityMethod::Heuristic,
        )
    };

    let value_series = build_value_series(&priced);
    let dividend_summary = DividendSummary::compute(&priced, dividends);
    let metrics = PortfolioMetrics::compute(
        &value_series,
        volatility,
        method,
        &dividend_summary,
        config.risk_free_rate,
        config.periods_per_year,
    );
    let score = score_metrics(&metrics, &config.scoring);

    tracing::debug!(
        holdings = priced.len(),
        trading_days = metrics.trading_days,
        cagr = metrics.cagr,
        volatility = metrics.volatility,
        total = score.total,
        "portfolio analysis complete"
    );

    PortfolioAnalysis {
        metrics,
        score,
        correlation,
        holdings: holding_rows,
        monthly_performance: monthly_performance(&priced, dividends),
        value_series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;
    use chrono::NaiveDate;

    fn series(ticker: &str, closes: &[f64]) -> PriceSeries {
        PriceSeries::new(
            ticker,
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
                        + chrono::Duration::days(i as i64),
                    close,
                })
                .collect(),
        )
    }

    #[test]
    fn empty_portfolio_is_neutral() {
        let analysis = analyze(&[], &[], &HashMap::new(), &AnalysisConfig::default());
        assert_eq!(analysis.metrics.cagr, 0.0);
        assert_eq!(analysis.metrics.volatility, 0.0);
        assert_eq!(analysis.metrics.volatility_method, VolatilityMethod::Heuristic);
        assert!(analysis.correlation.is_empty());
        assert!(analysis.value_series.is_empty());
    }

    #[test]
    fn single_holding_volatility_matches_holding() {
        let holdings = vec![Holding::new("A", 1.0)];
        let prices = vec![series("A", &[100.0, 102.0, 99.0, 104.0, 103.0])];
        let analysis = analyze(&holdings, &prices, &HashMap::new(), &AnalysisConfig::default());

        assert_eq!(analysis.metrics.volatility_method, VolatilityMethod::Correlated);
        assert!((analysis.metrics.volatility - analysis.holdings[0].volatility).abs() < 1e-12);
    }

    #[test]
    fn disjoint_histories_fall_back_to_heuristic() {
        let holdings = vec![Holding::new("A", 0.5), Holding::new("B", 0.5)];
        let a = series("A", &[100.0, 101.0]);
        let b = PriceSeries::new(
            "B",
            vec![PricePoint {
                date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                close: 10.0,
            }],
        );
        let analysis = analyze(&holdings, &[a, b], &HashMap::new(), &AnalysisConfig::default());
        assert_eq!(analysis.metrics.volatility_method, VolatilityMethod::Heuristic);
        assert_eq!(analysis.metrics.cagr, 0.0);
    }

    #[test]
    fn heuristic_volatility_uses_each_holdings_history() {
        let holdings = vec![Holding::new("A", 0.5), Holding::new("B", 0.5)];
        let a = series("A", &[100.0, 105.0, 100.0, 105.0, 100.0]);
        let b = PriceSeries::new(
            "B",
            (0..5)
                .map(|i| PricePoint {
                    date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap() + chrono::Duration::days(i),
                    close: if i % 2 == 0 { 50.0 } else { 52.5 },
                })
                .collect(),
        );
        let analysis = analyze(&holdings, &[a, b], &HashMap::new(), &AnalysisConfig::default());

        assert_eq!(analysis.metrics.volatility_method, VolatilityMethod::Heuristic);
        assert!(analysis.holdings.iter().all(|h| h.volatility == 0.0));
        assert!(analysis.metrics.volatility > 0.0);
        assert!(analysis.score.volatility_points < 15);
    }
}
