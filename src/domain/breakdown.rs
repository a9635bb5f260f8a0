//! Per-holding metric breakdowns ranked for insight lists.

use std::collections::HashMap;

use crate::domain::alignment::{ReturnSeries, common_dates, prices_on, simple_returns};
use crate::domain::correlation::annualized_volatility;
use crate::domain::metrics::cagr;
use crate::domain::portfolio::PricedHolding;
use crate::domain::price::{DividendProfile, PriceSeries};

/// Metrics for one holding over the portfolio's common date window.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingMetrics {
    pub ticker: String,
    pub weight: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub dividend_yield: f64,
    pub dividend_growth_rate: f64,
}

/// One entry of a ranked list: the metric value and its weighted contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedContribution {
    pub ticker: String,
    pub weight: f64,
    pub value: f64,
    /// `value * weight`
    pub contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingMetric {
    Cagr,
    Volatility,
    DividendYield,
}

impl HoldingMetrics {
    fn value(&self, metric: HoldingMetric) -> f64 {
        match metric {
            HoldingMetric::Cagr => self.cagr,
            HoldingMetric::Volatility => self.volatility,
            HoldingMetric::DividendYield => self.dividend_yield,
        }
    }
}

/// Computes each holding's own metrics. `returns` must be index-aligned with `priced`.
pub fn holding_metrics(
    priced: &[PricedHolding<'_>],
    returns: &[ReturnSeries],
    dividends: &HashMap<String, DividendProfile>,
    periods_per_year: f64,
) -> Vec<HoldingMetrics> {
    let series: Vec<&PriceSeries> = priced.iter().map(|p| p.prices).collect();
    let dates = common_dates(&series);

    priced
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let closes: Vec<f64> = prices_on(p.prices, &dates).into_iter().flatten().collect();
            let profile = dividends
                .get(&p.holding.ticker)
                .copied()
                .unwrap_or_default();
            HoldingMetrics {
                ticker: p.holding.ticker.clone(),
                weight: p.holding.weight,
                cagr: cagr(&closes, periods_per_year),
                volatility: returns
                    .get(i)
                    .map(|r| annualized_volatility(&r.values, periods_per_year))
                    .unwrap_or(0.0),
                dividend_yield: profile.annual_yield,
                dividend_growth_rate: profile.growth_rate,
            }
        })
        .collect()
}

/// Annualized volatility of one holding over its own full history, ignoring other holdings' dates.
pub fn standalone_volatility(series: &PriceSeries, periods_per_year: f64) -> f64 {
    let closes: Vec<Option<f64>> = series.points.iter().map(|p| Some(p.close)).collect();
    annualized_volatility(&simple_returns(&closes), periods_per_year)
}

/// Holdings ranked by `metric`, highest first. Ties keep input order.
pub fn rank_by(metrics: &[HoldingMetrics], metric: HoldingMetric) -> Vec<RankedContribution> {
    let mut ranked: Vec<RankedContribution> = metrics
        .iter()
        .map(|m| {
            let value = m.value(metric);
            RankedContribution {
                ticker: m.ticker.clone(),
                weight: m.weight,
                value,
                contribution: value * m.weight,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked
}
