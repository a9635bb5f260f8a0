//! Portfolio performance metrics over a buy-and-hold value series.

use std::collections::HashMap;

use super::portfolio::{PricedHolding, ValuePoint};
use crate::domain::price::DividendProfile;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.035;

/// How the portfolio volatility figure was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityMethod {
    /// Full covariance using pairwise correlation of aligned returns.
    Correlated,
    /// Weighted average with a holding-count diversification factor.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioMetrics {
    pub cagr: f64,
    /// Price CAGR plus weighted dividend yield (additive model).
    pub cagr_with_dividends: f64,
    pub total_return: f64,
    pub price_return: f64,
    pub dividend_return: f64,
    pub volatility: f64,
    pub volatility_method: VolatilityMethod,
    pub sharpe_ratio: f64,
    /// Most negative peak-to-trough decline, always <= 0.
    pub max_drawdown: f64,
    pub dividend_yield: f64,
    pub dividend_growth_rate: f64,
    pub trading_days: usize,
}

impl PortfolioMetrics {
    /// Derives every metric from a value series, a volatility estimate and dividend data.
    pub fn compute(
        values: &[ValuePoint],
        volatility: f64,
        volatility_method: VolatilityMethod,
        dividends: &DividendSummary,
        risk_free_rate: f64,
        periods_per_year: f64,
    ) -> Self {
        let series: Vec<f64> = values.iter().map(|p| p.value).collect();

        let cagr = cagr(&series, periods_per_year);
        let cagr_with_dividends = cagr + dividends.weighted_yield;

        let price_return = match (series.first(), series.last()) {
            (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
            _ => 0.0,
        };
        let years = if periods_per_year > 0.0 {
            series.len().saturating_sub(1) as f64 / periods_per_year
        } else {
            0.0
        };
        let dividend_return = dividends.weighted_yield * years;

        let volatility = if volatility.is_finite() { volatility.max(0.0) } else { 0.0 };

        PortfolioMetrics {
            cagr,
            cagr_with_dividends,
            total_return: price_return + dividend_return,
            price_return,
            dividend_return,
            volatility,
            volatility_method,
            sharpe_ratio: sharpe_ratio(cagr_with_dividends, risk_free_rate, volatility),
            max_drawdown: max_drawdown(&series),
            dividend_yield: dividends.weighted_yield,
            dividend_growth_rate: dividends.weighted_growth,
            trading_days: series.len(),
        }
    }
}

/// `(last / first)^(periods_per_year / intervals) - 1`, 0 when undefined.
pub fn cagr(values: &[f64], periods_per_year: f64) -> f64 {
    if values.len() < 2 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let first = values[0];
    let last = values[values.len() - 1];
    if first <= 0.0 || last < 0.0 {
        return 0.0;
    }
    let intervals = (values.len() - 1) as f64;
    let growth = (last / first).powf(periods_per_year / intervals) - 1.0;
    if growth.is_finite() { growth } else { 0.0 }
}

/// Most negative `(value - peak) / peak` seen left to right; 0 for an empty series.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut mdd = 0.0_f64;
    for &value in values {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            let dd = (value - peak) / peak;
            if dd < mdd {
                mdd = dd;
            }
        }
    }
    mdd
}

/// `(return - risk_free) / volatility`, 0 when volatility is not positive.
pub fn sharpe_ratio(annual_return: f64, risk_free_rate: f64, volatility: f64) -> f64 {
    if volatility > 0.0 && volatility.is_finite() {
        (annual_return - risk_free_rate) / volatility
    } else {
        0.0
    }
}

/// Weighted dividend yield and growth for a set of holdings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DividendSummary {
    pub weighted_yield: f64,
    /// Averaged over dividend-paying holdings only.
    pub weighted_growth: f64,
}

impl DividendSummary {
    pub fn compute(
        priced: &[PricedHolding<'_>],
        dividends: &HashMap<String, DividendProfile>,
    ) -> Self {
        let mut total_weight = 0.0;
        let mut yield_sum = 0.0;
        let mut paying_weight = 0.0;
        let mut growth_sum = 0.0;

        for p in priced {
            let weight = p.holding.weight.max(0.0);
            total_weight += weight;
            let Some(profile) = dividends.get(&p.holding.ticker) else {
                continue;
            };
            yield_sum += weight * profile.annual_yield;
            if profile.pays_dividend() {
                paying_weight += weight;
                growth_sum += weight * profile.growth_rate;
            }
        }

        DividendSummary {
            weighted_yield: if total_weight > 0.0 { yield_sum / total_weight } else { 0.0 },
            weighted_growth: if paying_weight > 0.0 { growth_sum / paying_weight } else { 0.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::{Holding, PricePoint, PriceSeries};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn make_value_series(values: &[f64]) -> Vec<ValuePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ValuePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                value: v,
            })
            .collect()
    }

    #[test]
    fn cagr_yearly_scenario() {
        assert_relative_eq!(cagr(&[100.0, 110.0, 121.0], 1.0), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn cagr_flat_series_is_exactly_zero() {
        assert_eq!(cagr(&[100.0; 253], TRADING_DAYS_PER_YEAR), 0.0);
    }

    #[test]
    fn cagr_undefined_cases() {
        assert_eq!(cagr(&[], 252.0), 0.0);
        assert_eq!(cagr(&[100.0], 252.0), 0.0);
        assert_eq!(cagr(&[0.0, 10.0], 252.0), 0.0);
        assert_eq!(cagr(&[-1.0, 10.0], 252.0), 0.0);
    }

    #[test]
    fn cagr_one_trading_year() {
        let mut values = vec![100.0; 252];
        values.push(112.0);
        assert_relative_eq!(cagr(&values, TRADING_DAYS_PER_YEAR), 0.12, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_increase_is_zero() {
        assert_eq!(max_drawdown(&[100.0, 110.0, 121.0]), 0.0);
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        let dd = max_drawdown(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_relative_eq!(dd, (80.0 - 110.0) / 110.0, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_empty() {
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn sharpe_zero_volatility() {
        assert_eq!(sharpe_ratio(0.10, 0.035, 0.0), 0.0);
        assert_relative_eq!(sharpe_ratio(0.10, 0.035, 0.13), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn dividend_summary_weights_growth_by_payers_only() {
        let holdings = vec![
            Holding::new("A", 0.5),
            Holding::new("B", 0.25),
            Holding::new("C", 0.25),
        ];
        let prices: Vec<PriceSeries> = ["A", "B", "C"]
            .iter()
            .map(|t| {
                PriceSeries::new(
                    *t,
                    vec![PricePoint {
                        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                        close: 10.0,
                    }],
                )
            })
            .collect();
        let priced = crate::domain::portfolio::pair_holdings(&holdings, &prices);
        let mut dividends = HashMap::new();
        dividends.insert(
            "A".to_string(),
            DividendProfile { annual_yield: 0.04, growth_rate: 0.10 },
        );
        dividends.insert(
            "B".to_string(),
            DividendProfile { annual_yield: 0.02, growth_rate: 0.04 },
        );

        let summary = DividendSummary::compute(&priced, &dividends);
        assert_relative_eq!(summary.weighted_yield, 0.025, epsilon = 1e-12);
        // (0.5 * 0.10 + 0.25 * 0.04) / 0.75
        assert_relative_eq!(summary.weighted_growth, 0.08, epsilon = 1e-12);
    }

    #[test]
    fn dividend_summary_empty() {
        let summary = DividendSummary::compute(&[], &HashMap::new());
        assert_eq!(summary, DividendSummary::default());
    }

    #[test]
    fn compute_full_metrics() {
        let values = make_value_series(&[1.0, 1.05, 0.98, 1.10]);
        let dividends = DividendSummary {
            weighted_yield: 0.02,
            weighted_growth: 0.05,
        };
        let m = PortfolioMetrics::compute(
            &values,
            0.15,
            VolatilityMethod::Correlated,
            &dividends,
            DEFAULT_RISK_FREE_RATE,
            1.0,
        );

        assert_relative_eq!(m.price_return, 0.10, epsilon = 1e-12);
        assert_relative_eq!(m.dividend_return, 0.06, epsilon = 1e-12);
        assert_relative_eq!(m.total_return, 0.16, epsilon = 1e-12);
        assert_relative_eq!(m.cagr_with_dividends, m.cagr + 0.02, epsilon = 1e-15);
        assert_relative_eq!(m.max_drawdown, (0.98 - 1.05) / 1.05, epsilon = 1e-12);
        assert_relative_eq!(
            m.sharpe_ratio,
            (m.cagr_with_dividends - DEFAULT_RISK_FREE_RATE) / 0.15,
            epsilon = 1e-12
        );
        assert_eq!(m.trading_days, 4);
        assert_eq!(m.volatility_method, VolatilityMethod::Correlated);
    }

    #[test]
    fn compute_on_empty_series_is_neutral() {
        let m = PortfolioMetrics::compute(
            &[],
            0.0,
            VolatilityMethod::Heuristic,
            &DividendSummary::default(),
            DEFAULT_RISK_FREE_RATE,
            TRADING_DAYS_PER_YEAR,
        );
        assert_eq!(m.cagr, 0.0);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
    }

    proptest! {
        #[test]
        fn max_drawdown_is_never_positive(values in prop::collection::vec(0.01f64..1000.0, 0..64)) {
            let dd = max_drawdown(&values);
            prop_assert!(dd <= 0.0);
            prop_assert!(dd >= -1.0);
        }
    }
}
