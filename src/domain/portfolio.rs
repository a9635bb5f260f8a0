//! Buy-and-hold portfolio value series.
//!
//! One unit of currency is split by weight across holdings on the first common date and held
//! without rebalancing, so weights drift as prices move.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use crate::domain::alignment::common_dates;
use crate::domain::price::{DividendProfile, Holding, PriceSeries};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A holding paired with the price history it is valued against.
#[derive(Debug, Clone, Copy)]
pub struct PricedHolding<'a> {
    pub holding: &'a Holding,
    pub prices: &'a PriceSeries,
}

/// Pairs holdings with price series by ticker. Holdings with no matching series are dropped.
pub fn pair_holdings<'a>(
    holdings: &'a [Holding],
    prices: &'a [PriceSeries],
) -> Vec<PricedHolding<'a>> {
    let by_ticker: HashMap<&str, &PriceSeries> =
        prices.iter().map(|s| (s.ticker.as_str(), s)).collect();
    holdings
        .iter()
        .filter_map(|h| match by_ticker.get(h.ticker.as_str()) {
            Some(series) => Some(PricedHolding {
                holding: h,
                prices: series,
            }),
            None => {
                tracing::warn!(ticker = %h.ticker, "holding has no price history, excluded");
                None
            }
        })
        .collect()
}

/// Units bought on the first common date: weight / first price, 0 for a non-positive price.
fn units_held(priced: &[PricedHolding<'_>], first: NaiveDate) -> Vec<f64> {
    priced
        .iter()
        .map(|p| match p.prices.close_on(first) {
            Some(price) if price > 0.0 => p.holding.weight / price,
            _ => 0.0,
        })
        .collect()
}

/// Daily value of the buy-and-hold portfolio over the common dates of all holdings.
pub fn build_value_series(priced: &[PricedHolding<'_>]) -> Vec<ValuePoint> {
    let series: Vec<&PriceSeries> = priced.iter().map(|p| p.prices).collect();
    let dates = common_dates(&series);
    let Some(&first) = dates.first() else {
        return Vec::new();
    };
    let units = units_held(priced, first);

    dates
        .iter()
        .map(|&date| {
            let value = priced
                .iter()
                .zip(&units)
                .map(|(p, u)| u * p.prices.close_on(date).unwrap_or(0.0))
                .sum();
            ValuePoint { date, value }
        })
        .collect()
}

/// Month-end values for historical performance charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyPerformancePoint {
    /// Last common trading date of the month.
    pub date: NaiveDate,
    pub month_index: usize,
    pub price_value: f64,
    /// Price value with each holding's dividends compounded monthly.
    pub value_with_dividends: f64,
}

/// Monthly buy-and-hold values where dividends compound per month.
///
/// Each holding's month value is multiplied by `(1 + annual_yield / 12)^month_index`. This is a
/// different dividend model from the additive yield used by
/// [`PortfolioMetrics`](crate::domain::metrics::PortfolioMetrics); it is kept for chart data only.
pub fn monthly_performance(
    priced: &[PricedHolding<'_>],
    dividends: &HashMap<String, DividendProfile>,
) -> Vec<MonthlyPerformancePoint> {
    let series: Vec<&PriceSeries> = priced.iter().map(|p| p.prices).collect();
    let dates = common_dates(&series);
    let Some(&first) = dates.first() else {
        return Vec::new();
    };
    let units = units_held(priced, first);
    let monthly_yields: Vec<f64> = priced
        .iter()
        .map(|p| {
            dividends
                .get(&p.holding.ticker)
                .map(|d| d.annual_yield.max(0.0) / 12.0)
                .unwrap_or(0.0)
        })
        .collect();

    let mut month_ends: Vec<NaiveDate> = Vec::new();
    for &date in &dates {
        match month_ends.last_mut() {
            Some(last) if (last.year(), last.month()) == (date.year(), date.month()) => {
                *last = date;
            }
            _ => month_ends.push(date),
        }
    }

    month_ends
        .into_iter()
        .enumerate()
        .map(|(month_index, date)| {
            let mut price_value = 0.0;
            let mut value_with_dividends = 0.0;
            for ((p, u), y) in priced.iter().zip(&units).zip(&monthly_yields) {
                let value = u * p.prices.close_on(date).unwrap_or(0.0);
                price_value += value;
                value_with_dividends += value * (1.0 + y).powi(month_index as i32);
            }
            MonthlyPerformancePoint {
                date,
                month_index,
                price_value,
                value_with_dividends,
            }
        })
        .collect()
}
