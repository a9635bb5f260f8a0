//! Common trading-date alignment and simple daily returns.
//!
//! Every series is restricted to the dates present in *all* inputs. Fewer than two common dates
//! produce empty return series, which downstream code treats as "no correlation signal".

use crate::domain::price::PriceSeries;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Simple daily returns for one ticker over the common date set.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub ticker: String,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Sorted intersection of the dates of every series.
pub fn common_dates(series: &[&PriceSeries]) -> Vec<NaiveDate> {
    let Some((first, rest)) = series.split_first() else {
        return Vec::new();
    };
    let shared: BTreeSet<NaiveDate> = first
        .dates()
        .filter(|d| rest.iter().all(|s| s.contains(*d)))
        .collect();
    shared.into_iter().collect()
}

/// Closing prices of `series` on each of `dates`, `None` where missing.
pub fn prices_on(series: &PriceSeries, dates: &[NaiveDate]) -> Vec<Option<f64>> {
    dates.iter().map(|&d| series.close_on(d)).collect()
}

/// Simple returns between adjacent prices. Steps with a missing price or a non-positive
/// earlier price are skipped.
pub fn simple_returns(prices: &[Option<f64>]) -> Vec<f64> {
    prices
        .windows(2)
        .filter_map(|w| match (w[0], w[1]) {
            (Some(prev), Some(curr)) if prev > 0.0 => Some((curr - prev) / prev),
            _ => None,
        })
        .collect()
}

/// Return series for every input restricted to the common date set.
pub fn aligned_returns(series: &[&PriceSeries]) -> Vec<ReturnSeries> {
    let dates = common_dates(series);
    series
        .iter()
        .map(|s| {
            let values = if dates.len() < 2 {
                Vec::new()
            } else {
                simple_returns(&prices_on(s, &dates))
            };
            ReturnSeries {
                ticker: s.ticker.clone(),
                values,
            }
        })
        .collect()
}
