#![allow(dead_code)]

use chrono::NaiveDate;
use nestcast::domain::error::NestcastError;
use nestcast::domain::price::{Holding, PricePoint, PriceSeries};
use nestcast::ports::price_data_port::PriceDataPort;
use std::collections::HashMap;

pub struct MockPriceDataPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.data.insert(series.ticker.clone(), series);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn fetch_prices(&self, ticker: &str) -> Result<PriceSeries, NestcastError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(NestcastError::PriceData {
                reason: reason.clone(),
            });
        }
        self.data
            .get(ticker)
            .cloned()
            .ok_or_else(|| NestcastError::NoData {
                ticker: ticker.to_string(),
            })
    }

    fn list_tickers(&self) -> Result<Vec<String>, NestcastError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily closes starting at `start`, one calendar day apart.
pub fn series_from(ticker: &str, start: NaiveDate, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(
        ticker,
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                close,
            })
            .collect(),
    )
}

pub fn series(ticker: &str, closes: &[f64]) -> PriceSeries {
    series_from(ticker, date(2023, 1, 2), closes)
}

/// Deterministic zig-zag walk with a drift, `count` points starting at `start_price`.
pub fn generate_closes(count: usize, start_price: f64, drift: f64, swing: f64) -> Vec<f64> {
    let mut price = start_price;
    (0..count)
        .map(|i| {
            let close = price;
            let wiggle = if i % 3 == 0 { -swing } else { swing * 0.6 };
            price *= 1.0 + drift + wiggle;
            close
        })
        .collect()
}

pub fn holdings(entries: &[(&str, f64)]) -> Vec<Holding> {
    entries.iter().map(|&(t, w)| Holding::new(t, w)).collect()
}
