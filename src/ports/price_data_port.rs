//! Price history access port trait.

use crate::domain::error::NestcastError;
use crate::domain::price::PriceSeries;

pub trait PriceDataPort {
    /// Full close history for `ticker`, sorted by date.
    fn fetch_prices(&self, ticker: &str) -> Result<PriceSeries, NestcastError>;

    /// Tickers with available history, sorted.
    fn list_tickers(&self) -> Result<Vec<String>, NestcastError>;
}
