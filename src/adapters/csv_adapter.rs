//! CSV price history adapter.
//!
//! One file per ticker, `<base>/<TICKER>.csv`, with a `date,close` header. Extra columns are
//! ignored.

use crate::domain::error::NestcastError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::price_data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

impl PriceDataPort for CsvPriceAdapter {
    fn fetch_prices(&self, ticker: &str) -> Result<PriceSeries, NestcastError> {
        let path = self.csv_path(ticker);
        if !path.exists() {
            return Err(NestcastError::NoData {
                ticker: ticker.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| NestcastError::PriceData {
                reason: format!("{}: {}", path.display(), e),
            })?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| NestcastError::PriceData {
                    reason: format!("{}: missing {} column", path.display(), name),
                })
        };
        let date_col = column("date")?;
        let close_col = column("close")?;

        let mut points = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| NestcastError::PriceData {
                reason: format!("CSV parse error: {}", e),
            })?;
            let row = line + 2;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                NestcastError::PriceData {
                    reason: format!("{} row {}: invalid date {:?}: {}", ticker, row, date_str, e),
                }
            })?;

            let close_str = record.get(close_col).unwrap_or_default().trim();
            let close: f64 = close_str.parse().map_err(|e| NestcastError::PriceData {
                reason: format!("{} row {}: invalid close {:?}: {}", ticker, row, close_str, e),
            })?;
            if !close.is_finite() || close <= 0.0 {
                return Err(NestcastError::PriceData {
                    reason: format!("{} row {}: close must be positive", ticker, row),
                });
            }

            points.push(PricePoint { date, close });
        }

        tracing::debug!(ticker, points = points.len(), "loaded price history");
        Ok(PriceSeries::new(ticker, points))
    }

    fn list_tickers(&self) -> Result<Vec<String>, NestcastError> {
        let mut tickers = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    tickers.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        tickers.sort();
        Ok(tickers)
    }
}
