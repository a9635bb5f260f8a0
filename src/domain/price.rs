//! Holdings and closing-price histories.

use chrono::NaiveDate;
use std::collections::HashMap;

/// A portfolio position expressed as a fraction of total value.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub weight: f64,
}

impl Holding {
    pub fn new(ticker: impl Into<String>, weight: f64) -> Self {
        Holding {
            ticker: ticker.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closing prices for one ticker, sorted by date with a date index.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    /// Builds a series, sorting points by date. Later duplicates of a date win.
    pub fn new(ticker: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let date_index = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self {
            ticker: ticker.into(),
            points,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.date_index.get(&date).map(|&i| self.points[i].close)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.date_index.contains_key(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }
}

/// Annual dividend yield and its growth rate, both as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DividendProfile {
    pub annual_yield: f64,
    pub growth_rate: f64,
}

impl DividendProfile {
    pub fn pays_dividend(&self) -> bool {
        self.annual_yield > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn new_sorts_points_by_date() {
        let series = PriceSeries::new(
            "VTI",
            vec![
                PricePoint { date: date(3), close: 102.0 },
                PricePoint { date: date(1), close: 100.0 },
                PricePoint { date: date(2), close: 101.0 },
            ],
        );
        let dates: Vec<_> = series.dates().collect();
        assert_eq!(dates, vec![date(1), date(2), date(3)]);
    }

    #[test]
    fn close_on_uses_date_index() {
        let series = PriceSeries::new(
            "VTI",
            vec![
                PricePoint { date: date(1), close: 100.0 },
                PricePoint { date: date(2), close: 101.0 },
            ],
        );
        assert_eq!(series.close_on(date(2)), Some(101.0));
        assert_eq!(series.close_on(date(5)), None);
        assert!(series.contains(date(1)));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn empty_series() {
        let series = PriceSeries::new("BND", vec![]);
        assert!(series.is_empty());
        assert_eq!(series.close_on(date(1)), None);
    }

    #[test]
    fn dividend_profile_pays() {
        assert!(!DividendProfile::default().pays_dividend());
        let profile = DividendProfile {
            annual_yield: 0.02,
            growth_rate: 0.05,
        };
        assert!(profile.pays_dividend());
    }
}
