//! Pearson correlation and portfolio volatility estimators.

use crate::domain::alignment::ReturnSeries;

/// Pearson correlation of two date-aligned return series.
///
/// Uses uncorrected sums. Returns 0.0 when the series are empty, differ in length, or either
/// variance is zero.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len();
    if n == 0 || n != b.len() {
        return 0.0;
    }
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom > 0.0 && denom.is_finite() {
        (cov / denom).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Symmetric correlation matrix with a unit diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Computes the upper triangle and mirrors it.
    pub fn from_returns(returns: &[ReturnSeries]) -> Self {
        let n = returns.len();
        let mut values = vec![vec![0.0; n]; n];
        for i in 0..n {
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                let rho = pearson(&returns[i].values, &returns[j].values);
                values[i][j] = rho;
                values[j][i] = rho;
            }
        }
        Self {
            tickers: returns.iter().map(|r| r.ticker.clone()).collect(),
            values,
        }
    }

    /// Builds a matrix from explicit rows, mirroring the upper triangle and forcing the diagonal.
    pub fn from_rows(tickers: Vec<String>, rows: &[Vec<f64>]) -> Self {
        let n = tickers.len();
        let mut values = vec![vec![0.0; n]; n];
        for i in 0..n {
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                let rho = rows
                    .get(i)
                    .and_then(|r| r.get(j))
                    .copied()
                    .filter(|v| v.is_finite())
                    .unwrap_or(0.0)
                    .clamp(-1.0, 1.0);
                values[i][j] = rho;
                values[j][i] = rho;
            }
        }
        Self { tickers, values }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Correlation between `i` and `j`; 0.0 outside the matrix.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }
}

/// Population standard deviation of `returns` scaled by √periods_per_year.
pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let vol = variance.sqrt() * periods_per_year.max(0.0).sqrt();
    if vol.is_finite() { vol } else { 0.0 }
}

/// Correlation-aware portfolio volatility: sqrt(max(0, Σᵢ Σⱼ wᵢ wⱼ σᵢ σⱼ ρᵢⱼ)).
pub fn portfolio_volatility(
    weights: &[f64],
    volatilities: &[f64],
    correlation: &CorrelationMatrix,
) -> f64 {
    let n = weights.len().min(volatilities.len());
    let mut variance = 0.0;
    for i in 0..n {
        for j in 0..n {
            let rho = if i == j { 1.0 } else { correlation.get(i, j) };
            variance += weights[i] * weights[j] * volatilities[i] * volatilities[j] * rho;
        }
    }
    variance.max(0.0).sqrt()
}

/// Heuristic estimate used when no correlation data is available.
///
/// Weighted-average volatility scaled by `1 - min(0.3, (n - 1) * 0.05)`. This is an
/// approximation, not a statistically derived figure.
pub fn heuristic_portfolio_volatility(weights: &[f64], volatilities: &[f64]) -> f64 {
    let n = weights.len().min(volatilities.len());
    if n == 0 {
        return 0.0;
    }
    let total_weight: f64 = weights[..n].iter().sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = weights[..n]
        .iter()
        .zip(&volatilities[..n])
        .map(|(w, v)| w * v)
        .sum::<f64>()
        / total_weight;
    let diversification = 1.0 - (0.3_f64).min((n - 1) as f64 * 0.05);
    weighted * diversification
}
