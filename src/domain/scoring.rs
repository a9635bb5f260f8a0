//! Composite portfolio score and letter grade.
//!
//! Each metric is looked up in an ordered table of half-open buckets. Tables are plain values so
//! callers can supply their own breakpoints; [`ScoringConfig::default`] documents the defaults.

use std::fmt;

use crate::domain::metrics::PortfolioMetrics;

pub const MAX_PROFITABILITY: u32 = 40;
pub const MAX_STABILITY: u32 = 30;
pub const MAX_EFFICIENCY: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// First bucket with `value >= threshold` wins.
    HigherIsBetter,
    /// First bucket with `value < threshold` wins.
    LowerIsBetter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketTable {
    pub direction: Direction,
    /// `(threshold, points)` ordered from best to worst.
    pub buckets: Vec<(f64, u32)>,
    /// Points when no bucket matches (including NaN input).
    pub fallback: u32,
}

impl BucketTable {
    pub fn points(&self, value: f64) -> u32 {
        self.buckets
            .iter()
            .find(|&&(threshold, _)| match self.direction {
                Direction::HigherIsBetter => value >= threshold,
                Direction::LowerIsBetter => value < threshold,
            })
            .map(|&(_, points)| points)
            .unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub cagr: BucketTable,
    pub volatility: BucketTable,
    /// Applied to the drawdown magnitude.
    pub drawdown: BucketTable,
    pub sharpe: BucketTable,
    /// `(minimum total, grade)` ordered from best to worst.
    pub grades: Vec<(u32, Grade)>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            cagr: BucketTable {
                direction: Direction::HigherIsBetter,
                buckets: vec![(0.12, 40), (0.08, 32), (0.05, 24), (0.03, 16), (0.0, 8)],
                fallback: 0,
            },
            volatility: BucketTable {
                direction: Direction::LowerIsBetter,
                buckets: vec![(0.10, 15), (0.15, 12), (0.20, 9), (0.25, 6), (0.30, 3)],
                fallback: 0,
            },
            drawdown: BucketTable {
                direction: Direction::LowerIsBetter,
                buckets: vec![(0.10, 15), (0.20, 12), (0.30, 9), (0.40, 6), (0.50, 3)],
                fallback: 0,
            },
            sharpe: BucketTable {
                direction: Direction::HigherIsBetter,
                buckets: vec![(1.5, 30), (1.0, 24), (0.75, 18), (0.5, 12), (0.25, 6)],
                fallback: 0,
            },
            grades: vec![(90, Grade::S), (75, Grade::A), (60, Grade::B), (45, Grade::C)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortfolioScore {
    pub profitability: u32,
    pub volatility_points: u32,
    pub drawdown_points: u32,
    pub stability: u32,
    pub efficiency: u32,
    pub total: u32,
    pub grade: Grade,
}

pub fn score(
    cagr: f64,
    volatility: f64,
    sharpe: f64,
    max_drawdown: f64,
    config: &ScoringConfig,
) -> PortfolioScore {
    let profitability = config.cagr.points(cagr).min(MAX_PROFITABILITY);
    let half = MAX_STABILITY / 2;
    let volatility_points = config.volatility.points(volatility).min(half);
    let drawdown_points = config.drawdown.points(max_drawdown.abs()).min(half);
    let stability = volatility_points + drawdown_points;
    let efficiency = config.sharpe.points(sharpe).min(MAX_EFFICIENCY);
    let total = profitability + stability + efficiency;

    PortfolioScore {
        profitability,
        volatility_points,
        drawdown_points,
        stability,
        efficiency,
        total,
        grade: grade(total, config),
    }
}

/// Scores metrics on their dividend-adjusted CAGR.
pub fn score_metrics(metrics: &PortfolioMetrics, config: &ScoringConfig) -> PortfolioScore {
    score(
        metrics.cagr_with_dividends,
        metrics.volatility,
        metrics.sharpe_ratio,
        metrics.max_drawdown,
        config,
    )
}

pub fn grade(total: u32, config: &ScoringConfig) -> Grade {
    config
        .grades
        .iter()
        .find(|&&(min, _)| total >= min)
        .map(|&(_, g)| g)
        .unwrap_or(Grade::D)
}
