//! Shared Monte Carlo plumbing: trial execution, progress, cancellation and percentile picks.
//!
//! Trials run in parallel when the `parallel` feature is enabled. Results are collected in trial
//! order either way, so aggregation is deterministic for a fixed seed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::domain::error::NestcastError;

pub const DEFAULT_TRIALS: usize = 10_000;
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Side channel for long simulations. Neither field affects the numerical result.
#[derive(Clone)]
pub struct SimulationControl {
    pub progress: Option<ProgressCallback>,
    pub progress_interval: usize,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SimulationControl {
    fn default() -> Self {
        SimulationControl {
            progress: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancel: None,
        }
    }
}

impl fmt::Debug for SimulationControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationControl")
            .field("progress", &self.progress.is_some())
            .field("progress_interval", &self.progress_interval)
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl SimulationControl {
    pub fn with_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Counts finished trials and reports at coarse intervals.
struct Tracker<'a> {
    control: &'a SimulationControl,
    completed: AtomicUsize,
    total: usize,
}

impl<'a> Tracker<'a> {
    fn new(control: &'a SimulationControl, total: usize) -> Self {
        Self {
            control,
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Checked before a trial starts; a running trial is never interrupted.
    fn may_start(&self) -> bool {
        !self.control.is_cancelled()
    }

    fn finish(&self) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = &self.control.progress {
            let interval = self.control.progress_interval.max(1);
            if done % interval == 0 || done == self.total {
                callback(Progress {
                    completed: done,
                    total: self.total,
                });
            }
        }
    }

    fn cancelled(&self) -> NestcastError {
        let completed = self.completed.load(Ordering::Relaxed);
        tracing::info!(completed, total = self.total, "simulation cancelled");
        NestcastError::Cancelled {
            completed,
            total: self.total,
        }
    }
}

/// Runs `trial` for every index in `0..trials`, returning outputs in index order.
pub fn run_trials<T, F>(
    trials: usize,
    control: &SimulationControl,
    trial: F,
) -> Result<Vec<T>, NestcastError>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    let tracker = Tracker::new(control, trials);
    let step = |i: usize| {
        if !tracker.may_start() {
            return None;
        }
        let out = trial(i);
        tracker.finish();
        Some(out)
    };

    #[cfg(feature = "parallel")]
    let outputs: Option<Vec<T>> = (0..trials).into_par_iter().map(step).collect();
    #[cfg(not(feature = "parallel"))]
    let outputs: Option<Vec<T>> = (0..trials).map(step).collect();

    outputs.ok_or_else(|| tracker.cancelled())
}

/// Asset values of one real trial, indexed by step.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationPath {
    pub trial: usize,
    pub values: Vec<f64>,
}

impl SimulationPath {
    pub fn final_value(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Fixed-stride contiguous storage for one path per trial.
#[derive(Debug, Clone, PartialEq)]
pub struct PathArena {
    stride: usize,
    values: Vec<f64>,
}

impl PathArena {
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        if self.stride == 0 { 0 } else { self.values.len() / self.stride }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, trial: usize) -> &[f64] {
        let start = trial * self.stride;
        &self.values[start..start + self.stride]
    }
}

/// Runs one trial per arena row. `trial` fills its row and returns a per-trial summary.
pub fn fill_paths<T, F>(
    trials: usize,
    stride: usize,
    control: &SimulationControl,
    trial: F,
) -> Result<(PathArena, Vec<T>), NestcastError>
where
    T: Send,
    F: Fn(usize, &mut [f64]) -> T + Sync + Send,
{
    if stride == 0 {
        let summaries = run_trials(trials, control, |i| trial(i, &mut []))?;
        return Ok((PathArena { stride, values: Vec::new() }, summaries));
    }

    let tracker = Tracker::new(control, trials);
    let mut values = vec![0.0; trials * stride];
    let step = |(i, row): (usize, &mut [f64])| {
        if !tracker.may_start() {
            return None;
        }
        let out = trial(i, row);
        tracker.finish();
        Some(out)
    };

    #[cfg(feature = "parallel")]
    let outputs: Option<Vec<T>> = values.par_chunks_mut(stride).enumerate().map(step).collect();
    #[cfg(not(feature = "parallel"))]
    let outputs: Option<Vec<T>> = values.chunks_mut(stride).enumerate().map(step).collect();

    match outputs {
        Some(summaries) => Ok((PathArena { stride, values }, summaries)),
        None => Err(tracker.cancelled()),
    }
}

/// Index into a sorted sample of `count` items for percentile `p` in [0, 1]:
/// `floor(count * p)` clamped to the last element.
pub fn percentile_index(count: usize, p: f64) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let raw = (count as f64 * p.clamp(0.0, 1.0)).floor() as usize;
    Some(raw.min(count - 1))
}
