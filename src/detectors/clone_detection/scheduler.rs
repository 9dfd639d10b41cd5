//! Parallel all-pairs comparison scheduler.
//!
//! One run spawns a fresh pool of scoped worker threads:
//!
//! ```text
//! producer ──jobs──▶ worker × W ──results──▶ coordinator (caller thread)
//! ```
//!
//! Both queues are bounded. The coordinator counts completions, fires the
//! progress callback every `progress_interval` completions and always on the
//! last one, and returns only after every worker has exited.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use crossbeam::channel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cache::CacheStatistics;
use super::similarity::SimilarityDetector;
use crate::core::config::SchedulerConfig;
use crate::core::errors::{Result, TwinscanError};
use crate::core::function::{FunctionDescriptor, FunctionRef};

/// Lifecycle of a scheduler run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No run in progress
    Idle,
    /// Jobs are being queued
    Dispatching,
    /// Workers are consuming jobs and results are streaming back
    Draining,
    /// Every job is accounted for
    Complete,
}

impl RunState {
    fn as_u8(self) -> u8 {
        match self {
            RunState::Idle => 0,
            RunState::Dispatching => 1,
            RunState::Draining => 2,
            RunState::Complete => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Dispatching,
            2 => RunState::Draining,
            3 => RunState::Complete,
            _ => RunState::Idle,
        }
    }
}

/// One unordered pair of descriptor indices (`left < right`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComparisonJob {
    /// Index of the first descriptor
    pub left: usize,
    /// Index of the second descriptor
    pub right: usize,
}

/// All unordered index pairs for `n` descriptors, in row-major order.
pub fn candidate_pairs(n: usize) -> impl Iterator<Item = ComparisonJob> {
    (0..n).flat_map(move |left| (left + 1..n).map(move |right| ComparisonJob { left, right }))
}

/// Number of unordered pairs among `n` descriptors
pub fn total_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Duplicate pair reported by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Descriptor with the smaller index
    pub left: FunctionRef,
    /// Descriptor with the larger index
    pub right: FunctionRef,
    /// Similarity score in [0, 1]
    pub score: f64,
}

/// Outcome of one job
#[derive(Debug)]
pub struct ComparisonResult {
    /// The compared pair
    pub job: ComparisonJob,
    /// Score, when the comparison succeeded
    pub score: Option<f64>,
    /// Match, when the score reached the threshold
    pub matched: Option<Match>,
    /// Failure, when the comparison failed
    pub error: Option<TwinscanError>,
    /// False when the job was skipped after cancellation
    pub completed: bool,
}

impl ComparisonResult {
    fn scored(job: ComparisonJob, score: f64, matched: Option<Match>) -> Self {
        Self {
            job,
            score: Some(score),
            matched,
            error: None,
            completed: true,
        }
    }

    fn failed(job: ComparisonJob, error: TwinscanError) -> Self {
        Self {
            job,
            score: None,
            matched: None,
            error: Some(error),
            completed: true,
        }
    }

    fn skipped(job: ComparisonJob) -> Self {
        Self {
            job,
            score: None,
            matched: None,
            error: None,
            completed: false,
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Candidate pairs, `n(n-1)/2`
    pub total_comparisons: usize,
    /// Records received by the coordinator, skipped ones included
    pub completed: usize,
    /// Comparisons that returned an error or panicked
    pub failed: usize,
    /// Jobs not computed because the run was cancelled
    pub skipped: usize,
    /// Matches reported
    pub matches: usize,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Detector cache counters at the end of the run
    #[serde(skip)]
    pub cache: CacheStatistics,
}

/// Matches plus the aggregate error of a run, if any
#[derive(Debug)]
pub struct ComparisonOutcome {
    /// Matches sorted by descending score
    pub matches: Vec<Match>,
    /// Aggregate failure; the matches above are partial when set
    pub error: Option<TwinscanError>,
    /// Run counters
    pub stats: RunStatistics,
}

impl ComparisonOutcome {
    fn empty() -> Self {
        Self {
            matches: Vec::new(),
            error: None,
            stats: RunStatistics::default(),
        }
    }

    /// Whether every comparison succeeded
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Matches, or the aggregate error if any comparison failed.
    pub fn into_result(self) -> Result<Vec<Match>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.matches),
        }
    }
}

/// Drives all-pairs comparisons over a per-run worker pool
#[derive(Debug)]
pub struct ComparisonScheduler {
    detector: SimilarityDetector,
    config: SchedulerConfig,
    state: AtomicU8,
}

impl ComparisonScheduler {
    /// Create a scheduler; the configuration is validated first.
    pub fn new(detector: SimilarityDetector, config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector,
            config,
            state: AtomicU8::new(RunState::Idle.as_u8()),
        })
    }

    /// Underlying detector
    pub fn detector(&self) -> &SimilarityDetector {
        &self.detector
    }

    /// Scheduler configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: RunState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Compare every unordered pair and collect matches at or above the threshold.
    ///
    /// `progress(completed, total)` is called from the caller's thread; the
    /// last call always has `completed == total`. Fewer than two descriptors
    /// return immediately without any callback.
    pub fn find_similar<F>(&self, descriptors: &[FunctionDescriptor], mut progress: F) -> ComparisonOutcome
    where
        F: FnMut(usize, usize),
    {
        let n = descriptors.len();
        if n < 2 {
            self.set_state(RunState::Complete);
            return ComparisonOutcome::empty();
        }

        let started = Instant::now();
        let total = total_pairs(n);
        let workers = self.config.effective_workers().min(total).max(1);
        let capacity = self.config.queue_capacity;
        let interval = self.config.progress_interval;
        let cancel_on_error = self.config.cancel_on_error;

        info!(
            "Comparing {} functions ({} pairs) on {} workers",
            n, total, workers
        );

        let cancelled = AtomicBool::new(false);
        let mut stats = RunStatistics {
            total_comparisons: total,
            ..RunStatistics::default()
        };
        let mut matches = Vec::new();
        let mut first_error: Option<TwinscanError> = None;

        let (job_tx, job_rx) = channel::bounded::<ComparisonJob>(capacity);
        let (result_tx, result_rx) = channel::bounded::<ComparisonResult>(capacity);

        self.set_state(RunState::Dispatching);

        let scope_result = crossbeam::thread::scope(|scope| {
            scope.spawn(move |_| {
                for job in candidate_pairs(n) {
                    if job_tx.send(job).is_err() {
                        break;
                    }
                }
            });

            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancelled = &cancelled;
                scope.spawn(move |_| {
                    for job in job_rx.iter() {
                        let result = if cancel_on_error && cancelled.load(Ordering::Acquire) {
                            ComparisonResult::skipped(job)
                        } else {
                            self.run_job(descriptors, job)
                        };
                        if cancel_on_error && result.error.is_some() {
                            cancelled.store(true, Ordering::Release);
                        }
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            }

            // Workers hold the only remaining handles; draining ends when they exit.
            drop(job_rx);
            drop(result_tx);
            let results = result_rx;
            self.set_state(RunState::Draining);

            for result in results.iter() {
                stats.completed += 1;
                if !result.completed {
                    stats.skipped += 1;
                }
                if let Some(err) = result.error {
                    stats.failed += 1;
                    warn!(
                        "Comparison {} <-> {} failed: {}",
                        descriptors[result.job.left].identity(),
                        descriptors[result.job.right].identity(),
                        err
                    );
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                if let Some(matched) = result.matched {
                    matches.push(matched);
                }

                if stats.completed % interval == 0 || stats.completed == total {
                    progress(stats.completed, total);
                }
            }
        });

        if scope_result.is_err() && first_error.is_none() {
            first_error = Some(TwinscanError::internal("worker thread terminated unexpectedly"));
        }
        if stats.completed < total {
            let missing = total - stats.completed;
            warn!("Worker pool lost {} comparison results", missing);
            stats.failed += missing;
            stats.completed = total;
            if first_error.is_none() {
                first_error = Some(TwinscanError::internal("worker thread terminated unexpectedly"));
            }
            progress(total, total);
        }

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.left.index.cmp(&b.left.index))
                .then(a.right.index.cmp(&b.right.index))
        });

        stats.matches = matches.len();
        stats.elapsed = started.elapsed();
        stats.cache = self.detector.cache_statistics();
        self.set_state(RunState::Complete);

        let error = first_error.map(|err| TwinscanError::Scheduler {
            message: err.to_string(),
            failed: stats.failed,
            total,
            partial_matches: matches.len(),
        });

        if let Some(err) = &error {
            warn!("{}", err);
        }
        info!(
            "Comparison run finished: {} matches, {} failed, {} skipped in {:?}",
            stats.matches, stats.failed, stats.skipped, stats.elapsed
        );
        debug!("Cache statistics after run: {:?}", stats.cache);

        ComparisonOutcome {
            matches,
            error,
            stats,
        }
    }

    fn run_job(&self, descriptors: &[FunctionDescriptor], job: ComparisonJob) -> ComparisonResult {
        let left = &descriptors[job.left];
        let right = &descriptors[job.right];

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.detector.try_score(left, right)));

        match outcome {
            Ok(Ok(score)) => {
                let matched = self.detector.is_above_threshold(score).then(|| Match {
                    left: FunctionRef::from_descriptor(job.left, left),
                    right: FunctionRef::from_descriptor(job.right, right),
                    score,
                });
                ComparisonResult::scored(job, score, matched)
            }
            Ok(Err(err)) => ComparisonResult::failed(
                job,
                err.with_context(format!("{} <-> {}", left.identity(), right.identity())),
            ),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                ComparisonResult::failed(
                    job,
                    TwinscanError::comparison(format!("comparison panicked: {reason}"))
                        .with_context(format!("{} <-> {}", left.identity(), right.identity())),
                )
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
