//! Brute-force search for an input whose program output equals a target.
//!
//! The driver binds each candidate to the program's single `Input` slot,
//! runs the whole program, and compares every `Result` sink with the target
//! byte for byte. The candidate advances once per full run, however many
//! sinks the program has.
//!
//! Candidates are sharded across a `rayon` pool. Whatever the worker count,
//! the reported match is the lowest-index one: see [`worker`] for how the
//! shared counters guarantee that.
//!
//! Reproducibility: a [`CandidateStrategy`] is a pure function of its
//! parameters, so the same config always examines the same candidates.

pub mod candidates;
pub mod error;
mod worker;

pub use candidates::{decode_le, CandidateStrategy, DEFAULT_WIDTH, MAX_WIDTH};
pub use error::{SearchError, StopReason};

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hashpipe_core::id::SlotId;
use hashpipe_core::program::Program;

use worker::{Job, Progress, Report};

/// Default number of candidates a worker claims at once.
pub const DEFAULT_CHUNK_SIZE: u64 = 4096;

/// Limits that end a search early with [`SearchError::NotFound`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBudget {
    /// Examine at most this many candidates (the lowest indexes).
    pub max_candidates: Option<u64>,
    /// Stop after this many milliseconds of wall-clock time.
    pub max_duration_ms: Option<u64>,
}

/// Search configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub strategy: CandidateStrategy,
    /// Worker threads; 0 means one per available CPU.
    pub threads: usize,
    /// Candidates claimed per worker step.
    pub chunk_size: u64,
    pub budget: SearchBudget,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            strategy: CandidateStrategy::default(),
            threads: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            budget: SearchBudget::default(),
        }
    }
}

/// A successful search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Index of the matching candidate in the strategy's sequence.
    pub position: u64,
    /// The matching input bytes.
    pub candidate: Vec<u8>,
    /// Every `Result` slot that equalled the target in the winning run.
    pub matched: Vec<SlotId>,
    /// Candidates evaluated across all workers.
    pub examined: u64,
}

impl SearchOutcome {
    /// The candidate as a little-endian integer, if it fits in a `u64`.
    pub fn as_integer(&self) -> Option<u64> {
        decode_le(&self.candidate)
    }
}

/// A validated search, ready to run.
pub struct Search<'p> {
    program: &'p Program,
    target: Vec<u8>,
    config: SearchConfig,
    input_slot: SlotId,
    result_slots: Vec<SlotId>,
    cancel: Arc<AtomicBool>,
}

impl<'p> Search<'p> {
    /// Checks the program shape and the config.
    ///
    /// # Errors
    ///
    /// [`SearchError::InputCount`], [`SearchError::NoResultSink`],
    /// [`SearchError::InvalidStrategy`] or [`SearchError::InvalidConfig`].
    pub fn new(
        program: &'p Program,
        target: Vec<u8>,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        let input_slots = program.input_slots();
        let input_slot = match input_slots.as_slice() {
            [slot] => *slot,
            other => return Err(SearchError::InputCount { found: other.len() }),
        };

        let result_slots = program.result_slots();
        if result_slots.is_empty() {
            return Err(SearchError::NoResultSink);
        }

        config
            .strategy
            .validate()
            .map_err(|reason| SearchError::InvalidStrategy { reason })?;
        if config.chunk_size == 0 {
            return Err(SearchError::InvalidConfig {
                reason: "chunk_size must be at least 1".into(),
            });
        }

        Ok(Search {
            program,
            target,
            config,
            input_slot,
            result_slots,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops a running search when set. Checked once per chunk.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Number of candidates this search will examine at most.
    pub fn candidate_count(&self) -> u64 {
        let len = self.config.strategy.len();
        match self.config.budget.max_candidates {
            Some(max) => len.min(max),
            None => len,
        }
    }

    /// Runs the search to completion.
    ///
    /// # Errors
    ///
    /// [`SearchError::NotFound`] when nothing matched; the reason says
    /// whether the candidates ran out or a budget or cancel stopped it.
    /// [`SearchError::Runtime`] if the program failed on a candidate below
    /// any match.
    pub fn run(&self) -> Result<SearchOutcome, SearchError> {
        let total = self.candidate_count();
        let threads = match self.config.threads {
            0 => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            n => n,
        };
        let started = Instant::now();
        let deadline = self
            .config
            .budget
            .max_duration_ms
            .map(|ms| started + Duration::from_millis(ms));

        info!(
            candidates = total,
            threads,
            chunk_size = self.config.chunk_size,
            target_len = self.target.len(),
            "search started"
        );

        let job = Job {
            program: self.program,
            strategy: &self.config.strategy,
            target: &self.target,
            input_slot: self.input_slot,
            result_slots: &self.result_slots,
            total,
            chunk_size: self.config.chunk_size,
            deadline,
            cancel: &self.cancel,
        };
        let progress = Progress::new();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("hashpipe-search-{i}"))
            .build()
            .map_err(|err| SearchError::ThreadPool(err.to_string()))?;

        let (sender, receiver) = crossbeam::channel::unbounded();
        pool.scope(|scope| {
            for worker_id in 0..threads {
                let sender = sender.clone();
                let job = &job;
                let progress = &progress;
                scope.spawn(move |_| worker::run_worker(worker_id, job, progress, sender));
            }
        });
        drop(sender);

        let first = receiver.iter().min_by_key(Report::position);
        let examined = progress.examined.load(Ordering::Acquire);

        match first {
            Some(Report::Hit {
                position,
                candidate,
                matched,
            }) => {
                info!(
                    position,
                    examined,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "search found a match"
                );
                Ok(SearchOutcome {
                    position,
                    candidate,
                    matched,
                    examined,
                })
            }
            Some(Report::Failed { position, error }) => {
                warn!(position, %error, "search stopped on a runtime error");
                Err(SearchError::Runtime {
                    position,
                    source: error,
                })
            }
            None => {
                let reason = if examined >= total {
                    if total < self.config.strategy.len() {
                        StopReason::CandidateBudget
                    } else {
                        StopReason::Exhausted
                    }
                } else if self.cancel.load(Ordering::Relaxed) {
                    StopReason::Cancelled
                } else {
                    StopReason::TimeBudget
                };

                match reason {
                    StopReason::Exhausted => info!(examined, "search exhausted all candidates"),
                    _ => warn!(examined, %reason, "search stopped early"),
                }
                Err(SearchError::NotFound { examined, reason })
            }
        }
    }
}

/// Validates and runs a search in one call.
pub fn search(
    program: &Program,
    target: Vec<u8>,
    config: SearchConfig,
) -> Result<SearchOutcome, SearchError> {
    Search::new(program, target, config)?.run()
}
