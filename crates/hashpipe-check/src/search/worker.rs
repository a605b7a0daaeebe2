//! Search worker loop.
//!
//! Workers share three counters: the claim cursor, the lowest terminal
//! position seen so far (`best`), and the examined count. A worker claims
//! `chunk_size` indexes at a time and never evaluates an index above `best`,
//! so once a match is found only lower indexes are still being checked.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::Sender;
use smallvec::SmallVec;
use tracing::debug;

use hashpipe_core::id::SlotId;
use hashpipe_core::program::Program;

use super::candidates::CandidateStrategy;
use crate::interpreter::{ExecutionState, Interpreter, InterpreterConfig, RuntimeError};

/// No terminal event yet.
pub(super) const NONE: u64 = u64::MAX;

/// Read-only inputs shared by all workers.
pub(super) struct Job<'a> {
    pub program: &'a Program,
    pub strategy: &'a CandidateStrategy,
    pub target: &'a [u8],
    pub input_slot: SlotId,
    pub result_slots: &'a [SlotId],
    /// Candidates to examine, after the candidate budget.
    pub total: u64,
    pub chunk_size: u64,
    pub deadline: Option<Instant>,
    pub cancel: &'a Arc<AtomicBool>,
}

/// Counters shared by all workers.
pub(super) struct Progress {
    pub cursor: AtomicU64,
    pub best: AtomicU64,
    pub examined: AtomicU64,
}

impl Progress {
    pub fn new() -> Self {
        Progress {
            cursor: AtomicU64::new(0),
            best: AtomicU64::new(NONE),
            examined: AtomicU64::new(0),
        }
    }
}

/// What a worker sends back.
#[derive(Debug)]
pub(super) enum Report {
    Hit {
        position: u64,
        candidate: Vec<u8>,
        matched: Vec<SlotId>,
    },
    Failed {
        position: u64,
        error: RuntimeError,
    },
}

impl Report {
    pub fn position(&self) -> u64 {
        match self {
            Report::Hit { position, .. } | Report::Failed { position, .. } => *position,
        }
    }
}

/// Runs one worker until the candidates run out, a lower terminal event is
/// known, the deadline passes, or the search is cancelled.
pub(super) fn run_worker(
    worker: usize,
    job: &Job<'_>,
    progress: &Progress,
    reports: Sender<Report>,
) {
    let mut interp = Interpreter::new(job.program, InterpreterConfig::default());
    let mut candidate = Vec::with_capacity(job.target.len().max(8));
    let mut matched: SmallVec<[SlotId; 4]> = SmallVec::new();
    let mut local_examined = 0u64;

    'claim: loop {
        if job.cancel.load(Ordering::Relaxed) || job.deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        let start = progress.cursor.fetch_add(job.chunk_size, Ordering::Relaxed);
        if start >= job.total || start > progress.best.load(Ordering::Acquire) {
            break;
        }
        let end = start.saturating_add(job.chunk_size).min(job.total);

        for position in start..end {
            if position > progress.best.load(Ordering::Acquire) {
                break 'claim;
            }

            job.strategy.candidate_into(position, &mut candidate);
            interp.start([(job.input_slot, candidate.clone())]);
            let state = interp.run();
            progress.examined.fetch_add(1, Ordering::Relaxed);
            local_examined += 1;

            if let ExecutionState::Error { error, .. } = state {
                progress.best.fetch_min(position, Ordering::AcqRel);
                let _ = reports.send(Report::Failed {
                    position,
                    error: error.clone(),
                });
                break 'claim;
            }

            matched.clear();
            matched.extend(
                job.result_slots
                    .iter()
                    .copied()
                    .filter(|&slot| interp.bindings().get(slot) == Some(job.target)),
            );
            if !matched.is_empty() {
                progress.best.fetch_min(position, Ordering::AcqRel);
                let _ = reports.send(Report::Hit {
                    position,
                    candidate: candidate.clone(),
                    matched: matched.to_vec(),
                });
                break 'claim;
            }
        }
    }

    debug!(worker, examined = local_examined, "search worker finished");
}
