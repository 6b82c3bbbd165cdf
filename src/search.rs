//! Parallel brute-force search over a seed range.

use crate::prng::{self, Prng};
use crate::score;
use std::io::Result;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

/// Workers poll the cancellation flag once per this many candidates.
const CANCEL_POLL_INTERVAL: usize = 0x1000;

/// A seed accepted by the scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub seed: u32,
    pub confidence: f64,
}

/// Immutable description of one brute-force run.
pub(crate) struct Job {
    pub algorithm: String,
    pub observed: Vec<u32>,
    pub depth: usize,
    pub min_confidence: f64,
}

struct RunState {
    started: AtomicBool,
    completed: AtomicBool,
    cancelled: AtomicBool,
    status: Vec<AtomicU32>,
}

/// Cloneable handle onto a run's flags and per-worker progress counters.
///
/// The flags are single-bit signals; no other memory is published through
/// them, so relaxed ordering is sufficient.
#[derive(Clone)]
pub struct Monitor {
    run: Arc<RunState>,
}

impl Monitor {
    pub(crate) fn new(workers: usize) -> Self {
        Monitor {
            run: Arc::new(RunState {
                started: AtomicBool::new(false),
                completed: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                status: (0..workers).map(|_| AtomicU32::new(0)).collect(),
            }),
        }
    }

    /// True once any worker has begun evaluating candidates.
    pub fn started(&self) -> bool {
        self.run.started.load(Ordering::Relaxed)
    }

    /// True once every worker has finished or been cancelled.
    pub fn completed(&self) -> bool {
        self.run.completed.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> bool {
        self.run.cancelled.load(Ordering::Relaxed)
    }

    /// Ask every worker to stop at its next poll; partial results are kept.
    pub fn cancel(&self) {
        self.run.cancelled.store(true, Ordering::Relaxed);
    }

    /// Total candidates evaluated so far, summed over all workers.
    pub fn evaluated(&self) -> u32 {
        self.run
            .status
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .sum()
    }

    pub fn workers(&self) -> usize {
        self.run.status.len()
    }

    pub(crate) fn reset(&self) {
        self.run.completed.store(false, Ordering::Relaxed);
        self.run.started.store(false, Ordering::Relaxed);
        self.run.cancelled.store(false, Ordering::Relaxed);
        for slot in &self.run.status {
            slot.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn finish(&self) {
        self.run.completed.store(true, Ordering::Relaxed);
    }
}

/// Split `[lower, upper)` into `workers` contiguous near-equal sub-ranges.
fn partition(lower: u32, upper: u32, workers: usize) -> Vec<(u32, u32)> {
    let total = (upper - lower) as u64;
    let count = workers as u64;
    (0..count)
        .map(|index| {
            let start = lower as u64 + index * total / count;
            let end = lower as u64 + (index + 1) * total / count;
            (start as u32, end as u32)
        })
        .collect()
}

/// Drive the full worker pool over `[lower, upper)` and merge the results.
pub(crate) fn run(job: Job, lower: u32, upper: u32, monitor: &Monitor) -> Result<Vec<Candidate>> {
    let workers = monitor.workers();
    monitor.reset();

    // Construct every generator up front so an unknown algorithm fails
    // before any thread is spawned.
    let mut generators = Vec::with_capacity(workers);
    for _ in 0..workers {
        generators.push(prng::make(&job.algorithm)?);
    }

    let job = Arc::new(job);
    let mut handles = Vec::with_capacity(workers);
    for (slot, (range, mut generator)) in partition(lower, upper, workers)
        .into_iter()
        .zip(generators)
        .enumerate()
    {
        let job = Arc::clone(&job);
        let run = Arc::clone(&monitor.run);
        handles.push(thread::spawn(move || {
            search_range(&job, generator.as_mut(), range, slot, &run)
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        // A worker that died loses only its own findings.
        if let Ok(found) = handle.join() {
            results.extend(found);
        }
    }
    monitor.finish();

    results.sort_unstable_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.seed.cmp(&b.seed))
    });
    results.dedup_by_key(|candidate| candidate.seed);
    Ok(results)
}

fn search_range(
    job: &Job,
    generator: &mut dyn Prng,
    (lower, upper): (u32, u32),
    slot: usize,
    run: &RunState,
) -> Vec<Candidate> {
    run.started.store(true, Ordering::Relaxed);

    let mut values = Vec::with_capacity(job.depth);
    let mut found = Vec::new();
    for (count, seed) in (lower..upper).enumerate() {
        if count & (CANCEL_POLL_INTERVAL - 1) == 0 && run.cancelled.load(Ordering::Relaxed) {
            break;
        }

        generator.seed(seed);
        values.clear();
        for _ in 0..job.depth {
            values.push(generator.next());
        }

        let best = score::best_match(&values, &job.observed);
        let confidence = score::confidence(best.length, job.observed.len());
        if confidence >= job.min_confidence {
            found.push(Candidate { seed, confidence });
        }
        run.status[slot].fetch_add(1, Ordering::Relaxed);
    }
    found
}
