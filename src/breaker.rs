//! Top-level session: configuration, observed outputs, and dispatch to
//! state inference or brute force.

use crate::prng::{self, Descriptor, Prng};
use crate::search::{self, Candidate, Job, Monitor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{Error, ErrorKind, Result};
use std::thread;

const DEFAULT_DEPTH: u32 = 1000;
const DEFAULT_MIN_CONFIDENCE: f64 = 100.0;

/// Length of a generated sample sequence.
const SAMPLE_LEN: usize = 10;
/// Upper bound of the pseudo-random starting depth for samples.
const MAX_SAMPLE_DEPTH: u32 = 1000;

struct Recovered {
    words: Vec<u32>,
    generator: Box<dyn Prng>,
}

pub struct Breaker {
    algorithm: String,
    depth: u32,
    threads: usize,
    min_confidence: f64,
    observed: Vec<u32>,
    monitor: Monitor,
    recovered: Option<Recovered>,
}

impl Breaker {
    pub fn new() -> Self {
        let threads = thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        Breaker {
            algorithm: prng::names()[0].to_string(),
            depth: DEFAULT_DEPTH,
            threads,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            observed: Vec::new(),
            monitor: Monitor::new(threads),
            recovered: None,
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn set_algorithm(&mut self, name: &str) -> Result<()> {
        if !prng::supports(name) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "unsupported PRNG \"{}\", expected one of: {}",
                    name,
                    prng::names().join(", ")
                ),
            ));
        }
        self.algorithm = name.to_string();
        self.recovered = None;
        Ok(())
    }

    pub fn descriptor(&self) -> Option<&'static Descriptor> {
        prng::descriptor(&self.algorithm)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: u32) -> Result<()> {
        if depth == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "depth must be at least 1",
            ));
        }
        self.depth = depth;
        Ok(())
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn set_threads(&mut self, threads: usize) -> Result<()> {
        if threads == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "thread count must be at least 1",
            ));
        }
        self.threads = threads;
        self.monitor = Monitor::new(threads);
        Ok(())
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn set_min_confidence(&mut self, confidence: f64) -> Result<()> {
        if !(confidence > 0.0 && confidence <= 100.0) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "confidence must be within (0, 100]",
            ));
        }
        self.min_confidence = confidence;
        Ok(())
    }

    pub fn add_observed_output(&mut self, value: u32) {
        self.observed.push(value);
        self.recovered = None;
    }

    pub fn observed_outputs(&self) -> &[u32] {
        &self.observed
    }

    /// Handle onto the run flags and progress counters. Take it after
    /// configuration: `set_threads` replaces the underlying counters.
    pub fn monitor(&self) -> Monitor {
        self.monitor.clone()
    }

    /// Brute-force `[lower, upper)` for seeds whose replayed output matches
    /// the observed sequence at the configured confidence. Returns the
    /// accepted candidates sorted by descending confidence, then ascending
    /// seed; on cancellation, whatever was found so far.
    pub fn bruteforce(&mut self, lower: u32, upper: u32) -> Result<Vec<Candidate>> {
        let outcome = self.dispatch(lower, upper);
        if outcome.is_err() {
            // Wake any progress poller blocked on the completion flag.
            self.monitor.finish();
        }
        outcome
    }

    fn dispatch(&self, lower: u32, upper: u32) -> Result<Vec<Candidate>> {
        if self.observed.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "no observed outputs loaded",
            ));
        }
        if lower >= upper {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("empty seed range [{}, {})", lower, upper),
            ));
        }
        if (self.depth as usize) < self.observed.len() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "depth {} is smaller than the {} observed outputs",
                    self.depth,
                    self.observed.len()
                ),
            ));
        }
        let job = Job {
            algorithm: self.algorithm.clone(),
            observed: self.observed.clone(),
            depth: self.depth as usize,
            min_confidence: self.min_confidence,
        };
        search::run(job, lower, upper, &self.monitor)
    }

    /// Try to reconstruct the generator's internal state directly from the
    /// observed outputs. Needs an algorithm with an inverter and at least
    /// `state_words` observations; any remaining observations are used to
    /// verify the reconstruction by replay. Returns false when inference is
    /// unavailable or the verification mismatches, leaving brute force as
    /// the fallback.
    pub fn infer_state(&mut self) -> bool {
        let mut generator = match prng::make(&self.algorithm) {
            Ok(generator) => generator,
            Err(_) => return false,
        };
        let descriptor = generator.descriptor();
        if !descriptor.infers_state || self.observed.len() < descriptor.state_words {
            return false;
        }
        if generator
            .infer_state(&self.observed[..descriptor.state_words])
            .is_err()
        {
            return false;
        }
        let words = generator.state();
        for &expected in &self.observed[descriptor.state_words..] {
            if generator.next() != expected {
                return false;
            }
        }
        self.recovered = Some(Recovered { words, generator });
        true
    }

    /// The raw state words recovered by the last successful `infer_state`.
    pub fn recovered_state(&self) -> Option<&[u32]> {
        self.recovered
            .as_ref()
            .map(|recovered| recovered.words.as_slice())
    }

    /// The next `count` outputs the target generator will produce, predicted
    /// from the inferred state. The stored generator is not disturbed.
    pub fn predict(&self, count: usize) -> Option<Vec<u32>> {
        self.recovered.as_ref().map(|recovered| {
            let mut generator = recovered.generator.boxed_clone();
            (0..count).map(|_| generator.next()).collect()
        })
    }

    /// Emit a self-test sample: seed a fresh generator, discard a
    /// pseudo-random number of outputs, return the next `SAMPLE_LEN`. The
    /// starting depth is drawn from a generator keyed on the seed itself,
    /// so the same invocation always produces the same sample.
    pub fn generate_sample_from_seed(&self, seed: u32) -> Result<Vec<u32>> {
        let mut generator = prng::make(&self.algorithm)?;
        generator.seed(seed);
        let depth = StdRng::seed_from_u64(seed as u64)
            .gen_range(SAMPLE_LEN as u32..=MAX_SAMPLE_DEPTH);
        for _ in 0..depth as usize - SAMPLE_LEN {
            generator.next();
        }
        Ok((0..SAMPLE_LEN).map(|_| generator.next()).collect())
    }

    /// Continue the sequence past the observed outputs, inferring the state
    /// first if that has not happened yet. Emits one output per observation.
    pub fn generate_sample_from_state(&mut self) -> Result<Vec<u32>> {
        if self.recovered.is_none() && !self.infer_state() {
            let descriptor = self.descriptor().ok_or_else(|| {
                Error::new(ErrorKind::InvalidInput, "unknown algorithm")
            })?;
            let message = if descriptor.infers_state {
                format!(
                    "state inference failed: {} needs at least {} observed outputs",
                    descriptor.name, descriptor.state_words
                )
            } else {
                format!(
                    "state inference is not implemented for {}",
                    descriptor.name
                )
            };
            return Err(Error::new(ErrorKind::InvalidInput, message));
        }
        let count = self.observed.len();
        self.predict(count).ok_or_else(|| {
            Error::new(ErrorKind::Other, "state inference left no generator")
        })
    }
}

impl Default for Breaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let breaker = Breaker::new();
        assert_eq!(breaker.algorithm(), "mt19937");
        assert_eq!(breaker.depth(), 1000);
        assert_eq!(breaker.min_confidence(), 100.0);
        assert!(breaker.threads() >= 1);
        assert!(breaker.observed_outputs().is_empty());
    }

    #[test]
    fn setters_validate() {
        let mut breaker = Breaker::new();
        assert!(breaker.set_algorithm("rot13").is_err());
        assert!(breaker.set_depth(0).is_err());
        assert!(breaker.set_threads(0).is_err());
        assert!(breaker.set_min_confidence(0.0).is_err());
        assert!(breaker.set_min_confidence(100.1).is_err());

        assert!(breaker.set_algorithm("glibc-rand").is_ok());
        assert!(breaker.set_depth(20).is_ok());
        assert!(breaker.set_threads(2).is_ok());
        assert!(breaker.set_min_confidence(75.0).is_ok());
    }

    #[test]
    fn bruteforce_rejects_bad_runs() {
        let mut breaker = Breaker::new();
        assert!(breaker.bruteforce(0, 100).is_err());

        breaker.add_observed_output(42);
        assert!(breaker.bruteforce(100, 100).is_err());

        breaker.set_depth(1).unwrap();
        breaker.add_observed_output(43);
        assert!(breaker.bruteforce(0, 100).is_err());
    }

    #[test]
    fn infer_state_needs_enough_observations() {
        let mut breaker = Breaker::new();
        for value in 0..10u32 {
            breaker.add_observed_output(value);
        }
        assert!(!breaker.infer_state());
        assert!(breaker.recovered_state().is_none());
    }

    #[test]
    fn infer_state_unavailable_for_lcg() {
        let mut breaker = Breaker::new();
        breaker.set_algorithm("glibc-rand").unwrap();
        breaker.add_observed_output(1103527590);
        assert!(!breaker.infer_state());
    }

    #[test]
    fn sample_from_seed_is_deterministic() {
        let breaker = Breaker::new();
        let first = breaker.generate_sample_from_seed(42).unwrap();
        let second = breaker.generate_sample_from_seed(42).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
        assert_ne!(first, breaker.generate_sample_from_seed(43).unwrap());
    }
}
