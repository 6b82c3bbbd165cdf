//! Recover the seed or internal state of a legacy PRNG from a short
//! sequence of its observed 32-bit outputs.
//!
//! Candidate seeds are evaluated by bit-exact replay of the target
//! algorithm; for algorithms with an invertible output transform the
//! internal state can be reconstructed directly instead.

/// Session facade: configuration, observed outputs, dispatch.
pub mod breaker;

/// Supported generators and the registry that constructs them.
pub mod prng;

/// Match scoring of generated streams against observations.
pub mod score;

/// Parallel brute-force search over a seed range.
pub mod search;

pub use breaker::Breaker;
pub use search::{Candidate, Monitor};
