//! Aggregator: reduces the trials of one method to a single summary.

use std::collections::HashSet;

use log::warn;

use crate::error::{HarnessError, Result};
use crate::trial::TrialResult;

const MICROS_PER_SEC: f64 = 1_000_000.0;
const KB_PER_MIB: f64 = 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    /// Mean time of one query in microseconds.
    pub mean_time_per_query_us: f64,
    /// Mean peak memory in MiB.
    pub mean_memory_mib: f64,
    /// Distances of the first trial.
    pub canonical_distances: Vec<u64>,
    /// False iff the trials produced more than one distinct distance sequence.
    pub consistent: bool,
    pub trial_count: usize,
    pub distinct_outputs: usize,
}

/// Combine `trials` over a query set of `query_count` queries.
///
/// Disagreeing trials are not an error: the result is flagged inconsistent
/// and a warning is logged, but the summary is still produced.
pub fn aggregate(trials: &[TrialResult], query_count: usize) -> Result<AggregatedResult> {
    let first = trials
        .first()
        .ok_or_else(|| HarnessError::InvalidAggregate("no trials to aggregate".into()))?;
    if query_count == 0 {
        return Err(HarnessError::InvalidAggregate(
            "query count must be at least 1".into(),
        ));
    }

    let n = trials.len() as f64;
    let total_time: f64 = trials.iter().map(|t| t.elapsed_secs).sum();
    let total_memory: u64 = trials.iter().map(|t| t.peak_memory_kb).sum();

    let mean_time_per_query_us = (total_time * MICROS_PER_SEC) / (n * query_count as f64);
    let mean_memory_mib = total_memory as f64 / (n * KB_PER_MIB);

    let distinct: HashSet<&[u64]> = trials.iter().map(|t| t.distances.as_slice()).collect();
    let consistent = distinct.len() == 1;
    if !consistent {
        warn!(
            "non-deterministic output: {} trials produced {} different distance sequences on the same query set",
            trials.len(),
            distinct.len()
        );
    }

    Ok(AggregatedResult {
        mean_time_per_query_us,
        mean_memory_mib,
        canonical_distances: first.distances.clone(),
        consistent,
        trial_count: trials.len(),
        distinct_outputs: distinct.len(),
    })
}
