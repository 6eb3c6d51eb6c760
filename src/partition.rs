//! Splits the dataset into per-worker shares.

use crate::config::ConfigError;
use log::warn;

/// How many records each worker generates.
///
/// Every worker gets `total / workers` records and the first
/// `total % workers` workers get one extra, so the shares always add up
/// to exactly `total` and never differ by more than one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharePlan {
    total: u64,
    shares: Vec<u64>,
}

impl SharePlan {
    pub fn shares(&self) -> &[u64] {
        &self.shares
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn workers(&self) -> usize {
        self.shares.len()
    }

    /// Number of workers carrying one extra record.
    pub fn remainder(&self) -> u64 {
        self.total % self.shares.len() as u64
    }

    pub fn is_even(&self) -> bool {
        self.remainder() == 0
    }
}

/// Computes the share plan for `total` records over `workers` workers.
///
/// An uneven split is not an error; it is logged as a warning.
pub fn plan(total: u64, workers: usize) -> Result<SharePlan, ConfigError> {
    if workers == 0 {
        return Err(ConfigError::ZeroWorkers);
    }
    let n = workers as u64;
    let (base, remainder) = (total / n, total % n);
    let shares = (0..n)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect();
    if remainder != 0 {
        warn!(
            "{total} records do not divide evenly over {workers} workers; \
             the first {remainder} workers take {} records, the rest {base}",
            base + 1
        );
    }
    Ok(SharePlan { total, shares })
}
