//! A parallel MapReduce (lite) engine for access-log analytics.
//!
//! Synthetic access-log records are generated and counted by a fixed pool of
//! workers. Each worker owns its share of the dataset end to end, and the
//! partial tallies are folded into a single aggregate once every worker has
//! returned. Everything is in memory and scoped to one run.

pub mod config;
pub mod counts;
pub mod partition;
pub mod report;
pub mod standalone;
pub mod utils;
pub mod workload;

pub use config::{Config, ConfigError};
pub use counts::{combine, AggregateCounts, PartialCounts};
pub use partition::{plan, SharePlan};

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// One unit of map work: the share of records a single worker is
/// responsible for generating and counting.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct MapTask {
    /// Position of this task in the share plan.
    pub worker: usize,
    /// Number of records to produce.
    pub records: u64,
    /// Seed for the worker's private random source.
    pub seed: u64,
}

impl MapTask {
    /// Builds the task list for a share plan. Worker `i` is seeded with
    /// `base_seed + i`, so a fixed base seed reproduces the whole job.
    pub fn from_plan(plan: &SharePlan, base_seed: u64) -> Vec<MapTask> {
        plan.shares()
            .iter()
            .enumerate()
            .map(|(worker, &records)| MapTask {
                worker,
                records,
                seed: base_seed.wrapping_add(worker as u64),
            })
            .collect()
    }
}

/// A map function runs one [`MapTask`] to completion and returns the
/// worker's local tables.
///
/// It executes on a pool thread and must not touch state shared with other
/// workers. An [`anyhow::Error`] aborts the whole job.
pub type MapFn = fn(task: &MapTask, config: &Config) -> anyhow::Result<PartialCounts>;

/// A reduce function folds one partial result into the accumulator.
///
/// It must be associative and commutative: workers finish in any order.
pub type ReduceFn = fn(acc: AggregateCounts, partial: &PartialCounts) -> AggregateCounts;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}
