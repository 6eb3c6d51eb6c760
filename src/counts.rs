//! Frequency tables produced by the map stage and merged by the reduce stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrences per key. Ordered, so iteration and serialization are
/// deterministic and two tables with the same contents compare equal.
pub type Table = BTreeMap<String, u64>;

/// Request counts by source address and by status token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub by_source: Table,
    pub by_status: Table,
}

/// One worker's local tables, frozen when the worker returns.
pub type PartialCounts = Counts;

/// The pointwise sum of every worker's [`PartialCounts`].
pub type AggregateCounts = Counts;

impl Counts {
    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty() && self.by_status.is_empty()
    }

    /// Records counted in the source table.
    pub fn source_total(&self) -> u64 {
        self.by_source.values().sum()
    }

    /// Records counted in the status table. Equal to [`Counts::source_total`]
    /// for anything produced by the pipeline.
    pub fn status_total(&self) -> u64 {
        self.by_status.values().sum()
    }

    pub fn status(&self, token: &str) -> u64 {
        self.by_status.get(token).copied().unwrap_or(0)
    }

    /// Adds every count of `partial` into `self`.
    ///
    /// Zero entries are skipped so that an all-zero partial leaves the
    /// accumulator untouched.
    pub fn absorb(&mut self, partial: &PartialCounts) {
        add_table(&mut self.by_source, &partial.by_source);
        add_table(&mut self.by_status, &partial.by_status);
    }
}

fn add_table(acc: &mut Table, partial: &Table) {
    for (key, &count) in partial.iter().filter(|(_, count)| **count > 0) {
        match acc.get_mut(key) {
            Some(total) => *total += count,
            None => {
                acc.insert(key.clone(), count);
            }
        }
    }
}

/// Reduce step: folds one partial result into the accumulator.
///
/// Addition per key is associative and commutative, so folding the worker
/// outputs in any order yields the same aggregate.
pub fn combine(mut acc: AggregateCounts, partial: &PartialCounts) -> AggregateCounts {
    acc.absorb(partial);
    acc
}
