//! A MapReduce-compatible access-log analyzer.
//!
//! Each map task synthesizes its own share of log lines, pulls the source
//! address and status code out of every line and counts them. The reduce
//! step sums the per-worker tables.

use crate::config::{Config, WeightedPool};
use crate::counts::{combine, AggregateCounts, PartialCounts, Table};
use crate::MapTask;
use anyhow::{Context, Result};
use fnv::FnvHashMap;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Request descriptor embedded in every generated line.
pub const REQUEST: &str = "GET /api/v1/data";

/// A dotted quad, then anything, then `STATUS:` and its digits.
const LINE_PATTERN: &str =
    r"([0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}).*STATUS:([0-9]+)";

/// One raw access-log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord(String);

impl LogRecord {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces synthetic log lines from weighted pools.
///
/// Every generator owns its random source, so workers never contend on
/// (or share) RNG state.
pub struct Generator<'a> {
    rng: StdRng,
    sources: &'a WeightedPool,
    statuses: &'a WeightedPool,
}

impl<'a> Generator<'a> {
    pub fn new(sources: &'a WeightedPool, statuses: &'a WeightedPool, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sources,
            statuses,
        }
    }

    pub fn generate(&mut self) -> LogRecord {
        let source = self.sources.pick(&mut self.rng);
        let status = self.statuses.pick(&mut self.rng);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        LogRecord(format!(
            "{timestamp:.6} - INFO - {source} - REQUEST:{REQUEST} - STATUS:{status}"
        ))
    }
}

/// The fields counted by the analyzer, borrowed from the line they came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedEvent<'a> {
    pub source: &'a str,
    pub status: &'a str,
}

/// Compiled line matcher. Build it once per worker and reuse it for every
/// record in the share.
#[derive(Clone, Debug)]
pub struct Extractor {
    pattern: Regex,
}

impl Extractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(LINE_PATTERN)?,
        })
    }

    /// Returns `None` for any line without both an address and a status
    /// marker. Octet ranges are not checked.
    pub fn extract<'a>(&self, line: &'a str) -> Option<ParsedEvent<'a>> {
        let caps = self.pattern.captures(line)?;
        Some(ParsedEvent {
            source: caps.get(1)?.as_str(),
            status: caps.get(2)?.as_str(),
        })
    }
}

/// A worker's private, mutable tables.
#[derive(Debug, Default)]
pub struct Tally {
    by_source: FnvHashMap<String, u64>,
    by_status: FnvHashMap<String, u64>,
    misses: u64,
}

impl Tally {
    /// Extracts `line` and counts it. A line that does not match is
    /// skipped and only counted as a miss; returns whether it matched.
    pub fn observe(&mut self, extractor: &Extractor, line: &str) -> bool {
        match extractor.extract(line) {
            Some(event) => {
                bump(&mut self.by_source, event.source);
                bump(&mut self.by_status, event.status);
                true
            }
            None => {
                self.misses += 1;
                false
            }
        }
    }

    /// Lines that did not match.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Freezes the tables into the immutable result returned by a worker.
    pub fn into_partial(self) -> PartialCounts {
        PartialCounts {
            by_source: self.by_source.into_iter().collect::<Table>(),
            by_status: self.by_status.into_iter().collect::<Table>(),
        }
    }
}

#[inline]
fn bump(table: &mut FnvHashMap<String, u64>, key: &str) {
    match table.get_mut(key) {
        Some(count) => *count += 1,
        None => {
            table.insert(key.to_owned(), 1);
        }
    }
}

pub fn map(task: &MapTask, config: &Config) -> Result<PartialCounts> {
    let extractor = Extractor::new().context("failed to compile the access-log pattern")?;
    let mut generator = Generator::new(&config.sources, &config.statuses, task.seed);
    let mut tally = Tally::default();

    for _ in 0..task.records {
        let record = generator.generate();
        tally.observe(&extractor, record.as_str());
    }

    debug!(
        "worker {} counted {} records ({} unmatched)",
        task.worker,
        task.records,
        tally.misses()
    );
    Ok(tally.into_partial())
}

pub fn reduce(acc: AggregateCounts, partial: &PartialCounts) -> AggregateCounts {
    combine(acc, partial)
}
