//! Job configuration.
//!
//! A [`Config`] is built once at startup, from defaults, an optional JSON
//! file, and command-line overrides, and is then passed by reference to the
//! partitioner and every worker. Nothing in the pipeline reads global state.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Records generated when no size is configured.
pub const DEFAULT_TOTAL_RECORDS: u64 = 5_000_000;

/// Number of top sources shown in the report.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("the {0} pool has no entries")]
    EmptyPool(String),

    #[error("entry '{value}' in the {pool} pool has weight 0")]
    ZeroWeight { pool: String, value: String },

    #[error("entry '{value}' in the {pool} pool can never be extracted from a log line")]
    UnmatchablePool { pool: String, value: String },

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A pool entry together with its relative weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedEntry {
    pub value: String,
    #[serde(default = "default_weight")]
    pub weight: usize,
}

fn default_weight() -> usize {
    1
}

impl WeightedEntry {
    pub fn new(value: impl Into<String>, weight: usize) -> Self {
        Self {
            value: value.into(),
            weight,
        }
    }
}

/// A non-empty pool of values sampled uniformly.
///
/// Weighting is expressed by repetition: an entry with weight 10 occupies
/// ten slots, so it is drawn ten times as often as an entry of weight 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightedPool {
    slots: Vec<String>,
}

impl WeightedPool {
    /// Expands weighted entries into a pool.
    pub fn new(name: &str, entries: Vec<WeightedEntry>) -> Result<Self, ConfigError> {
        let mut slots = Vec::new();
        for WeightedEntry { value, weight } in entries {
            if weight == 0 {
                return Err(ConfigError::ZeroWeight {
                    pool: name.to_string(),
                    value,
                });
            }
            slots.extend(std::iter::repeat(value).take(weight));
        }
        if slots.is_empty() {
            return Err(ConfigError::EmptyPool(name.to_string()));
        }
        Ok(Self { slots })
    }

    /// Builds a pool from already-repeated values, e.g. `["200", "200", "500"]`.
    pub fn from_values<I, S>(name: &str, values: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots: Vec<String> = values.into_iter().map(Into::into).collect();
        if slots.is_empty() {
            return Err(ConfigError::EmptyPool(name.to_string()));
        }
        Ok(Self { slots })
    }

    /// Picks one slot uniformly at random.
    #[inline]
    pub fn pick<R: Rng>(&self, rng: &mut R) -> &str {
        &self.slots[rng.gen_range(0..self.slots.len())]
    }

    pub fn contains(&self, value: &str) -> bool {
        self.slots.iter().any(|slot| slot == value)
    }

    /// Number of slots, counting repetitions.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }
}

/// A source must be a dotted quad of 1-3 digit octets, exactly the token
/// the extractor captures.
pub fn is_extractable_source(value: &str) -> bool {
    let octets: Vec<&str> = value.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| (1..=3).contains(&o.len()) && o.bytes().all(|b| b.is_ascii_digit()))
}

/// A status must be a non-empty run of ASCII digits.
pub fn is_extractable_status(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn check_pool(
    name: &str,
    pool: &WeightedPool,
    extractable: fn(&str) -> bool,
) -> Result<(), ConfigError> {
    if pool.is_empty() {
        return Err(ConfigError::EmptyPool(name.to_string()));
    }
    match pool.slots().iter().find(|value| !extractable(value)) {
        Some(value) => Err(ConfigError::UnmatchablePool {
            pool: name.to_string(),
            value: value.clone(),
        }),
        None => Ok(()),
    }
}

/// Request sources used when none are configured: a /24 of ordinary hosts
/// plus one noisy host drawn ten times as often.
pub fn default_sources() -> Vec<WeightedEntry> {
    let mut sources: Vec<WeightedEntry> = (1..50)
        .map(|i| WeightedEntry::new(format!("192.168.1.{i}"), 1))
        .collect();
    sources.push(WeightedEntry::new("10.0.0.1", 10));
    sources
}

/// Status codes used when none are configured; 200 dominates.
pub fn default_statuses() -> Vec<WeightedEntry> {
    vec![
        WeightedEntry::new("200", 10),
        WeightedEntry::new("404", 1),
        WeightedEntry::new("500", 1),
        WeightedEntry::new("301", 1),
    ]
}

/// Hardware parallelism, or 1 if it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Immutable configuration for one job.
#[derive(Clone, Debug)]
pub struct Config {
    pub total_records: u64,
    pub workers: usize,
    pub sources: WeightedPool,
    pub statuses: WeightedPool,
    /// Base seed; `None` draws a fresh one per job.
    pub seed: Option<u64>,
    pub top_k: usize,
}

impl Config {
    /// The default job: 5M records over all available cores.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            total_records: DEFAULT_TOTAL_RECORDS,
            workers: default_workers(),
            sources: WeightedPool::new("source", default_sources())?,
            statuses: WeightedPool::new("status", default_statuses())?,
            seed: None,
            top_k: DEFAULT_TOP_K,
        })
    }

    /// Loads a JSON config file and layers it over the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        file.apply(Self::new()?)
    }

    /// Fails fast on settings that would make the job meaningless, including
    /// pool values no generated line could ever be counted under.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        check_pool("source", &self.sources, is_extractable_source)?;
        check_pool("status", &self.statuses, is_extractable_status)
    }
}

/// On-disk form of [`Config`]. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    pub total_records: Option<u64>,
    pub workers: Option<usize>,
    pub sources: Option<Vec<WeightedEntry>>,
    pub statuses: Option<Vec<WeightedEntry>>,
    pub seed: Option<u64>,
    pub top_k: Option<usize>,
}

impl ConfigFile {
    pub fn apply(self, mut base: Config) -> Result<Config, ConfigError> {
        if let Some(total_records) = self.total_records {
            base.total_records = total_records;
        }
        if let Some(workers) = self.workers {
            base.workers = workers;
        }
        if let Some(sources) = self.sources {
            base.sources = WeightedPool::new("source", sources)?;
        }
        if let Some(statuses) = self.statuses {
            base.statuses = WeightedPool::new("status", statuses)?;
        }
        if self.seed.is_some() {
            base.seed = self.seed;
        }
        if let Some(top_k) = self.top_k {
            base.top_k = top_k;
        }
        Ok(base)
    }
}
