use crate::config::{Config, ConfigError};
use crate::workload::DEFAULT_WORKLOAD;
use clap::Parser;
use std::path::PathBuf;
use uuid::Uuid;

pub mod engine;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Total number of log records to generate (default 5,000,000)
    #[arg(short = 'n', long, env = "LOGMR_RECORDS")]
    pub records: Option<u64>,

    /// Number of parallel workers (default: available parallelism)
    #[arg(short, long, env = "LOGMR_WORKERS")]
    pub workers: Option<usize>,

    /// Base seed for the workers' random sources. Random when unset.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// How many top request sources to report
    #[arg(short = 'k', long)]
    pub top: Option<usize>,

    /// JSON config file; command-line flags take precedence over it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the summary and aggregate counts as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Resolves defaults, the config file and flags into a validated job.
    pub fn into_job(self) -> Result<Job, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::new()?,
        };
        if let Some(records) = self.records {
            config.total_records = records;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(top) = self.top {
            config.top_k = top;
        }
        config.validate()?;
        Ok(Job::new(DEFAULT_WORKLOAD, config))
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub workload: String,
    pub config: Config,
}

impl Job {
    pub fn new(workload: impl Into<String>, config: Config) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workload: workload.into(),
            config,
        }
    }
}
