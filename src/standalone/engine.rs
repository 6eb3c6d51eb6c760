use crate::config::{Config, ConfigError};
use crate::counts::{AggregateCounts, PartialCounts};
use crate::partition::{self, SharePlan};
use crate::{MapFn, MapTask, Workload};
use log::{debug, error, info};
use rayon::prelude::*;
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::Job;

/// Failures that abort a whole job. No aggregate is produced when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start a pool of {workers} workers: {source}")]
    Pool {
        workers: usize,
        #[source]
        source: ThreadPoolBuildError,
    },

    #[error("worker {worker} failed: {cause:#}")]
    Worker { worker: usize, cause: anyhow::Error },

    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },
}

/// A completed job: the aggregate plus what it took to get there.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub id: String,
    pub plan: SharePlan,
    /// Base seed the workers were derived from; rerun with it to reproduce.
    pub seed: u64,
    pub counts: AggregateCounts,
    pub map_elapsed: Duration,
    pub reduce_elapsed: Duration,
    pub total_elapsed: Duration,
}

/// Runs every map task on a dedicated pool of `job.config.workers` threads
/// and waits for all of them.
///
/// Results come back in task order. If any worker returns an error or
/// panics, the job fails; the pool is torn down either way.
pub fn perform_map(
    job: &Job,
    engine: &Workload,
    tasks: &[MapTask],
) -> Result<Vec<PartialCounts>, JobError> {
    let workers = job.config.workers;
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("logmr-worker-{i}"))
        .build()
        .map_err(|source| JobError::Pool { workers, source })?;

    let map_fn = engine.map_fn;
    let config = &job.config;
    pool.install(|| {
        tasks
            .par_iter()
            .map(|task| run_task(map_fn, task, config))
            .collect::<Result<Vec<_>, _>>()
    })
}

fn run_task(map_fn: MapFn, task: &MapTask, config: &Config) -> Result<PartialCounts, JobError> {
    let started = Instant::now();
    match panic::catch_unwind(AssertUnwindSafe(|| map_fn(task, config))) {
        Ok(Ok(partial)) => {
            debug!(
                "worker {} finished {} records in {:?}",
                task.worker,
                task.records,
                started.elapsed()
            );
            Ok(partial)
        }
        Ok(Err(cause)) => Err(JobError::Worker {
            worker: task.worker,
            cause,
        }),
        Err(payload) => Err(JobError::WorkerPanicked {
            worker: task.worker,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Folds the partial results into one aggregate, sequentially, starting
/// from empty tables.
pub fn perform_reduce(engine: &Workload, partials: &[PartialCounts]) -> AggregateCounts {
    partials
        .iter()
        .fold(AggregateCounts::default(), engine.reduce_fn)
}

/// Plans, maps and reduces one job.
pub fn run_job(job: &Job, engine: &Workload) -> Result<JobOutcome, JobError> {
    let started = Instant::now();
    job.config.validate()?;

    let plan = partition::plan(job.config.total_records, job.config.workers)?;
    let seed = job.config.seed.unwrap_or_else(rand::random);
    info!(
        "[{}] {} records over {} workers, seed {}",
        job.id,
        plan.total(),
        plan.workers(),
        seed
    );
    let tasks = MapTask::from_plan(&plan, seed);

    info!("[{}] starting map phase", job.id);
    let map_started = Instant::now();
    let partials = perform_map(job, engine, &tasks).map_err(|err| {
        error!("[{}] map phase aborted: {}", job.id, err);
        err
    })?;
    let map_elapsed = map_started.elapsed();
    info!("[{}] map phase finished in {:?}", job.id, map_elapsed);

    info!("[{}] starting reduce phase", job.id);
    let reduce_started = Instant::now();
    let counts = perform_reduce(engine, &partials);
    let reduce_elapsed = reduce_started.elapsed();
    info!("[{}] reduce phase finished in {:?}", job.id, reduce_elapsed);
    debug_assert_eq!(counts.source_total(), counts.status_total());

    Ok(JobOutcome {
        id: job.id.clone(),
        plan,
        seed,
        counts,
        map_elapsed,
        reduce_elapsed,
        total_elapsed: started.elapsed(),
    })
}
