use anyhow::bail;
use logmr::config::{Config, ConfigError, WeightedPool};
use logmr::counts::PartialCounts;
use logmr::report::{self, Summary};
use logmr::standalone::engine::{perform_map, perform_reduce, run_job, JobError};
use logmr::standalone::Job;
use logmr::workload::{self, access_log};
use logmr::{plan, MapTask, Workload};

fn config(total: u64, workers: usize, sources: &[&str], statuses: &[&str], seed: u64) -> Config {
    Config {
        total_records: total,
        workers,
        sources: WeightedPool::from_values("source", sources.iter().copied()).unwrap(),
        statuses: WeightedPool::from_values("status", statuses.iter().copied()).unwrap(),
        seed: Some(seed),
        top_k: 3,
    }
}

fn access_log() -> Workload {
    workload::named("access-log").unwrap()
}

#[test]
fn single_source_weighted_statuses() {
    let engine = access_log();
    let mut ok_total = 0;
    let runs = 32;
    for seed in 0..runs {
        let cfg = config(100, 4, &["10.0.0.1"], &["200", "200", "500"], seed);
        let job = Job::new("access-log", cfg);
        let outcome = run_job(&job, &engine).unwrap();
        let counts = &outcome.counts;
        assert_eq!(counts.by_source["10.0.0.1"], 100);
        assert_eq!(counts.by_source.len(), 1);
        assert_eq!(counts.status("200") + counts.status("500"), 100);
        ok_total += counts.status("200");
    }
    // Expected mean is 66.7 with a standard error of about 0.83.
    let mean = ok_total as f64 / runs as f64;
    assert!((60.0..=73.0).contains(&mean), "mean 200 count {mean}");
}

#[test]
fn empty_dataset_reports_zero_error_rate() {
    let job = Job::new("access-log", config(0, 4, &["10.0.0.1"], &["500"], 1));
    let outcome = run_job(&job, &access_log()).unwrap();
    assert!(outcome.counts.by_source.is_empty());
    assert!(outcome.counts.by_status.is_empty());

    let summary = Summary::from_counts(&outcome.counts, 3);
    assert_eq!(summary.error_rate, 0.0);
    let text = report::render(&outcome, &summary);
    assert!(text.contains("Server Error Rate (500/Total): 0.00%"), "{text}");
}

#[test]
fn every_record_is_counted_once_with_uneven_shares() {
    let mut config = Config::new().unwrap();
    config.total_records = 10_003;
    config.workers = 4;
    config.seed = Some(5);
    let outcome = run_job(&Job::new("access-log", config), &access_log()).unwrap();

    assert_eq!(outcome.plan.shares(), [2501, 2501, 2501, 2500]);
    assert_eq!(outcome.counts.source_total(), 10_003);
    assert_eq!(outcome.counts.status_total(), 10_003);
}

#[test]
fn fixed_seed_is_reproducible() {
    let engine = access_log();
    let cfg = config(5_000, 3, &["10.0.0.1", "10.0.0.2", "10.0.0.3"], &["200", "404", "500"], 11);
    let first = run_job(&Job::new("access-log", cfg.clone()), &engine).unwrap();
    let second = run_job(&Job::new("access-log", cfg), &engine).unwrap();
    assert_eq!(first.seed, 11);
    assert_eq!(first.counts, second.counts);
}

#[test]
fn merge_order_does_not_matter() {
    let engine = access_log();
    let job = Job::new(
        "access-log",
        config(2_000, 4, &["10.0.0.1", "10.0.0.2"], &["200", "301", "500"], 3),
    );
    let plan = plan(job.config.total_records, job.config.workers).unwrap();
    let tasks = MapTask::from_plan(&plan, 3);
    let mut partials = perform_map(&job, &engine, &tasks).unwrap();
    assert_eq!(partials.len(), 4);

    let forward = perform_reduce(&engine, &partials);
    partials.reverse();
    let backward = perform_reduce(&engine, &partials);
    partials.rotate_left(1);
    let rotated = perform_reduce(&engine, &partials);

    assert_eq!(forward, backward);
    assert_eq!(forward, rotated);
    assert_eq!(forward.source_total(), 2_000);
}

fn fail_on_third(task: &MapTask, config: &Config) -> anyhow::Result<PartialCounts> {
    if task.worker == 2 {
        bail!("share {} could not be generated", task.worker);
    }
    access_log::map(task, config)
}

fn panic_on_first(task: &MapTask, config: &Config) -> anyhow::Result<PartialCounts> {
    if task.worker == 0 {
        panic!("worker blew up");
    }
    access_log::map(task, config)
}

#[test]
fn worker_error_fails_the_job() {
    let engine = Workload {
        map_fn: fail_on_third,
        reduce_fn: access_log::reduce,
    };
    let job = Job::new("failing", config(400, 4, &["10.0.0.1"], &["200"], 0));
    match run_job(&job, &engine) {
        Err(JobError::Worker { worker, cause }) => {
            assert_eq!(worker, 2);
            assert!(cause.to_string().contains("could not be generated"));
        }
        other => panic!("expected a worker failure, got {other:?}"),
    }
}

#[test]
fn worker_panic_fails_the_job() {
    let engine = Workload {
        map_fn: panic_on_first,
        reduce_fn: access_log::reduce,
    };
    let job = Job::new("panicking", config(400, 4, &["10.0.0.1"], &["200"], 0));
    match run_job(&job, &engine) {
        Err(JobError::WorkerPanicked { worker, message }) => {
            assert_eq!(worker, 0);
            assert_eq!(message, "worker blew up");
        }
        other => panic!("expected a worker panic, got {other:?}"),
    }
}

#[test]
fn zero_workers_fails_before_mapping() {
    let job = Job::new("access-log", config(10, 0, &["10.0.0.1"], &["200"], 0));
    assert!(matches!(
        run_job(&job, &access_log()),
        Err(JobError::Config(ConfigError::ZeroWorkers))
    ));
}

#[test]
fn unmatchable_source_pool_fails_before_mapping() {
    let job = Job::new("access-log", config(100, 4, &["A"], &["200", "200", "500"], 0));
    match run_job(&job, &access_log()) {
        Err(JobError::Config(ConfigError::UnmatchablePool { pool, value })) => {
            assert_eq!(pool, "source");
            assert_eq!(value, "A");
        }
        other => panic!("expected an unmatchable pool, got {other:?}"),
    }
}

#[test]
fn injected_malformed_record_is_skipped() {
    let sources = WeightedPool::from_values("source", ["10.0.0.1", "10.0.0.2"]).unwrap();
    let statuses = WeightedPool::from_values("status", ["200", "500"]).unwrap();
    let extractor = access_log::Extractor::new().unwrap();
    let mut generator = access_log::Generator::new(&sources, &statuses, 99);
    let mut tally = access_log::Tally::default();

    for _ in 0..50 {
        assert!(tally.observe(&extractor, generator.generate().as_str()));
    }
    assert!(!tally.observe(
        &extractor,
        "1700000000.000000 - INFO - 10.0.0.1 - REQUEST:GET /api/v1/data"
    ));
    for _ in 0..50 {
        assert!(tally.observe(&extractor, generator.generate().as_str()));
    }

    assert_eq!(tally.misses(), 1);
    let partial = tally.into_partial();
    assert_eq!(partial.source_total(), 100);
    assert_eq!(partial.status_total(), 100);
}
