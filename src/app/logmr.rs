use anyhow::{Context, Result};
use clap::Parser;
use logmr::report::{self, JsonReport, Summary};
use logmr::standalone::{engine::run_job, Args, Job};
use logmr::workload::{self, DEFAULT_WORKLOAD};

/// Returns the job and whether JSON output was requested.
fn parse_args() -> Result<(Job, bool)> {
    let args = Args::parse();
    let json = args.json;
    let job = args.into_job().context("invalid configuration")?;
    Ok((job, json))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (job, json) = parse_args()?;
    let engine = workload::named(DEFAULT_WORKLOAD)?;

    let outcome = run_job(&job, &engine).context("log analysis job failed")?;
    let summary = Summary::from_counts(&outcome.counts, job.config.top_k);

    if json {
        let report = JsonReport::new(&outcome, &summary);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::render(&outcome, &summary));
    }
    Ok(())
}
