//! Turns an aggregate into the human-readable (or JSON) job report.

use crate::counts::AggregateCounts;
use crate::standalone::engine::JobOutcome;
use crate::utils::{group_thousands, percent};
use itertools::Itertools;
use serde::Serialize;
use std::fmt;

/// Status token counted as a successful request.
pub const STATUS_OK: &str = "200";
/// Status token counted as a server error.
pub const STATUS_SERVER_ERROR: &str = "500";

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub requests: u64,
}

/// Health figures derived from an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Busiest sources, most requests first. Ties keep the aggregate's
    /// iteration order, which is ascending by address.
    pub top_sources: Vec<SourceCount>,
    /// Records that parsed.
    pub total: u64,
    pub ok: u64,
    pub server_errors: u64,
    /// `server_errors / total * 100`, or 0 for an empty aggregate.
    pub error_rate: f64,
}

impl Summary {
    pub fn from_counts(counts: &AggregateCounts, top_k: usize) -> Self {
        let top_sources = counts
            .by_source
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1))
            .take(top_k)
            .map(|(source, &requests)| SourceCount {
                source: source.clone(),
                requests,
            })
            .collect();
        let total = counts.status_total();
        let server_errors = counts.status(STATUS_SERVER_ERROR);
        Self {
            top_sources,
            total,
            ok: counts.status(STATUS_OK),
            server_errors,
            error_rate: percent(server_errors, total),
        }
    }
}

/// Machine-readable report: the summary plus the full aggregate tables.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    pub job: &'a str,
    pub records: u64,
    pub workers: usize,
    pub seed: u64,
    pub summary: &'a Summary,
    pub counts: &'a AggregateCounts,
}

impl<'a> JsonReport<'a> {
    pub fn new(outcome: &'a JobOutcome, summary: &'a Summary) -> Self {
        Self {
            job: &outcome.id,
            records: outcome.plan.total(),
            workers: outcome.plan.workers(),
            seed: outcome.seed,
            summary,
            counts: &outcome.counts,
        }
    }
}

/// Renders the console report.
pub fn render(outcome: &JobOutcome, summary: &Summary) -> String {
    Report { outcome, summary }.to_string()
}

/// The console report for one job.
pub struct Report<'a> {
    pub outcome: &'a JobOutcome,
    pub summary: &'a Summary,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Report { outcome, summary } = self;
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(out, "--- LOG ANALYSIS ENGINE ---")?;
        writeln!(out, "Dataset Size: {} records", group_thousands(outcome.plan.total()))?;
        writeln!(out, "Active Workers: {}", outcome.plan.workers())?;
        writeln!(
            out,
            "[Main] Mapping finished in {:.4}s",
            outcome.map_elapsed.as_secs_f64()
        )?;
        writeln!(
            out,
            "[Main] Reduction finished in {:.4}s",
            outcome.reduce_elapsed.as_secs_f64()
        )?;
        writeln!(out)?;
        writeln!(out, "{rule}")?;
        writeln!(
            out,
            "ANALYSIS COMPLETE in {:.4} seconds (Total Time)",
            outcome.total_elapsed.as_secs_f64()
        )?;
        writeln!(out, "{rule}")?;

        writeln!(
            out,
            "TOP {} SUSPICIOUS IPs (Highest Request Count):",
            summary.top_sources.len()
        )?;
        for (rank, entry) in summary.top_sources.iter().enumerate() {
            writeln!(
                out,
                "  {}. {} : {} requests",
                rank + 1,
                entry.source,
                group_thousands(entry.requests)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "SYSTEM HEALTH REPORT:")?;
        writeln!(out, "  Total Requests Processed: {}", group_thousands(summary.total))?;
        writeln!(
            out,
            "  Successful ({STATUS_OK}) Requests: {} ({:.2}%)",
            group_thousands(summary.ok),
            percent(summary.ok, summary.total)
        )?;
        writeln!(
            out,
            "  Server Errors ({STATUS_SERVER_ERROR}): {} ({:.2}%)",
            group_thousands(summary.server_errors),
            percent(summary.server_errors, summary.total)
        )?;
        writeln!(
            out,
            "  Server Error Rate ({STATUS_SERVER_ERROR}/Total): {:.2}%",
            summary.error_rate
        )?;
        writeln!(out, "{rule}")?;
        Ok(())
    }
}
