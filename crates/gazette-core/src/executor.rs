//! Bounded-parallelism batch execution of external jobs.
//!
//! OCR, tiling, and PDF jobs are independent external processes run across
//! many files. The executor drains its queue in fixed-width cohorts: up to
//! `n` jobs start together, and the next cohort is not admitted until every
//! process in the current one has exited. This cohort barrier is part of
//! the contract — it bounds peak load differently than a continuously
//! topped-up pool and callers size `n` around it.
//!
//! Batches are best-effort: a job exiting non-zero never aborts the queue.
//! Every job's outcome is collected in the summary so strict callers can
//! inspect failures afterwards.

use crate::error::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// One external job: a program and its arguments, never a shell string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobSpec {
    /// Human-readable label for logs and outcomes.
    pub label: String,
    /// Program to execute.
    pub program: String,
    /// Arguments passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory, if different from the caller's.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

impl JobSpec {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Terminal state of one job.
#[derive(Debug, Clone, Serialize)]
pub enum JobStatus {
    /// Process ran to completion with this exit code (-1 if killed by a
    /// signal).
    Completed(i32),
    /// Process could not be spawned at all.
    SpawnFailed(String),
}

/// Per-job result, collected into the batch summary.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub label: String,
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn success(&self) -> bool {
        matches!(self.status, JobStatus::Completed(0))
    }
}

/// Aggregate result of one `run_all` drain.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    /// Per-job outcomes in completion-batch order.
    pub outcomes: Vec<JobOutcome>,
    /// Number of cohorts issued.
    pub cohorts: usize,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// FIFO queue of jobs drained in fixed-width concurrent cohorts.
#[derive(Debug, Default)]
pub struct BatchExecutor {
    queue: VecDeque<JobSpec>,
    concurrency: Option<usize>,
}

impl BatchExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job to the back of the queue.
    pub fn enqueue(&mut self, job: JobSpec) {
        self.queue.push_back(job);
    }

    /// Jobs currently queued.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Override the cohort width. Clamped to at least 1.
    pub fn set_concurrency(&mut self, n: usize) {
        self.concurrency = Some(n.max(1));
    }

    /// Cohort width: the override if set, otherwise 80% of the logical
    /// cores, leaving headroom for the rest of the host, minimum 1.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            (cores * 4 / 5).max(1)
        })
    }

    /// Drain the queue to completion.
    ///
    /// Blocks until every enqueued job has finished, success or failure.
    /// Progress (`processed`/`remaining`) is logged after each cohort.
    pub async fn run_all(&mut self, label: &str) -> Result<BatchSummary> {
        let width = self.effective_concurrency();
        let total = self.queue.len();
        info!("Batch '{}': {} job(s), cohort width {}", label, total, width);

        let mut summary = BatchSummary::default();
        while !self.queue.is_empty() {
            let take = width.min(self.queue.len());
            let cohort: Vec<JobSpec> = self.queue.drain(..take).collect();
            summary.cohorts += 1;

            let running = cohort.into_iter().map(run_job);
            let outcomes = join_all(running).await;
            for outcome in &outcomes {
                if !outcome.success() {
                    warn!("Job '{}' failed: {:?}", outcome.label, outcome.status);
                }
            }
            summary.outcomes.extend(outcomes);

            info!(
                "Batch '{}': processed {} of {}, {} remaining",
                label,
                summary.outcomes.len(),
                total,
                self.queue.len()
            );
        }

        info!(
            "Batch '{}' complete: {} succeeded, {} failed, {} cohort(s)",
            label,
            summary.succeeded(),
            summary.failed(),
            summary.cohorts
        );
        Ok(summary)
    }
}

/// Spawn one job and wait for it to exit.
async fn run_job(spec: JobSpec) -> JobOutcome {
    debug!("Starting job '{}': {} {:?}", spec.label, spec.program, spec.args);

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(ref cwd) = spec.cwd {
        command.current_dir(cwd);
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let status = match command.status().await {
        Ok(status) => JobStatus::Completed(status.code().unwrap_or(-1)),
        Err(e) => JobStatus::SpawnFailed(format!("{}: {}", spec.program, e)),
    };

    JobOutcome {
        label: spec.label,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_job(label: &str, script: &str) -> JobSpec {
        JobSpec::new(label, "/bin/sh").arg("-c").arg(script)
    }

    #[test]
    fn test_concurrency_clamped_to_one() {
        let mut executor = BatchExecutor::new();
        executor.set_concurrency(0);
        assert_eq!(executor.effective_concurrency(), 1);
    }

    #[test]
    fn test_default_concurrency_at_least_one() {
        let executor = BatchExecutor::new();
        assert!(executor.effective_concurrency() >= 1);
    }

    #[tokio::test]
    async fn test_cohort_count_is_ceil() {
        let mut executor = BatchExecutor::new();
        executor.set_concurrency(2);
        for i in 0..5 {
            executor.enqueue(shell_job(&format!("job-{}", i), "exit 0"));
        }

        let summary = executor.run_all("cohorts").await.unwrap();
        assert_eq!(summary.outcomes.len(), 5);
        assert_eq!(summary.cohorts, 3); // ceil(5 / 2)
        assert_eq!(summary.succeeded(), 5);
        assert_eq!(executor.queued(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let mut executor = BatchExecutor::new();
        executor.set_concurrency(1);
        executor.enqueue(shell_job("ok-1", "exit 0"));
        executor.enqueue(shell_job("bad", "exit 3"));
        executor.enqueue(shell_job("ok-2", "exit 0"));

        let summary = executor.run_all("best-effort").await.unwrap();
        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(matches!(
            summary.outcomes[1].status,
            JobStatus::Completed(3)
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_outcome() {
        let mut executor = BatchExecutor::new();
        executor.enqueue(JobSpec::new("ghost", "/nonexistent/binary"));

        let summary = executor.run_all("spawn").await.unwrap();
        assert_eq!(summary.failed(), 1);
        assert!(matches!(
            summary.outcomes[0].status,
            JobStatus::SpawnFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_cohort_barrier_orders_execution() {
        // With width 1 the second job must not start until the first has
        // fully completed, so the marker file is always present.
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("first-done");
        let probe = dir.path().join("probe");

        let mut executor = BatchExecutor::new();
        executor.set_concurrency(1);
        executor.enqueue(shell_job(
            "first",
            &format!("sleep 0.2 && touch {}", marker.display()),
        ));
        executor.enqueue(shell_job(
            "second",
            &format!(
                "test -f {} && echo yes > {} || echo no > {}",
                marker.display(),
                probe.display(),
                probe.display()
            ),
        ));

        let summary = executor.run_all("barrier").await.unwrap();
        assert_eq!(summary.cohorts, 2);
        assert_eq!(std::fs::read_to_string(&probe).unwrap().trim(), "yes");
    }
}
