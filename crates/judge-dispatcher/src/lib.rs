//! Worker pool: a bounded set of workers draining a FIFO job queue,
//! invoking the Sandbox Driver, and persisting terminal results.
//!
//! Generalized from this workspace's `JoinSet`-driven concurrent task
//! runner (fixed-size fan-out over a task list) into a long-lived pool of
//! workers pulling continuously from a channel instead of a one-shot
//! batch.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use judge_catalog::Catalog;
use judge_core::JobStatus;
use judge_sandbox::SandboxDriver;
use judge_store::{JobStore, TerminalResult};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Accepts submitted job ids and fans them out to a bounded pool of
/// workers. Cloning shares the same queue and active-job set.
#[derive(Clone)]
pub struct Dispatcher {
    queue_tx: mpsc::UnboundedSender<String>,
    active_jobs: Arc<Mutex<HashSet<String>>>,
    worker_count: usize,
}

impl Dispatcher {
    /// Spawns `worker_count` workers, each looping on the shared queue
    /// until it closes. Workers never retry: any failure becomes a
    /// terminal status, per the worker loop's no-retry contract.
    pub fn spawn(
        worker_count: usize,
        store: JobStore,
        catalog: Arc<Catalog>,
        driver: Arc<dyn SandboxDriver>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel::<String>();
        let queue_rx = Arc::new(tokio::sync::Mutex::new(queue_rx));
        let active_jobs = Arc::new(Mutex::new(HashSet::new()));

        for worker_id in 0..worker_count {
            let queue_rx = queue_rx.clone();
            let store = store.clone();
            let catalog = catalog.clone();
            let driver = driver.clone();
            let active_jobs = active_jobs.clone();
            tokio::spawn(async move {
                worker_loop(worker_id as i64, queue_rx, store, catalog, driver, active_jobs).await;
            });
        }

        Self { queue_tx, active_jobs, worker_count }
    }

    /// Enqueues a job id for processing. The job must already exist in
    /// the store with status PENDING.
    pub fn enqueue(&self, job_id: String) {
        if self.queue_tx.send(job_id).is_err() {
            error!("dispatcher queue closed; no workers are running");
        }
    }

    /// Ids of jobs currently claimed by a worker, for health reporting.
    pub fn active_job_ids(&self) -> Vec<String> {
        self.active_jobs.lock().expect("active_jobs mutex poisoned").iter().cloned().collect()
    }

    pub fn active_job_count(&self) -> usize {
        self.active_jobs.lock().expect("active_jobs mutex poisoned").len()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

async fn worker_loop(
    worker_id: i64,
    queue_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>,
    store: JobStore,
    catalog: Arc<Catalog>,
    driver: Arc<dyn SandboxDriver>,
    active_jobs: Arc<Mutex<HashSet<String>>>,
) {
    loop {
        let job_id = {
            let mut rx = queue_rx.lock().await;
            match rx.recv().await {
                Some(id) => id,
                None => return,
            }
        };

        let job = match store.claim(&job_id, worker_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(job_id, worker = worker_id, error = %e, "failed to claim job, dropping");
                continue;
            }
        };

        active_jobs.lock().expect("active_jobs mutex poisoned").insert(job_id.clone());

        let spec = catalog.lookup(job.language);
        let (status, result) =
            match driver.run(&job.source_code, job.language, job.stdin.as_deref(), spec).await {
                Ok(outcome) => (
                    outcome.status,
                    TerminalResult {
                        stdout: Some(outcome.stdout),
                        stderr: Some(outcome.stderr),
                        compile_output: outcome.compile_output,
                        exit_code: outcome.exit_code,
                        execution_time_ms: Some(outcome.execution_time_ms),
                        memory_usage_kb: Some(outcome.memory_usage_kb),
                        error_message: outcome.error_message,
                    },
                ),
                Err(e) => (
                    JobStatus::Failed,
                    TerminalResult { error_message: e.as_job_message(), ..Default::default() },
                ),
            };

        debug_assert!(status.is_terminal());

        if let Err(e) = store.complete(&job_id, status, result).await {
            error!(job_id, worker = worker_id, error = %e, "failed to persist terminal result");
        } else {
            info!(job_id, worker = worker_id, %status, "job finished");
        }

        active_jobs.lock().expect("active_jobs mutex poisoned").remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judge_core::{JobStatus, JudgeError, Language};
    use judge_sandbox::FakeSandboxDriver;
    use std::time::Duration;

    async fn wait_terminal(store: &JobStore, job_id: &str) -> judge_store::Job {
        let mut job = store.get(job_id).await.unwrap();
        for _ in 0..50 {
            if job.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            job = store.get(job_id).await.unwrap();
        }
        job
    }

    fn completed_outcome() -> judge_sandbox::RunOutcome {
        judge_sandbox::RunOutcome {
            status: JobStatus::Completed,
            stdout: "Hello\n".to_string(),
            stderr: String::new(),
            compile_output: None,
            exit_code: Some(0),
            execution_time_ms: 5,
            memory_usage_kb: 1024,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn submitted_job_reaches_a_terminal_status() {
        let store = JobStore::open_in_memory().unwrap();
        store.insert("job-1", "print(1)", Language::Python3, None).await.unwrap();

        let catalog = Arc::new(Catalog::default());
        let driver: Arc<dyn SandboxDriver> = Arc::new(FakeSandboxDriver::outcome(completed_outcome()));
        let dispatcher = Dispatcher::spawn(1, store.clone(), catalog, driver);

        dispatcher.enqueue("job-1".to_string());

        let job = wait_terminal(&store, "job-1").await;
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert_eq!(job.stdout.as_deref(), Some("Hello\n"));
    }

    #[tokio::test]
    async fn unknown_job_id_does_not_crash_the_worker() {
        let store = JobStore::open_in_memory().unwrap();
        let catalog = Arc::new(Catalog::default());
        let driver: Arc<dyn SandboxDriver> = Arc::new(FakeSandboxDriver::outcome(completed_outcome()));
        let dispatcher = Dispatcher::spawn(1, store.clone(), catalog, driver);

        dispatcher.enqueue("does-not-exist".to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dispatcher.active_job_count(), 0);
    }

    #[tokio::test]
    async fn a_driver_error_becomes_a_failed_job_with_no_retry() {
        let store = JobStore::open_in_memory().unwrap();
        store.insert("job-2", "print(1)", Language::Python3, None).await.unwrap();

        let catalog = Arc::new(Catalog::default());
        let driver: Arc<dyn SandboxDriver> = Arc::new(FakeSandboxDriver::new(|_, _, _, _| {
            Err(JudgeError::RuntimeUnavailable("docker daemon unreachable".into()))
        }));
        let dispatcher = Dispatcher::spawn(1, store.clone(), catalog, driver);

        dispatcher.enqueue("job-2".to_string());

        let job = wait_terminal(&store, "job-2").await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("runtime unavailable: docker daemon unreachable"));

        // The worker does not requeue a failed job on its own.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let job = store.get("job-2").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn a_second_claim_on_an_already_processed_job_is_a_no_op() {
        let store = JobStore::open_in_memory().unwrap();
        store.insert("job-3", "print(1)", Language::Python3, None).await.unwrap();

        let catalog = Arc::new(Catalog::default());
        let driver: Arc<dyn SandboxDriver> = Arc::new(FakeSandboxDriver::outcome(completed_outcome()));
        let dispatcher = Dispatcher::spawn(1, store.clone(), catalog, driver);

        dispatcher.enqueue("job-3".to_string());
        wait_terminal(&store, "job-3").await;

        // Re-enqueueing an already-terminal job must not panic the worker;
        // the store's claim affects zero rows and the worker drops it.
        dispatcher.enqueue("job-3".to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let job = store.get("job-3").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }
}
