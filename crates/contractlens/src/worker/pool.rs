use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};

use crate::error::WorkerError;
use crate::worker::job::{AnalysisJob, JobResult};
use crate::worker::runner::AnalysisRunner;

/// Contracts with a job queued or running.
type InFlight = Arc<Mutex<HashSet<i64>>>;

pub struct WorkerPool {
    job_sender: Sender<AnalysisJob>,
    result_receiver: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    in_flight: InFlight,
}

impl WorkerPool {
    /// Starts `worker_count` threads sharing a queue of `queue_capacity` jobs.
    pub fn new(
        runner: Arc<AnalysisRunner>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed("worker_count must be > 0".to_string()));
        }

        let capacity = queue_capacity.max(1);
        let (job_sender, job_receiver) = bounded::<AnalysisJob>(capacity);
        let (result_sender, result_receiver) = bounded::<JobResult>(capacity);
        let shutdown = Arc::new(AtomicBool::new(false));
        let in_flight: InFlight = Arc::new(Mutex::new(HashSet::new()));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let worker_runner = Arc::clone(&runner);
            let worker_in_flight = Arc::clone(&in_flight);

            let handle = thread::Builder::new()
                .name(format!("contractlens-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        job_rx,
                        result_tx,
                        worker_runner,
                        worker_in_flight,
                    );
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
            in_flight,
        })
    }

    /// Queues a job. Blocks while the queue is full.
    ///
    /// Fails with `AlreadyQueued` when the contract already has a job queued
    /// or running.
    pub fn submit(&self, job: AnalysisJob) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        let contract_id = job.contract_id;
        if !lock(&self.in_flight).insert(contract_id) {
            return Err(WorkerError::AlreadyQueued(contract_id));
        }

        self.job_sender.send(job).map_err(|_| {
            lock(&self.in_flight).remove(&contract_id);
            WorkerError::ChannelClosed
        })
    }

    pub fn is_in_flight(&self, contract_id: i64) -> bool {
        lock(&self.in_flight).contains(&contract_id)
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobResult> {
        self.result_receiver.recv().ok()
    }

    /// Stops accepting jobs. Jobs already queued still run.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Closes the queue and waits for the workers to drain it.
    pub fn wait(self) {
        let queued = self.job_sender.len();
        if queued > 0 {
            info!("Finishing {} queued jobs before exit", queued);
        }
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn lock(in_flight: &InFlight) -> std::sync::MutexGuard<'_, HashSet<i64>> {
    // The set holds plain ids; a poisoned guard is still consistent.
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<AnalysisJob>,
    result_sender: Sender<JobResult>,
    runner: Arc<AnalysisRunner>,
    in_flight: InFlight,
) {
    debug!("Worker {} started", worker_id);

    // Runs until every sender is gone and the queue is empty.
    loop {
        match job_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(job) => {
                debug!(
                    "Worker {} processing contract {}",
                    worker_id, job.contract_id
                );

                let result = runner.run(&job);
                lock(&in_flight).remove(&job.contract_id);

                match result_sender.try_send(result) {
                    Ok(()) => {}
                    Err(TrySendError::Full(result)) => {
                        warn!(
                            "Result queue full, dropping result for contract {}",
                            result.contract_id
                        );
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        error!("Worker {} result channel disconnected", worker_id);
                        break;
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisOrchestrator;
    use crate::config::GenerationConfig;
    use crate::db::{contract_repo, project_repo, Database};
    use crate::events::ContractEventBroadcaster;
    use crate::llm::{GenerationError, GenerationOptions, TextGenerator};
    use crate::status::ProcessingStatus;
    use crate::storage::{local::LocalStore, DocumentStore};
    use tempfile::TempDir;

    struct FixedGenerator;

    impl TextGenerator for FixedGenerator {
        fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, GenerationError> {
            Ok(r#"{"contract_type": "Lease"}"#.to_string())
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    fn setup(temp_dir: &TempDir) -> (Database, Arc<dyn DocumentStore>, Arc<AnalysisRunner>) {
        let db = Database::open_in_memory().unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(LocalStore::new(temp_dir.path()));
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(FixedGenerator), &GenerationConfig::default());
        let runner = Arc::new(AnalysisRunner::new(
            db.clone(),
            Arc::clone(&store),
            orchestrator,
            ContractEventBroadcaster::default(),
        ));
        (db, store, runner)
    }

    fn seed_contract(db: &Database, store: &dyn DocumentStore, content: &str) -> AnalysisJob {
        let project = project_repo::insert(db, "Tower", None, None).unwrap();
        let key = store.store(project.id, "lease.txt", content.as_bytes()).unwrap();
        let id = contract_repo::insert(
            db,
            &contract_repo::NewContract {
                project_id: project.id,
                file_name: "lease.txt",
                file_location: &key,
                file_size: Some(content.len() as i64),
            },
        )
        .unwrap();
        AnalysisJob::new(id, "lease.txt", &key)
    }

    #[test]
    fn test_worker_pool_creation() {
        let temp_dir = TempDir::new().unwrap();
        let (_db, _store, runner) = setup(&temp_dir);
        let pool = WorkerPool::new(runner, 2, 4).unwrap();

        assert!(!pool.is_shutdown());

        pool.shutdown();
        assert!(pool.is_shutdown());

        pool.wait();
    }

    #[test]
    fn test_zero_workers_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (_db, _store, runner) = setup(&temp_dir);
        assert!(matches!(
            WorkerPool::new(runner, 0, 4),
            Err(WorkerError::SpawnFailed(_))
        ));
    }

    #[test]
    fn test_submit_and_process_text_job() {
        let temp_dir = TempDir::new().unwrap();
        let (db, store, runner) = setup(&temp_dir);
        let pool = WorkerPool::new(runner, 2, 4).unwrap();

        let text = "This lease agreement binds both parties. ".repeat(5);
        let job = seed_contract(&db, store.as_ref(), &text);
        let contract_id = job.contract_id;
        pool.submit(job).unwrap();

        let result = pool.recv_result().unwrap();
        assert!(result.is_success(), "Job failed: {:?}", result.error);
        assert!(!pool.is_in_flight(contract_id));

        let row = contract_repo::find_by_id(&db, contract_id).unwrap().unwrap();
        assert_eq!(row.processing_status, ProcessingStatus::Completed);
        assert!(row.processed_at.is_some());

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_duplicate_submission_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (db, store, runner) = setup(&temp_dir);
        let pool = WorkerPool::new(runner, 1, 4).unwrap();
        lock(&pool.in_flight).insert(99);

        let job = seed_contract(&db, store.as_ref(), "short");
        let duplicate = AnalysisJob {
            contract_id: 99,
            ..job
        };
        assert!(matches!(
            pool.submit(duplicate),
            Err(WorkerError::AlreadyQueued(99))
        ));

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_queued_jobs_run_before_workers_exit() {
        let temp_dir = TempDir::new().unwrap();
        let (db, store, runner) = setup(&temp_dir);
        let pool = WorkerPool::new(runner, 1, 8).unwrap();

        let text = "This lease agreement binds both parties. ".repeat(5);
        let ids: Vec<i64> = (0..4)
            .map(|_| {
                let job = seed_contract(&db, store.as_ref(), &text);
                let id = job.contract_id;
                pool.submit(job).unwrap();
                id
            })
            .collect();

        pool.shutdown();
        pool.wait();

        for id in ids {
            let row = contract_repo::find_by_id(&db, id).unwrap().unwrap();
            assert_eq!(row.processing_status, ProcessingStatus::Completed, "contract {}", id);
        }
    }

    #[test]
    fn test_submit_after_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let (db, store, runner) = setup(&temp_dir);
        let pool = WorkerPool::new(runner, 1, 4).unwrap();
        pool.shutdown();

        let job = seed_contract(&db, store.as_ref(), "text");
        assert!(matches!(pool.submit(job), Err(WorkerError::ChannelClosed)));
        pool.wait();
    }
}
