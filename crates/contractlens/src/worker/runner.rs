use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::analysis::{AnalysisOrchestrator, AnalysisOutcome, ContractData};
use crate::db::contract_repo::{self, ProcessedAt};
use crate::db::Database;
use crate::error::ContractLensError;
use crate::events::{ContractEventBroadcaster, ContractPhase, ContractProgressTracker};
use crate::extractor::{ensure_analyzable, ExtractorRegistry};
use crate::sanitize;
use crate::status::{ProcessingStatus, Transition};
use crate::storage::DocumentStore;
use crate::worker::job::{AnalysisJob, JobResult};

/// Executes one analysis job end to end and records its terminal status.
///
/// Never propagates a failure: errors and panics inside the run become a
/// `failed` contract carrying `{"error": message}`.
pub struct AnalysisRunner {
    db: Database,
    store: Arc<dyn DocumentStore>,
    registry: ExtractorRegistry,
    orchestrator: AnalysisOrchestrator,
    events: ContractEventBroadcaster,
}

impl AnalysisRunner {
    pub fn new(
        db: Database,
        store: Arc<dyn DocumentStore>,
        orchestrator: AnalysisOrchestrator,
        events: ContractEventBroadcaster,
    ) -> Self {
        Self {
            db,
            store,
            registry: ExtractorRegistry::new(),
            orchestrator,
            events,
        }
    }

    pub fn run(&self, job: &AnalysisJob) -> JobResult {
        let _span = tracing::info_span!(
            "contract.analyze",
            contract_id = job.contract_id,
            file = %sanitize::redact_path(Path::new(&job.file_name)),
        )
        .entered();

        // Handle scoped to this job; released when the run returns.
        let db = self.db.clone();
        let tracker = self.events.track(job.contract_id, &job.file_name);

        match self.write_transition(&db, job, Transition::Start, ProcessingStatus::Pending, None) {
            Ok(true) => {}
            Ok(false) => {
                log::warn!(
                    "Contract {} is no longer pending, skipping analysis",
                    job.contract_id
                );
                let current = contract_repo::find_by_id(&db, job.contract_id)
                    .ok()
                    .flatten()
                    .map(|c| c.processing_status)
                    .unwrap_or(ProcessingStatus::Pending);
                return JobResult {
                    status: current,
                    ..JobResult::completed(job)
                }
                .not_applied();
            }
            Err(e) => {
                log::error!("Failed to mark contract {} processing: {}", job.contract_id, e);
                tracker.failed(&e.to_string());
                return JobResult::failed(job, e.to_string()).not_applied();
            }
        }
        tracker.update_phase(ContractPhase::Processing, "Analysis started");

        let outcome = catch_unwind(AssertUnwindSafe(|| self.analyze(job, &tracker)));

        let (result, data) = match outcome {
            Ok(Ok(outcome)) => (JobResult::completed(job), ContractData::completed(outcome)),
            Ok(Err(e)) => {
                let message = e.to_string();
                log::error!("Analysis of contract {} failed: {}", job.contract_id, message);
                (JobResult::failed(job, message.clone()), ContractData::failed(message))
            }
            Err(panic) => {
                let message = format!("Analysis panicked: {}", panic_message(panic.as_ref()));
                log::error!("Contract {}: {}", job.contract_id, message);
                (JobResult::failed(job, message.clone()), ContractData::failed(message))
            }
        };

        let (result, payload) = stored_payload(job, result, data.to_value());

        let transition = match result.status {
            ProcessingStatus::Completed => Transition::Complete,
            _ => Transition::Fail,
        };

        match self.write_transition(
            &db,
            job,
            transition,
            ProcessingStatus::Processing,
            Some(&payload),
        ) {
            Ok(true) => {
                match &result.error {
                    None => tracker.completed(),
                    Some(error) => tracker.failed(error),
                }
                result
            }
            Ok(false) => {
                log::warn!(
                    "Contract {} status changed during analysis, dropping result",
                    job.contract_id
                );
                result.not_applied()
            }
            Err(e) => {
                log::error!(
                    "Failed to record result for contract {}: {}",
                    job.contract_id,
                    e
                );
                tracker.failed(&e.to_string());
                result.not_applied()
            }
        }
    }

    fn analyze(
        &self,
        job: &AnalysisJob,
        tracker: &ContractProgressTracker,
    ) -> Result<AnalysisOutcome, ContractLensError> {
        tracker.update_phase(ContractPhase::Extracting, "Extracting text");
        let document = self.store.fetch(&job.file_location)?;
        let extracted = self.registry.extract(document.path())?;
        drop(document);

        log::info!(
            "Extracted {} characters from {} ({})",
            extracted.char_count(),
            sanitize::redact_path(Path::new(&job.file_name)),
            extracted.format
        );
        if !extracted.skipped_pages.is_empty() {
            log::warn!("Skipped unreadable pages: {:?}", extracted.skipped_pages);
        }

        ensure_analyzable(&extracted.text)?;

        tracker.update_phase(ContractPhase::Analyzing, "Running analysis stages");
        Ok(self.orchestrator.run(&extracted.text)?)
    }

    /// Applies a lifecycle transition only if the contract is still in `from`.
    fn write_transition(
        &self,
        db: &Database,
        job: &AnalysisJob,
        transition: Transition,
        from: ProcessingStatus,
        contract_data: Option<&Value>,
    ) -> Result<bool, ContractLensError> {
        let to = transition.apply(from)?;
        let now = chrono::Utc::now().to_rfc3339();
        let processed_at = if transition.stamps_processed_at() {
            ProcessedAt::Stamp(&now)
        } else if transition.clears_processed_at() {
            ProcessedAt::Clear
        } else {
            ProcessedAt::Keep
        };

        Ok(contract_repo::transition(
            db,
            job.contract_id,
            from,
            to,
            contract_data,
            processed_at,
        )?)
    }
}

/// Pairs the job result with the JSON to store; data that cannot be
/// serialized fails the run.
fn stored_payload(
    job: &AnalysisJob,
    result: JobResult,
    serialized: Result<Value, serde_json::Error>,
) -> (JobResult, Value) {
    match serialized {
        Ok(value) => (result, value),
        Err(e) => {
            let message = format!("Failed to serialize analysis result: {}", e);
            log::error!("Contract {}: {}", job.contract_id, message);
            let payload = json!({ "error": message });
            (JobResult::failed(job, message), payload)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
