use crate::status::ProcessingStatus;

/// One scheduled analysis of one contract.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub id: String,
    pub contract_id: i64,
    /// Original upload name, used for events and log lines.
    pub file_name: String,
    /// Storage key of the document.
    pub file_location: String,
}

impl AnalysisJob {
    pub fn new(contract_id: i64, file_name: &str, file_location: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            contract_id,
            file_name: file_name.to_string(),
            file_location: file_location.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub job_id: String,
    pub contract_id: i64,
    /// Status the run ended in (or found, when the run was skipped).
    pub status: ProcessingStatus,
    pub error: Option<String>,
    /// False when the contract's status was changed by someone else and the
    /// run's outcome was not written.
    pub applied: bool,
}

impl JobResult {
    pub fn completed(job: &AnalysisJob) -> Self {
        Self {
            job_id: job.id.clone(),
            contract_id: job.contract_id,
            status: ProcessingStatus::Completed,
            error: None,
            applied: true,
        }
    }

    pub fn failed(job: &AnalysisJob, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            contract_id: job.contract_id,
            status: ProcessingStatus::Failed,
            error: Some(error),
            applied: true,
        }
    }

    pub fn not_applied(mut self) -> Self {
        self.applied = false;
        self
    }

    pub fn is_success(&self) -> bool {
        self.applied && self.status == ProcessingStatus::Completed
    }
}
