//! Contract operations exposed to hosts (CLI, HTTP layers).
//!
//! `ContractService` owns the worker pool; dropping it without calling
//! [`ContractService::shutdown`] leaves queued jobs to finish detached.
//! Contracts left `pending` by an earlier process are queued again when the
//! service starts.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::analysis::{AnalysisError, AnalysisOrchestrator, QuestionAnswerer};
use crate::config::Config;
use crate::db::contract_repo::{self, ContractRow, NewContract, ProcessedAt};
use crate::db::project_repo::{self, ProjectChanges, ProjectRow};
use crate::db::{Database, DatabaseError};
use crate::error::{ConfigError, ContractLensError, StorageError, WorkerError};
use crate::events::{ContractEvent, ContractEventBroadcaster, ContractPhase};
use crate::extractor::is_supported_file_name;
use crate::llm::{OllamaClient, TextGenerator};
use crate::status::{InvalidTransition, ProcessingStatus, Transition};
use crate::storage::{self, DocumentStore};
use crate::worker::{AnalysisJob, AnalysisRunner, JobResult, WorkerPool};

/// Longest accepted question, in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Project {0} not found")]
    ProjectNotFound(i64),

    #[error("Contract {0} not found")]
    ContractNotFound(i64),

    #[error("Unsupported file type '{0}'. Allowed: pdf, docx, doc, txt")]
    UnsupportedFileType(String),

    #[error("File too large ({size} bytes, limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Contract {contract_id} is {status}: {reason}")]
    InvalidStatus {
        contract_id: i64,
        status: ProcessingStatus,
        reason: &'static str,
    },

    #[error("Source document for contract {0} is missing")]
    SourceMissing(i64),

    #[error("Contract {0} changed status concurrently, try again")]
    Conflict(i64),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Status view of one contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractResult {
    pub contract_id: i64,
    pub status: ProcessingStatus,
    pub contract_data: Value,
    pub processed_at: Option<String>,
}

/// List entry for a project's contracts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractSummary {
    pub id: i64,
    pub file_name: String,
    pub file_type: String,
    pub file_size: Option<i64>,
    pub processing_status: ProcessingStatus,
    pub processed_at: Option<String>,
    pub created_at: String,
}

impl From<&ContractRow> for ContractSummary {
    fn from(row: &ContractRow) -> Self {
        Self {
            id: row.id,
            file_name: row.file_name.clone(),
            file_type: file_type(&row.file_name),
            file_size: row.file_size,
            processing_status: row.processing_status,
            processed_at: row.processed_at.clone(),
            created_at: row.created_at.clone(),
        }
    }
}

/// A project with its contracts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: ProjectRow,
    pub contract_count: usize,
    pub contracts: Vec<ContractSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAnswer {
    pub contract_id: i64,
    pub question: String,
    pub answer: String,
    pub confidence: Option<f64>,
    pub sources: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

fn file_type(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

pub struct ContractService {
    db: Database,
    store: Arc<dyn DocumentStore>,
    pool: WorkerPool,
    answerer: QuestionAnswerer,
    events: ContractEventBroadcaster,
    max_upload_bytes: u64,
}

impl ContractService {
    /// Wires the service from already-built collaborators and starts workers.
    pub fn new(
        config: &Config,
        db: Database,
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, ServiceError> {
        let events = ContractEventBroadcaster::default();
        let orchestrator = AnalysisOrchestrator::new(Arc::clone(&generator), &config.generation);
        let runner = Arc::new(AnalysisRunner::new(
            db.clone(),
            Arc::clone(&store),
            orchestrator,
            events.clone(),
        ));
        let pool = WorkerPool::new(runner, config.worker_count, config.queue_capacity)?;

        let service = Self {
            db,
            store,
            pool,
            answerer: QuestionAnswerer::new(generator),
            events,
            max_upload_bytes: config.max_upload_bytes,
        };
        service.resume_pending()?;
        Ok(service)
    }

    /// Queues every `pending` contract that has no job yet; returns how many.
    pub fn resume_pending(&self) -> Result<usize, ServiceError> {
        let mut resumed = 0;
        for contract in contract_repo::list_by_status(&self.db, ProcessingStatus::Pending)? {
            if self.pool.is_in_flight(contract.id) {
                continue;
            }
            self.enqueue(&contract)?;
            resumed += 1;
        }
        if resumed > 0 {
            info!("Resumed {} pending contracts", resumed);
        }
        Ok(resumed)
    }

    /// Opens the database, store and generation client named by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ContractLensError> {
        let db_path = config.database_file().ok_or_else(|| ConfigError::Validation {
            message: "Could not determine database path; set database_path".to_string(),
        })?;
        let db = Database::open(&db_path)?;
        let store = storage::from_config(config)?;
        let generator: Arc<dyn TextGenerator> = Arc::new(OllamaClient::new(&config.generation)?);

        info!(
            "Using model {} with {} workers",
            generator.model(),
            config.worker_count
        );

        Ok(Self::new(config, db, store, generator)?)
    }

    pub fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        job_number: Option<&str>,
    ) -> Result<ProjectRow, ServiceError> {
        let project = project_repo::insert(&self.db, name, description, job_number)?;
        info!("Created project {} ({})", project.id, project.name);
        Ok(project)
    }

    pub fn get_project(&self, project_id: i64) -> Result<ProjectRow, ServiceError> {
        project_repo::find_by_id(&self.db, project_id)?
            .ok_or(ServiceError::ProjectNotFound(project_id))
    }

    /// The project with a summary of each of its contracts.
    pub fn get_project_detail(&self, project_id: i64) -> Result<ProjectDetail, ServiceError> {
        let project = self.get_project(project_id)?;
        let contracts: Vec<ContractSummary> = contract_repo::list_by_project(&self.db, project_id)?
            .iter()
            .map(ContractSummary::from)
            .collect();

        Ok(ProjectDetail {
            project,
            contract_count: contracts.len(),
            contracts,
        })
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectRow>, ServiceError> {
        Ok(project_repo::list(&self.db)?)
    }

    /// Changes the fields given in `changes`; others keep their value.
    pub fn update_project(
        &self,
        project_id: i64,
        changes: &ProjectChanges<'_>,
    ) -> Result<ProjectRow, ServiceError> {
        let project = project_repo::update(&self.db, project_id, changes)?
            .ok_or(ServiceError::ProjectNotFound(project_id))?;
        info!("Updated project {}", project_id);
        Ok(project)
    }

    /// Deletes a project with its contracts and their stored documents.
    pub fn delete_project(&self, project_id: i64) -> Result<(), ServiceError> {
        self.get_project(project_id)?;

        let contracts = contract_repo::list_by_project(&self.db, project_id)?;
        for contract in &contracts {
            self.remove_document(contract);
        }

        if !project_repo::delete(&self.db, project_id)? {
            return Err(ServiceError::ProjectNotFound(project_id));
        }
        info!(
            "Deleted project {} with {} contracts",
            project_id,
            contracts.len()
        );
        Ok(())
    }

    /// Stores a document, records it as `pending` and schedules analysis.
    pub fn upload(
        &self,
        project_id: i64,
        file_name: &str,
        content: &[u8],
    ) -> Result<ContractRow, ServiceError> {
        self.get_project(project_id)?;

        if !is_supported_file_name(file_name) {
            return Err(ServiceError::UnsupportedFileType(file_type(file_name)));
        }

        let size = content.len() as u64;
        if size > self.max_upload_bytes {
            return Err(ServiceError::FileTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let location = self.store.store(project_id, file_name, content)?;

        let inserted = contract_repo::insert(
            &self.db,
            &NewContract {
                project_id,
                file_name,
                file_location: &location,
                file_size: Some(size as i64),
            },
        );
        let contract_id = match inserted {
            Ok(id) => id,
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&location) {
                    warn!("Failed to remove orphaned upload {}: {}", location, cleanup);
                }
                return Err(e.into());
            }
        };

        info!(
            "Uploaded contract {} ({} bytes) to project {}",
            contract_id, size, project_id
        );

        let contract = self.get_contract(contract_id)?;
        self.enqueue(&contract)?;
        Ok(contract)
    }

    /// Schedules analysis of a contract that is still `pending`.
    pub fn submit(&self, contract_id: i64) -> Result<(), ServiceError> {
        let contract = self.get_contract(contract_id)?;
        if contract.processing_status != ProcessingStatus::Pending {
            return Err(ServiceError::InvalidStatus {
                contract_id,
                status: contract.processing_status,
                reason: "only pending contracts can be scheduled",
            });
        }
        self.enqueue(&contract)
    }

    fn enqueue(&self, contract: &ContractRow) -> Result<(), ServiceError> {
        self.pool.submit(AnalysisJob::new(
            contract.id,
            &contract.file_name,
            &contract.file_location,
        ))?;
        self.events.send(ContractEvent::new(
            contract.id,
            &contract.file_name,
            ContractPhase::Queued,
            "Contract queued for analysis",
        ));
        Ok(())
    }

    pub fn get_contract(&self, contract_id: i64) -> Result<ContractRow, ServiceError> {
        contract_repo::find_by_id(&self.db, contract_id)?
            .ok_or(ServiceError::ContractNotFound(contract_id))
    }

    pub fn get_result(&self, contract_id: i64) -> Result<ContractResult, ServiceError> {
        let contract = self.get_contract(contract_id)?;
        Ok(ContractResult {
            contract_id: contract.id,
            status: contract.processing_status,
            contract_data: contract.contract_data,
            processed_at: contract.processed_at,
        })
    }

    pub fn list_project_contracts(
        &self,
        project_id: i64,
    ) -> Result<Vec<ContractSummary>, ServiceError> {
        self.get_project(project_id)?;
        let rows = contract_repo::list_by_project(&self.db, project_id)?;
        Ok(rows.iter().map(ContractSummary::from).collect())
    }

    /// Resets a finished contract to `pending` and schedules it again.
    ///
    /// The previous `contract_data` stays in place until the new run ends.
    pub fn reanalyze(&self, contract_id: i64) -> Result<ContractRow, ServiceError> {
        let contract = self.get_contract(contract_id)?;
        let status = contract.processing_status;

        if !status.is_terminal() {
            return Err(ServiceError::InvalidStatus {
                contract_id,
                status,
                reason: "only completed or failed contracts can be reanalyzed",
            });
        }
        if !self.store.exists(&contract.file_location)? {
            return Err(ServiceError::SourceMissing(contract_id));
        }
        if self.pool.is_in_flight(contract_id) {
            return Err(WorkerError::AlreadyQueued(contract_id).into());
        }

        let to = Transition::Reanalyze.apply(status)?;
        if !contract_repo::transition(&self.db, contract_id, status, to, None, ProcessedAt::Keep)? {
            return Err(ServiceError::Conflict(contract_id));
        }
        info!("Contract {} reset to pending for reanalysis", contract_id);

        let contract = self.get_contract(contract_id)?;
        self.enqueue(&contract)?;
        Ok(contract)
    }

    /// Administrative override: forces `status`, optionally replacing the data.
    pub fn update_status(
        &self,
        contract_id: i64,
        status: ProcessingStatus,
        contract_data: Option<&Value>,
    ) -> Result<ContractRow, ServiceError> {
        let processed_at =
            (status == ProcessingStatus::Completed).then(|| Utc::now().to_rfc3339());

        if !contract_repo::overwrite_status(
            &self.db,
            contract_id,
            status,
            contract_data,
            processed_at.as_deref(),
        )? {
            return Err(ServiceError::ContractNotFound(contract_id));
        }

        info!("Contract {} status forced to {}", contract_id, status);
        self.get_contract(contract_id)
    }

    pub fn ask(
        &self,
        contract_id: i64,
        question: &str,
        context: Option<&str>,
    ) -> Result<QuestionAnswer, ServiceError> {
        let question = validate_question(question)?;
        let contract = self.get_contract(contract_id)?;

        if contract.processing_status != ProcessingStatus::Completed {
            return Err(ServiceError::InvalidStatus {
                contract_id,
                status: contract.processing_status,
                reason: "analysis must be completed before asking questions",
            });
        }

        let analysis = contract
            .contract_data
            .get("analysis")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        let answer = self.answerer.answer(&analysis, question, context)?;

        Ok(QuestionAnswer {
            contract_id,
            question: question.to_string(),
            answer: answer.answer,
            confidence: answer.confidence,
            sources: answer.sources,
            timestamp: Utc::now(),
        })
    }

    /// Deletes the record; removing the stored file is best effort.
    pub fn delete_contract(&self, contract_id: i64) -> Result<(), ServiceError> {
        let contract = self.get_contract(contract_id)?;
        self.remove_document(&contract);

        if !contract_repo::delete(&self.db, contract_id)? {
            return Err(ServiceError::ContractNotFound(contract_id));
        }
        info!("Deleted contract {}", contract_id);
        Ok(())
    }

    fn remove_document(&self, contract: &ContractRow) {
        match self.store.delete(&contract.file_location) {
            Ok(()) => debug!("Removed document {}", contract.file_location),
            Err(StorageError::NotFound(_)) => {
                debug!("Document {} already gone", contract.file_location)
            }
            Err(e) => warn!(
                "Failed to remove document for contract {}: {}",
                contract.id, e
            ),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContractEvent> {
        self.events.subscribe()
    }

    /// Blocks until a worker reports a finished job.
    pub fn recv_result(&self) -> Option<JobResult> {
        self.pool.recv_result()
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.pool.try_recv_result()
    }

    /// Stops accepting work and waits until every queued job has finished.
    pub fn shutdown(self) {
        self.pool.shutdown();
        self.pool.wait();
    }
}

fn validate_question(question: &str) -> Result<&str, ServiceError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ServiceError::InvalidQuestion(
            "question must not be empty".to_string(),
        ));
    }
    let chars = question.chars().count();
    if chars > MAX_QUESTION_CHARS {
        return Err(ServiceError::InvalidQuestion(format!(
            "question is {} characters, limit is {}",
            chars, MAX_QUESTION_CHARS
        )));
    }
    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerationError, GenerationOptions};
    use crate::storage::LocalStore;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Answers every prompt with the same text and records the prompts.
    struct EchoGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl TextGenerator for EchoGenerator {
        fn generate(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    fn service(temp_dir: &TempDir, reply: &str) -> (ContractService, Arc<EchoGenerator>) {
        let config = Config {
            worker_count: 1,
            max_upload_bytes: 1024,
            ..Config::default()
        };
        let generator = Arc::new(EchoGenerator {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let service = ContractService::new(
            &config,
            Database::open_in_memory().unwrap(),
            Arc::new(LocalStore::new(temp_dir.path())),
            generator.clone(),
        )
        .unwrap();
        (service, generator)
    }

    fn contract_text() -> Vec<u8> {
        "The tenant shall pay rent monthly. Either party may terminate with notice. "
            .repeat(3)
            .into_bytes()
    }

    #[test]
    fn test_validate_question() {
        assert_eq!(validate_question("  What is the term?  ").unwrap(), "What is the term?");
        assert!(validate_question("   ").is_err());
        assert!(validate_question(&"q".repeat(MAX_QUESTION_CHARS)).is_ok());
        assert!(validate_question(&"q".repeat(MAX_QUESTION_CHARS + 1)).is_err());
    }

    #[test]
    fn test_file_type() {
        assert_eq!(file_type("Lease.PDF"), "pdf");
        assert_eq!(file_type("notes"), "");
    }

    #[test]
    fn test_upload_rejections() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, "{}");
        let project = service.create_project("Tower", None, None).unwrap();

        assert!(matches!(
            service.upload(project.id, "scan.png", b"x"),
            Err(ServiceError::UnsupportedFileType(ext)) if ext == "png"
        ));
        assert!(matches!(
            service.upload(project.id, "big.txt", &[b'a'; 2048]),
            Err(ServiceError::FileTooLarge { size: 2048, limit: 1024 })
        ));
        assert!(matches!(
            service.upload(999, "a.txt", b"x"),
            Err(ServiceError::ProjectNotFound(999))
        ));

        service.shutdown();
    }

    #[test]
    fn test_upload_runs_analysis() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, r#"{"contract_type": "Lease"}"#);
        let project = service.create_project("Tower", Some("HQ"), Some("J-1")).unwrap();

        let contract = service.upload(project.id, "lease.txt", &contract_text()).unwrap();
        assert_eq!(contract.file_size, Some(contract_text().len() as i64));

        let result = service.recv_result().unwrap();
        assert!(result.is_success(), "{:?}", result.error);

        let view = service.get_result(contract.id).unwrap();
        assert_eq!(view.status, ProcessingStatus::Completed);
        assert_eq!(view.contract_data["analysis"]["summary"]["contract_type"], "Lease");
        assert!(view.processed_at.is_some());

        let listed = service.list_project_contracts(project.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_type, "txt");

        service.shutdown();
    }

    #[test]
    fn test_ask_requires_completed() {
        let temp_dir = TempDir::new().unwrap();
        let (service, generator) = service(&temp_dir, "Thirty days notice.");
        let project = service.create_project("Tower", None, None).unwrap();
        let contract = service.upload(project.id, "lease.txt", &contract_text()).unwrap();
        service.recv_result().unwrap();

        service
            .update_status(contract.id, ProcessingStatus::Failed, Some(&json!({"error": "x"})))
            .unwrap();
        assert!(matches!(
            service.ask(contract.id, "Notice period?", None),
            Err(ServiceError::InvalidStatus { status: ProcessingStatus::Failed, .. })
        ));

        let forced = service
            .update_status(
                contract.id,
                ProcessingStatus::Completed,
                Some(&json!({"analysis": {"terms": {"termination_clause": "30 days"}}})),
            )
            .unwrap();
        assert!(forced.processed_at.is_some());

        let answer = service
            .ask(contract.id, "  Notice period?  ", Some("tenant side"))
            .unwrap();
        assert_eq!(answer.answer, "Thirty days notice.");
        assert_eq!(answer.question, "Notice period?");
        assert!(answer.confidence.is_none());

        let prompts = generator.prompts.lock().unwrap();
        let last = prompts.last().unwrap();
        assert!(last.contains("termination_clause"));
        assert!(last.contains("tenant side"));

        drop(prompts);
        service.shutdown();
    }

    #[test]
    fn test_reanalyze_checks() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, "{}");
        let project = service.create_project("Tower", None, None).unwrap();
        let contract = service.upload(project.id, "lease.txt", &contract_text()).unwrap();
        service.recv_result().unwrap();

        service
            .update_status(contract.id, ProcessingStatus::Processing, None)
            .unwrap();
        assert!(matches!(
            service.reanalyze(contract.id),
            Err(ServiceError::InvalidStatus { .. })
        ));

        service
            .update_status(contract.id, ProcessingStatus::Completed, None)
            .unwrap();
        let reset = service.reanalyze(contract.id).unwrap();
        assert_eq!(reset.processing_status, ProcessingStatus::Pending);
        // Previous analysis stays until the new run lands.
        assert!(reset.contract_data.get("analysis").is_some());
        assert!(service.recv_result().unwrap().is_success());

        std::fs::remove_file(temp_dir.path().join(&contract.file_location)).unwrap();
        assert!(matches!(
            service.reanalyze(contract.id),
            Err(ServiceError::SourceMissing(_))
        ));

        service.shutdown();
    }

    #[test]
    fn test_delete_contract_survives_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, "{}");
        let project = service.create_project("Tower", None, None).unwrap();
        let contract = service.upload(project.id, "lease.txt", &contract_text()).unwrap();
        service.recv_result().unwrap();

        std::fs::remove_file(temp_dir.path().join(&contract.file_location)).unwrap();
        service.delete_contract(contract.id).unwrap();

        assert!(matches!(
            service.get_contract(contract.id),
            Err(ServiceError::ContractNotFound(_))
        ));
        assert!(matches!(
            service.delete_contract(contract.id),
            Err(ServiceError::ContractNotFound(_))
        ));

        service.shutdown();
    }

    #[test]
    fn test_update_status_unknown_contract() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, "{}");
        assert!(matches!(
            service.update_status(42, ProcessingStatus::Pending, None),
            Err(ServiceError::ContractNotFound(42))
        ));
        service.shutdown();
    }

    #[test]
    fn test_project_detail_and_update() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, "{}");
        let project = service.create_project("Tower", None, None).unwrap();
        service.upload(project.id, "lease.txt", &contract_text()).unwrap();
        service.recv_result().unwrap();

        let updated = service
            .update_project(
                project.id,
                &ProjectChanges {
                    name: Some("Tower B"),
                    job_number: Some("J-7"),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Tower B");

        let detail = service.get_project_detail(project.id).unwrap();
        assert_eq!(detail.project.job_number.as_deref(), Some("J-7"));
        assert_eq!(detail.contract_count, 1);
        assert_eq!(detail.contracts[0].file_name, "lease.txt");

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "Tower B");
        assert_eq!(json["contract_count"], 1);

        assert!(matches!(
            service.update_project(99, &ProjectChanges::default()),
            Err(ServiceError::ProjectNotFound(99))
        ));
        service.shutdown();
    }

    #[test]
    fn test_delete_project_removes_documents() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, "{}");
        let project = service.create_project("Tower", None, None).unwrap();
        let keep = service.create_project("Depot", None, None).unwrap();

        let first = service.upload(project.id, "a.txt", &contract_text()).unwrap();
        let second = service.upload(project.id, "b.txt", &contract_text()).unwrap();
        let other = service.upload(keep.id, "c.txt", &contract_text()).unwrap();
        for _ in 0..3 {
            service.recv_result().unwrap();
        }

        service.delete_project(project.id).unwrap();

        for contract in [&first, &second] {
            assert!(!temp_dir.path().join(&contract.file_location).exists());
            assert!(matches!(
                service.get_contract(contract.id),
                Err(ServiceError::ContractNotFound(_))
            ));
        }
        assert!(temp_dir.path().join(&other.file_location).exists());
        assert!(matches!(
            service.delete_project(project.id),
            Err(ServiceError::ProjectNotFound(_))
        ));

        service.shutdown();
    }

    #[test]
    fn test_pending_contracts_resume_on_start() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let store = Arc::new(LocalStore::new(temp_dir.path()));
        let project = project_repo::insert(&db, "Tower", None, None).unwrap();
        let location = store.store(project.id, "lease.txt", &contract_text()).unwrap();
        let contract_id = contract_repo::insert(
            &db,
            &NewContract {
                project_id: project.id,
                file_name: "lease.txt",
                file_location: &location,
                file_size: None,
            },
        )
        .unwrap();

        let config = Config {
            worker_count: 1,
            ..Config::default()
        };
        let generator = Arc::new(EchoGenerator {
            reply: "{}".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let service = ContractService::new(&config, db, store, generator).unwrap();

        let result = service.recv_result().unwrap();
        assert_eq!(result.contract_id, contract_id);
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(service.resume_pending().unwrap(), 0);

        service.shutdown();
    }
}
