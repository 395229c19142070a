//! Test harness for isolated pipeline runs.
//!
//! Each `TestHarness` owns a temp upload directory, an in-memory database,
//! a project to upload into and a `ContractService` whose generation calls
//! go to a `MockGenerator`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tempfile::TempDir;

use contractlens::analysis::AnalysisStage;
use contractlens::config::Config;
use contractlens::db::contract_repo::ContractRow;
use contractlens::db::Database;
use contractlens::llm::{GenerationError, GenerationOptions, TextGenerator};
use contractlens::storage::LocalStore;
use contractlens::worker::JobResult;
use contractlens::{ContractService, ProcessingStatus};

pub const SUMMARY_JSON: &str = r#"{"contract_type": "Service Agreement", "parties": ["Acme Corp", "Globex"], "contract_value": "$120,000"}"#;
pub const RISKS_JSON: &str = r#"{"overall_risk_level": "Medium", "key_risks": ["Uncapped liability"]}"#;
pub const TERMS_JSON: &str = r#"{"payment_terms": "Net 30", "termination": "60 days written notice"}"#;

/// Scripted generation service.
///
/// Replies are chosen per analysis stage (detected from the prompt); any
/// other prompt is treated as a question. Every prompt is recorded.
pub struct MockGenerator {
    replies: HashMap<&'static str, Result<String, GenerationError>>,
    prompts: Mutex<Vec<String>>,
    gate: Option<Receiver<()>>,
}

impl MockGenerator {
    /// Valid JSON for all three stages.
    pub fn valid() -> Self {
        Self {
            replies: HashMap::new(),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
        .reply(AnalysisStage::Summary, SUMMARY_JSON)
        .reply(AnalysisStage::Risks, RISKS_JSON)
        .reply(AnalysisStage::Terms, TERMS_JSON)
        .answer("The agreement can be terminated with 60 days written notice.")
    }

    pub fn reply(mut self, stage: AnalysisStage, text: &str) -> Self {
        self.replies.insert(stage.as_str(), Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, stage: AnalysisStage, error: GenerationError) -> Self {
        self.replies.insert(stage.as_str(), Err(error));
        self
    }

    pub fn answer(mut self, text: &str) -> Self {
        self.replies.insert("answer", Ok(text.to_string()));
        self
    }

    /// Every call blocks until the returned sender sends or is dropped.
    pub fn gated(mut self) -> (Self, Sender<()>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.gate = Some(rx);
        (self, tx)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn kind(prompt: &str) -> &'static str {
        if prompt.starts_with("Analyze this contract") {
            "summary"
        } else if prompt.starts_with("Identify risks") {
            "risks"
        } else if prompt.starts_with("Extract key contract terms") {
            "terms"
        } else {
            "answer"
        }
    }
}

impl TextGenerator for MockGenerator {
    fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        self.replies
            .get(Self::kind(prompt))
            .cloned()
            .unwrap_or_else(|| Ok("{}".to_string()))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Test harness providing an isolated contract service.
pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
    pub generator: Arc<MockGenerator>,
    pub service: ContractService,
    pub project_id: i64,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_generator(MockGenerator::valid())
    }

    pub fn with_generator(generator: MockGenerator) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let upload_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("Failed to create upload dir");

        let config = Config {
            worker_count: 2,
            upload_directory: upload_dir.to_string_lossy().to_string(),
            ..Config::default()
        };

        let generator = Arc::new(generator);
        let service = ContractService::new(
            &config,
            Database::open_in_memory().expect("Failed to open database"),
            Arc::new(LocalStore::new(&upload_dir)),
            generator.clone(),
        )
        .expect("Failed to start service");

        let project_id = service
            .create_project("Harbor Tower", Some("Test project"), Some("JOB-001"))
            .expect("Failed to create project")
            .id;

        Self {
            temp_dir,
            upload_dir,
            generator,
            service,
            project_id,
        }
    }

    pub fn upload_text(&self, file_name: &str, content: &str) -> ContractRow {
        self.service
            .upload(self.project_id, file_name, content.as_bytes())
            .expect("Upload failed")
    }

    /// Blocks until the job for `contract_id` reports back.
    pub fn wait(&self, contract_id: i64) -> JobResult {
        loop {
            let result = self.service.recv_result().expect("Worker pool stopped");
            if result.contract_id == contract_id {
                return result;
            }
        }
    }

    /// Polls until the contract reaches `status`.
    pub fn wait_for_status(&self, contract_id: i64, status: ProcessingStatus) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            let current = self.service.get_contract(contract_id).unwrap().processing_status;
            if current == status {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("Contract {} never reached {}", contract_id, status);
    }

    pub fn stored_path(&self, contract: &ContractRow) -> PathBuf {
        self.upload_dir.join(&contract.file_location)
    }

    pub fn write_file(&self, file_name: &str, content: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(file_name);
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }
}

/// Contract-like text of exactly `chars` characters.
pub fn contract_text(chars: usize) -> String {
    const CLAUSE: &str = "The Provider shall deliver the services described herein and the Client shall pay all invoices within thirty days. ";
    CLAUSE.chars().cycle().take(chars).collect()
}
