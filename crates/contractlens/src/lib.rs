pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod extractor;
pub mod llm;
pub mod logging;
pub mod sanitize;
pub mod service;
pub mod status;
pub mod storage;
pub mod worker;

pub use analysis::{AnalysisOrchestrator, ParsedResponse, QuestionAnswerer};
pub use config::{load_config, Config};
pub use error::{
    ConfigError, ContractLensError, ExtractError, Result, StorageError, WorkerError,
};
pub use events::{ContractEvent, ContractEventBroadcaster, ContractPhase};
pub use extractor::{DocumentFormat, ExtractorRegistry};
pub use llm::{GenerationError, GenerationOptions, OllamaClient, TextGenerator};
pub use service::{ContractService, ServiceError};
pub use status::ProcessingStatus;
pub use storage::DocumentStore;
pub use worker::WorkerPool;
