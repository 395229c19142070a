//! Contract analysis progress events for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Step of a contract's analysis run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractPhase {
    Queued,
    Processing,
    Extracting,
    Analyzing,
    Completed,
    Failed,
}

impl std::fmt::Display for ContractPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractPhase::Queued => write!(f, "Queued"),
            ContractPhase::Processing => write!(f, "Processing"),
            ContractPhase::Extracting => write!(f, "Extracting text"),
            ContractPhase::Analyzing => write!(f, "Analyzing"),
            ContractPhase::Completed => write!(f, "Completed"),
            ContractPhase::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEvent {
    pub contract_id: i64,
    pub file_name: String,
    pub phase: ContractPhase,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContractEvent {
    pub fn new(contract_id: i64, file_name: &str, phase: ContractPhase, message: &str) -> Self {
        Self {
            contract_id,
            file_name: file_name.to_string(),
            phase,
            message: message.to_string(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failed(contract_id: i64, file_name: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(contract_id, file_name, ContractPhase::Failed, "Analysis failed")
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, ContractPhase::Completed | ContractPhase::Failed)
    }
}

/// Fans out contract events to every subscriber.
#[derive(Clone)]
pub struct ContractEventBroadcaster {
    sender: Arc<broadcast::Sender<ContractEvent>>,
}

impl ContractEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: ContractEvent) {
        // No active receivers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContractEvent> {
        self.sender.subscribe()
    }

    /// Tracker for one run of one contract.
    pub fn track(&self, contract_id: i64, file_name: &str) -> ContractProgressTracker {
        ContractProgressTracker {
            contract_id,
            file_name: file_name.to_string(),
            sender: Arc::clone(&self.sender),
        }
    }
}

impl Default for ContractEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

pub struct ContractProgressTracker {
    contract_id: i64,
    file_name: String,
    sender: Arc<broadcast::Sender<ContractEvent>>,
}

impl ContractProgressTracker {
    pub fn update_phase(&self, phase: ContractPhase, message: &str) {
        let event = ContractEvent::new(self.contract_id, &self.file_name, phase, message);
        let _ = self.sender.send(event);
    }

    pub fn completed(&self) {
        self.update_phase(ContractPhase::Completed, "Analysis completed");
    }

    pub fn failed(&self, error: &str) {
        let _ = self
            .sender
            .send(ContractEvent::failed(self.contract_id, &self.file_name, error));
    }
}
