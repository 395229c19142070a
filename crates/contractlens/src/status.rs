//! Contract processing lifecycle.
//!
//! ```text
//! pending ──Start──▶ processing ──Complete──▶ completed
//!    │                   │                        │
//!    └──────Fail─────────┴────────▶ failed        │
//!                                     │           │
//!    pending ◀──────Reanalyze─────────┴───────────┘
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub const ALL: [ProcessingStatus; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown processing status '{0}', expected one of: pending, processing, completed, failed")]
pub struct UnknownStatus(pub String);

impl FromStr for ProcessingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Lifecycle events. Manual overrides do not go through this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Complete,
    Fail,
    Reanalyze,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot apply {transition:?} to a contract in status '{from}'")]
pub struct InvalidTransition {
    pub from: ProcessingStatus,
    pub transition: Transition,
}

impl Transition {
    /// Target status, or an error when `from` does not allow this transition.
    pub fn apply(self, from: ProcessingStatus) -> Result<ProcessingStatus, InvalidTransition> {
        use ProcessingStatus::*;

        let to = match (self, from) {
            (Transition::Start, Pending) => Processing,
            (Transition::Complete, Processing) => Completed,
            (Transition::Fail, Pending | Processing) => Failed,
            (Transition::Reanalyze, Completed | Failed) => Pending,
            _ => {
                return Err(InvalidTransition {
                    from,
                    transition: self,
                })
            }
        };

        Ok(to)
    }

    /// Whether this transition stamps `processed_at`.
    pub fn stamps_processed_at(self) -> bool {
        matches!(self, Transition::Complete)
    }

    /// Whether this transition clears a `processed_at` left by an earlier run.
    pub fn clears_processed_at(self) -> bool {
        matches!(self, Transition::Fail)
    }
}
