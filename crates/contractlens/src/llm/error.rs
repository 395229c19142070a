use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation service unavailable at {0}")]
    ServiceUnavailable(String),

    #[error("Generation request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Generation service returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid response from generation service: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Connection failures and timeouts may succeed on a later attempt;
    /// status and decoding errors will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::Timeout { .. })
    }
}
