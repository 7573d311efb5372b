use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Content generator is not configured")]
    NotConfigured,

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed generator output: {0}")]
    Malformed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AssistError {
    /// Whether the canned fallback may stand in for this failure.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AssistError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, AssistError>;
