use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GradebookError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Invariant(String),

    #[error("index {index} out of range (len {len})")]
    Range { index: usize, len: usize },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("remote store error: {0}")]
    Remote(String),

    #[error("local storage error: {0}")]
    Storage(String),
}

impl GradebookError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Stable code used in IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::Invariant(_) => "invariant_violation",
            Self::Range { .. } => "out_of_range",
            Self::Decode(_) => "decode_failed",
            Self::Remote(_) => "remote_failed",
            Self::Storage(_) => "storage_failed",
        }
    }
}

impl From<serde_json::Error> for GradebookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<rusqlite::Error> for GradebookError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GradebookError>;
