use thiserror::Error;

/// Error type that captures common expense-book failures.
#[derive(Debug, Error)]
pub enum ExpenseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Import error: {0}")]
    Import(String),
}

pub type Result<T> = std::result::Result<T, ExpenseError>;
