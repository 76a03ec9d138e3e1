//! Error types for Taskmail

use crate::execution::ExecutionResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid capacity for {what}: {capacity} (must be at least 1)")]
    InvalidCapacity { what: &'static str, capacity: usize },

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Execution failed: {0}")]
    Execution(ExecutionResult),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
