// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid supervisor state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Result limit must be at least 1, got {0}")]
    InvalidLimit(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
