//! Harness error type.

use thiserror::Error;

use rbpool_core::{AllocError, InvariantViolation, TreeError};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("tree invariant broken: {0}")]
    Invariant(#[from] InvariantViolation),
    #[error("unknown storm kind '{0}'")]
    UnknownStorm(String),
    #[error("pool accounting broken after {storm}: {message}")]
    Accounting { storm: &'static str, message: String },
}
