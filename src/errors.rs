// src/errors.rs

//! Crate-wide error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskdepError {
    /// The receiving side of a channel-backed collaborator has gone away.
    #[error("object transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdepError>;
