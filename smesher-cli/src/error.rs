//! Common error types for smesher-cli.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use thiserror::Error;

use crate::api_client::types::RpcCode;

/// Main error type for smesher-cli operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Terminal I/O errors, including end of input while prompting
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operator input that could not be parsed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP transport errors talking to the node
    #[error("Node API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Node response that did not match the expected shape
    #[error("Failed to decode node response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The node answered with a non-zero application status code
    #[error("Failed to {action}. Node response code: {code}")]
    Rejected { action: &'static str, code: RpcCode },

    /// Failure while reading a server-side stream
    #[error("Error reading from {stream} stream: {message}")]
    Stream {
        stream: &'static str,
        message: String,
    },
}

impl Error {
    /// Whether this error should end an interactive session rather than
    /// just the current command.
    pub fn ends_session(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
