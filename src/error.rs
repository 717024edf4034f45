//! Error types for the triage pipeline

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the triage pipeline
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Input validation errors (rejected before a session is created)
    #[error("Invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("Invalid chain id: {0}")]
    InvalidChainId(i64),

    #[error("Invalid block number: {0}")]
    InvalidBlockNumber(i64),

    // External collaborator errors
    #[error("Source provider error: {0}")]
    SourceProvider(String),

    #[error("Price feed error: {0}")]
    PriceFeed(String),

    #[error("DEX quote error: {0}")]
    DexQuote(String),

    #[error("Token metadata error: {0}")]
    TokenMetadata(String),

    #[error("Session store error: {0}")]
    SessionStore(String),

    // Sandbox errors
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    // Session lifecycle errors
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Stage cancelled: {0}")]
    Cancelled(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is an input validation failure. Validation
    /// failures are rejected before any session exists.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidAddress(_) | Error::InvalidChainId(_) | Error::InvalidBlockNumber(_)
        )
    }

    /// Check if this error came from an unreachable external collaborator
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Error::SourceProvider(_)
                | Error::PriceFeed(_)
                | Error::DexQuote(_)
                | Error::TokenMetadata(_)
                | Error::SessionStore(_)
                | Error::Sandbox(_)
        )
    }
}


// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
