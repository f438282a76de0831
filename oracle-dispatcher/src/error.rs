//! Error types for the oracle dispatcher

use thiserror::Error;

/// Dispatcher error
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected by the surety ledger
    #[error("Surety error: {0}")]
    Surety(#[from] surety_core::Error),

    /// Event subscription error
    #[error("Subscribe error: {0}")]
    Subscribe(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
