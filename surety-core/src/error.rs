//! Error types for the surety ledger

use crate::types::{Address, Amount, FlightKey, ShardIndex};
use thiserror::Error;

/// Result type for surety operations
pub type Result<T> = std::result::Result<T, Error>;

/// Surety errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller lacks the required role or membership state
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Address already has an airline record
    #[error("Airline already exists: {0}")]
    DuplicateAirline(Address),

    /// Airline must be registered before paying dues
    #[error("Airline not registered: {0}")]
    NotRegistered(Address),

    /// Amount below the required dues
    #[error("Insufficient funds: required {required}, provided {provided}")]
    InsufficientFunds {
        /// Required minimum
        required: Amount,
        /// Amount provided
        provided: Amount,
    },

    /// Flight already registered under the same identity
    #[error("Flight already registered: {0}")]
    DuplicateFlight(FlightKey),

    /// Flight not found
    #[error("Flight not found: {0}")]
    FlightNotFound(String),

    /// Generic record lookup failure
    #[error("Not found: {0}")]
    NotFound(String),

    /// Premium above the configured cap
    #[error("Premium too high: maximum {max}, provided {provided}")]
    PremiumTooHigh {
        /// Maximum premium
        max: Amount,
        /// Premium provided
        provided: Amount,
    },

    /// Non-positive amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(Amount),

    /// Passenger already holds a live policy for the flight
    #[error("Policy already exists for {passenger} on {flight}")]
    DuplicatePolicy {
        /// Passenger
        passenger: Address,
        /// Flight
        flight: FlightKey,
    },

    /// Flight status is final; no new policies
    #[error("Flight already resolved: {0}")]
    FlightResolved(FlightKey),

    /// Withdrawable balance is zero
    #[error("Nothing to withdraw for {0}")]
    NothingToWithdraw(Address),

    /// Pool cannot cover the withdrawal
    #[error("Pool underfunded: balance {balance}, requested {requested}")]
    PoolUnderfunded {
        /// Pool balance
        balance: Amount,
        /// Amount requested
        requested: Amount,
    },

    /// Recipient could not accept the transfer
    #[error("Transfer to {recipient} failed: {reason}")]
    TransferFailed {
        /// Recipient
        recipient: Address,
        /// Reason reported by the transfer backend
        reason: String,
    },

    /// Oracle registration fee below the required fee
    #[error("Insufficient fee: required {required}, provided {provided}")]
    InsufficientFee {
        /// Required fee
        required: Amount,
        /// Fee provided
        provided: Amount,
    },

    /// Address already registered as an oracle
    #[error("Oracle already registered: {0}")]
    DuplicateOracle(Address),

    /// Index is not one of the oracle's assigned indexes
    #[error("Index {index} not assigned to oracle {oracle}")]
    IndexMismatch {
        /// Oracle address
        oracle: Address,
        /// Submitted index
        index: ShardIndex,
    },

    /// No open status request for the index and flight
    #[error("No status request for index {index} on {flight}")]
    UnknownRequest {
        /// Submitted index
        index: ShardIndex,
        /// Flight
        flight: FlightKey,
    },

    /// Operation not legal in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Contract is paused
    #[error("Contract is not operational")]
    NotOperational,

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Coarse error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller lacks required role/state
    Unauthorized,
    /// Operation not legal in current lifecycle state
    InvalidState,
    /// Reference to a nonexistent record
    NotFound,
    /// Amount below a required minimum
    InsufficientFunds,
    /// Runtime plumbing (actor, config, IO)
    Infrastructure,
}

impl Error {
    /// Map the error onto the caller-facing taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Unauthorized(_) | Error::IndexMismatch { .. } => ErrorCategory::Unauthorized,
            Error::DuplicateAirline(_)
            | Error::NotRegistered(_)
            | Error::DuplicateFlight(_)
            | Error::PremiumTooHigh { .. }
            | Error::InvalidAmount(_)
            | Error::DuplicatePolicy { .. }
            | Error::FlightResolved(_)
            | Error::NothingToWithdraw(_)
            | Error::PoolUnderfunded { .. }
            | Error::TransferFailed { .. }
            | Error::DuplicateOracle(_)
            | Error::InvalidState(_)
            | Error::NotOperational => ErrorCategory::InvalidState,
            Error::FlightNotFound(_) | Error::NotFound(_) | Error::UnknownRequest { .. } => {
                ErrorCategory::NotFound
            }
            Error::InsufficientFunds { .. } | Error::InsufficientFee { .. } => {
                ErrorCategory::InsufficientFunds
            }
            Error::Concurrency(_) | Error::Config(_) | Error::Io(_) | Error::Other(_) => {
                ErrorCategory::Infrastructure
            }
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
