//! Core types for the surety ledger
//!
//! All types are designed for:
//! - Deterministic serialization (serde)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native-currency amount (exact decimal)
pub type Amount = Decimal;

/// Sequential flight index assigned by the flight registry
pub type FlightId = u64;

/// Shard index an oracle may answer for
pub type ShardIndex = u8;

/// Account address (airline, passenger or oracle)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create new address
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Airline membership state
///
/// Ordering follows the lifecycle, so `a < b` means `a` comes earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AirlineState {
    /// Applied for membership, awaiting approval
    Applied = 0,
    /// Approved by the federation, dues outstanding
    Registered = 1,
    /// Dues paid; may vote and register flights
    Paid = 2,
}

impl fmt::Display for AirlineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AirlineState::Applied => "applied",
            AirlineState::Registered => "registered",
            AirlineState::Paid => "paid",
        };
        f.write_str(name)
    }
}

/// Flight status as reported by oracles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FlightStatus {
    /// No status known yet
    #[default]
    Unknown = 0,
    /// Departed on time
    OnTime = 10,
    /// Late, airline's fault
    LateAirline = 20,
    /// Late because of weather
    LateWeather = 30,
    /// Late for technical reasons
    LateTechnical = 40,
    /// Late for any other reason
    LateOther = 50,
}

impl FlightStatus {
    /// All status codes, in code order
    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];

    /// Numeric status code
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Parse from numeric status code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Only airline-caused delays trigger a payout
    pub fn is_airline_fault(&self) -> bool {
        matches!(self, FlightStatus::LateAirline)
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightStatus::Unknown => "unknown",
            FlightStatus::OnTime => "on-time",
            FlightStatus::LateAirline => "late-airline",
            FlightStatus::LateWeather => "late-weather",
            FlightStatus::LateTechnical => "late-technical",
            FlightStatus::LateOther => "late-other",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Identity of a flight: owning airline, flight name and scheduled departure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    /// Owning airline
    pub airline: Address,

    /// Flight name (not unique across airlines)
    pub name: String,

    /// Scheduled departure (unix seconds)
    pub timestamp: i64,
}

impl FlightKey {
    /// Create new flight key
    pub fn new(airline: Address, name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            airline,
            name: name.into(),
            timestamp,
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.airline, self.name, self.timestamp)
    }
}

/// Insurance policy lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PolicyState {
    /// Bought, awaiting flight resolution
    #[default]
    Active = 0,
    /// Payout credited to the passenger balance
    Credited = 1,
    /// Credit withdrawn by the passenger
    Withdrawn = 2,
}
