//! Flight catalog
//!
//! Flights get sequential indexes that are never reused. Identity fields are
//! immutable; only consensus finalization writes the status.

use crate::{
    types::{FlightId, FlightKey, FlightStatus},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registered flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Sequential index
    pub index: FlightId,

    /// Identity (airline, name, timestamp)
    pub key: FlightKey,

    /// Latest finalized status
    pub status: FlightStatus,
}

/// Flight registry
#[derive(Debug, Default)]
pub struct FlightRegistry {
    flights: Vec<Flight>,
    by_key: HashMap<FlightKey, FlightId>,
}

impl FlightRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a flight; the caller has already checked the airline is Paid
    pub fn register(&mut self, key: FlightKey) -> Result<FlightId> {
        if self.by_key.contains_key(&key) {
            return Err(Error::DuplicateFlight(key));
        }

        let index = self.flights.len() as FlightId;
        tracing::info!(index, flight = %key, "flight registered");

        self.by_key.insert(key.clone(), index);
        self.flights.push(Flight {
            index,
            key,
            status: FlightStatus::Unknown,
        });
        Ok(index)
    }

    /// Lookup by index
    pub fn get(&self, index: FlightId) -> Result<&Flight> {
        self.flights
            .get(index as usize)
            .ok_or_else(|| Error::FlightNotFound(format!("index {}", index)))
    }

    /// Lookup by identity
    pub fn find(&self, key: &FlightKey) -> Result<&Flight> {
        self.by_key
            .get(key)
            .and_then(|&index| self.flights.get(index as usize))
            .ok_or_else(|| Error::FlightNotFound(key.to_string()))
    }

    /// Lookup by name; the first flight registered under that name wins
    ///
    /// Names are not unique across airlines. Callers that know the airline
    /// should use [`FlightRegistry::find`] instead.
    pub fn find_by_name(&self, name: &str) -> Result<&Flight> {
        self.flights
            .iter()
            .find(|flight| flight.key.name == name)
            .ok_or_else(|| Error::FlightNotFound(name.to_string()))
    }

    /// Write the finalized status
    pub(crate) fn set_status(&mut self, index: FlightId, status: FlightStatus) -> Result<()> {
        let flight = self
            .flights
            .get_mut(index as usize)
            .ok_or_else(|| Error::FlightNotFound(format!("index {}", index)))?;
        flight.status = status;
        Ok(())
    }

    /// All flights in index order
    pub fn all(&self) -> &[Flight] {
        &self.flights
    }

    /// Number of registered flights
    pub fn count(&self) -> usize {
        self.flights.len()
    }
}
