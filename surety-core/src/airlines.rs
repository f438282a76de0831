//! Airline federation governance
//!
//! Admission control and capital requirements. An airline moves through
//! `Applied → Registered → Paid` and never back. Until the federation holds
//! more than `consensus_threshold` Paid airlines, one approval from any Paid
//! airline registers a candidate; after that, half of the Paid airlines
//! (rounded down, at least one) must approve.

use crate::{
    config::GovernanceConfig,
    types::{Address, AirlineState, Amount},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Federation member record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airline {
    /// Airline address
    pub address: Address,

    /// Display name
    pub name: String,

    /// Membership state
    pub state: AirlineState,

    /// Paid airlines that approved this one
    pub approvals: BTreeSet<Address>,
}

/// Result of a governance vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Threshold reached; candidate is now Registered
    Registered {
        /// Approvals collected
        votes: usize,
    },
    /// Vote recorded, threshold not met yet
    Pending {
        /// Approvals collected
        votes: usize,
        /// Approvals required
        required: usize,
    },
    /// Candidate was already Registered or Paid; nothing changed
    AlreadyRegistered,
}

/// Airline registry
#[derive(Debug)]
pub struct AirlineRegistry {
    airlines: HashMap<Address, Airline>,
    paid_count: usize,
    dues: Amount,
    consensus_threshold: usize,
}

impl AirlineRegistry {
    /// Create registry with the founding airline already Paid
    pub fn new(config: &GovernanceConfig) -> Self {
        let founder = Airline {
            address: config.founding_airline.clone(),
            name: config.founding_airline_name.clone(),
            state: AirlineState::Paid,
            approvals: BTreeSet::new(),
        };

        let mut airlines = HashMap::new();
        airlines.insert(founder.address.clone(), founder);

        Self {
            airlines,
            paid_count: 1,
            dues: config.airline_dues,
            consensus_threshold: config.consensus_threshold,
        }
    }

    /// Apply for membership
    pub fn apply(&mut self, name: &str, applicant: &Address) -> Result<&Airline> {
        if self.airlines.contains_key(applicant) {
            return Err(Error::DuplicateAirline(applicant.clone()));
        }

        let airline = Airline {
            address: applicant.clone(),
            name: name.to_string(),
            state: AirlineState::Applied,
            approvals: BTreeSet::new(),
        };

        tracing::info!(airline = %applicant, name, "airline applied");
        let airline = self.airlines.entry(applicant.clone()).or_insert(airline);
        Ok(&*airline)
    }

    /// Record `approver`'s vote for `candidate`
    ///
    /// An unmet threshold is not an error: the vote is kept and the outcome
    /// reports how many approvals are still missing.
    pub fn approve(&mut self, candidate: &Address, approver: &Address) -> Result<ApprovalOutcome> {
        if !self.is_paid(approver) {
            return Err(Error::Unauthorized(format!(
                "{} must be a paid airline to approve",
                approver
            )));
        }

        let required = self.required_approvals();
        let airline = self
            .airlines
            .get_mut(candidate)
            .ok_or_else(|| Error::NotFound(format!("airline {}", candidate)))?;

        if airline.state > AirlineState::Applied {
            return Ok(ApprovalOutcome::AlreadyRegistered);
        }

        airline.approvals.insert(approver.clone());
        let votes = airline.approvals.len();

        if votes >= required {
            airline.state = AirlineState::Registered;
            tracing::info!(airline = %candidate, votes, "airline registered");
            Ok(ApprovalOutcome::Registered { votes })
        } else {
            tracing::debug!(airline = %candidate, votes, required, "approval recorded, threshold unmet");
            Ok(ApprovalOutcome::Pending { votes, required })
        }
    }

    /// Pay dues; advances Registered → Paid
    ///
    /// Returns the escrowed amount; the caller moves it into the pool.
    pub fn pay_dues(&mut self, airline: &Address, amount: Amount) -> Result<Amount> {
        let dues = self.dues;
        let record = self
            .airlines
            .get_mut(airline)
            .filter(|a| a.state == AirlineState::Registered)
            .ok_or_else(|| Error::NotRegistered(airline.clone()))?;

        if amount < dues {
            return Err(Error::InsufficientFunds {
                required: dues,
                provided: amount,
            });
        }

        record.state = AirlineState::Paid;
        self.paid_count += 1;

        tracing::info!(airline = %airline, %amount, paid_airlines = self.paid_count, "airline paid dues");
        Ok(amount)
    }

    /// Approvals needed to register a candidate right now
    pub fn required_approvals(&self) -> usize {
        if self.paid_count <= self.consensus_threshold {
            1
        } else {
            (self.paid_count / 2).max(1)
        }
    }

    /// Membership state, if the address has a record
    pub fn state_of(&self, address: &Address) -> Option<AirlineState> {
        self.airlines.get(address).map(|a| a.state)
    }

    /// True if the address is a Paid airline
    pub fn is_paid(&self, address: &Address) -> bool {
        self.state_of(address) == Some(AirlineState::Paid)
    }

    /// Full record
    pub fn get(&self, address: &Address) -> Option<&Airline> {
        self.airlines.get(address)
    }

    /// Number of Paid airlines
    pub fn paid_count(&self) -> usize {
        self.paid_count
    }

    /// Number of airline records in any state
    pub fn len(&self) -> usize {
        self.airlines.len()
    }

    /// True if no airline exists (never the case after genesis)
    pub fn is_empty(&self) -> bool {
        self.airlines.is_empty()
    }
}
