//! Main surety orchestration layer
//!
//! [`FlightSurety`] ties the four components together behind one API. Each
//! component owns its data; effects that cross components (dues into the
//! pool, finalized status into the flight catalog, delay credits into the
//! pool) are explicit calls made here, after the owning component accepted
//! the operation. Every method either commits completely and emits its
//! events, or returns an error and leaves state untouched.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rust_decimal::Decimal;
//! use surety_core::{treasury::InMemoryWallets, types::Address, Config, FlightSurety};
//!
//! # fn main() -> surety_core::Result<()> {
//! let config = Config::default();
//! let founder = config.governance.founding_airline.clone();
//! let mut surety = FlightSurety::new(config, Arc::new(InMemoryWallets::new()))?;
//!
//! let index = surety.register_flight(&founder, "FLT1", 1_700_000_000)?;
//! let key = surety.flight(index)?.key.clone();
//! surety.buy_insurance(&Address::new("passenger-1"), &key, Decimal::ONE)?;
//! # Ok(())
//! # }
//! ```

use crate::{
    airlines::{Airline, AirlineRegistry, ApprovalOutcome},
    events::{EventLog, EventRecord, SuretyEvent},
    flights::{Flight, FlightRegistry},
    insurance::{InsurancePool, Policy},
    oracles::{Oracle, OracleConsensus, RequestOutcome, StatusRequest, VoteOutcome},
    treasury::FundsTransfer,
    types::{Address, AirlineState, Amount, FlightId, FlightKey, FlightStatus, PolicyState, ShardIndex},
    Config, Error, Result,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Flight insurance ledger state
#[derive(Debug)]
pub struct FlightSurety {
    owner: Address,
    operational: bool,
    airlines: AirlineRegistry,
    flights: FlightRegistry,
    pool: InsurancePool,
    oracles: OracleConsensus,
    events: EventLog,
    transfer: Arc<dyn FundsTransfer>,
}

impl FlightSurety {
    /// Genesis state: founding airline Paid, contract operational
    pub fn new(config: Config, transfer: Arc<dyn FundsTransfer>) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            founder = %config.governance.founding_airline,
            quorum = config.oracle.quorum,
            "surety ledger initialized"
        );

        Ok(Self {
            owner: config.governance.founding_airline.clone(),
            operational: true,
            airlines: AirlineRegistry::new(&config.governance),
            flights: FlightRegistry::new(),
            pool: InsurancePool::new(&config.insurance),
            oracles: OracleConsensus::new(&config.oracle),
            events: EventLog::new(config.actor.event_channel_capacity),
            transfer,
        })
    }

    fn ensure_operational(&self) -> Result<()> {
        if self.operational {
            Ok(())
        } else {
            Err(Error::NotOperational)
        }
    }

    // ------------------------------------------------------------------
    // Operational control
    // ------------------------------------------------------------------

    /// Contract owner (the founding airline)
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// True unless the owner paused the contract
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// Pause or resume all mutations; owner only
    pub fn set_operational(&mut self, caller: &Address, operational: bool) -> Result<()> {
        if caller != &self.owner {
            return Err(Error::Unauthorized(format!(
                "{} is not the contract owner",
                caller
            )));
        }
        if self.operational != operational {
            self.operational = operational;
            tracing::warn!(operational, "operational status changed");
            self.events
                .emit(SuretyEvent::OperationalStatusChanged { operational });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Airline governance
    // ------------------------------------------------------------------

    /// Apply for federation membership
    pub fn apply_airline(&mut self, name: &str, applicant: &Address) -> Result<Airline> {
        self.ensure_operational()?;
        let airline = self.airlines.apply(name, applicant)?.clone();
        self.events.emit(SuretyEvent::AirlineApplied {
            airline: applicant.clone(),
            name: name.to_string(),
        });
        Ok(airline)
    }

    /// Vote for a candidate airline
    pub fn approve_airline(&mut self, candidate: &Address, approver: &Address) -> Result<ApprovalOutcome> {
        self.ensure_operational()?;
        let outcome = self.airlines.approve(candidate, approver)?;
        if let ApprovalOutcome::Registered { votes } = outcome {
            self.events.emit(SuretyEvent::AirlineRegistered {
                airline: candidate.clone(),
                votes,
            });
        }
        Ok(outcome)
    }

    /// Pay dues; the amount is escrowed in the pool
    pub fn pay_dues(&mut self, airline: &Address, amount: Amount) -> Result<()> {
        self.ensure_operational()?;
        let escrowed = self.airlines.pay_dues(airline, amount)?;
        self.pool.deposit(escrowed);
        self.events.emit(SuretyEvent::AirlinePaid {
            airline: airline.clone(),
            amount: escrowed,
        });
        Ok(())
    }

    /// Membership state
    pub fn airline_state(&self, address: &Address) -> Option<AirlineState> {
        self.airlines.state_of(address)
    }

    /// True if the address is a Paid airline
    pub fn is_paid(&self, address: &Address) -> bool {
        self.airlines.is_paid(address)
    }

    /// Airline record
    pub fn airline(&self, address: &Address) -> Result<&Airline> {
        self.airlines
            .get(address)
            .ok_or_else(|| Error::NotFound(format!("airline {}", address)))
    }

    /// Number of Paid airlines
    pub fn paid_airline_count(&self) -> usize {
        self.airlines.paid_count()
    }

    // ------------------------------------------------------------------
    // Flights
    // ------------------------------------------------------------------

    /// Register a flight; Paid airlines only
    pub fn register_flight(&mut self, airline: &Address, name: &str, timestamp: i64) -> Result<FlightId> {
        self.ensure_operational()?;
        if !self.airlines.is_paid(airline) {
            return Err(Error::Unauthorized(format!(
                "{} must be a paid airline to register flights",
                airline
            )));
        }

        let key = FlightKey::new(airline.clone(), name, timestamp);
        let index = self.flights.register(key.clone())?;
        self.events
            .emit(SuretyEvent::FlightRegistered { index, flight: key });
        Ok(index)
    }

    /// Flight by index
    pub fn flight(&self, index: FlightId) -> Result<&Flight> {
        self.flights.get(index)
    }

    /// First flight registered under `name`
    pub fn flight_by_name(&self, name: &str) -> Result<&Flight> {
        self.flights.find_by_name(name)
    }

    /// Flight by identity
    pub fn find_flight(&self, key: &FlightKey) -> Result<&Flight> {
        self.flights.find(key)
    }

    /// All flights in index order
    pub fn flights(&self) -> &[Flight] {
        self.flights.all()
    }

    /// Number of registered flights
    pub fn flight_count(&self) -> usize {
        self.flights.count()
    }

    // ------------------------------------------------------------------
    // Insurance
    // ------------------------------------------------------------------

    /// Buy a policy; the premium is escrowed in the pool
    pub fn buy_insurance(&mut self, passenger: &Address, flight: &FlightKey, amount: Amount) -> Result<Policy> {
        self.ensure_operational()?;
        let flight = self.flights.find(flight)?;
        if self.oracles.final_status(flight.index).is_some() {
            return Err(Error::FlightResolved(flight.key.clone()));
        }

        let policy = self.pool.buy(passenger, flight, amount)?.clone();
        self.events.emit(SuretyEvent::InsurancePurchased {
            passenger: passenger.clone(),
            flight: policy.flight.clone(),
            amount: policy.amount,
            payout_amount: policy.payout_amount,
        });
        Ok(policy)
    }

    /// Policy record; zero-valued when the passenger holds none
    pub fn insurance(&self, passenger: &Address, flight: &FlightKey) -> Policy {
        self.flights
            .find(flight)
            .ok()
            .and_then(|f| self.pool.policy(passenger, f.index))
            .cloned()
            .unwrap_or_else(|| Policy::empty(passenger.clone(), flight.clone()))
    }

    /// Withdrawable balance
    pub fn balance(&self, passenger: &Address) -> Amount {
        self.pool.balance(passenger)
    }

    /// Funds escrowed by the pool
    pub fn pool_balance(&self) -> Amount {
        self.pool.pool_balance()
    }

    /// Transfer the passenger's whole balance
    pub fn withdraw_balance(&mut self, passenger: &Address) -> Result<Amount> {
        self.ensure_operational()?;
        let amount = self.pool.withdraw(passenger, self.transfer.as_ref())?;
        self.events.emit(SuretyEvent::BalanceWithdrawn {
            passenger: passenger.clone(),
            amount,
        });
        Ok(amount)
    }

    /// Claim the payout of a credited policy on `flight`
    pub fn claim_insurance(&mut self, passenger: &Address, flight: &FlightKey) -> Result<Amount> {
        self.ensure_operational()?;
        let index = self.flights.find(flight)?.index;
        let state = self
            .pool
            .policy(passenger, index)
            .map(|p| p.state)
            .ok_or_else(|| Error::NotFound(format!("policy for {} on {}", passenger, flight)))?;

        match state {
            PolicyState::Credited => self.withdraw_balance(passenger),
            PolicyState::Active => Err(Error::InvalidState(format!(
                "policy on {} has not been credited",
                flight
            ))),
            PolicyState::Withdrawn => Err(Error::InvalidState(format!(
                "policy on {} was already paid out",
                flight
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Oracles
    // ------------------------------------------------------------------

    /// Register an oracle; the fee is escrowed in the pool
    pub fn register_oracle(&mut self, address: &Address, fee: Amount) -> Result<Vec<ShardIndex>> {
        self.ensure_operational()?;
        let indexes = self.oracles.register(address, fee)?;
        self.pool.deposit(fee);
        self.events.emit(SuretyEvent::OracleRegistered {
            oracle: address.clone(),
            indexes: indexes.clone(),
        });
        Ok(indexes)
    }

    /// Shard indexes of a registered oracle
    pub fn oracle_indexes(&self, address: &Address) -> Result<Vec<ShardIndex>> {
        self.oracles
            .oracle(address)
            .map(|o| o.indexes.clone())
            .ok_or_else(|| Error::NotFound(format!("oracle {}", address)))
    }

    /// Registered oracle
    pub fn oracle(&self, address: &Address) -> Option<&Oracle> {
        self.oracles.oracle(address)
    }

    /// Required oracle registration fee
    pub fn oracle_registration_fee(&self) -> Amount {
        self.oracles.registration_fee()
    }

    /// Ask oracles for a flight's status
    pub fn request_status(&mut self, flight: &FlightKey) -> Result<RequestOutcome> {
        self.ensure_operational()?;
        let flight = self.flights.find(flight)?;
        let outcome = self.oracles.request_status(flight);

        if let RequestOutcome::Requested { index, .. } = outcome {
            self.events.emit(SuretyEvent::StatusRequested {
                index,
                airline: flight.key.airline.clone(),
                flight: flight.key.name.clone(),
                timestamp: flight.key.timestamp,
            });
        }
        Ok(outcome)
    }

    /// Record an oracle vote; on quorum, finalize the flight and credit policies
    pub fn submit_response(
        &mut self,
        oracle: &Address,
        index: ShardIndex,
        flight: &FlightKey,
        status: FlightStatus,
    ) -> Result<VoteOutcome> {
        self.ensure_operational()?;
        let flight = match self.flights.find(flight) {
            Ok(flight) => flight.clone(),
            Err(_) => {
                // No request can exist for an unknown flight
                self.oracles.check_eligible(oracle, index)?;
                return Err(Error::UnknownRequest {
                    index,
                    flight: flight.clone(),
                });
            }
        };

        let outcome = self.oracles.submit_response(oracle, index, &flight, status)?;
        if matches!(outcome, VoteOutcome::Ignored(_)) {
            return Ok(outcome);
        }

        self.events.emit(SuretyEvent::OracleReported {
            oracle: oracle.clone(),
            index,
            flight: flight.key.clone(),
            status,
        });

        if let VoteOutcome::Finalized(final_status) = outcome {
            self.flights.set_status(flight.index, final_status)?;
            self.events.emit(SuretyEvent::StatusFinalized {
                flight: flight.key.clone(),
                status: final_status,
            });

            for policy in self.pool.credit_on_delay(flight.index, final_status) {
                self.events.emit(SuretyEvent::InsuranceCredited {
                    passenger: policy.passenger,
                    flight: policy.flight,
                    amount: policy.payout_amount,
                });
            }
        }
        Ok(outcome)
    }

    /// Status request for an index/flight pair
    pub fn status_request(&self, index: ShardIndex, flight: &FlightKey) -> Result<&StatusRequest> {
        let id = self.flights.find(flight)?.index;
        self.oracles
            .request(index, id)
            .ok_or_else(|| Error::UnknownRequest {
                index,
                flight: flight.clone(),
            })
    }

    /// Requests still waiting for quorum
    pub fn pending_requests(&self) -> Vec<&StatusRequest> {
        self.oracles.pending_requests()
    }

    /// Final status, if consensus was reached
    pub fn final_status(&self, flight: &FlightKey) -> Result<Option<FlightStatus>> {
        let id = self.flights.find(flight)?.index;
        Ok(self.oracles.final_status(id))
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Subscribe to events committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Event broadcast sender
    pub fn event_sender(&self) -> broadcast::Sender<EventRecord> {
        self.events.sender()
    }

    /// Committed events with `sequence >= from`
    pub fn events_since(&self, from: u64) -> &[EventRecord] {
        self.events.since(from)
    }

    /// Number of committed events
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
