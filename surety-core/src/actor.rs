//! Actor-based concurrency for the surety ledger
//!
//! All mutations go through one task that owns write access to the
//! [`FlightSurety`] state, so operations are applied one at a time in mailbox
//! order. Queries take a read lock and never wait behind the mailbox.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Airlines / passengers / oracle workers        │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               SuretyHandle (Clone)                    │
//! │   mutations → mailbox      queries → read lock       │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              SuretyActor (Single Task)                │
//! │   write lock → FlightSurety → EventLog → broadcast   │
//! └──────────────────────────────────────────────────────┘
//! ```

use crate::{
    airlines::{Airline, ApprovalOutcome},
    events::{EventRecord, SuretyEvent},
    flights::Flight,
    insurance::Policy,
    metrics::Metrics,
    oracles::{RequestOutcome, StatusRequest, VoteOutcome},
    treasury::FundsTransfer,
    types::{Address, AirlineState, Amount, FlightId, FlightKey, FlightStatus, ShardIndex},
    Config, Error, FlightSurety, Result,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Command sent to the surety actor
#[derive(Debug)]
pub enum SuretyCommand {
    /// Pause or resume the contract
    SetOperational {
        caller: Address,
        operational: bool,
        response: oneshot::Sender<Result<()>>,
    },

    /// Apply for membership
    ApplyAirline {
        name: String,
        applicant: Address,
        response: oneshot::Sender<Result<Airline>>,
    },

    /// Vote for a candidate
    ApproveAirline {
        candidate: Address,
        approver: Address,
        response: oneshot::Sender<Result<ApprovalOutcome>>,
    },

    /// Pay membership dues
    PayDues {
        airline: Address,
        amount: Amount,
        response: oneshot::Sender<Result<()>>,
    },

    /// Register a flight
    RegisterFlight {
        airline: Address,
        name: String,
        timestamp: i64,
        response: oneshot::Sender<Result<FlightId>>,
    },

    /// Buy a policy
    BuyInsurance {
        passenger: Address,
        flight: FlightKey,
        amount: Amount,
        response: oneshot::Sender<Result<Policy>>,
    },

    /// Withdraw the whole balance
    WithdrawBalance {
        passenger: Address,
        response: oneshot::Sender<Result<Amount>>,
    },

    /// Claim a credited policy
    ClaimInsurance {
        passenger: Address,
        flight: FlightKey,
        response: oneshot::Sender<Result<Amount>>,
    },

    /// Register an oracle
    RegisterOracle {
        oracle: Address,
        fee: Amount,
        response: oneshot::Sender<Result<Vec<ShardIndex>>>,
    },

    /// Ask oracles for a flight status
    RequestStatus {
        flight: FlightKey,
        response: oneshot::Sender<Result<RequestOutcome>>,
    },

    /// Oracle vote
    SubmitResponse {
        oracle: Address,
        index: ShardIndex,
        flight: FlightKey,
        status: FlightStatus,
        response: oneshot::Sender<Result<VoteOutcome>>,
    },

    /// Shutdown actor
    Shutdown,
}

impl SuretyCommand {
    fn operation(&self) -> &'static str {
        match self {
            SuretyCommand::SetOperational { .. } => "set_operational",
            SuretyCommand::ApplyAirline { .. } => "apply_airline",
            SuretyCommand::ApproveAirline { .. } => "approve_airline",
            SuretyCommand::PayDues { .. } => "pay_dues",
            SuretyCommand::RegisterFlight { .. } => "register_flight",
            SuretyCommand::BuyInsurance { .. } => "buy_insurance",
            SuretyCommand::WithdrawBalance { .. } => "withdraw_balance",
            SuretyCommand::ClaimInsurance { .. } => "claim_insurance",
            SuretyCommand::RegisterOracle { .. } => "register_oracle",
            SuretyCommand::RequestStatus { .. } => "request_status",
            SuretyCommand::SubmitResponse { .. } => "submit_response",
            SuretyCommand::Shutdown => "shutdown",
        }
    }
}

/// Actor that applies surety commands
#[derive(Debug)]
pub struct SuretyActor {
    state: Arc<RwLock<FlightSurety>>,
    mailbox: mpsc::Receiver<SuretyCommand>,
    metrics: Metrics,
}

impl SuretyActor {
    /// Create new actor
    pub fn new(
        state: Arc<RwLock<FlightSurety>>,
        mailbox: mpsc::Receiver<SuretyCommand>,
        metrics: Metrics,
    ) -> Self {
        Self {
            state,
            mailbox,
            metrics,
        }
    }

    /// Run the actor loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(command) = self.mailbox.recv().await {
            if let SuretyCommand::Shutdown = command {
                tracing::info!("surety actor shutting down");
                break;
            }
            self.handle_command(command);
        }
    }

    fn handle_command(&self, command: SuretyCommand) {
        let operation = command.operation();
        match command {
            SuretyCommand::SetOperational {
                caller,
                operational,
                response,
            } => self.execute(operation, response, |s| s.set_operational(&caller, operational)),

            SuretyCommand::ApplyAirline {
                name,
                applicant,
                response,
            } => self.execute(operation, response, |s| s.apply_airline(&name, &applicant)),

            SuretyCommand::ApproveAirline {
                candidate,
                approver,
                response,
            } => self.execute(operation, response, |s| s.approve_airline(&candidate, &approver)),

            SuretyCommand::PayDues {
                airline,
                amount,
                response,
            } => self.execute(operation, response, |s| s.pay_dues(&airline, amount)),

            SuretyCommand::RegisterFlight {
                airline,
                name,
                timestamp,
                response,
            } => self.execute(operation, response, |s| {
                s.register_flight(&airline, &name, timestamp)
            }),

            SuretyCommand::BuyInsurance {
                passenger,
                flight,
                amount,
                response,
            } => self.execute(operation, response, |s| {
                s.buy_insurance(&passenger, &flight, amount)
            }),

            SuretyCommand::WithdrawBalance {
                passenger,
                response,
            } => self.execute(operation, response, |s| s.withdraw_balance(&passenger)),

            SuretyCommand::ClaimInsurance {
                passenger,
                flight,
                response,
            } => self.execute(operation, response, |s| s.claim_insurance(&passenger, &flight)),

            SuretyCommand::RegisterOracle {
                oracle,
                fee,
                response,
            } => self.execute(operation, response, |s| s.register_oracle(&oracle, fee)),

            SuretyCommand::RequestStatus { flight, response } => {
                self.execute(operation, response, |s| s.request_status(&flight))
            }

            SuretyCommand::SubmitResponse {
                oracle,
                index,
                flight,
                status,
                response,
            } => self.execute(operation, response, |s| {
                s.submit_response(&oracle, index, &flight, status)
            }),

            SuretyCommand::Shutdown => {
                // Handled in run loop
            }
        }
    }

    /// Apply one mutation under the write lock, then reply
    fn execute<T>(
        &self,
        operation: &'static str,
        response: oneshot::Sender<Result<T>>,
        apply: impl FnOnce(&mut FlightSurety) -> Result<T>,
    ) {
        let result = {
            let mut state = self.state.write();
            let first_event = state.event_count() as u64;
            let result = apply(&mut *state);

            self.metrics.record_operation(operation, result.is_ok());
            for record in state.events_since(first_event) {
                self.observe(&record.event);
            }
            self.metrics
                .paid_airlines
                .set(state.paid_airline_count() as i64);
            result
        };

        if let Err(e) = &result {
            tracing::warn!(operation, category = ?e.category(), "operation rejected: {}", e);
        }

        // Caller may have given up waiting
        let _ = response.send(result);
    }

    fn observe(&self, event: &SuretyEvent) {
        match event {
            SuretyEvent::InsurancePurchased { .. } => self.metrics.policies_total.inc(),
            SuretyEvent::StatusFinalized { .. } => self.metrics.status_finalized_total.inc(),
            SuretyEvent::BalanceWithdrawn { .. } => self.metrics.payouts_total.inc(),
            _ => {}
        }
    }
}

/// Handle for sending commands to the actor and reading committed state
#[derive(Debug, Clone)]
pub struct SuretyHandle {
    sender: mpsc::Sender<SuretyCommand>,
    state: Arc<RwLock<FlightSurety>>,
    events: broadcast::Sender<EventRecord>,
    metrics: Metrics,
}

impl SuretyHandle {
    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> SuretyCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(command(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Pause or resume all mutations; owner only
    pub async fn set_operational(&self, caller: &Address, operational: bool) -> Result<()> {
        self.call(|response| SuretyCommand::SetOperational {
            caller: caller.clone(),
            operational,
            response,
        })
        .await
    }

    /// Apply for membership
    pub async fn apply_airline(&self, name: &str, applicant: &Address) -> Result<Airline> {
        self.call(|response| SuretyCommand::ApplyAirline {
            name: name.to_string(),
            applicant: applicant.clone(),
            response,
        })
        .await
    }

    /// Vote for a candidate airline
    pub async fn approve_airline(
        &self,
        candidate: &Address,
        approver: &Address,
    ) -> Result<ApprovalOutcome> {
        self.call(|response| SuretyCommand::ApproveAirline {
            candidate: candidate.clone(),
            approver: approver.clone(),
            response,
        })
        .await
    }

    /// Pay membership dues
    pub async fn pay_dues(&self, airline: &Address, amount: Amount) -> Result<()> {
        self.call(|response| SuretyCommand::PayDues {
            airline: airline.clone(),
            amount,
            response,
        })
        .await
    }

    /// Register a flight for a Paid airline
    pub async fn register_flight(
        &self,
        airline: &Address,
        name: &str,
        timestamp: i64,
    ) -> Result<FlightId> {
        self.call(|response| SuretyCommand::RegisterFlight {
            airline: airline.clone(),
            name: name.to_string(),
            timestamp,
            response,
        })
        .await
    }

    /// Buy a policy
    pub async fn buy_insurance(
        &self,
        passenger: &Address,
        flight: &FlightKey,
        amount: Amount,
    ) -> Result<Policy> {
        self.call(|response| SuretyCommand::BuyInsurance {
            passenger: passenger.clone(),
            flight: flight.clone(),
            amount,
            response,
        })
        .await
    }

    /// Withdraw the whole credited balance
    pub async fn withdraw_balance(&self, passenger: &Address) -> Result<Amount> {
        self.call(|response| SuretyCommand::WithdrawBalance {
            passenger: passenger.clone(),
            response,
        })
        .await
    }

    /// Claim the payout of a credited policy
    pub async fn claim_insurance(&self, passenger: &Address, flight: &FlightKey) -> Result<Amount> {
        self.call(|response| SuretyCommand::ClaimInsurance {
            passenger: passenger.clone(),
            flight: flight.clone(),
            response,
        })
        .await
    }

    /// Register an oracle
    pub async fn register_oracle(&self, oracle: &Address, fee: Amount) -> Result<Vec<ShardIndex>> {
        self.call(|response| SuretyCommand::RegisterOracle {
            oracle: oracle.clone(),
            fee,
            response,
        })
        .await
    }

    /// Ask oracles for a flight status
    pub async fn request_status(&self, flight: &FlightKey) -> Result<RequestOutcome> {
        self.call(|response| SuretyCommand::RequestStatus {
            flight: flight.clone(),
            response,
        })
        .await
    }

    /// Submit an oracle vote
    pub async fn submit_response(
        &self,
        oracle: &Address,
        index: ShardIndex,
        flight: &FlightKey,
        status: FlightStatus,
    ) -> Result<VoteOutcome> {
        self.call(|response| SuretyCommand::SubmitResponse {
            oracle: oracle.clone(),
            index,
            flight: flight.clone(),
            status,
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SuretyCommand::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }

    // Queries read committed state directly

    /// True unless paused
    pub fn is_operational(&self) -> bool {
        self.state.read().is_operational()
    }

    /// Contract owner
    pub fn owner(&self) -> Address {
        self.state.read().owner().clone()
    }

    /// Membership state
    pub fn airline_state(&self, address: &Address) -> Option<AirlineState> {
        self.state.read().airline_state(address)
    }

    /// True if the address is a Paid airline
    pub fn is_paid(&self, address: &Address) -> bool {
        self.state.read().is_paid(address)
    }

    /// Airline record
    pub fn airline(&self, address: &Address) -> Result<Airline> {
        self.state.read().airline(address).cloned()
    }

    /// Flight by index
    pub fn flight(&self, index: FlightId) -> Result<Flight> {
        self.state.read().flight(index).cloned()
    }

    /// First flight registered under `name`
    pub fn flight_by_name(&self, name: &str) -> Result<Flight> {
        self.state.read().flight_by_name(name).cloned()
    }

    /// All flights in index order
    pub fn flights(&self) -> Vec<Flight> {
        self.state.read().flights().to_vec()
    }

    /// Number of registered flights
    pub fn flight_count(&self) -> usize {
        self.state.read().flight_count()
    }

    /// Policy record, zero-valued when absent
    pub fn insurance(&self, passenger: &Address, flight: &FlightKey) -> Policy {
        self.state.read().insurance(passenger, flight)
    }

    /// Withdrawable balance
    pub fn balance(&self, passenger: &Address) -> Amount {
        self.state.read().balance(passenger)
    }

    /// Funds escrowed by the pool
    pub fn pool_balance(&self) -> Amount {
        self.state.read().pool_balance()
    }

    /// Shard indexes of a registered oracle
    pub fn oracle_indexes(&self, oracle: &Address) -> Result<Vec<ShardIndex>> {
        self.state.read().oracle_indexes(oracle)
    }

    /// Required oracle registration fee
    pub fn oracle_registration_fee(&self) -> Amount {
        self.state.read().oracle_registration_fee()
    }

    /// Requests still waiting for quorum
    pub fn pending_requests(&self) -> Vec<StatusRequest> {
        self.state
            .read()
            .pending_requests()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Final status, if consensus was reached
    pub fn final_status(&self, flight: &FlightKey) -> Result<Option<FlightStatus>> {
        self.state.read().final_status(flight)
    }

    /// Committed events with `sequence >= from`
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        self.state.read().events_since(from).to_vec()
    }

    /// Subscribe to events committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Subscribe and return the sequence of the first event the receiver sees
    ///
    /// Events are broadcast under the state write lock, so holding the read
    /// lock keeps the receiver and the log position consistent.
    pub fn subscribe_from_log_end(&self) -> (broadcast::Receiver<EventRecord>, u64) {
        let state = self.state.read();
        (state.subscribe(), state.event_count() as u64)
    }

    /// Actor metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Spawn the surety actor with genesis state
pub fn spawn_surety_actor(config: Config, transfer: Arc<dyn FundsTransfer>) -> Result<SuretyHandle> {
    let mailbox_capacity = config.actor.mailbox_capacity;
    let surety = FlightSurety::new(config, transfer)?;
    let events = surety.event_sender();
    let state = Arc::new(RwLock::new(surety));

    let metrics = Metrics::new().map_err(|e| Error::Other(format!("metrics: {}", e)))?;
    metrics
        .paid_airlines
        .set(state.read().paid_airline_count() as i64);

    // Bounded channel for backpressure
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = SuretyActor::new(state.clone(), rx, metrics.clone());

    tokio::spawn(async move {
        actor.run().await;
    });

    Ok(SuretyHandle {
        sender: tx,
        state,
        events,
        metrics,
    })
}
