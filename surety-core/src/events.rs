//! Append-only event log with publish/subscribe fan-out
//!
//! Every committed mutation appends one or more [`SuretyEvent`]s. Records are
//! kept in memory in commit order and broadcast to live subscribers (the
//! governance UI, the oracle dispatcher). A subscriber that falls behind the
//! broadcast buffer can catch up from [`EventLog::since`].

use crate::types::{Address, Amount, FlightKey, FlightStatus, ShardIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Domain event emitted by a committed mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuretyEvent {
    /// Airline applied for membership
    AirlineApplied {
        /// Applicant
        airline: Address,
        /// Airline name
        name: String,
    },
    /// Airline reached the approval threshold
    AirlineRegistered {
        /// Airline
        airline: Address,
        /// Approvals collected
        votes: usize,
    },
    /// Airline paid its dues
    AirlinePaid {
        /// Airline
        airline: Address,
        /// Amount escrowed
        amount: Amount,
    },
    /// Flight added to the registry
    FlightRegistered {
        /// Flight index
        index: u64,
        /// Flight identity
        flight: FlightKey,
    },
    /// Passenger bought a policy
    InsurancePurchased {
        /// Passenger
        passenger: Address,
        /// Flight identity
        flight: FlightKey,
        /// Premium escrowed
        amount: Amount,
        /// Payout on airline-fault delay
        payout_amount: Amount,
    },
    /// Policy payout credited to the passenger balance
    InsuranceCredited {
        /// Passenger
        passenger: Address,
        /// Flight identity
        flight: FlightKey,
        /// Amount credited
        amount: Amount,
    },
    /// Passenger withdrew accumulated credit
    BalanceWithdrawn {
        /// Passenger
        passenger: Address,
        /// Amount transferred
        amount: Amount,
    },
    /// Oracle registered
    OracleRegistered {
        /// Oracle
        oracle: Address,
        /// Assigned shard indexes
        indexes: Vec<ShardIndex>,
    },
    /// Status requested from oracles holding `index`
    StatusRequested {
        /// Shard index
        index: ShardIndex,
        /// Owning airline
        airline: Address,
        /// Flight name
        flight: String,
        /// Scheduled departure
        timestamp: i64,
    },
    /// Oracle vote recorded on a pending request
    OracleReported {
        /// Oracle
        oracle: Address,
        /// Shard index
        index: ShardIndex,
        /// Flight identity
        flight: FlightKey,
        /// Reported status
        status: FlightStatus,
    },
    /// Flight status reached quorum
    StatusFinalized {
        /// Flight identity
        flight: FlightKey,
        /// Final status
        status: FlightStatus,
    },
    /// Owner toggled operational status
    OperationalStatusChanged {
        /// New status
        operational: bool,
    },
}

impl SuretyEvent {
    /// Short name (metrics label, logs)
    pub fn name(&self) -> &'static str {
        match self {
            SuretyEvent::AirlineApplied { .. } => "airline_applied",
            SuretyEvent::AirlineRegistered { .. } => "airline_registered",
            SuretyEvent::AirlinePaid { .. } => "airline_paid",
            SuretyEvent::FlightRegistered { .. } => "flight_registered",
            SuretyEvent::InsurancePurchased { .. } => "insurance_purchased",
            SuretyEvent::InsuranceCredited { .. } => "insurance_credited",
            SuretyEvent::BalanceWithdrawn { .. } => "balance_withdrawn",
            SuretyEvent::OracleRegistered { .. } => "oracle_registered",
            SuretyEvent::StatusRequested { .. } => "status_requested",
            SuretyEvent::OracleReported { .. } => "oracle_reported",
            SuretyEvent::StatusFinalized { .. } => "status_finalized",
            SuretyEvent::OperationalStatusChanged { .. } => "operational_status_changed",
        }
    }
}

/// Event as stored in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,

    /// Position in the log (0-based, gapless)
    pub sequence: u64,

    /// Commit timestamp
    pub emitted_at: DateTime<Utc>,

    /// Event payload
    pub event: SuretyEvent,
}

/// Append-only event log
#[derive(Debug)]
pub struct EventLog {
    records: Vec<EventRecord>,
    sender: broadcast::Sender<EventRecord>,
}

impl EventLog {
    /// Create new log with the given broadcast buffer
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity);
        Self {
            records: Vec::new(),
            sender,
        }
    }

    /// Append and broadcast an event, returning its sequence number
    pub fn emit(&mut self, event: SuretyEvent) -> u64 {
        let record = EventRecord {
            event_id: Uuid::now_v7(),
            sequence: self.records.len() as u64,
            emitted_at: Utc::now(),
            event,
        };

        tracing::trace!(sequence = record.sequence, event = record.event.name(), "event emitted");

        // No live subscribers is not an error; the record stays in the log
        let _ = self.sender.send(record.clone());
        let sequence = record.sequence;
        self.records.push(record);
        sequence
    }

    /// Subscribe to events committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Sender half, for handles that subscribe without holding the state lock
    pub fn sender(&self) -> broadcast::Sender<EventRecord> {
        self.sender.clone()
    }

    /// Records with `sequence >= from`
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = (from as usize).min(self.records.len());
        &self.records[start..]
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing was emitted yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
