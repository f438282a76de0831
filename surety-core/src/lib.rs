//! FlightSurety Core
//!
//! Flight-delay insurance ledger governed by a federation of airlines, with
//! flight status settled by a decentralized oracle quorum.
//!
//! # Architecture
//!
//! - **Airline governance**: Applied → Registered → Paid, with multi-party
//!   approval once the federation grows past the bootstrap size
//! - **Flight registry**: flights keyed by (airline, name, timestamp)
//! - **Insurance pool**: premiums escrowed, 1.5x payout credited on
//!   airline-fault delays, pull-based withdrawal
//! - **Oracle consensus**: sharded status requests, quorum of matching votes
//! - **Single Writer**: one actor task applies all mutations in order
//!
//! # Invariants
//!
//! - Airline state only moves forward: Applied → Registered → Paid
//! - A flight's status is final once the quorum agrees
//! - A credited payout is withdrawn at most once
//! - Every committed mutation emits its events in commit order

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod error;
pub mod config;
pub mod events;
pub mod airlines;
pub mod flights;
pub mod insurance;
pub mod oracles;
pub mod treasury;
pub mod surety;
pub mod actor;
pub mod metrics;

// Re-exports
pub use actor::{spawn_surety_actor, SuretyHandle};
pub use config::Config;
pub use error::{Error, ErrorCategory, Result};
pub use events::{EventRecord, SuretyEvent};
pub use surety::FlightSurety;
pub use types::{
    Address, AirlineState, Amount, FlightId, FlightKey, FlightStatus, PolicyState, ShardIndex,
};
