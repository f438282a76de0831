//! Oracle Dispatcher
//!
//! Off-chain side of the oracle protocol:
//! - Subscribes to surety events through the actor's broadcast channel
//! - Runs one worker per registered oracle, each in its own task
//! - Answers status requests routed to an index the oracle holds
//! - Isolates failures per oracle submission
//! - Observability via Prometheus metrics

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod fleet;
pub mod metrics;
pub mod subscriber;
pub mod worker;

pub use config::DispatcherConfig;
pub use error::{Error, Result};
pub use fleet::OracleFleet;
pub use subscriber::{EventHandler, EventSubscriber};
pub use worker::OracleWorker;
