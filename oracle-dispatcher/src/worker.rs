//! Per-oracle worker
//!
//! A worker holds one oracle's identity, its shard indexes and a locally held
//! status opinion. On every status request routed to one of its indexes it
//! submits that opinion. Submissions are independent: a rejected vote is
//! logged and counted, and never affects another oracle's worker.

use crate::{
    metrics::{SUBMISSIONS_TOTAL, SUBMISSION_DURATION},
    subscriber::EventHandler,
    Result,
};
use async_trait::async_trait;
use std::time::Instant;
use surety_core::{
    oracles::VoteOutcome, Address, EventRecord, FlightKey, FlightStatus, ShardIndex,
    SuretyEvent, SuretyHandle,
};
use tracing::{debug, info, warn};

/// Oracle worker
#[derive(Debug, Clone)]
pub struct OracleWorker {
    surety: SuretyHandle,
    oracle: Address,
    indexes: Vec<ShardIndex>,
    opinion: FlightStatus,
}

impl OracleWorker {
    /// Create worker for a registered oracle
    pub fn new(
        surety: SuretyHandle,
        oracle: Address,
        indexes: Vec<ShardIndex>,
        opinion: FlightStatus,
    ) -> Self {
        Self {
            surety,
            oracle,
            indexes,
            opinion,
        }
    }

    /// Oracle address
    pub fn oracle(&self) -> &Address {
        &self.oracle
    }

    /// Shard indexes this worker answers for
    pub fn indexes(&self) -> &[ShardIndex] {
        &self.indexes
    }

    /// Status this oracle reports
    pub fn opinion(&self) -> FlightStatus {
        self.opinion
    }

    /// Submit this oracle's opinion for a routed request
    pub async fn respond(&self, index: ShardIndex, flight: &FlightKey) -> Result<VoteOutcome> {
        let start = Instant::now();
        let result = self
            .surety
            .submit_response(&self.oracle, index, flight, self.opinion)
            .await;

        let outcome = match &result {
            Ok(VoteOutcome::Recorded { .. }) => "recorded",
            Ok(VoteOutcome::Finalized(_)) => "finalized",
            Ok(VoteOutcome::Ignored(_)) => "ignored",
            Err(_) => "rejected",
        };
        SUBMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
        SUBMISSION_DURATION
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(vote) => {
                if let VoteOutcome::Finalized(status) = vote {
                    info!(oracle = %self.oracle, flight = %flight, %status, "vote finalized flight");
                } else {
                    debug!(oracle = %self.oracle, index, flight = %flight, outcome, "vote submitted");
                }
                Ok(vote)
            }
            Err(e) => {
                warn!(oracle = %self.oracle, index, flight = %flight, "submission rejected: {}", e);
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl EventHandler for OracleWorker {
    async fn handle(&self, record: EventRecord) -> Result<()> {
        let SuretyEvent::StatusRequested {
            index,
            airline,
            flight,
            timestamp,
        } = record.event
        else {
            return Ok(());
        };

        if !self.indexes.contains(&index) {
            return Ok(());
        }

        let key = FlightKey::new(airline, flight, timestamp);
        self.respond(index, &key).await.map(|_| ())
    }
}
