//! Oracle registration and status consensus
//!
//! Oracles pay a fee and receive shard indexes drawn from a seedable RNG.
//! A status request is routed to one shard index derived from the flight
//! identity and a rotating nonce; only oracles holding that index may vote.
//! Votes are tallied per oracle (last vote wins), and the first status code
//! to collect `quorum` matching votes finalizes the flight.
//!
//! # State machine
//!
//! ```text
//!  request_status ──▶ Pending ──(quorum)──▶ Finalized
//!                       ▲  │
//!                       └──┘ submit_response (vote overwrite)
//! ```
//!
//! Pending requests never expire.

use crate::{
    config::OracleConfig,
    flights::Flight,
    types::{Address, Amount, FlightId, FlightKey, FlightStatus, ShardIndex},
    Error, Result,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registered oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oracle {
    /// Oracle address
    pub address: Address,

    /// Assigned shard indexes (duplicates allowed)
    pub indexes: Vec<ShardIndex>,
}

impl Oracle {
    /// True if the oracle may answer requests routed to `index`
    pub fn holds(&self, index: ShardIndex) -> bool {
        self.indexes.contains(&index)
    }
}

/// Request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    /// Collecting votes
    Pending,
    /// Quorum reached; status locked
    Finalized(FlightStatus),
}

/// Status request for one flight on one shard index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    /// Shard index the request was routed to
    pub index: ShardIndex,

    /// Flight index
    pub flight: FlightId,

    /// Flight identity
    pub key: FlightKey,

    /// Latest vote per oracle
    pub votes: HashMap<Address, FlightStatus>,

    /// Lifecycle state
    pub state: RequestState,
}

impl StatusRequest {
    /// Votes currently backing `status`
    pub fn tally(&self, status: FlightStatus) -> usize {
        self.votes.values().filter(|&&vote| vote == status).count()
    }
}

/// Result of `request_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Request routed to `index`
    Requested {
        /// Shard index
        index: ShardIndex,
        /// False if a pending request already existed for the pair
        created: bool,
    },
    /// Flight already finalized; nothing requested
    AlreadyFinal(FlightStatus),
}

/// Result of `submit_response`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote recorded, no quorum yet
    Recorded {
        /// Votes backing the submitted status
        tally: usize,
    },
    /// This vote reached quorum
    Finalized(FlightStatus),
    /// Request was already final; vote had no effect
    Ignored(FlightStatus),
}

/// Oracle registry and vote aggregator
#[derive(Debug)]
pub struct OracleConsensus {
    oracles: HashMap<Address, Oracle>,
    requests: HashMap<(ShardIndex, FlightId), StatusRequest>,
    resolved: HashMap<FlightId, FlightStatus>,
    request_nonce: u64,
    rng: StdRng,
    registration_fee: Amount,
    index_space: u8,
    indexes_per_oracle: usize,
    quorum: usize,
}

impl OracleConsensus {
    /// Create aggregator; a configured seed makes index assignment reproducible
    pub fn new(config: &OracleConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            oracles: HashMap::new(),
            requests: HashMap::new(),
            resolved: HashMap::new(),
            request_nonce: 0,
            rng,
            registration_fee: config.registration_fee,
            index_space: config.index_space,
            indexes_per_oracle: config.indexes_per_oracle,
            quorum: config.quorum,
        }
    }

    /// Register an oracle; returns its shard indexes
    pub fn register(&mut self, address: &Address, fee_paid: Amount) -> Result<Vec<ShardIndex>> {
        if fee_paid < self.registration_fee {
            return Err(Error::InsufficientFee {
                required: self.registration_fee,
                provided: fee_paid,
            });
        }
        if self.oracles.contains_key(address) {
            return Err(Error::DuplicateOracle(address.clone()));
        }

        // Independent draws; duplicates are part of the sharding scheme
        let indexes: Vec<ShardIndex> = (0..self.indexes_per_oracle)
            .map(|_| self.rng.gen_range(0..self.index_space))
            .collect();

        tracing::info!(oracle = %address, ?indexes, "oracle registered");
        self.oracles.insert(
            address.clone(),
            Oracle {
                address: address.clone(),
                indexes: indexes.clone(),
            },
        );
        Ok(indexes)
    }

    /// Open (or reuse) a status request for `flight`
    pub fn request_status(&mut self, flight: &Flight) -> RequestOutcome {
        if let Some(&status) = self.resolved.get(&flight.index) {
            return RequestOutcome::AlreadyFinal(status);
        }

        let index = shard_index(&flight.key, self.request_nonce, self.index_space);
        self.request_nonce = self.request_nonce.wrapping_add(1);

        let mut created = false;
        self.requests
            .entry((index, flight.index))
            .or_insert_with(|| {
                created = true;
                StatusRequest {
                    index,
                    flight: flight.index,
                    key: flight.key.clone(),
                    votes: HashMap::new(),
                    state: RequestState::Pending,
                }
            });

        tracing::info!(index, flight = %flight.key, created, "status requested");
        RequestOutcome::Requested { index, created }
    }

    /// Record an oracle's vote and finalize on quorum
    pub fn submit_response(
        &mut self,
        oracle: &Address,
        index: ShardIndex,
        flight: &Flight,
        status: FlightStatus,
    ) -> Result<VoteOutcome> {
        self.check_eligible(oracle, index)?;

        let request = self
            .requests
            .get_mut(&(index, flight.index))
            .ok_or_else(|| Error::UnknownRequest {
                index,
                flight: flight.key.clone(),
            })?;

        if let RequestState::Finalized(final_status) = request.state {
            tracing::debug!(oracle = %oracle, index, flight = %flight.key, "late vote ignored");
            return Ok(VoteOutcome::Ignored(final_status));
        }

        request.votes.insert(oracle.clone(), status);
        let tally = request.tally(status);
        tracing::debug!(oracle = %oracle, index, flight = %flight.key, %status, tally, "vote recorded");

        if tally < self.quorum {
            return Ok(VoteOutcome::Recorded { tally });
        }

        self.finalize(flight, status);
        Ok(VoteOutcome::Finalized(status))
    }

    /// Fail unless `oracle` is registered and holds `index`
    pub fn check_eligible(&self, oracle: &Address, index: ShardIndex) -> Result<()> {
        let registered = self
            .oracles
            .get(oracle)
            .ok_or_else(|| Error::Unauthorized(format!("{} is not a registered oracle", oracle)))?;
        if !registered.holds(index) {
            return Err(Error::IndexMismatch {
                oracle: oracle.clone(),
                index,
            });
        }
        Ok(())
    }

    /// Lock `status` for the flight and close its other pending requests
    fn finalize(&mut self, flight: &Flight, status: FlightStatus) {
        self.resolved.insert(flight.index, status);
        for request in self
            .requests
            .values_mut()
            .filter(|r| r.flight == flight.index && r.state == RequestState::Pending)
        {
            request.state = RequestState::Finalized(status);
        }
        tracing::info!(flight = %flight.key, %status, "status finalized");
    }

    /// Final status, if the flight was resolved
    pub fn final_status(&self, flight: FlightId) -> Option<FlightStatus> {
        self.resolved.get(&flight).copied()
    }

    /// Registered oracle, if any
    pub fn oracle(&self, address: &Address) -> Option<&Oracle> {
        self.oracles.get(address)
    }

    /// Request for an index/flight pair, if any
    pub fn request(&self, index: ShardIndex, flight: FlightId) -> Option<&StatusRequest> {
        self.requests.get(&(index, flight))
    }

    /// Requests still collecting votes
    pub fn pending_requests(&self) -> Vec<&StatusRequest> {
        self.requests
            .values()
            .filter(|r| r.state == RequestState::Pending)
            .collect()
    }

    /// Number of registered oracles
    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    /// Required registration fee
    pub fn registration_fee(&self) -> Amount {
        self.registration_fee
    }
}

/// Route a request: hash of flight identity and nonce, reduced to the index space
pub fn shard_index(key: &FlightKey, nonce: u64, index_space: u8) -> ShardIndex {
    (request_digest(key, nonce) % u64::from(index_space.max(1))) as ShardIndex
}

/// First 8 bytes of the blake3 hash over the request fields
///
/// String fields are length-prefixed so adjacent fields cannot shift bytes
/// into each other.
fn request_digest(key: &FlightKey, nonce: u64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    for field in [key.airline.as_str(), key.name.as_str()] {
        hasher.update(&(field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.update(&key.timestamp.to_be_bytes());
    hasher.update(&nonce.to_be_bytes());
    let hash = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_be_bytes(prefix)
}
