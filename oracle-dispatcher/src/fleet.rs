//! Oracle fleet bootstrap and worker pool
//!
//! Registers `oracle_count` oracles with the surety ledger, gives each one a
//! randomly drawn status opinion and runs one subscriber task per oracle.

use crate::{
    subscriber::EventSubscriber, worker::OracleWorker, DispatcherConfig, Error, Result,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::sync::Arc;
use surety_core::{Address, FlightStatus, ShardIndex, SuretyHandle};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Running oracle workers
#[derive(Debug)]
pub struct OracleFleet {
    surety: SuretyHandle,
    workers: Vec<Arc<OracleWorker>>,
    tasks: Vec<JoinHandle<Result<()>>>,
}

impl OracleFleet {
    /// Empty fleet
    pub fn new(surety: SuretyHandle) -> Self {
        Self {
            surety,
            workers: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Register the configured oracles and start their workers
    ///
    /// An address registered by an earlier run keeps its indexes.
    pub async fn bootstrap(surety: SuretyHandle, config: &DispatcherConfig) -> Result<Self> {
        config.validate()?;
        let statuses = config.statuses();
        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let fee = surety.oracle_registration_fee();
        let mut fleet = Self::new(surety);

        for n in 0..config.oracle_count {
            let oracle = Address::new(format!("{}-{}", config.address_prefix, n));
            let opinion = *statuses
                .choose(&mut rng)
                .ok_or_else(|| Error::Config("no status opinions available".into()))?;

            let indexes = match fleet.surety.register_oracle(&oracle, fee).await {
                Ok(indexes) => indexes,
                Err(surety_core::Error::DuplicateOracle(_)) => {
                    fleet.surety.oracle_indexes(&oracle)?
                }
                Err(e) => return Err(e.into()),
            };

            let worker = OracleWorker::new(fleet.surety.clone(), oracle, indexes, opinion);
            fleet.spawn(worker);
        }

        info!(oracles = fleet.len(), %fee, "oracle fleet ready");
        Ok(fleet)
    }

    /// Start a worker in its own task
    pub fn spawn(&mut self, worker: OracleWorker) {
        let worker = Arc::new(worker);
        let subscriber = EventSubscriber::new(self.surety.clone(), worker.oracle().as_str());
        self.tasks.push(tokio::spawn(subscriber.subscribe(worker.clone())));
        self.workers.push(worker);
    }

    /// Workers in spawn order
    pub fn workers(&self) -> &[Arc<OracleWorker>] {
        &self.workers
    }

    /// Workers answering for `index`
    pub fn holders(&self, index: ShardIndex) -> Vec<&OracleWorker> {
        self.workers
            .iter()
            .filter(|w| w.indexes().contains(&index))
            .map(|w| w.as_ref())
            .collect()
    }

    /// Number of workers holding each opinion
    pub fn opinion_count(&self, status: FlightStatus) -> usize {
        self.workers.iter().filter(|w| w.opinion() == status).count()
    }

    /// Number of workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// True if no worker runs
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Stop all workers
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        for result in futures::future::join_all(self.tasks).await {
            match result {
                Ok(Err(e)) => warn!("oracle worker exited with error: {}", e),
                Err(e) if !e.is_cancelled() => warn!("oracle worker panicked: {}", e),
                _ => {}
            }
        }
        info!("oracle fleet stopped");
    }
}
