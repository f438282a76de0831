//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the surety ledger.
//!
//! # Metrics
//!
//! - `surety_operations_total` - Mutations by operation and outcome
//! - `surety_paid_airlines` - Paid airlines in the federation
//! - `surety_policies_total` - Policies sold
//! - `surety_status_finalized_total` - Flights finalized by oracle consensus
//! - `surety_payouts_total` - Successful balance withdrawals

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Mutations by operation and outcome
    pub operations_total: IntCounterVec,

    /// Paid airlines
    pub paid_airlines: IntGauge,

    /// Policies sold
    pub policies_total: IntCounter,

    /// Flights finalized
    pub status_finalized_total: IntCounter,

    /// Withdrawals paid out
    pub payouts_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("paid_airlines", &self.paid_airlines.get())
            .field("policies_total", &self.policies_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new("surety_operations_total", "Mutations by operation and outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let paid_airlines = IntGauge::new("surety_paid_airlines", "Paid airlines in the federation")?;
        registry.register(Box::new(paid_airlines.clone()))?;

        let policies_total = IntCounter::new("surety_policies_total", "Policies sold")?;
        registry.register(Box::new(policies_total.clone()))?;

        let status_finalized_total = IntCounter::new(
            "surety_status_finalized_total",
            "Flights finalized by oracle consensus",
        )?;
        registry.register(Box::new(status_finalized_total.clone()))?;

        let payouts_total = IntCounter::new("surety_payouts_total", "Balance withdrawals paid out")?;
        registry.register(Box::new(payouts_total.clone()))?;

        Ok(Self {
            operations_total,
            paid_airlines,
            policies_total,
            status_finalized_total,
            payouts_total,
            registry,
        })
    }

    /// Count a mutation
    pub fn record_operation(&self, operation: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Text exposition of all metrics
    pub fn gather_text(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
