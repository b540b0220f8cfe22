//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_transactions_admitted_total` - Transactions accepted into a block
//! - `ledger_transactions_rejected_total` - Admissions refused by validation
//! - `ledger_blocks_sealed_total` - Blocks sealed
//! - `ledger_open_block_transactions` - Transactions waiting in the open block
//! - `ledger_seal_duration_seconds` - Histogram of sealing latencies
//! - `ledger_validations_total` - Chain validations run
//!
//! Each collector registers into its own [`Registry`], so several ledgers can
//! live in one process.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transactions admitted
    pub transactions_admitted: IntCounter,

    /// Transactions rejected
    pub transactions_rejected: IntCounter,

    /// Blocks sealed
    pub blocks_sealed: IntCounter,

    /// Open block size
    pub open_block_transactions: IntGauge,

    /// Seal duration histogram
    pub seal_duration: Histogram,

    /// Validations run
    pub validations: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("transactions_admitted", &self.transactions_admitted.get())
            .field("transactions_rejected", &self.transactions_rejected.get())
            .field("blocks_sealed", &self.blocks_sealed.get())
            .field("open_block_transactions", &self.open_block_transactions.get())
            .field("validations", &self.validations.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_admitted = IntCounter::new(
            "ledger_transactions_admitted_total",
            "Total number of transactions admitted",
        )?;
        registry.register(Box::new(transactions_admitted.clone()))?;

        let transactions_rejected = IntCounter::new(
            "ledger_transactions_rejected_total",
            "Total number of transactions rejected",
        )?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let blocks_sealed =
            IntCounter::new("ledger_blocks_sealed_total", "Total number of sealed blocks")?;
        registry.register(Box::new(blocks_sealed.clone()))?;

        let open_block_transactions = IntGauge::new(
            "ledger_open_block_transactions",
            "Transactions in the open block",
        )?;
        registry.register(Box::new(open_block_transactions.clone()))?;

        let seal_duration = Histogram::with_opts(
            HistogramOpts::new("ledger_seal_duration_seconds", "Histogram of seal latencies")
                .buckets(vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01]),
        )?;
        registry.register(Box::new(seal_duration.clone()))?;

        let validations =
            IntCounter::new("ledger_validations_total", "Total number of chain validations")?;
        registry.register(Box::new(validations.clone()))?;

        Ok(Self {
            transactions_admitted,
            transactions_rejected,
            blocks_sealed,
            open_block_transactions,
            seal_duration,
            validations,
            registry,
        })
    }

    /// Record a successful admission
    pub fn record_admitted(&self, open_block_len: usize) {
        self.transactions_admitted.inc();
        self.open_block_transactions.set(open_block_len as i64);
    }

    /// Record a rejected admission
    pub fn record_rejected(&self) {
        self.transactions_rejected.inc();
    }

    /// Record a block seal
    pub fn record_sealed(&self, duration_seconds: f64) {
        self.blocks_sealed.inc();
        self.open_block_transactions.set(0);
        self.seal_duration.observe(duration_seconds);
    }

    /// Record a validation run
    pub fn record_validation(&self) {
        self.validations.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
