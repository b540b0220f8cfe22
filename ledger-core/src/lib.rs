//! Hashchain Ledger
//!
//! Append-only, hash-linked ledger of account balances and transfers,
//! grouped into fixed-size blocks.
//!
//! # Architecture
//!
//! - **Open block**: exactly one mutable block accepts transactions
//! - **Sealing**: the tenth admission seals the block with a Merkle root
//! - **Copy-on-commit**: each block owns its own account snapshot
//! - **Single writer**: admissions run under one exclusive lock
//!
//! # Invariants
//!
//! - Conservation: Σ(latest sealed balances) + Σ(sealed fees) == max balance
//! - Continuity: block N's previous hash equals block N-1's hash
//! - Shape: sealed blocks hold exactly ten transactions
//! - Uniqueness: a transaction id appears once across the whole chain

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod crypto;
pub mod merkle;
pub mod ledger;
pub mod registry;
pub mod actor;
pub mod command;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{Account, Address, Block, Transaction, TransactionId};
pub use crypto::HashAlgorithm;
pub use ledger::Ledger;
pub use registry::{create_ledger, LedgerRegistry, Opened};
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use command::{CommandError, CommandProcessor};
pub use config::Config;
