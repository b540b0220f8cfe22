//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Every failure aborts the whole operation; the engine never keeps partial
/// state behind an `Err`.
#[derive(Error, Debug)]
pub enum Error {
    /// Transaction amount is outside `[0, MAX]`
    #[error("Transaction amount {amount} is out of range (max {max})")]
    AmountOutOfRange {
        /// Offending amount
        amount: u64,
        /// Ledger maximum value
        max: u64,
    },

    /// Fee below the ledger minimum
    #[error("Transaction fee {fee} is below the minimum of {min}")]
    FeeTooLow {
        /// Offending fee
        fee: u64,
        /// Minimum accepted fee
        min: u64,
    },

    /// Note exceeds the maximum length
    #[error("Transaction note is {len} chars, limit is {max}")]
    NoteTooLong {
        /// Note length in chars
        len: usize,
        /// Maximum note length
        max: usize,
    },

    /// Transaction id already present in the chain
    #[error("Duplicate transaction id: {0}")]
    DuplicateTransactionId(String),

    /// Payer balance does not cover amount + fee
    #[error("Insufficient funds in {address}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Payer address
        address: String,
        /// Payer balance at admission time
        balance: u64,
        /// amount + fee
        required: u128,
    },

    /// Account address already taken in the open block
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    /// Account address unknown
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Block number unknown
    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    /// No block has been sealed yet
    #[error("No block has been committed yet")]
    NoCommittedBlock,

    /// Transaction id unknown
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction is still in the open block
    #[error("Transaction {0} is not in a sealed block")]
    TransactionNotSealed(String),

    /// Chain link broken at the given block
    #[error("Hash is inconsistent at block {0}")]
    HashInconsistent(u64),

    /// Sealed block does not hold exactly the block capacity
    #[error("Transaction count is invalid in block {block}: {count}")]
    TransactionCountInvalid {
        /// Block number
        block: u64,
        /// Transactions found
        count: usize,
    },

    /// Balances plus collected fees do not add up to MAX
    #[error("Balance mismatch: balances {balances} + fees {fees} != {expected}")]
    BalanceMismatch {
        /// Sum of the latest sealed snapshot
        balances: u128,
        /// Sum of all sealed fees
        fees: u128,
        /// Ledger maximum value
        expected: u128,
    },

    /// Requested hash algorithm is not available
    #[error("Hashing algorithm unavailable: {0}")]
    HashingUnavailable(String),

    /// Merkle computation error
    #[error("Merkle error: {0}")]
    Merkle(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short reason string shown to command-line users
    pub fn reason(&self) -> String {
        match self {
            Error::AmountOutOfRange { .. } => "Transaction Amount Is Out of Range".to_string(),
            Error::FeeTooLow { .. } => "Transaction Fee Must Be Greater Than 10".to_string(),
            Error::NoteTooLong { .. } => "Note Length Must Be Less Than 1024 Chars".to_string(),
            Error::DuplicateTransactionId(_) => "Transaction Id Must Be Unique".to_string(),
            Error::InsufficientFunds { .. } => "Payer Does Not Have Required Funds".to_string(),
            Error::AccountAlreadyExists(_) => "Account Already Exists".to_string(),
            Error::AccountNotFound(_) => "Account Does Not Exist".to_string(),
            Error::BlockNotFound(_) => "Block Does Not Exist".to_string(),
            Error::NoCommittedBlock => "Account Is Not Committed to a Block".to_string(),
            Error::TransactionNotFound(_) => "Transaction Does Not Exist".to_string(),
            Error::TransactionNotSealed(_) => "Transaction Is Not Committed to a Block".to_string(),
            Error::HashInconsistent(block) => format!("Hash Is Inconsistent: {}", block),
            Error::TransactionCountInvalid { block, .. } => {
                format!("Transaction Count Is Not 10 In Block: {}", block)
            }
            Error::BalanceMismatch { .. } => "Balance Does Not Add Up".to_string(),
            other => other.to_string(),
        }
    }

    /// True for the chain-integrity failures reported by `Ledger::validate`
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Error::HashInconsistent(_)
                | Error::TransactionCountInvalid { .. }
                | Error::BalanceMismatch { .. }
        )
    }
}
