//! Core types for the ledger
//!
//! All types are plain values:
//! - Each block owns its own account snapshot (no shared mutable table)
//! - Transactions refer to accounts by address, resolved against the open block
//! - Blocks refer to their predecessor by number, never by pointer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Transactions held by a sealed block
pub const BLOCK_CAPACITY: usize = 10;

/// Smallest fee the ledger accepts
pub const MIN_FEE: u64 = 10;

/// Longest note the ledger accepts, in chars
pub const MAX_NOTE_LEN: usize = 1024;

/// Account address (unique key within a block snapshot)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create new address
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction identifier (unique across the whole chain)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create new transaction ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account balance record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account address
    pub address: Address,

    /// Current balance
    pub balance: u64,
}

impl Account {
    /// Create account with an opening balance
    pub fn new(address: impl Into<String>, balance: u64) -> Self {
        Self {
            address: Address::new(address),
            balance,
        }
    }
}

/// Transfer between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: TransactionId,

    /// Amount moved from payer to receiver
    pub amount: u64,

    /// Fee collected from the payer
    pub fee: u64,

    /// Free-form note
    pub note: String,

    /// Payer address
    pub payer: Address,

    /// Receiver address
    pub receiver: Address,
}

impl Transaction {
    /// Build a transaction from accounts resolved against the open block
    pub fn new(
        id: impl Into<String>,
        amount: u64,
        fee: u64,
        note: impl Into<String>,
        payer: &Account,
        receiver: &Account,
    ) -> Self {
        Self {
            id: TransactionId::new(id),
            amount,
            fee,
            note: note.into(),
            payer: payer.address.clone(),
            receiver: receiver.address.clone(),
        }
    }

    /// Canonical string used as the Merkle leaf for this transaction
    ///
    /// Free-form fields are JSON-quoted so that separators inside an id,
    /// note or address cannot make two transactions serialize alike.
    pub fn canonical_string(&self) -> String {
        format!(
            "Transaction Id: {}, Amount: {}, Fee: {}, Note: {}, Payer: {}, Receiver: {}",
            quote(self.id.as_str()),
            self.amount,
            self.fee,
            quote(&self.note),
            quote(self.payer.as_str()),
            quote(self.receiver.as_str()),
        )
    }

    /// amount + fee, widened so it cannot overflow
    pub fn total_debit(&self) -> u128 {
        self.amount as u128 + self.fee as u128
    }
}

fn quote(s: &str) -> String {
    // Serializing a &str to JSON cannot fail
    serde_json::to_string(s).unwrap_or_default()
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction Id: {}, Amount: {}, Fee: {}, Note: {}, Payer: {}, Receiver: {}",
            self.id, self.amount, self.fee, self.note, self.payer, self.receiver
        )
    }
}

/// Block of transactions with the account snapshot it was opened with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block number (genesis = 1)
    pub number: u64,

    /// Hash of the previous sealed block (empty for block 1)
    pub previous_hash: String,

    /// Merkle root, set once when the block is sealed
    pub hash: Option<String>,

    /// Transactions in admission order
    pub transactions: Vec<Transaction>,

    /// Account snapshot owned by this block
    pub accounts: BTreeMap<Address, Account>,

    /// Number of the previous sealed block
    pub previous_block: Option<u64>,
}

impl Block {
    /// Create the genesis block holding the master account
    pub fn genesis(master: Account) -> Self {
        let mut block = Self {
            number: 1,
            previous_hash: String::new(),
            hash: None,
            transactions: Vec::with_capacity(BLOCK_CAPACITY),
            accounts: BTreeMap::new(),
            previous_block: None,
        };
        block.insert_account(master);
        block
    }

    /// Open the successor of a sealed block
    ///
    /// The account map is cloned, so later balance changes in the new
    /// block never reach the sealed snapshot.
    pub fn successor(sealed: &Block, hash: String) -> Self {
        Self {
            number: sealed.number + 1,
            previous_hash: hash,
            hash: None,
            transactions: Vec::with_capacity(BLOCK_CAPACITY),
            accounts: sealed.accounts.clone(),
            previous_block: Some(sealed.number),
        }
    }

    /// Whether the block has been sealed
    pub fn is_sealed(&self) -> bool {
        self.hash.is_some()
    }

    /// Look up an account in this snapshot
    pub fn account(&self, address: &str) -> Option<&Account> {
        self.accounts.get(&Address::new(address))
    }

    pub(crate) fn account_mut(&mut self, address: &Address) -> Option<&mut Account> {
        self.accounts.get_mut(address)
    }

    pub(crate) fn insert_account(&mut self, account: Account) {
        self.accounts.insert(account.address.clone(), account);
    }

    /// Find a transaction by ID
    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id.as_str() == id)
    }

    /// Sum of all balances in the snapshot
    pub fn total_balance(&self) -> u128 {
        self.accounts.values().map(|a| a.balance as u128).sum()
    }

    /// Sum of all fees collected by this block
    pub fn total_fees(&self) -> u128 {
        self.transactions.iter().map(|tx| tx.fee as u128).sum()
    }

    /// Address -> balance view of the snapshot
    pub fn balances(&self) -> BTreeMap<String, u64> {
        self.accounts
            .values()
            .map(|a| (a.address.to_string(), a.balance))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_string() {
        let mary = Account::new("mary", 100);
        let sergey = Account::new("sergey", 100);
        let tx = Transaction::new("1", 60, 10, "simple test", &mary, &sergey);

        assert_eq!(
            tx.canonical_string(),
            r#"Transaction Id: "1", Amount: 60, Fee: 10, Note: "simple test", Payer: "mary", Receiver: "sergey""#
        );
        assert_eq!(
            tx.to_string(),
            "Transaction Id: 1, Amount: 60, Fee: 10, Note: simple test, Payer: mary, Receiver: sergey"
        );
    }

    #[test]
    fn test_canonical_string_unambiguous() {
        let a = Account::new("a", 0);
        let b = Account::new("b", 0);
        let x = Account::new("x, Payer: a", 0);

        let t1 = Transaction::new("1", 1, 10, "n\", Payer: \"a", &a, &b);
        let t2 = Transaction::new("1", 1, 10, "n", &x, &b);
        assert_ne!(t1.canonical_string(), t2.canonical_string());
    }

    #[test]
    fn test_genesis_block() {
        let block = Block::genesis(Account::new("master", 1_000));
        assert_eq!(block.number, 1);
        assert!(block.previous_hash.is_empty());
        assert!(!block.is_sealed());
        assert_eq!(block.account("master").unwrap().balance, 1_000);
        assert_eq!(block.previous_block, None);
    }

    #[test]
    fn test_successor_copies_accounts() {
        let mut sealed = Block::genesis(Account::new("master", 1_000));
        sealed.hash = Some("abc".to_string());

        let mut next = Block::successor(&sealed, "abc".to_string());
        assert_eq!(next.number, 2);
        assert_eq!(next.previous_hash, "abc");
        assert_eq!(next.previous_block, Some(1));

        next.account_mut(&Address::new("master")).unwrap().balance = 1;
        assert_eq!(sealed.account("master").unwrap().balance, 1_000);
    }

    #[test]
    fn test_totals() {
        let mut block = Block::genesis(Account::new("master", 900));
        block.insert_account(Account::new("mary", 80));
        let master = Account::new("master", 0);
        let mary = Account::new("mary", 0);
        block.transactions.push(Transaction::new("1", 10, 10, "", &master, &mary));
        block.transactions.push(Transaction::new("2", 10, 15, "", &master, &mary));

        assert_eq!(block.total_balance(), 980);
        assert_eq!(block.total_fees(), 25);
        assert_eq!(block.balances().get("mary"), Some(&80));
    }
}
