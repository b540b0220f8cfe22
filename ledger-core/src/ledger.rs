//! Ledger engine
//!
//! Owns the chain of sealed blocks plus the single open block, admits
//! transactions, seals full blocks and audits the chain.
//!
//! # Example
//!
//! ```
//! use hashchain_ledger::{Config, Ledger, Transaction};
//!
//! # fn main() -> hashchain_ledger::Result<()> {
//! let ledger = Ledger::new(Config::new("test", "test ledger", "chapman"))?;
//! ledger.create_account("mary")?;
//!
//! let open = ledger.open_block();
//! let master = open.account("master").expect("genesis account");
//! let mary = open.account("mary").expect("just created");
//!
//! let tx = Transaction::new("1", 100, 10, "funding", master, mary);
//! let id = ledger.admit(tx)?;
//! assert!(ledger.get_transaction(id.as_str()).is_some());
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! State sits behind one `RwLock`. Account creation and admission hold the
//! write guard for the whole validate → mutate → maybe-seal sequence; every
//! read takes the read guard and returns owned copies, so no caller sees a
//! block halfway through sealing.

use crate::{
    crypto::HashAlgorithm,
    merkle::{block_leaves, merkle_root, MerkleProof, MerkleTree},
    metrics::Metrics,
    types::{
        Account, Block, Transaction, TransactionId, BLOCK_CAPACITY, MAX_NOTE_LEN, MIN_FEE,
    },
    Config, Error, Result,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// Mutable chain state guarded by the ledger lock
#[derive(Debug)]
struct ChainState {
    /// Sealed blocks keyed by number
    blocks: BTreeMap<u64, Block>,

    /// The one block accepting transactions
    open_block: Block,

    /// Every admitted transaction id, sealed or open
    transaction_ids: HashSet<TransactionId>,
}

/// Balances a transaction leaves behind, computed before any mutation
struct Settlement {
    payer_balance: u64,
    receiver_balance: u64,
}

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    name: String,
    description: String,
    seed: String,
    max_balance: u64,
    algorithm: HashAlgorithm,
    state: RwLock<ChainState>,
    metrics: Option<Metrics>,
}

impl Ledger {
    /// Create a ledger with a genesis block
    ///
    /// The genesis open block is number 1 with an empty previous hash and
    /// holds the master account with the whole `max_balance`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let algorithm = config.algorithm()?;

        let metrics = if config.metrics.enabled {
            Some(Metrics::new()?)
        } else {
            None
        };

        let master = Account::new(config.master_address.clone(), config.max_balance);

        tracing::info!(
            name = %config.name,
            algorithm = %algorithm,
            max_balance = config.max_balance,
            "Ledger created"
        );

        Ok(Self {
            name: config.name,
            description: config.description,
            seed: config.seed,
            max_balance: config.max_balance,
            algorithm,
            state: RwLock::new(ChainState {
                blocks: BTreeMap::new(),
                open_block: Block::genesis(master),
                transaction_ids: HashSet::new(),
            }),
            metrics,
        })
    }

    /// Ledger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ledger description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Merkle seed
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Fixed total value established at genesis
    pub fn max_balance(&self) -> u64 {
        self.max_balance
    }

    /// Hash algorithm used for block hashes
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Metrics collector, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Create an account with a zero balance in the open block
    pub fn create_account(&self, address: &str) -> Result<Account> {
        let mut state = self.state.write();

        if state.open_block.account(address).is_some() {
            return Err(Error::AccountAlreadyExists(address.to_string()));
        }

        let account = Account::new(address, 0);
        state.open_block.insert_account(account.clone());

        tracing::debug!(address, block = state.open_block.number, "Account created");
        Ok(account)
    }

    /// Admit a transaction into the open block
    ///
    /// Checks run in a fixed order and the first failure wins: amount range,
    /// fee, note length, id uniqueness, account resolution, funds. On success
    /// the payer is debited `amount + fee`, the receiver credited `amount`,
    /// and the block is sealed if it just reached capacity.
    pub fn admit(&self, tx: Transaction) -> Result<TransactionId> {
        let mut state = self.state.write();

        match self.admit_locked(&mut state, tx) {
            Ok(id) => Ok(id),
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected();
                }
                tracing::warn!(reason = %e.reason(), "Transaction rejected: {}", e);
                Err(e)
            }
        }
    }

    fn admit_locked(&self, state: &mut ChainState, tx: Transaction) -> Result<TransactionId> {
        let settlement = self.check_transaction(state, &tx)?;

        // Root is computed before any mutation so a failure leaves no trace
        let sealing_root = if state.open_block.transactions.len() + 1 >= BLOCK_CAPACITY {
            let leaves = block_leaves(
                &self.seed,
                state
                    .open_block
                    .transactions
                    .iter()
                    .chain(std::iter::once(&tx)),
            );
            Some(merkle_root(self.algorithm, &leaves)?)
        } else {
            None
        };

        if let Some(payer) = state.open_block.account_mut(&tx.payer) {
            payer.balance = settlement.payer_balance;
        }
        if let Some(receiver) = state.open_block.account_mut(&tx.receiver) {
            receiver.balance = settlement.receiver_balance;
        }

        let id = tx.id.clone();
        tracing::debug!(
            id = %id,
            amount = tx.amount,
            fee = tx.fee,
            block = state.open_block.number,
            "Transaction admitted"
        );

        state.transaction_ids.insert(id.clone());
        state.open_block.transactions.push(tx);

        if let Some(metrics) = &self.metrics {
            metrics.record_admitted(state.open_block.transactions.len());
        }

        if let Some(root) = sealing_root {
            self.seal(state, root);
        }

        Ok(id)
    }

    fn check_transaction(&self, state: &ChainState, tx: &Transaction) -> Result<Settlement> {
        if tx.amount > self.max_balance {
            return Err(Error::AmountOutOfRange {
                amount: tx.amount,
                max: self.max_balance,
            });
        }

        if tx.fee < MIN_FEE {
            return Err(Error::FeeTooLow {
                fee: tx.fee,
                min: MIN_FEE,
            });
        }

        let note_len = tx.note.chars().count();
        if note_len > MAX_NOTE_LEN {
            return Err(Error::NoteTooLong {
                len: note_len,
                max: MAX_NOTE_LEN,
            });
        }

        if state.transaction_ids.contains(&tx.id) {
            return Err(Error::DuplicateTransactionId(tx.id.to_string()));
        }

        let open = &state.open_block;
        let payer = open
            .accounts
            .get(&tx.payer)
            .ok_or_else(|| Error::AccountNotFound(tx.payer.to_string()))?;
        let receiver = open
            .accounts
            .get(&tx.receiver)
            .ok_or_else(|| Error::AccountNotFound(tx.receiver.to_string()))?;

        let required = tx.total_debit();
        if (payer.balance as u128) < required {
            return Err(Error::InsufficientFunds {
                address: payer.address.to_string(),
                balance: payer.balance,
                required,
            });
        }

        let payer_balance = payer.balance as u128 - required;
        let receiver_balance = if tx.payer == tx.receiver {
            payer_balance + tx.amount as u128
        } else {
            receiver.balance as u128 + tx.amount as u128
        };

        if receiver_balance > self.max_balance as u128 {
            return Err(Error::AmountOutOfRange {
                amount: tx.amount,
                max: self.max_balance,
            });
        }

        // Both values are bounded by max_balance
        Ok(Settlement {
            payer_balance: payer_balance as u64,
            receiver_balance: receiver_balance as u64,
        })
    }

    /// Seal the open block with `root` and open its successor
    fn seal(&self, state: &mut ChainState, root: String) {
        let started = Instant::now();

        state.open_block.hash = Some(root.clone());
        let next = Block::successor(&state.open_block, root.clone());
        let sealed = std::mem::replace(&mut state.open_block, next);
        let number = sealed.number;
        state.blocks.insert(number, sealed);

        if let Some(metrics) = &self.metrics {
            metrics.record_sealed(started.elapsed().as_secs_f64());
        }

        tracing::info!(block = number, hash = %root, "Block sealed");
    }

    /// Balance of `address` in the latest sealed block
    pub fn get_account_balance(&self, address: &str) -> Result<u64> {
        let state = self.state.read();

        let (_, block) = state
            .blocks
            .last_key_value()
            .ok_or(Error::NoCommittedBlock)?;

        block
            .account(address)
            .map(|account| account.balance)
            .ok_or_else(|| Error::AccountNotFound(address.to_string()))
    }

    /// All balances in the latest sealed block, `None` before the first seal
    pub fn get_account_balances(&self) -> Option<BTreeMap<String, u64>> {
        let state = self.state.read();
        state
            .blocks
            .last_key_value()
            .map(|(_, block)| block.balances())
    }

    /// Sealed or open block by number
    pub fn get_block(&self, number: u64) -> Result<Block> {
        let state = self.state.read();

        if let Some(block) = state.blocks.get(&number) {
            return Ok(block.clone());
        }
        if state.open_block.number == number {
            return Ok(state.open_block.clone());
        }

        Err(Error::BlockNotFound(number))
    }

    /// Find a transaction, scanning sealed blocks oldest first, then the open block
    pub fn get_transaction(&self, id: &str) -> Option<Transaction> {
        let state = self.state.read();

        state
            .blocks
            .values()
            .chain(std::iter::once(&state.open_block))
            .find_map(|block| block.transaction(id))
            .cloned()
    }

    /// Copy of the open block
    pub fn open_block(&self) -> Block {
        self.state.read().open_block.clone()
    }

    /// Number of sealed blocks
    pub fn number_of_blocks(&self) -> usize {
        self.state.read().blocks.len()
    }

    /// Merkle inclusion proof for a sealed transaction
    ///
    /// The proof's root equals the hash of the block holding the
    /// transaction. Leaf 0 is the seed, so the transaction at position `i`
    /// is leaf `i + 1`.
    pub fn prove_transaction(&self, id: &str) -> Result<MerkleProof> {
        let state = self.state.read();

        for block in state.blocks.values() {
            if let Some(position) = block.transactions.iter().position(|tx| tx.id.as_str() == id)
            {
                let leaves = block_leaves(&self.seed, &block.transactions);
                let tree = MerkleTree::from_leaves(self.algorithm, &leaves)?;
                return tree
                    .generate_proof(position + 1)
                    .ok_or_else(|| Error::Merkle(format!("no proof for leaf {}", position + 1)));
            }
        }

        if state.open_block.transaction(id).is_some() {
            return Err(Error::TransactionNotSealed(id.to_string()));
        }

        Err(Error::TransactionNotFound(id.to_string()))
    }

    /// Audit the sealed chain
    ///
    /// For every sealed block the previous hash must link to the prior block
    /// and the block must hold exactly [`BLOCK_CAPACITY`] transactions. Then
    /// the latest snapshot plus all collected fees must equal `max_balance`.
    /// Only after those pass is each block's Merkle root recomputed, so a
    /// tampered fee reports `BalanceMismatch` rather than a hash error. The
    /// open block is never read.
    pub fn validate(&self) -> Result<()> {
        let state = self.state.read();

        if let Some(metrics) = &self.metrics {
            metrics.record_validation();
        }

        let result = self.validate_chain(&state.blocks);
        if let Err(ref e) = result {
            tracing::error!(reason = %e.reason(), "Chain validation failed: {}", e);
        }
        result
    }

    fn validate_chain(&self, blocks: &BTreeMap<u64, Block>) -> Result<()> {
        let Some((_, latest)) = blocks.last_key_value() else {
            // Nothing settled yet
            return Ok(());
        };

        let mut fees: u128 = 0;

        for (&number, block) in blocks {
            if number > 1 {
                let linked = blocks
                    .get(&(number - 1))
                    .and_then(|previous| previous.hash.as_deref())
                    .is_some_and(|hash| hash == block.previous_hash);
                if !linked {
                    return Err(Error::HashInconsistent(number));
                }
            }

            if block.transactions.len() != BLOCK_CAPACITY {
                return Err(Error::TransactionCountInvalid {
                    block: number,
                    count: block.transactions.len(),
                });
            }

            fees += block.total_fees();
        }

        let balances = latest.total_balance();
        let expected = self.max_balance as u128;
        if balances + fees != expected {
            return Err(Error::BalanceMismatch {
                balances,
                fees,
                expected,
            });
        }

        self.verify_roots(blocks)
    }

    /// Recompute every sealed block's Merkle root against its stored hash
    fn verify_roots(&self, blocks: &BTreeMap<u64, Block>) -> Result<()> {
        for (&number, block) in blocks {
            let leaves = block_leaves(&self.seed, &block.transactions);
            let root = merkle_root(self.algorithm, &leaves)?;
            if block.hash.as_deref() != Some(root.as_str()) {
                return Err(Error::HashInconsistent(number));
            }
        }
        Ok(())
    }
}
